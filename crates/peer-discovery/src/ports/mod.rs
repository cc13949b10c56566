//! # Ports Layer
//!
//! Traits the discovery services drive. The node runtime supplies the
//! concrete implementations (peer server, address book, resolvers).

pub mod outbound;

pub use outbound::{AddressPool, PeerDialer, SeedResolver, TimeSource};
