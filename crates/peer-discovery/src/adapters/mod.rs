//! # Adapters Layer
//!
//! - `time` - system clock (always available)
//! - `dns` - system resolver, SOCKS5 aware (feature `network`)
//! - `socks` - SOCKS5 `RESOLVE` client for Tor (feature `network`)

mod time;

#[cfg(feature = "network")]
mod dns;
#[cfg(feature = "network")]
mod socks;

pub use time::SystemTimeSource;

#[cfg(feature = "network")]
pub use dns::SystemSeedResolver;
#[cfg(feature = "network")]
pub use socks::{SocksResolver, SocksError};
