//! # Node Configuration
//!
//! Layered configuration: compiled defaults, then a TOML file, then
//! `NODE_*` environment variables, then command-line flags. Each layer
//! only overrides the keys it sets.
//!
//! [`NodeConfig::validate`] runs last. It normalizes peer endpoints and
//! rejects values the node cannot start with.

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use peer_discovery::InitialPeerList;

use crate::adapters::storage::{StorageBackend, StorageConfig};
use crate::logging::{self, LoggingError, DEFAULT_LOG_LEVEL};
use crate::params::{Network, NetworkParams};

/// Environment variable naming the config file.
pub const CONFIG_FILE_ENV: &str = "NODE_CONFIG_FILE";

/// Config file read from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "node.toml";

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Peer networking.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub network: Network,
    pub listen_ip: IpAddr,
    /// Defaults to the network's peer port.
    pub listen_port: Option<u16>,
    /// Persistent peers. When non-empty, the only peers dialed.
    pub connect_peers: Vec<String>,
    /// Opportunistic peers.
    pub add_peers: Vec<String>,
    pub disable_dns_seed: bool,
    /// Replaces the network's compiled-in seed list.
    pub dns_seeds: Option<Vec<String>>,
    /// Inserted when DNS seeding yields no addresses.
    pub seed_fallback_peers: Vec<SocketAddr>,
    /// SOCKS5 proxy.
    pub proxy: Option<SocketAddr>,
    /// Resolve seeds through `proxy`.
    pub use_tor: bool,
    pub dns_timeout: Duration,
    pub connect_timeout: Duration,
    pub persistent_retry_delay: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: None,
            connect_peers: Vec::new(),
            add_peers: Vec::new(),
            disable_dns_seed: false,
            dns_seeds: None,
            seed_fallback_peers: Vec::new(),
            proxy: None,
            use_tor: false,
            dns_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
            persistent_retry_delay: Duration::from_secs(5),
        }
    }
}

impl NetworkConfig {
    /// Proxy used for seed resolution: set only when Tor is enabled.
    pub fn seed_proxy(&self) -> Option<SocketAddr> {
        if self.use_tor {
            self.proxy
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// A level (`trace` .. `critical`, `off`) or filter directives.
    pub debug_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Values taken from the command line. Unset fields leave the lower
/// layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub network: Option<Network>,
    pub data_dir: Option<PathBuf>,
    pub debug_level: Option<String>,
    pub connect_peers: Vec<String>,
    pub add_peers: Vec<String>,
    pub disable_dns_seed: bool,
    pub listen_port: Option<u16>,
    pub proxy: Option<SocketAddr>,
    pub use_tor: bool,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(String),

    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    DebugLevel(#[from] LoggingError),
}

fn invalid(key: &str, value: &str, reason: impl Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e| invalid(key, value, e))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected a boolean")),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_socket_addrs(key: &str, values: &[String]) -> Result<Vec<SocketAddr>, ConfigError> {
    values.iter().map(|v| parse_value(key, v)).collect()
}

/// Add the default port to an endpoint that has none.
///
/// Accepts `ip:port`, `[v6]:port`, a bare IP, `host:port` or a bare host.
pub fn normalize_endpoint(endpoint: &str, default_port: u16) -> Result<String, ConfigError> {
    let key = "peer endpoint";
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(invalid(key, endpoint, "empty"));
    }

    if let Ok(addr) = trimmed.parse::<SocketAddr>() {
        return Ok(addr.to_string());
    }
    if let Ok(ip) = trimmed.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port).to_string());
    }

    match trimmed.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() || host.contains(':') {
                return Err(invalid(key, endpoint, "malformed host"));
            }
            port.parse::<u16>()
                .map_err(|_| invalid(key, endpoint, "malformed port"))?;
            Ok(trimmed.to_string())
        }
        None => Ok(format!("{}:{}", trimmed, default_port)),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    network: NetworkSection,
    storage: StorageSection,
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NetworkSection {
    network: Option<Network>,
    listen_ip: Option<IpAddr>,
    listen_port: Option<u16>,
    connect_peers: Option<Vec<String>>,
    add_peers: Option<Vec<String>>,
    disable_dns_seed: Option<bool>,
    dns_seeds: Option<Vec<String>>,
    seed_fallback_peers: Option<Vec<String>>,
    proxy: Option<String>,
    use_tor: Option<bool>,
    dns_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    persistent_retry_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StorageSection {
    data_dir: Option<PathBuf>,
    backend: Option<StorageBackend>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggingSection {
    debug_level: Option<String>,
}

impl NodeConfig {
    /// Load from the process environment and `overrides`.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        Self::load_with_env(path, overrides, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup.
    pub fn load_with_env<F>(
        path: Option<&Path>,
        overrides: &CliOverrides,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(file) = Self::config_path(path, &env) {
            let text = std::fs::read_to_string(&file).map_err(|source| ConfigError::Read {
                path: file.clone(),
                source,
            })?;
            config.apply_toml(&text)?;
        }

        config.apply_env(&env)?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn config_path<F>(path: Option<&Path>, env: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = path {
            return Some(path.to_path_buf());
        }
        if let Some(path) = env(CONFIG_FILE_ENV) {
            return Some(PathBuf::from(path));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    }

    /// Merge a TOML document over the current values.
    pub fn apply_toml(&mut self, text: &str) -> Result<(), ConfigError> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let net = &mut self.network;
        let section = file.network;

        if let Some(v) = section.network {
            net.network = v;
        }
        if let Some(v) = section.listen_ip {
            net.listen_ip = v;
        }
        if let Some(v) = section.listen_port {
            net.listen_port = Some(v);
        }
        if let Some(v) = section.connect_peers {
            net.connect_peers = v;
        }
        if let Some(v) = section.add_peers {
            net.add_peers = v;
        }
        if let Some(v) = section.disable_dns_seed {
            net.disable_dns_seed = v;
        }
        if let Some(v) = section.dns_seeds {
            net.dns_seeds = Some(v);
        }
        if let Some(v) = section.seed_fallback_peers {
            net.seed_fallback_peers = parse_socket_addrs("network.seed_fallback_peers", &v)?;
        }
        if let Some(v) = section.proxy {
            net.proxy = Some(parse_value("network.proxy", &v)?);
        }
        if let Some(v) = section.use_tor {
            net.use_tor = v;
        }
        if let Some(v) = section.dns_timeout_secs {
            net.dns_timeout = Duration::from_secs(v);
        }
        if let Some(v) = section.connect_timeout_secs {
            net.connect_timeout = Duration::from_secs(v);
        }
        if let Some(v) = section.persistent_retry_secs {
            net.persistent_retry_delay = Duration::from_secs(v);
        }

        if let Some(v) = file.storage.data_dir {
            self.storage.data_dir = v;
        }
        if let Some(v) = file.storage.backend {
            self.storage.backend = v;
        }
        if let Some(v) = file.logging.debug_level {
            self.logging.debug_level = v;
        }
        Ok(())
    }

    /// Apply `NODE_*` variables from `env`.
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let net = &mut self.network;

        if let Some(v) = env("NODE_NETWORK") {
            net.network = parse_value("NODE_NETWORK", &v)?;
        }
        if let Some(v) = env("NODE_LISTEN_IP") {
            net.listen_ip = parse_value("NODE_LISTEN_IP", &v)?;
        }
        if let Some(v) = env("NODE_LISTEN_PORT") {
            net.listen_port = Some(parse_value("NODE_LISTEN_PORT", &v)?);
        }
        if let Some(v) = env("NODE_CONNECT_PEERS") {
            net.connect_peers = parse_list(&v);
        }
        if let Some(v) = env("NODE_ADD_PEERS") {
            net.add_peers = parse_list(&v);
        }
        if let Some(v) = env("NODE_DISABLE_DNS_SEED") {
            net.disable_dns_seed = parse_bool("NODE_DISABLE_DNS_SEED", &v)?;
        }
        if let Some(v) = env("NODE_DNS_SEEDS") {
            net.dns_seeds = Some(parse_list(&v));
        }
        if let Some(v) = env("NODE_SEED_FALLBACK_PEERS") {
            net.seed_fallback_peers =
                parse_socket_addrs("NODE_SEED_FALLBACK_PEERS", &parse_list(&v))?;
        }
        if let Some(v) = env("NODE_PROXY") {
            net.proxy = Some(parse_value("NODE_PROXY", &v)?);
        }
        if let Some(v) = env("NODE_USE_TOR") {
            net.use_tor = parse_bool("NODE_USE_TOR", &v)?;
        }
        if let Some(v) = env("NODE_DNS_TIMEOUT_SECS") {
            net.dns_timeout = Duration::from_secs(parse_value("NODE_DNS_TIMEOUT_SECS", &v)?);
        }

        if let Some(v) = env("NODE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env("NODE_STORAGE_BACKEND") {
            self.storage.backend = parse_value("NODE_STORAGE_BACKEND", &v)?;
        }
        if let Some(v) = env("NODE_DEBUG_LEVEL") {
            self.logging.debug_level = v;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        let net = &mut self.network;

        if let Some(v) = overrides.network {
            net.network = v;
        }
        if let Some(v) = overrides.listen_port {
            net.listen_port = Some(v);
        }
        if !overrides.connect_peers.is_empty() {
            net.connect_peers = overrides.connect_peers.clone();
        }
        if !overrides.add_peers.is_empty() {
            net.add_peers = overrides.add_peers.clone();
        }
        if overrides.disable_dns_seed {
            net.disable_dns_seed = true;
        }
        if let Some(v) = overrides.proxy {
            net.proxy = Some(v);
        }
        if overrides.use_tor {
            net.use_tor = true;
        }
        if let Some(v) = &overrides.data_dir {
            self.storage.data_dir = v.clone();
        }
        if let Some(v) = &overrides.debug_level {
            self.logging.debug_level = v.clone();
        }
    }

    /// Normalize endpoints and reject values the node cannot run with.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        logging::parse_directives(&self.logging.debug_level)?;

        let default_port = self.network_params().default_port;
        let net = &mut self.network;

        for list in [&mut net.connect_peers, &mut net.add_peers] {
            for endpoint in list.iter_mut() {
                *endpoint = normalize_endpoint(endpoint, default_port)?;
            }
        }

        if net.use_tor && net.proxy.is_none() {
            return Err(invalid("use_tor", "true", "requires a proxy"));
        }
        for (key, value) in [
            ("dns_timeout_secs", net.dns_timeout),
            ("connect_timeout_secs", net.connect_timeout),
            ("persistent_retry_secs", net.persistent_retry_delay),
        ] {
            if value.is_zero() {
                return Err(invalid(key, "0", "must be positive"));
            }
        }
        Ok(())
    }

    /// Parameters for the configured network, with any seed override.
    pub fn network_params(&self) -> NetworkParams {
        let params = NetworkParams::for_network(self.network.network);
        match &self.network.dns_seeds {
            Some(seeds) => params.with_dns_seeds(seeds.clone()),
            None => params,
        }
    }

    pub fn listen_addr(&self, params: &NetworkParams) -> SocketAddr {
        SocketAddr::new(
            self.network.listen_ip,
            self.network.listen_port.unwrap_or(params.default_port),
        )
    }

    pub fn initial_peers(&self) -> InitialPeerList {
        InitialPeerList::new(
            self.network.connect_peers.clone(),
            self.network.add_peers.clone(),
        )
    }
}
