use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use super::dns::DnsConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::stun::StunConfig;
use crate::Endpoint;

const LOCAL_CONFIG_PATH: &str = "ferrous-netdiag.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/ferrous-netdiag/config.toml";

/// Main configuration structure for ferrous-netdiag
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Proxy listener (bind address, port)
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream resolvers and cache
    #[serde(default)]
    pub dns: DnsConfig,

    /// NAT classification
    #[serde(default)]
    pub stun: StunConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. ferrous-netdiag.toml in current directory
    /// 3. /etc/ferrous-netdiag/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if let Some(path) = Self::get_config_path() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply command-line overrides to configuration
    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(upstreams) = overrides.upstream_servers.filter(|u| !u.is_empty()) {
            self.dns.upstream_servers = upstreams;
        }
        if let Some(servers) = overrides.stun_servers.filter(|s| !s.is_empty()) {
            self.stun.servers = servers;
        }
        if let Some(timeout) = overrides.stun_timeout {
            self.stun.timeout = timeout;
        }
        if let Some(local) = overrides.stun_local_bind {
            self.stun.local_bind = local;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.dns_port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }
        if self.server.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid bind address '{}'",
                self.server.bind_address
            )));
        }

        if self.dns.upstream_servers.is_empty() {
            return Err(ConfigError::Validation(
                "No upstream servers configured".to_string(),
            ));
        }
        validate_endpoints("upstream", &self.dns.upstream_servers)?;
        if self.dns.per_upstream_timeout == 0 {
            return Err(ConfigError::Validation(
                "Upstream timeout cannot be 0".to_string(),
            ));
        }
        if self.dns.cache_enabled && self.dns.cache_max_entries == 0 {
            return Err(ConfigError::Validation(
                "Cache capacity cannot be 0 while the cache is enabled".to_string(),
            ));
        }
        if self.dns.cache_min_ttl > self.dns.cache_max_ttl {
            return Err(ConfigError::Validation(format!(
                "cache_min_ttl ({}) exceeds cache_max_ttl ({})",
                self.dns.cache_min_ttl, self.dns.cache_max_ttl
            )));
        }

        if self.stun.servers.is_empty() {
            return Err(ConfigError::Validation(
                "No STUN servers configured".to_string(),
            ));
        }
        validate_endpoints("STUN", &self.stun.servers)?;
        if self.stun.timeout == 0 {
            return Err(ConfigError::Validation(
                "STUN timeout cannot be 0".to_string(),
            ));
        }
        if self.stun.local_bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid STUN local bind address '{}'",
                self.stun.local_bind
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, toml_string)
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;
        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        [LOCAL_CONFIG_PATH, SYSTEM_CONFIG_PATH]
            .into_iter()
            .find(|p| std::path::Path::new(p).exists())
            .map(str::to_string)
    }

    pub fn upstream_endpoints(&self) -> Result<Vec<Endpoint>, ConfigError> {
        parse_endpoints("upstream", &self.dns.upstream_servers)
    }

    pub fn stun_endpoints(&self) -> Result<Vec<Endpoint>, ConfigError> {
        parse_endpoints("STUN", &self.stun.servers)
    }
}

fn parse_endpoints(kind: &str, raw: &[String]) -> Result<Vec<Endpoint>, ConfigError> {
    raw.iter()
        .map(|s| {
            s.parse::<Endpoint>().map_err(|e| {
                ConfigError::Validation(format!("Invalid {} server: {}", kind, e))
            })
        })
        .collect()
}

fn validate_endpoints(kind: &str, raw: &[String]) -> Result<(), ConfigError> {
    parse_endpoints(kind, raw).map(|_| ())
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub dns_port: Option<u16>,
    pub upstream_servers: Option<Vec<String>>,
    pub stun_servers: Option<Vec<String>>,
    pub stun_timeout: Option<u64>,
    pub stun_local_bind: Option<String>,
    pub log_level: Option<String>,
}
