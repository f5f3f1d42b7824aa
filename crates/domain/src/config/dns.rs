use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsConfig {
    /// Tried in order; the first is the preferred upstream.
    #[serde(default = "default_upstream_servers")]
    pub upstream_servers: Vec<String>,

    /// Milliseconds to wait on each upstream before moving on.
    #[serde(default = "default_per_upstream_timeout")]
    pub per_upstream_timeout: u64,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    #[serde(default)]
    pub cache_min_ttl: u32,

    #[serde(default = "default_cache_max_ttl")]
    pub cache_max_ttl: u32,

    /// Where undecodable upstream replies are written. Unset disables dumping.
    #[serde(default)]
    pub malformed_dump_dir: Option<String>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            upstream_servers: default_upstream_servers(),
            per_upstream_timeout: default_per_upstream_timeout(),
            cache_enabled: true,
            cache_max_entries: default_cache_max_entries(),
            cache_min_ttl: 0,
            cache_max_ttl: default_cache_max_ttl(),
            malformed_dump_dir: None,
        }
    }
}

impl DnsConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.per_upstream_timeout)
    }
}

fn default_upstream_servers() -> Vec<String> {
    vec!["8.8.8.8:53".to_string(), "1.1.1.1:53".to_string()]
}

fn default_per_upstream_timeout() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_cache_max_ttl() -> u32 {
    86_400
}
