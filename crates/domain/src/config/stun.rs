use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StunConfig {
    /// Candidate servers, tried in order until one answers.
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Milliseconds to wait for each binding response.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Local address the STUN socket binds to.
    #[serde(default = "default_local_bind")]
    pub local_bind: String,
}

impl Default for StunConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            timeout: default_timeout(),
            local_bind: default_local_bind(),
        }
    }
}

impl StunConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

fn default_servers() -> Vec<String> {
    vec![
        "stun.l.google.com:19302".to_string(),
        "stun.ekiga.net:3478".to_string(),
    ]
}

fn default_timeout() -> u64 {
    2000
}

fn default_local_bind() -> String {
    "0.0.0.0:0".to_string()
}
