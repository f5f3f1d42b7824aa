//! Persistence of upstream replies that failed to decode.

use async_trait::async_trait;
use chrono::Utc;
use ferrous_netdiag_application::ports::MalformedReplySink;
use ferrous_netdiag_domain::DomainError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Writes each malformed reply verbatim to its own file,
/// `malformed-<timestamp>-<upstream>-<seq>.bin`, under a fixed directory.
pub struct MalformedReplyDumper {
    dir: PathBuf,
    seq: AtomicU64,
}

impl MalformedReplyDumper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    fn file_name(&self, upstream: SocketAddr) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let upstream: String = upstream
            .to_string()
            .chars()
            .filter(|c| !matches!(c, '[' | ']'))
            .map(|c| if c == ':' { '_' } else { c })
            .collect();
        format!("malformed-{}-{}-{}.bin", timestamp, upstream, seq)
    }
}

#[async_trait]
impl MalformedReplySink for MalformedReplyDumper {
    async fn persist(&self, upstream: SocketAddr, bytes: &[u8]) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(self.file_name(upstream));
        tokio::fs::write(&path, bytes).await?;
        info!(
            upstream = %upstream,
            path = %path.display(),
            bytes = bytes.len(),
            "Malformed reply saved"
        );
        Ok(())
    }
}
