//! Source-media retrieval.
//!
//! The pipeline only depends on the `MediaFetcher` trait; `YtDlpFetcher`
//! is the production implementation, shelling out to yt-dlp with the
//! configured format preference and a deadline.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use vidbrand_core::{Config, JobError};

/// Resolves an opaque source reference to a local media file.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `source_ref` to `dest`. On success `dest` exists and is
    /// non-empty.
    async fn fetch(&self, source_ref: &str, dest: &Path) -> Result<(), JobError>;
}

/// yt-dlp subprocess fetcher.
pub struct YtDlpFetcher {
    ytdlp_path: String,
    format: String,
    timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(config: &Config) -> Self {
        Self {
            ytdlp_path: config.ytdlp_path.clone(),
            format: config.fetch_format.clone(),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, source_ref: &str, dest: &Path) -> Result<(), JobError> {
        tracing::debug!(source_ref, dest = %dest.display(), "starting download");

        let mut child = Command::new(&self.ytdlp_path)
            .arg("--no-playlist")
            .arg("-f")
            .arg(&self.format)
            .arg("-o")
            .arg(dest)
            .arg("--")
            .arg(source_ref)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| JobError::Fetch(format!("failed to run yt-dlp: {e}")))?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(JobError::Fetch(format!("failed to wait for yt-dlp: {e}"))),
            Err(_elapsed) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(JobError::Fetch(format!(
                    "download timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        if !status.success() {
            return Err(JobError::Fetch(format!("yt-dlp exited with {status}")));
        }

        let size = tokio::fs::metadata(dest)
            .await
            .map_err(|e| JobError::Fetch(format!("downloaded file missing: {e}")))?
            .len();
        if size == 0 {
            return Err(JobError::Fetch("downloaded file is empty".to_string()));
        }

        Ok(())
    }
}
