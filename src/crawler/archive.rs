//! Best-effort archival records
//!
//! Each successful fetch leaves a small metadata file (URL, date, status)
//! in the archive directory. Failures here never affect the crawl.

use chrono::{DateTime, SecondsFormat, Utc};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    dir: PathBuf,
}

impl ArchiveWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `<dir>/<unix nanos>.txt` for one fetch
    pub async fn write(
        &self,
        url: &str,
        status: u16,
        fetched_at: DateTime<Utc>,
    ) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let nanos = fetched_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| fetched_at.timestamp_micros().saturating_mul(1000));
        let path = self.dir.join(format!("{}.txt", nanos));

        let record = format!(
            "URL: {}\nDate: {}\nStatus: {}\n\n",
            url,
            fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            status
        );
        tokio::fs::write(&path, record).await?;

        Ok(path)
    }

    /// Like [`write`](Self::write), but logs and swallows any failure
    pub async fn record(&self, url: &str, status: u16, fetched_at: DateTime<Utc>) {
        match self.write(url, status, fetched_at).await {
            Ok(path) => tracing::trace!(url, path = %path.display(), "archived fetch"),
            Err(e) => tracing::warn!(url, dir = %self.dir.display(), error = %e, "archive write failed"),
        }
    }
}
