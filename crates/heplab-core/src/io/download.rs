//! Streaming download with skip-if-identical and bounded retry.
//!
//! Before fetching, the remote `Content-Length` is compared against an
//! existing local file; identical sizes skip the transfer entirely (the
//! mirrors are static release archives, so size is a sufficient identity
//! check). Transient connection failures are retried a small bounded number
//! of times with a fixed backoff; HTTP error statuses are terminal.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use heplab_schema::PackageId;

use crate::reporter::Reporter;

/// Connection-level retry budget and fixed backoff.
const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

impl DownloadError {
    /// Connection-level failures are worth retrying; anything the server
    /// answered definitively is not.
    fn transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

/// Request for one remote file.
#[derive(Debug)]
pub struct DownloadRequest<'a, R: Reporter + ?Sized> {
    pub client: &'a Client,
    pub package: PackageId,
    pub url: &'a str,
    pub dest: &'a Path,
    /// Optional SHA256 to verify after transfer.
    pub expected_hash: Option<&'a str>,
    pub reporter: &'a R,
}

impl<R: Reporter + ?Sized> DownloadRequest<'_, R> {
    /// Execute the download, honoring skip-if-identical and the retry
    /// budget.
    pub async fn execute(&self) -> Result<(), DownloadError> {
        let file_name = crate::paths::filename_from_url(self.url);

        let remote_size = self.remote_size().await;
        if let (Some(remote), Ok(meta)) = (remote_size, std::fs::metadata(self.dest)) {
            if meta.len() == remote {
                tracing::info!("{file_name} already downloaded ({remote} bytes), skipping");
                return Ok(());
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch(file_name, remote_size).await {
                Ok(()) => return Ok(()),
                Err(e) if e.transient() && attempt <= MAX_RETRIES => {
                    tracing::warn!(
                        "download of {file_name} failed (attempt {attempt}/{MAX_RETRIES}): {e}, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn remote_size(&self) -> Option<u64> {
        let resp = self
            .client
            .head(self.url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .ok()?;
        // `Response::content_length()` reports the body size hint, which is
        // always 0 for HEAD responses; the header carries the real size.
        resp.error_for_status()
            .ok()?
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }

    async fn fetch(&self, file_name: &str, total: Option<u64>) -> Result<(), DownloadError> {
        if let Some(parent) = self.dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let response = self
            .client
            .get(self.url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let total = total.or_else(|| response.content_length());
        let mut file = File::create(self.dest).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            self.reporter
                .downloading(self.package, file_name, downloaded, total);
        }
        file.flush().await?;

        if let Some(expected) = self.expected_hash {
            let actual = hex::encode(hasher.finalize());
            if actual != expected {
                tokio::fs::remove_file(self.dest).await.ok();
                return Err(DownloadError::HashMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok(())
    }
}
