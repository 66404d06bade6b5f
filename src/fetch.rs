//! Streaming package download to scratch storage

use std::path::PathBuf;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::config::USER_AGENT;
use crate::error::DownloadError;

/// Streams a remote package to a uniquely named scratch file.
///
/// The body is written chunk by chunk, never buffered whole. The returned
/// path is owned by the caller, deletion included; the fetcher never
/// removes a file it handed out.
pub struct PackageFetcher {
    client: Client,
}

impl PackageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let scratch = tempfile::Builder::new()
            .prefix("apphash-pkg-")
            .suffix(".apk")
            .tempfile()?
            .into_temp_path();

        let mut file = File::create(&scratch).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }
        file.flush().await?;

        let path = scratch.keep().map_err(|e| e.error)?;
        info!("Package downloaded to {} ({} bytes)", path.display(), downloaded);
        Ok(path)
    }
}
