//! ICU source acquisition.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use icu_forge_core::{BuildConfig, ForgeError, Result, Workspace};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Default base URL for ICU tag archives.
pub const DEFAULT_SOURCE_URL: &str = "https://github.com/unicode-org/icu/archive/refs/tags";

/// Connect and read-inactivity timeout for the archive download. A slow
/// transfer that keeps making progress is never cut off.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Supplies an unpacked ICU source tree inside the workspace.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Make `workspace.source_dir(config)` exist.
    async fn fetch(&self, config: &BuildConfig, workspace: &Workspace) -> Result<()>;
}

/// Downloads the tag archive over HTTP and extracts it into the workspace.
///
/// An archive left over from an earlier run is reused without touching
/// the network.
#[derive(Debug, Clone)]
pub struct HttpSourceProvider {
    url_base: String,
    client: reqwest::Client,
}

impl HttpSourceProvider {
    pub fn new(url_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(DOWNLOAD_TIMEOUT)
            .read_timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| ForgeError::SourceUnavailable(format!("HTTP client: {e}")))?;
        Ok(Self {
            url_base: url_base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Archive URL for a source tag.
    pub fn archive_url(&self, tag: &str) -> String {
        format!("{}/{}.tar.gz", self.url_base, tag)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!(url = %url, "Downloading ICU source");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ForgeError::SourceUnavailable(format!("request to {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(ForgeError::SourceUnavailable(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        // Land under a temporary name so an interrupted download is never
        // mistaken for a cached archive.
        let partial = PathBuf::from(format!("{}.partial", dest.display()));
        let written = match stream_to_file(response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, dest)
            .await
            .map_err(|e| ForgeError::io_at(dest, e))?;

        info!(path = %dest.display(), bytes = written, "Downloaded ICU source");
        Ok(())
    }
}

#[async_trait]
impl SourceProvider for HttpSourceProvider {
    async fn fetch(&self, config: &BuildConfig, workspace: &Workspace) -> Result<()> {
        let archive = workspace.source_archive(config);

        if archive.is_file() {
            info!(path = %archive.display(), "Using cached ICU source archive");
        } else {
            self.download(&self.archive_url(config.source_tag()), &archive)
                .await?;
        }

        let root = workspace.root().to_path_buf();
        let archive_for_task = archive.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_archive(&archive_for_task, &root))
            .await
            .map_err(|e| ForgeError::SourceUnavailable(format!("extraction task: {e}")))?;

        if let Err(e) = extracted {
            warn!(path = %archive.display(), "Removing unreadable source archive");
            let _ = std::fs::remove_file(&archive);
            return Err(e);
        }

        let source_dir = workspace.source_dir(config);
        if !source_dir.is_dir() {
            return Err(ForgeError::SourceUnavailable(format!(
                "archive {} did not contain {}",
                archive.display(),
                source_dir.display()
            )));
        }

        info!(path = %source_dir.display(), "Extracted ICU source");
        Ok(())
    }
}

/// Write the response body to `path` chunk by chunk, returning the byte count.
async fn stream_to_file(mut response: reqwest::Response, path: &Path) -> Result<u64> {
    let url = response.url().to_string();
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ForgeError::io_at(path, e))?;
    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ForgeError::SourceUnavailable(format!("reading body of {url}: {e}")))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| ForgeError::io_at(path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| ForgeError::io_at(path, e))?;
    Ok(written)
}

/// Unpack a `.tar.gz` archive into `dest`.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive).map_err(|e| ForgeError::io_at(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.unpack(dest).map_err(|e| {
        ForgeError::SourceUnavailable(format!("extracting {}: {e}", archive.display()))
    })
}
