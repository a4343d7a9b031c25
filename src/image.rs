//! Downloads remote images next to the rendered documents.
use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::Config;

/// Extension used when the URL path carries none.
pub const DEFAULT_EXTENSION: &str = ".jpg";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http-status: remote answered {code}")]
    HttpStatus { code: u16 },
    #[error("transport: {message}")]
    Transport { message: String },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    fn transport(err: reqwest::Error) -> Self {
        FetchError::Transport {
            message: err.to_string(),
        }
    }

    fn write(path: &Path, source: std::io::Error) -> Self {
        FetchError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Store the resource at `url` in `dest`. The parent of `dest` must exist.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

/// Streams responses straight to disk.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    http: Client,
}

impl HttpImageFetcher {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder().user_agent(cfg.http.user_agent.clone());
        if let Some(secs) = cfg.http.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self::new(http))
    }

    async fn stream_to(&self, res: reqwest::Response, dest: &Path) -> Result<u64, FetchError> {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| FetchError::write(dest, e))?;
        let mut written = 0u64;
        let mut stream = res.bytes_stream();
        let outcome = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(FetchError::transport)?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| FetchError::write(dest, e))?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(|e| FetchError::write(dest, e))
        }
        .await;
        drop(file);

        if let Err(err) = outcome {
            if let Err(rm) = tokio::fs::remove_file(dest).await {
                warn!(path=%dest.display(), error=%rm, "failed to remove partial download");
            }
            return Err(err);
        }
        Ok(written)
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(FetchError::transport)?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                code: status.as_u16(),
            });
        }
        let bytes = self.stream_to(res, dest).await?;
        debug!(url, path=%dest.display(), bytes, "downloaded image");
        Ok(())
    }
}

/// Extension of the URL's last path segment, query string removed. Falls back
/// to `.jpg`. Case is preserved.
pub fn infer_extension(url: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => name[idx..].to_string(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// The per-document image directory and the public URL it is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDir {
    pub local: PathBuf,
    pub public: String,
}

impl AssetDir {
    pub fn for_slug(image_root: impl AsRef<Path>, public_base: &str, slug: &str) -> Self {
        Self {
            local: image_root.as_ref().join(slug),
            public: format!("{}/{}", public_base.trim_end_matches('/'), slug),
        }
    }

    pub async fn ensure(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.local).await
    }

    pub fn public_path(&self, filename: &str) -> String {
        format!("{}/{}", self.public, filename)
    }

    /// Download `url` as `<stem><ext>` and return its public path.
    pub async fn materialize(
        &self,
        fetcher: &dyn ImageFetcher,
        url: &str,
        stem: &str,
    ) -> Result<String, FetchError> {
        let filename = format!("{}{}", stem, infer_extension(url));
        fetcher.fetch(url, &self.local.join(&filename)).await?;
        Ok(self.public_path(&filename))
    }
}
