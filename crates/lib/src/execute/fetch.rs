//! Source downloads.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::BuildError;

/// Downloads a URL to a file.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
  /// Download `url` to `dest`. Either `dest` ends up complete or it is not
  /// created at all.
  async fn fetch(&self, url: &str, dest: &Path) -> Result<(), BuildError>;
}

impl<T: Fetcher> Fetcher for &T {
  async fn fetch(&self, url: &str, dest: &Path) -> Result<(), BuildError> {
    (**self).fetch(url, dest).await
  }
}

/// HTTP(S) fetcher following redirects. No retries: transport failures are
/// left to the invoking CI.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Fetcher for HttpFetcher {
  async fn fetch(&self, url: &str, dest: &Path) -> Result<(), BuildError> {
    info!(url = %url, dest = %dest.display(), "fetching");

    let fetch_failed = |message: String| BuildError::FetchFailed {
      url: url.to_string(),
      message,
    };

    let mut response = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| fetch_failed(e.to_string()))?;

    if !response.status().is_success() {
      return Err(fetch_failed(format!("HTTP {}", response.status())));
    }

    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;

    let mut size = 0usize;
    while let Some(chunk) = response.chunk().await.map_err(|e| fetch_failed(e.to_string()))? {
      file.write_all(&chunk)?;
      size += chunk.len();
    }
    file.flush()?;
    file.persist(dest).map_err(|e| BuildError::Io(e.error))?;

    info!(path = %dest.display(), size, "download complete");
    Ok(())
  }
}
