//! HTTP archive downloads
//!
//! Streams archives into a per-user cache keyed by URL hash, with retry on
//! network failure and md5/sha256 integrity verification. A cached file that
//! no longer matches its expected digest is invalidated and fetched once
//! more before the mismatch is reported.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::defaults;
use crate::core::component::{Checksum, ChecksumAlgorithm};
use crate::error::FetchError;

/// Environment variable overriding the download cache directory
pub const ENV_CACHE_DIR: &str = "OMNIFORGE_CACHE_DIR";

/// Resolve the download cache directory.
///
/// `OMNIFORGE_CACHE_DIR` wins; otherwise the platform cache dir
/// (`~/.cache/omniforge/downloads` on Linux).
pub fn default_cache_dir() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_CACHE_DIR) {
        return PathBuf::from(path);
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("omniforge")
        .join("downloads")
}

/// Archive downloader with retry and a URL-keyed cache
#[derive(Debug, Clone)]
pub struct DownloadManager {
    client: reqwest::Client,
    max_retries: u32,
    base_delay_ms: u64,
    cache_dir: PathBuf,
}

impl DownloadManager {
    /// Create a manager using the default cache directory
    pub fn new() -> Self {
        Self::with_cache_dir(default_cache_dir())
    }

    /// Create a manager caching under `cache_dir`
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            max_retries: defaults::MAX_DOWNLOAD_RETRIES,
            base_delay_ms: 1000,
            cache_dir,
        }
    }

    /// Shorten the retry backoff, for tests
    #[cfg(test)]
    fn with_fast_retries(mut self) -> Self {
        self.base_delay_ms = 10;
        self
    }

    /// Cache location for `url`: `<sha256(url) prefix>-<basename>`
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let key = hex::encode(Sha256::digest(url.as_bytes()));
        let base = url_basename(url);
        self.cache_dir.join(format!("{}-{base}", &key[..16]))
    }

    /// Fetch `url` into the cache, verifying `expected` when given.
    ///
    /// Returns the cached file path. A pre-existing cache entry is reused
    /// when its digest matches (or no digest is expected); a stale entry is
    /// deleted and the URL downloaded again.
    pub async fn fetch(
        &self,
        url: &str,
        expected: Option<&Checksum>,
    ) -> Result<PathBuf, FetchError> {
        let cached = self.cache_path(url);

        if cached.exists() {
            match expected {
                None => {
                    tracing::debug!("Using cached download for {url}");
                    return Ok(cached);
                }
                Some(checksum) => {
                    let actual = digest_file(&cached, checksum.algorithm)?;
                    if actual == checksum.digest {
                        tracing::debug!("Using cached download for {url}");
                        return Ok(cached);
                    }
                    tracing::warn!("Cached file for {url} failed verification; refetching");
                    std::fs::remove_file(&cached).map_err(|e| FetchError::Io {
                        path: cached.clone(),
                        error: e.to_string(),
                    })?;
                }
            }
        }

        self.download_with_retry(url, &cached).await?;

        if let Some(checksum) = expected {
            let actual = digest_file(&cached, checksum.algorithm)?;
            if actual != checksum.digest {
                let _ = std::fs::remove_file(&cached);
                return Err(FetchError::Integrity {
                    file: cached.display().to_string(),
                    algorithm: checksum.algorithm.as_str().to_string(),
                    expected: checksum.digest.clone(),
                    actual,
                });
            }
        }

        Ok(cached)
    }

    /// Download with retry, doubling the delay between attempts (capped at
    /// 30 seconds). A partial file is removed when every attempt fails.
    async fn download_with_retry(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let mut attempts = 0;
        let mut last_error = None;
        let mut delay_ms = self.base_delay_ms;

        while attempts < self.max_retries {
            attempts += 1;

            match self.download_once(url, dest).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!("Download attempt {attempts} for {url} failed: {e}");
                    last_error = Some(e);

                    if attempts < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(30_000);
                    }
                }
            }
        }

        let _ = tokio::fs::remove_file(dest).await;

        Err(last_error.unwrap_or_else(|| FetchError::Download {
            url: url.to_string(),
            error: format!("gave up after {} attempts", self.max_retries),
        }))
    }

    /// Single streaming download attempt
    async fn download_once(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Download {
                url: url.to_string(),
                error: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Download {
                url: url.to_string(),
                error: format!("HTTP {}", response.status()),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::Io {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                })?;
        }

        let mut file = File::create(dest).await.map_err(|e| FetchError::Io {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| FetchError::Download {
                url: url.to_string(),
                error: e.to_string(),
            })?;

            file.write_all(&chunk).await.map_err(|e| FetchError::Io {
                path: dest.to_path_buf(),
                error: e.to_string(),
            })?;
        }

        file.flush().await.map_err(|e| FetchError::Io {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(())
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Final path segment of `url`, without query or fragment
pub fn url_basename(url: &str) -> &str {
    url.rsplit('/')
        .next()
        .and_then(|name| name.split(['?', '#']).next())
        .filter(|name| !name.is_empty())
        .unwrap_or("download")
}

/// Hex digest of a file under the given algorithm
pub fn digest_file(path: &Path, algorithm: ChecksumAlgorithm) -> Result<String, FetchError> {
    let content = std::fs::read(path).map_err(|e| FetchError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(digest_bytes(&content, algorithm))
}

/// Hex digest of a byte slice under the given algorithm
pub fn digest_bytes(data: &[u8], algorithm: ChecksumAlgorithm) -> String {
    match algorithm {
        ChecksumAlgorithm::Md5 => hex::encode(md5::Md5::digest(data)),
        ChecksumAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
    }
}
