use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;
use crate::core::http::Fetcher;

/// A single file to materialize, with an optional SHA-1 for callers that
/// choose to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    /// Expected byte length. A body of another length counts as a failed
    /// attempt.
    pub size: Option<u64>,
}

impl DownloadEntry {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            sha1: None,
            size: None,
        }
    }

    pub fn with_sha1(mut self, sha1: Option<String>) -> Self {
        self.sha1 = sha1;
        self
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }
}

/// Whether a call actually hit the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Downloaded,
    AlreadyPresent,
}

/// Concurrent downloader with existence-based skipping and a single retry.
pub struct Downloader {
    fetcher: Arc<dyn Fetcher>,
    /// Maximum number of parallel downloads.
    concurrency: usize,
    /// Per-attempt timeout.
    timeout: Duration,
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            concurrency: 2,
            timeout: Duration::from_millis(50_000),
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    // ── Fetch with retry ────────────────────────────────

    async fn fetch_once(&self, url: &str, size: Option<u64>) -> LauncherResult<Vec<u8>> {
        let bytes = match tokio::time::timeout(self.timeout, self.fetcher.fetch(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(LauncherError::download(
                    url,
                    format!("timed out after {} ms", self.timeout.as_millis()),
                ))
            }
        };
        match size {
            Some(expected) if bytes.len() as u64 != expected => Err(LauncherError::download(
                url,
                format!("expected {} bytes, got {}", expected, bytes.len()),
            )),
            _ => Ok(bytes),
        }
    }

    /// Fetch `url`, retrying exactly once with the same parameters.
    ///
    /// When `size` is known, a body of a different length fails the attempt.
    pub async fn fetch_with_retry(&self, url: &str, size: Option<u64>) -> LauncherResult<Vec<u8>> {
        match self.fetch_once(url, size).await {
            Ok(bytes) => Ok(bytes),
            Err(first) => {
                warn!("Fetch failed for {}, retrying once: {}", url, first);
                self.fetch_once(url, size).await
            }
        }
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to `dest` unless `dest` already exists.
    pub async fn download_file(&self, url: &str, dest: &Path) -> LauncherResult<FileStatus> {
        self.download_entry(&DownloadEntry::new(url, dest)).await
    }

    /// Materialize one entry.
    ///
    /// Existence is the only freshness check. Bytes land in a uniquely named
    /// `.part` sibling first and are renamed into place, so an interrupted
    /// transfer never leaves a file that a later run would skip, and two
    /// writers racing on one destination never share a temp file.
    pub async fn download_entry(&self, entry: &DownloadEntry) -> LauncherResult<FileStatus> {
        let (url, dest) = (entry.url.as_str(), entry.dest.as_path());
        if dest.exists() {
            return Ok(FileStatus::AlreadyPresent);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let bytes = self.fetch_with_retry(url, entry.size).await?;

        let partial = partial_path(dest);
        // Scoped so the handle is closed before the rename (Windows).
        {
            let mut file = tokio::fs::File::create(&partial)
                .await
                .map_err(|e| LauncherError::io(&partial, e))?;
            file.write_all(&bytes)
                .await
                .map_err(|e| LauncherError::io(&partial, e))?;
            file.flush()
                .await
                .map_err(|e| LauncherError::io(&partial, e))?;
        }
        if let Err(e) = tokio::fs::rename(&partial, dest).await {
            let _ = tokio::fs::remove_file(&partial).await;
            if dest.exists() {
                debug!("{:?} was written concurrently, keeping it", dest);
                return Ok(FileStatus::AlreadyPresent);
            }
            return Err(LauncherError::io(dest, e));
        }

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(FileStatus::Downloaded)
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files concurrently using `buffer_unordered`.
    ///
    /// Entries sharing a destination are collapsed to the first one.
    /// Emits `Progress { category, completed, total }` once at 0 and then
    /// after every entry (downloaded or already present). The first entry
    /// that still fails after its retry aborts the batch; files completed
    /// before that stay on disk. Returns how many files were fetched.
    pub async fn download_batch(
        &self,
        category: &str,
        entries: Vec<DownloadEntry>,
        sink: &dyn EventSink,
    ) -> LauncherResult<usize> {
        let entries = dedup_by_dest(entries);
        let total = entries.len();
        info!(
            "Starting {} batch: {} files, concurrency={}",
            category, total, self.concurrency
        );
        sink.progress(category, 0, total);

        let mut pending = stream::iter(entries)
            .map(|entry| async move { self.download_entry(&entry).await })
            .buffer_unordered(self.concurrency);

        let mut completed = 0;
        let mut fetched = 0;
        while let Some(result) = pending.next().await {
            if result? == FileStatus::Downloaded {
                fetched += 1;
            }
            completed += 1;
            sink.progress(category, completed, total);
        }

        info!(
            "Finished {} batch: {} fetched, {} already present",
            category,
            fetched,
            total - fetched
        );
        Ok(fetched)
    }

    /// Compare an existing file's SHA-1 with `expected`.
    pub async fn verify_sha1(path: &Path, expected: &str) -> LauncherResult<bool> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        let actual = hex::encode(hasher.finalize());
        Ok(actual.eq_ignore_ascii_case(expected))
    }

    /// Like [`Downloader::verify_sha1`] but reports a mismatch as an error.
    pub async fn require_sha1(path: &Path, expected: &str) -> LauncherResult<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        let actual = hex::encode(Sha1::digest(&bytes));
        if actual.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(LauncherError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                actual,
            })
        }
    }
}

fn dedup_by_dest(entries: Vec<DownloadEntry>) -> Vec<DownloadEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.dest.clone()))
        .collect()
}

/// `<name>.<uuid>.part` next to `dest`.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.part", Uuid::new_v4().simple()));
    dest.with_file_name(name)
}
