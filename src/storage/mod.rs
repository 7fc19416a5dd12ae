// src/storage/mod.rs
pub mod export;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::edgar::client::{DocumentSource, EdgarUrls};
use crate::edgar::models::{accession_no_dashes, cik_without_leading_zeros};
use crate::utils::error::{AppError, EdgarError, StorageError};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk cache of primary filing documents.
///
/// Layout: `<raw_dir>/<cik10>/<accession without dashes>/<sanitized filename>`.
/// A document already on disk is never fetched again unless `overwrite` is set.
pub struct DocumentCache<S: ?Sized> {
    raw_dir: PathBuf,
    source: Arc<S>,
    urls: EdgarUrls,
    overwrite: bool,
}

impl<S> DocumentCache<S>
where
    S: DocumentSource + ?Sized,
{
    /// Creates a cache rooted at `raw_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(
        raw_dir: P,
        source: Arc<S>,
        urls: EdgarUrls,
        overwrite: bool,
    ) -> Result<Self, StorageError> {
        let raw_dir = raw_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&raw_dir)?;

        Ok(Self {
            raw_dir,
            source,
            urls,
            overwrite,
        })
    }

    /// Deterministic storage address for a filing document.
    pub fn local_path(&self, cik10: &str, accession_number: &str, filename: &str) -> PathBuf {
        self.raw_dir
            .join(cik10.trim())
            .join(sanitize_file_name(&accession_no_dashes(accession_number)))
            .join(sanitize_file_name(filename))
    }

    /// Returns the local path of the document, downloading it first on a miss.
    pub async fn get_or_fetch(
        &self,
        cik10: &str,
        accession_number: &str,
        filename: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, AppError> {
        let local_path = self.local_path(cik10, accession_number, filename);

        if !self.overwrite && tokio::fs::try_exists(&local_path).await? {
            tracing::debug!(cik = %cik10, accession = %accession_number, "Cache hit: {}", local_path.display());
            return Ok(local_path);
        }

        let url = self.urls.primary_doc_url(
            &cik_without_leading_zeros(cik10),
            &accession_no_dashes(accession_number),
            filename,
        );
        tracing::debug!(cik = %cik10, accession = %accession_number, "Cache miss, downloading {}", url);

        let bytes = self.source.fetch(&url, cancel).await?;

        // A cancellation that raced the last bytes still must not touch the cache.
        if cancel.is_cancelled() {
            return Err(EdgarError::Cancelled.into());
        }

        write_atomically(&local_path, &bytes)
            .await
            .map_err(StorageError::IoError)?;

        tracing::info!(
            cik = %cik10,
            accession = %accession_number,
            "Cached {} bytes at {}",
            bytes.len(),
            local_path.display()
        );
        Ok(local_path)
    }
}

/// Writes to a uniquely named sibling file, then renames it over the target.
/// Concurrent writers to one path each rename a complete file; the last wins.
async fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "cache path has no parent"))?;
    tokio::fs::create_dir_all(dir).await?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(
        ".{}.{}-{}.part",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Replaces characters that are illegal in file names on common platforms with `_`.
pub fn sanitize_file_name(file_name: &str) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let sanitized: String = file_name
        .chars()
        .map(|c| if INVALID.contains(&c) || c.is_control() { '_' } else { c })
        .collect();

    match sanitized.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => sanitized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Counts fetches and records requested URLs.
    struct CountingSource {
        body: Vec<u8>,
        fail: bool,
        urls: Mutex<Vec<String>>,
    }

    impl CountingSource {
        fn serving(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: body.as_bytes().to_vec(),
                fail: false,
                urls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                body: Vec::new(),
                fail: true,
                urls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.urls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DocumentSource for CountingSource {
        async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, EdgarError> {
            self.urls.lock().unwrap().push(url.to_string());
            if cancel.is_cancelled() {
                return Err(EdgarError::Cancelled);
            }
            if self.fail {
                return Err(EdgarError::FilingDocNotFound(url.to_string()));
            }
            Ok(self.body.clone())
        }
    }

    const CIK: &str = "0000320193";
    const ACCESSION: &str = "0000320193-23-000106";
    const DOC: &str = "a10-k20230930.htm";

    #[tokio::test]
    async fn layout_and_url_follow_edgar_conventions() {
        let dir = tempfile::tempdir().unwrap();
        let source = CountingSource::serving("<html>10-K</html>");
        let cache = DocumentCache::new(dir.path(), Arc::clone(&source), EdgarUrls::default(), false).unwrap();

        let path = cache
            .get_or_fetch(CIK, ACCESSION, DOC, &CancellationToken::new())
            .await
            .unwrap();

        assert!(path.ends_with("0000320193/000032019323000106/a10-k20230930.htm"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html>10-K</html>");

        let urls = source.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].ends_with("/320193/000032019323000106/a10-k20230930.htm"));
    }

    #[tokio::test]
    async fn second_call_is_served_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = CountingSource::serving("body");
        let cache = DocumentCache::new(dir.path(), Arc::clone(&source), EdgarUrls::default(), false).unwrap();
        let cancel = CancellationToken::new();

        let first = cache.get_or_fetch(CIK, ACCESSION, DOC, &cancel).await.unwrap();
        let second = cache.get_or_fetch(CIK, ACCESSION, DOC, &cancel).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn existing_file_from_previous_run_is_a_hit() {
        let dir = tempfile::tempdir().unwrap();
        let source = CountingSource::serving("fresh");
        let cache = DocumentCache::new(dir.path(), Arc::clone(&source), EdgarUrls::default(), false).unwrap();

        let path = cache.local_path(CIK, ACCESSION, DOC);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "from last run").unwrap();

        let got = cache.get_or_fetch(CIK, ACCESSION, DOC, &CancellationToken::new()).await.unwrap();
        assert_eq!(std::fs::read_to_string(got).unwrap(), "from last run");
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn overwrite_forces_refetch() {
        let dir = tempfile::tempdir().unwrap();
        let source = CountingSource::serving("fresh");
        let cache = DocumentCache::new(dir.path(), Arc::clone(&source), EdgarUrls::default(), true).unwrap();

        let path = cache.local_path(CIK, ACCESSION, DOC);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale").unwrap();

        let cancel = CancellationToken::new();
        cache.get_or_fetch(CIK, ACCESSION, DOC, &cancel).await.unwrap();
        cache.get_or_fetch(CIK, ACCESSION, DOC, &cancel).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let source = CountingSource::failing();
        let cache = DocumentCache::new(dir.path(), Arc::clone(&source), EdgarUrls::default(), false).unwrap();

        let result = cache.get_or_fetch(CIK, ACCESSION, DOC, &CancellationToken::new()).await;
        assert_err!(&result);
        assert!(!cache.local_path(CIK, ACCESSION, DOC).exists());
        assert!(!dir.path().join(CIK).exists());
    }

    #[tokio::test]
    async fn cancellation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = CountingSource::serving("body");
        let cache = DocumentCache::new(dir.path(), Arc::clone(&source), EdgarUrls::default(), false).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = cache.get_or_fetch(CIK, ACCESSION, DOC, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!cache.local_path(CIK, ACCESSION, DOC).exists());
    }

    /// Finishes the download but sees the run cancelled while it was in flight.
    struct CancelledMidFetch;

    #[async_trait]
    impl DocumentSource for CancelledMidFetch {
        async fn fetch(&self, _url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, EdgarError> {
            cancel.cancel();
            Ok(b"<html>complete body</html>".to_vec())
        }
    }

    #[tokio::test]
    async fn cancellation_during_download_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocumentCache::new(dir.path(), Arc::new(CancelledMidFetch), EdgarUrls::default(), false).unwrap();
        let cancel = CancellationToken::new();

        let err = cache.get_or_fetch(CIK, ACCESSION, DOC, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!cache.local_path(CIK, ACCESSION, DOC).exists());
        assert!(!dir.path().join(CIK).exists());
    }

    #[test]
    fn accession_cannot_escape_the_cache_root() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocumentCache::new(dir.path(), CountingSource::serving("x"), EdgarUrls::default(), false).unwrap();

        for accession in ["../x", "..", "a/../../b"] {
            let path = cache.local_path(CIK, accession, DOC);
            assert_eq!(path.parent().unwrap().parent().unwrap(), dir.path().join(CIK));
            assert!(path.components().all(|c| c != std::path::Component::ParentDir));
        }
    }

    #[tokio::test]
    async fn concurrent_writers_to_one_address_leave_a_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let body = "x".repeat(64 * 1024);
        let source = CountingSource::serving(&body);
        let cache = Arc::new(
            DocumentCache::new(dir.path(), Arc::clone(&source), EdgarUrls::default(), true).unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache
                        .get_or_fetch(CIK, ACCESSION, DOC, &CancellationToken::new())
                        .await
                        .map(|_| ())
                })
            })
            .collect();
        for handle in handles {
            assert_ok!(handle.await.unwrap());
        }

        let path = cache.local_path(CIK, ACCESSION, DOC);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("a10-k20230930.htm"), "a10-k20230930.htm");
        assert_eq!(sanitize_file_name("odd:name?.htm"), "odd_name_.htm");
        assert_eq!(sanitize_file_name("dir/evil\\x.htm"), "dir_evil_x.htm");
        assert_eq!(sanitize_file_name(".."), "_");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
    }
}
