//! Fetcher: exports the configured spreadsheet into a scratch directory and
//! remembers the result for a short while.

pub mod cache;
pub mod export;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use secrecy::SecretString;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::errors::FetchError;

pub use cache::{CacheKey, FetchCache};
pub use export::{ExportRequest, ExportRunner, SvnExportRunner};

const FALLBACK_FILE_NAME: &str = "export.bin";

/// An exported file. The scratch directory is removed when the last handle drops.
#[derive(Debug)]
pub struct Snapshot {
    path: PathBuf,
    _dir: TempDir,
}

impl Snapshot {
    pub fn new(dir: TempDir, path: PathBuf) -> Self {
        Self { path, _dir: dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub struct Fetcher {
    runner: Arc<dyn ExportRunner>,
    cache: FetchCache,
    clock: Arc<dyn Clock>,
    scratch_root: Option<PathBuf>,
}

impl Fetcher {
    pub fn new(runner: Arc<dyn ExportRunner>, ttl: Duration) -> Self {
        Self {
            runner,
            cache: FetchCache::new(ttl),
            clock: Arc::new(SystemClock),
            scratch_root: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub async fn fetch(
        &self,
        url: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<Arc<Snapshot>, FetchError> {
        let key = CacheKey::new(url, username);
        if let Some(snapshot) = self.cache.get(&key, self.clock.now()) {
            debug!(
                event_name = "lookup.fetch.cache_hit",
                path = %snapshot.path().display(),
                "serving spreadsheet from cache"
            );
            return Ok(snapshot);
        }

        let dir = self.scratch_dir()?;
        let path = dir.path().join(file_name_from_url(url));
        let request = ExportRequest { url, username, password, destination: &path };

        let started = Instant::now();
        if let Err(error) = self.runner.export(&request).await {
            warn!(
                event_name = "lookup.fetch.export_failed",
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %error,
                "spreadsheet export failed"
            );
            return Err(error);
        }
        info!(
            event_name = "lookup.fetch.exported",
            elapsed_ms = started.elapsed().as_millis() as u64,
            path = %path.display(),
            "spreadsheet exported"
        );

        let snapshot = Arc::new(Snapshot::new(dir, path));
        self.cache.put(key, Arc::clone(&snapshot), self.clock.now());
        Ok(snapshot)
    }

    fn scratch_dir(&self) -> Result<TempDir, FetchError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sheetbot-");
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

/// Last path segment of the url, which keeps the extension the table loader keys on.
fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .filter(|segment| !segment.contains(':'))
        .map(str::to_owned)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_owned())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use secrecy::SecretString;

    use super::{file_name_from_url, ExportRequest, ExportRunner, Fetcher};
    use crate::clock::ManualClock;
    use crate::errors::FetchError;

    const URL: &str = "https://svn.example.com/repo/trunk/Assets/HeroCostume.csv";

    #[derive(Default)]
    struct CountingRunner {
        calls: AtomicUsize,
        fail_with: Option<String>,
    }

    impl CountingRunner {
        fn failing(diagnostic: &str) -> Self {
            Self { calls: AtomicUsize::new(0), fail_with: Some(diagnostic.to_owned()) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExportRunner for CountingRunner {
        async fn export(&self, request: &ExportRequest<'_>) -> Result<(), FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(diagnostic) = &self.fail_with {
                return Err(FetchError::Export { diagnostic: diagnostic.clone() });
            }
            fs::write(request.destination, format!("皮肤名,英雄ID\n导出{call},1\n"))?;
            Ok(())
        }
    }

    fn fetcher(runner: Arc<CountingRunner>, clock: Arc<ManualClock>) -> Fetcher {
        Fetcher::new(runner, Duration::from_secs(30 * 60)).with_clock(clock)
    }

    #[tokio::test]
    async fn cached_entry_skips_export() {
        let runner = Arc::new(CountingRunner::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let fetcher = fetcher(Arc::clone(&runner), Arc::clone(&clock));
        let password = SecretString::from("secret");

        let first = fetcher.fetch(URL, "builder", &password).await.expect("first fetch");
        clock.advance(chrono::Duration::minutes(29));
        let second = fetcher.fetch(URL, "builder", &password).await.expect("second fetch");

        assert_eq!(runner.calls(), 1);
        assert_eq!(first.path(), second.path());
        assert!(second.path().ends_with("HeroCostume.csv"));
    }

    #[tokio::test]
    async fn expired_entry_triggers_new_export() {
        let runner = Arc::new(CountingRunner::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let fetcher = fetcher(Arc::clone(&runner), Arc::clone(&clock));
        let password = SecretString::from("secret");

        let first = fetcher.fetch(URL, "builder", &password).await.expect("first fetch");
        clock.advance(chrono::Duration::minutes(31));
        let second = fetcher.fetch(URL, "builder", &password).await.expect("refetch");

        assert_eq!(runner.calls(), 2);
        assert_ne!(first.path(), second.path());
        let contents = fs::read_to_string(second.path()).expect("read export");
        assert!(contents.contains("导出2"));
    }

    #[tokio::test]
    async fn different_user_does_not_share_cache() {
        let runner = Arc::new(CountingRunner::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let fetcher = fetcher(Arc::clone(&runner), clock);
        let password = SecretString::from("secret");

        fetcher.fetch(URL, "alice", &password).await.expect("alice fetch");
        fetcher.fetch(URL, "bob", &password).await.expect("bob fetch");

        assert_eq!(runner.calls(), 2);
        assert_eq!(fetcher.cached_entries(), 2);
    }

    #[tokio::test]
    async fn export_failure_is_not_cached() {
        let runner = Arc::new(CountingRunner::failing("svn: E170001: Authorization failed"));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let fetcher = fetcher(Arc::clone(&runner), clock);
        let password = SecretString::from("wrong");

        let error = fetcher.fetch(URL, "builder", &password).await.expect_err("export fails");
        assert!(error.to_string().contains("E170001: Authorization failed"));

        fetcher.fetch(URL, "builder", &password).await.expect_err("still fails");
        assert_eq!(runner.calls(), 2, "failures are never cached or retried internally");
        assert_eq!(fetcher.cached_entries(), 0);
    }

    #[tokio::test]
    async fn replaced_snapshot_directory_is_removed_once_released() {
        let runner = Arc::new(CountingRunner::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let root = tempfile::tempdir().expect("scratch root");
        let fetcher = fetcher(Arc::clone(&runner), Arc::clone(&clock)).with_scratch_root(root.path());
        let password = SecretString::from("secret");

        let first = fetcher.fetch(URL, "builder", &password).await.expect("first fetch");
        let first_dir = first.path().parent().expect("scratch dir").to_path_buf();
        drop(first);

        clock.advance(chrono::Duration::minutes(45));
        let _second = fetcher.fetch(URL, "builder", &password).await.expect("refetch");

        assert!(!first_dir.exists(), "expired scratch directory should be cleaned up");
    }

    #[test]
    fn file_name_keeps_extension_and_falls_back() {
        assert_eq!(file_name_from_url(URL), "HeroCostume.csv");
        assert_eq!(file_name_from_url("https://svn.example.com/x/Skins.xlsx?p=12"), "Skins.xlsx");
        assert_eq!(file_name_from_url("https://svn.example.com/x/"), "x");
        assert_eq!(file_name_from_url("https:"), "export.bin");
    }
}
