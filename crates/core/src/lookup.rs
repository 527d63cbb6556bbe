use std::sync::Arc;

use secrecy::SecretString;
use tracing::info;

use crate::config::{AppConfig, SearchConfig, SvnConfig};
use crate::errors::LookupError;
use crate::fetch::{ExportRunner, Fetcher, SvnExportRunner};
use crate::search::{self, Row, SearchRequest, Table};

/// Where the spreadsheet lives and who to export it as.
#[derive(Clone, Debug)]
pub struct SourceSpec {
    pub url: String,
    pub username: String,
    pub password: SecretString,
}

impl From<&SvnConfig> for SourceSpec {
    fn from(svn: &SvnConfig) -> Self {
        Self { url: svn.url.clone(), username: svn.username.clone(), password: svn.password.clone() }
    }
}

/// Fetch then search, with the source and columns fixed at construction.
pub struct LookupService {
    fetcher: Fetcher,
    source: SourceSpec,
    search: SearchConfig,
}

impl LookupService {
    pub fn new(fetcher: Fetcher, source: SourceSpec, search: SearchConfig) -> Self {
        Self { fetcher, source, search }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let runner: Arc<dyn ExportRunner> = Arc::new(
            SvnExportRunner::new(config.svn.binary.clone())
                .with_timeout(config.svn.export_timeout()),
        );
        let fetcher = Fetcher::new(runner, config.svn.cache_ttl());
        Self::new(fetcher, SourceSpec::from(&config.svn), config.search.clone())
    }

    pub fn cached_entries(&self) -> usize {
        self.fetcher.cached_entries()
    }

    pub async fn lookup(&self, query: &str) -> Result<Vec<Row>, LookupError> {
        let snapshot = self
            .fetcher
            .fetch(&self.source.url, &self.source.username, &self.source.password)
            .await?;

        let search = self.search.clone();
        let query = query.to_owned();
        let rows = tokio::task::spawn_blocking(move || {
            let request = SearchRequest {
                query: &query,
                search_column: &search.search_column,
                return_columns: &search.return_columns,
                max_results: search.max_results,
                match_mode: search.match_mode,
            };
            search::search(snapshot.path(), &request)
        })
        .await
        .map_err(|error| LookupError::Unexpected(error.to_string()))??;

        info!(event_name = "lookup.completed", matched = rows.len(), "spreadsheet lookup completed");
        Ok(rows)
    }

    /// Exports the source and checks that the search and return columns are in its header.
    pub async fn verify_columns(&self) -> Result<(), LookupError> {
        let snapshot = self
            .fetcher
            .fetch(&self.source.url, &self.source.username, &self.source.password)
            .await?;

        let search = self.search.clone();
        tokio::task::spawn_blocking(move || {
            let table = Table::load(snapshot.path())?;
            table.require_columns(
                std::iter::once(search.search_column.as_str())
                    .chain(search.return_columns.iter().map(String::as_str)),
            )
        })
        .await
        .map_err(|error| LookupError::Unexpected(error.to_string()))??;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{LookupService, SourceSpec};
    use crate::config::SearchConfig;
    use crate::errors::{FetchError, LookupError, SearchError};
    use crate::fetch::{ExportRequest, ExportRunner, Fetcher};
    use crate::search::{MatchMode, Row};

    const FIXTURE: &str = "皮肤名,英雄ID,收藏品质\n狂铁-黑骑士,1,3\n测试皮肤,2,1\n黑骑士·觉醒,3,5\n";

    #[derive(Default)]
    struct FixtureRunner {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExportRunner for FixtureRunner {
        async fn export(&self, request: &ExportRequest<'_>) -> Result<(), FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(request.destination, FIXTURE)?;
            Ok(())
        }
    }

    fn service(runner: Arc<FixtureRunner>, return_columns: &[&str]) -> LookupService {
        LookupService::new(
            Fetcher::new(runner, Duration::from_secs(1_800)),
            SourceSpec {
                url: "https://svn.example.com/trunk/HeroCostume.csv".to_owned(),
                username: "builder".to_owned(),
                password: String::from("secret").into(),
            },
            SearchConfig {
                search_column: "皮肤名".to_owned(),
                return_columns: return_columns.iter().map(|name| (*name).to_owned()).collect(),
                max_results: 5,
                match_mode: MatchMode::Pattern,
            },
        )
    }

    #[tokio::test]
    async fn lookup_fetches_once_and_searches_each_time() {
        let runner = Arc::new(FixtureRunner::default());
        let service = service(Arc::clone(&runner), &["英雄ID", "收藏品质"]);

        let first = service.lookup("黑骑士").await.expect("first lookup");
        let second = service.lookup("测试").await.expect("second lookup");

        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            first,
            vec![
                Row::new().with("英雄ID", "1").with("收藏品质", "3"),
                Row::new().with("英雄ID", "3").with("收藏品质", "5"),
            ]
        );
        assert_eq!(second, vec![Row::new().with("英雄ID", "2").with("收藏品质", "1")]);
        assert_eq!(service.cached_entries(), 1);
    }

    #[tokio::test]
    async fn misconfigured_column_surfaces_as_search_error() {
        let runner = Arc::new(FixtureRunner::default());
        let service = service(runner, &["皮肤ID"]);

        let error = service.lookup("黑骑士").await.expect_err("column missing");
        assert!(matches!(
            error,
            LookupError::Search(SearchError::ColumnNotFound { ref column }) if column == "皮肤ID"
        ));
    }

    #[tokio::test]
    async fn verify_columns_reports_first_missing_column() {
        let runner = Arc::new(FixtureRunner::default());

        service(Arc::clone(&runner), &["英雄ID", "收藏品质"])
            .verify_columns()
            .await
            .expect("configured columns exist");

        let error = service(Arc::clone(&runner), &["英雄ID", "皮肤ID", "品质"])
            .verify_columns()
            .await
            .expect_err("皮肤ID is not in the header");
        assert!(matches!(
            error,
            LookupError::Search(SearchError::ColumnNotFound { ref column }) if column == "皮肤ID"
        ));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }
}
