use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not start export command `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("svn export failed: {diagnostic}")]
    Export { diagnostic: String },
    #[error("svn export timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("could not prepare export directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read table `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse CSV `{path}`: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("could not read workbook `{path}`: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook `{path}` has no worksheets")]
    NoWorksheet { path: PathBuf },
    #[error("table `{path}` has no header row")]
    MissingHeader { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("column `{column}` not found in table header")]
    ColumnNotFound { column: String },
    #[error("invalid search pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("unexpected lookup failure: {0}")]
    Unexpected(String),
}

impl LookupError {
    /// Stable label for logs and CLI error classes.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Search(SearchError::ColumnNotFound { .. }) => "column_not_found",
            Self::Search(_) => "search",
            Self::Unexpected(_) => "unexpected",
        }
    }
}
