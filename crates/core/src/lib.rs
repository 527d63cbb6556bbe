pub mod clock;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod lookup;
pub mod search;

pub use config::{AppConfig, ConfigError, LoadOptions};
pub use errors::{FetchError, LoadError, LookupError, SearchError};
pub use fetch::{Fetcher, Snapshot};
pub use lookup::{LookupService, SourceSpec};
pub use search::{CellValue, MatchMode, Row};
