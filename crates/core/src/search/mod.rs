//! Searcher: keyword match over one column of a spreadsheet, projected onto the
//! configured output columns.

pub mod matcher;
pub mod table;
pub mod value;

#[cfg(test)]
pub(crate) mod fixtures;

use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::errors::SearchError;

pub use matcher::{keywords, KeywordMatcher, MatchMode};
pub use table::{Table, TableFormat};
pub use value::CellValue;

pub const DEFAULT_MAX_RESULTS: usize = 5;

/// One matching row, projected onto the requested columns in request order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.push((column.into(), value.into()));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(column, _)| column.as_str())
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(column, value)| (column.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub search_column: &'a str,
    pub return_columns: &'a [String],
    pub max_results: usize,
    pub match_mode: MatchMode,
}

impl<'a> SearchRequest<'a> {
    pub fn new(query: &'a str, search_column: &'a str, return_columns: &'a [String]) -> Self {
        Self {
            query,
            search_column,
            return_columns,
            max_results: DEFAULT_MAX_RESULTS,
            match_mode: MatchMode::Pattern,
        }
    }
}

/// Loads the table at `path` and runs `request` against it. Nothing parsed is kept between calls.
pub fn search(path: &Path, request: &SearchRequest<'_>) -> Result<Vec<Row>, SearchError> {
    let table = Table::load(path)?;
    let rows = table.search(request)?;
    debug!(
        event_name = "lookup.search.completed",
        table_rows = table.rows().len(),
        matched = rows.len(),
        "spreadsheet search completed"
    );
    Ok(rows)
}

impl Table {
    pub fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<Row>, SearchError> {
        let search_index = self.require_column(request.search_column)?;
        let projection = request
            .return_columns
            .iter()
            .map(|column| self.require_column(column).map(|index| (index, column.as_str())))
            .collect::<Result<Vec<_>, _>>()?;
        let matcher = KeywordMatcher::new(request.query, request.match_mode)?;

        let rows = self
            .rows()
            .iter()
            .filter(|row| matcher.is_match(&self.cell(row, search_index).to_string()))
            .take(request.max_results)
            .map(|row| {
                let mut projected = Row::new();
                for (index, column) in &projection {
                    projected.push(*column, self.cell(row, *index).clone());
                }
                projected
            })
            .collect();

        Ok(rows)
    }

    /// Fails on the first name missing from the header.
    pub fn require_columns<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), SearchError> {
        names.into_iter().try_for_each(|name| self.require_column(name).map(|_| ()))
    }

    fn require_column(&self, name: &str) -> Result<usize, SearchError> {
        self.column_index(name).ok_or_else(|| SearchError::ColumnNotFound { column: name.to_owned() })
    }
}
