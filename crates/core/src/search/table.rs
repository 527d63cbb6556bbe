use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Reader};

use super::value::CellValue;
use crate::errors::LoadError;

/// Zip container: xlsx, xlsm, xlsb, ods.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
/// OLE compound file: legacy xls.
const OLE_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

static EMPTY_CELL: CellValue = CellValue::Empty;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Workbook,
}

impl TableFormat {
    /// Picks the parser from the leading bytes; exported files often keep a `.csv`
    /// name whatever their contents.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&ZIP_MAGIC) || bytes.starts_with(&OLE_MAGIC) {
            Self::Workbook
        } else {
            Self::Csv
        }
    }
}

/// Header plus data rows, held fully in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes =
            fs::read(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;

        match TableFormat::sniff(&bytes) {
            TableFormat::Csv => load_csv(path, &bytes),
            TableFormat::Workbook => load_workbook(path, bytes),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// First column whose header equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Ragged rows read as empty past their last cell.
    pub fn cell<'a>(&self, row: &'a [CellValue], index: usize) -> &'a CellValue {
        row.get(index).unwrap_or(&EMPTY_CELL)
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_owned()
}

fn load_csv(path: &Path, bytes: &[u8]) -> Result<Table, LoadError> {
    let csv_error = |source| LoadError::Csv { path: path.to_path_buf(), source };

    let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(bytes);

    let headers: Vec<String> = reader.headers().map_err(csv_error)?.iter().map(normalize_header).collect();
    if headers.iter().all(String::is_empty) {
        return Err(LoadError::MissingHeader { path: path.to_path_buf() });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(CellValue::from).collect());
    }

    Ok(Table::new(headers, rows))
}

fn load_workbook(path: &Path, bytes: Vec<u8>) -> Result<Table, LoadError> {
    let workbook_error = |source| LoadError::Workbook { path: path.to_path_buf(), source };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(workbook_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::NoWorksheet { path: path.to_path_buf() })?
        .map_err(workbook_error)?;

    let mut sheet_rows = range.rows();
    let header_row =
        sheet_rows.next().ok_or_else(|| LoadError::MissingHeader { path: path.to_path_buf() })?;
    let headers =
        header_row.iter().map(|cell| normalize_header(&CellValue::from(cell).to_string())).collect();
    let rows = sheet_rows.map(|row| row.iter().map(CellValue::from).collect()).collect();

    Ok(Table::new(headers, rows))
}
