//! # Spreadsheet Parsing
//!
//! Parses a fetched byte stream as a single-workbook spreadsheet and exposes
//! the first sheet as a grid of typed cells. The workbook format (xlsx, xlsm,
//! xlsb, xls, ods) is auto-detected from the byte content; the whole object is
//! materialized in memory before parsing, so the sheet never outlives the run.
use anyhow::Result;
use calamine::{open_workbook_auto_from_rs, Data, DataType, Range, Reader, Sheets};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;

/// Errors raised while parsing workbook bytes into a sheet.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// The byte stream is not a parseable workbook
    #[error("Malformed workbook: {0}")]
    MalformedWorkbook(#[from] calamine::Error),

    /// The workbook contains no sheets at all
    #[error("Workbook has no sheets")]
    SheetNotFound,

    /// The first sheet contains no data rows
    #[error("Empty sheet or missing data")]
    EmptySheet,

    /// Header row expected but not found
    #[error("Missing header row")]
    MissingHeaderRow,

    /// Column header is missing or invalid
    #[error("Missing column name at '{position}'")]
    MissingHeaderColumn { position: String },

    /// Cell value cannot be converted to the expected type
    #[error("Invalid cell value at '{position}': {message}")]
    InvalidCellValue { position: String, message: String },
}

/// In-memory workbook opened from fetched object bytes.
///
/// Wraps calamine's auto-detecting reader over an owned byte buffer. Only the
/// first sheet is ever read; sheet selection is intentionally not supported.
pub struct Workbook {
    reader: Sheets<Cursor<Vec<u8>>>,
}

impl Workbook {
    /// Opens a workbook from raw bytes, auto-detecting the format.
    ///
    /// # Errors
    ///
    /// Returns [`SpreadsheetError::MalformedWorkbook`] when the bytes are not
    /// a parseable spreadsheet of any supported format.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Workbook, SpreadsheetError> {
        let reader = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        Ok(Workbook { reader })
    }

    /// Reads the first sheet of the workbook into memory.
    ///
    /// The first row of the sheet is treated as the header row; data rows
    /// follow it. An empty sheet is an error, not an empty record set.
    pub fn first_sheet(&mut self) -> Result<Sheet, SpreadsheetError> {
        let name = self
            .reader
            .sheet_names()
            .first()
            .cloned()
            .ok_or(SpreadsheetError::SheetNotFound)?;
        let range = self.reader.worksheet_range(&name)?;
        Sheet::from_range(name, &range)
    }
}

/// Convert 0-based row & column indexes to an Excel-style cell position.
///
/// Used in error messages so operators can locate the offending cell in the
/// source spreadsheet ("B3" rather than "row 2, column 1").
pub fn cell_position(row: usize, column: usize) -> String {
    let row = (row + 1).to_string();
    let mut column: u32 = column as u32 + 1;
    let mut position = String::from("");
    while column > 0 {
        column -= 1;
        let digit = char::from_u32(65 + column % 26).expect("Hardcode letters");
        column /= 26;
        position.insert(0, digit)
    }
    position.push_str(row.as_str());
    position
}

/// A single cell with its 0-based position and parsed value.
#[derive(Clone, Debug)]
pub struct Cell {
    pub row: usize,
    pub column: usize,
    pub value: Data,
}

impl Cell {
    /// Excel-style position of this cell, for diagnostics.
    pub fn position(&self) -> String {
        cell_position(self.row, self.column)
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_bool(&self) -> bool {
        self.value.is_bool()
    }

    pub fn get_bool(&self) -> Option<bool> {
        self.value.get_bool()
    }

    /// True for native integers and for floats with no fractional part.
    pub fn is_bigint(&self) -> bool {
        self.value.is_int()
            || self
                .value
                .get_float()
                .map(|value| value.fract() == 0.0)
                .unwrap_or(false)
    }

    pub fn get_bigint(&self) -> Option<i64> {
        match self.value {
            Data::Int(value) => Some(value),
            Data::Float(value) => Some(value as i64),
            _ => None,
        }
    }

    pub fn is_double(&self) -> bool {
        self.value.is_float() || self.value.is_int()
    }

    pub fn get_double(&self) -> Option<f64> {
        match self.value {
            Data::Int(value) => Some(value as f64),
            Data::Float(value) => Some(value),
            _ => None,
        }
    }

    /// True for every non-empty, non-error cell: anything renders as text.
    pub fn is_varchar(&self) -> bool {
        !self.is_empty() && !self.is_error()
    }

    /// String rendition of the cell value, formatting dates and times
    /// according to their detected precision.
    pub fn get_varchar(&self) -> Option<String> {
        match &self.value {
            Data::Bool(value) => Some(value.to_string()),
            Data::Int(value) => Some(value.to_string()),
            Data::Float(value) => Some(value.to_string()),
            Data::String(value) => Some(value.to_owned()),
            Data::DateTime(_) => {
                if self.is_time() {
                    Some(self.get_time()?.to_string())
                } else if self.is_date() {
                    Some(self.get_date()?.to_string())
                } else {
                    Some(self.get_datetime()?.to_string())
                }
            }
            Data::DateTimeIso(value) => Some(value.to_owned()),
            Data::DurationIso(value) => Some(value.to_owned()),
            _ => None,
        }
    }

    pub fn is_datetime(&self) -> bool {
        self.value.is_datetime() || self.value.is_datetime_iso()
    }

    /// Datetime value from either Excel's serial format or an ISO string.
    pub fn get_datetime(&self) -> Option<NaiveDateTime> {
        match &self.value {
            Data::DateTime(value) => value.as_datetime(),
            Data::DateTimeIso(value) => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|datetime| datetime.naive_local()),
            _ => None,
        }
    }

    /// True when the serial datetime has no time component.
    pub fn is_date(&self) -> bool {
        self.value
            .get_datetime()
            .map(|value| value.as_f64().fract() == 0.0)
            .unwrap_or(false)
    }

    pub fn get_date(&self) -> Option<NaiveDate> {
        self.get_datetime().map(|datetime| datetime.date())
    }

    /// True when the serial datetime falls within the first day, i.e. it
    /// carries a time of day and no date.
    pub fn is_time(&self) -> bool {
        self.value
            .get_datetime()
            .map(|value| value.as_f64() <= 1.0)
            .unwrap_or(false)
    }

    pub fn get_time(&self) -> Option<NaiveTime> {
        self.get_datetime().map(|datetime| datetime.time())
    }

    pub fn is_error(&self) -> bool {
        self.value.is_error()
    }

    /// Error cells become positioned parse errors; the run aborts on them.
    pub fn get_error(&self) -> Option<SpreadsheetError> {
        let error = self.value.get_error()?;
        Some(SpreadsheetError::InvalidCellValue {
            position: self.position(),
            message: error.to_string(),
        })
    }
}

/// The first sheet of a workbook, fully materialized.
///
/// Cells are stored sparsely with an index by (row, column); bounds are the
/// used area reported by the reader. The first used row is the header row.
#[derive(Debug)]
pub struct Sheet {
    /// Sheet name, for diagnostics only
    pub name: String,
    /// First used row (0-based, inclusive) — the header row
    pub row_lower_bound: usize,
    /// Last used row (0-based, inclusive)
    pub row_upper_bound: usize,
    /// First used column (0-based, inclusive)
    pub column_lower_bound: usize,
    /// Last used column (0-based, inclusive)
    pub column_upper_bound: usize,
    /// All non-empty cells in the used area
    pub cells: Vec<Cell>,
    /// Index mapping from (row, column) to cell vector position
    pub indexes: HashMap<(usize, usize), usize>,
}

impl Sheet {
    /// Builds a sheet from a calamine cell range.
    pub(crate) fn from_range(name: String, range: &Range<Data>) -> Result<Sheet, SpreadsheetError> {
        let (start, end) = match (range.start(), range.end()) {
            (Some(start), Some(end)) => (
                (start.0 as usize, start.1 as usize),
                (end.0 as usize, end.1 as usize),
            ),
            _ => return Err(SpreadsheetError::EmptySheet),
        };

        let mut cells: Vec<Cell> = Vec::new();
        let mut indexes: HashMap<(usize, usize), usize> = HashMap::new();
        for (row, column, value) in range.used_cells() {
            let row = start.0 + row;
            let column = start.1 + column;
            indexes.insert((row, column), cells.len());
            cells.push(Cell {
                row,
                column,
                value: value.to_owned(),
            });
        }
        if cells.is_empty() {
            return Err(SpreadsheetError::EmptySheet);
        }

        Ok(Sheet {
            name,
            row_lower_bound: start.0,
            row_upper_bound: end.0,
            column_lower_bound: start.1,
            column_upper_bound: end.1,
            cells,
            indexes,
        })
    }

    /// Gets the cell at a position, if one exists within the used area.
    pub fn get(&self, row: usize, column: usize) -> Option<&Cell> {
        if self.row_lower_bound <= row
            && row <= self.row_upper_bound
            && self.column_lower_bound <= column
            && column <= self.column_upper_bound
        {
            self.indexes
                .get(&(row, column))
                .and_then(|index| self.cells.get(*index))
        } else {
            None
        }
    }

    /// First data row (0-based): the row after the header.
    pub fn data_row_lower_bound(&self) -> usize {
        self.row_lower_bound + 1
    }

    /// Number of data rows below the header.
    pub fn data_row_count(&self) -> usize {
        (self.row_upper_bound + 1).saturating_sub(self.data_row_lower_bound())
    }

    /// Extracts column names from the header row.
    ///
    /// Every column within the used area must carry a non-empty header cell
    /// that renders as text; anything else aborts the run with the cell's
    /// position in the message.
    pub fn header(&self) -> Result<Vec<String>, SpreadsheetError> {
        if self.cells.is_empty() {
            return Err(SpreadsheetError::MissingHeaderRow);
        }
        (self.column_lower_bound..=self.column_upper_bound)
            .map(|column| {
                self.get(self.row_lower_bound, column)
                    .ok_or(SpreadsheetError::MissingHeaderColumn {
                        position: cell_position(self.row_lower_bound, column),
                    })
                    .and_then(|cell| {
                        cell.get_varchar()
                            .ok_or(SpreadsheetError::InvalidCellValue {
                                position: cell_position(self.row_lower_bound, column),
                                message: "cast to varchar failed".to_string(),
                            })
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_from_cells(cells: Vec<(usize, usize, Data)>) -> Sheet {
        let row_lower_bound = cells.iter().map(|(row, _, _)| *row).min().unwrap();
        let row_upper_bound = cells.iter().map(|(row, _, _)| *row).max().unwrap();
        let column_lower_bound = cells.iter().map(|(_, column, _)| *column).min().unwrap();
        let column_upper_bound = cells.iter().map(|(_, column, _)| *column).max().unwrap();
        let mut indexes = HashMap::new();
        let cells: Vec<Cell> = cells
            .into_iter()
            .enumerate()
            .map(|(index, (row, column, value))| {
                indexes.insert((row, column), index);
                Cell { row, column, value }
            })
            .collect();
        Sheet {
            name: "Sheet1".to_string(),
            row_lower_bound,
            row_upper_bound,
            column_lower_bound,
            column_upper_bound,
            cells,
            indexes,
        }
    }

    #[test]
    fn cell_positions_follow_excel_naming() {
        assert_eq!(cell_position(0, 0), "A1");
        assert_eq!(cell_position(2, 1), "B3");
        assert_eq!(cell_position(0, 25), "Z1");
        assert_eq!(cell_position(0, 26), "AA1");
        assert_eq!(cell_position(9, 27), "AB10");
    }

    #[test]
    fn malformed_bytes_are_rejected() {
        let result = Workbook::from_bytes(b"this is not a workbook".to_vec());
        assert!(matches!(
            result,
            Err(SpreadsheetError::MalformedWorkbook(_))
        ));
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(Workbook::from_bytes(Vec::new()).is_err());
    }

    #[test]
    fn header_reads_first_row_as_column_names() {
        let sheet = sheet_from_cells(vec![
            (0, 0, Data::String("id".to_string())),
            (0, 1, Data::String("name".to_string())),
            (1, 0, Data::Int(1)),
            (1, 1, Data::String("Ann".to_string())),
        ]);
        assert_eq!(sheet.header().unwrap(), vec!["id", "name"]);
        assert_eq!(sheet.data_row_lower_bound(), 1);
        assert_eq!(sheet.data_row_count(), 1);
    }

    #[test]
    fn missing_header_cell_reports_position() {
        let sheet = sheet_from_cells(vec![
            (0, 0, Data::String("id".to_string())),
            (1, 0, Data::Int(1)),
            (1, 1, Data::String("Ann".to_string())),
        ]);
        match sheet.header() {
            Err(SpreadsheetError::MissingHeaderColumn { position }) => {
                assert_eq!(position, "B1")
            }
            other => panic!("expected missing header column, got {other:?}"),
        }
    }

    #[test]
    fn numeric_headers_render_as_text() {
        let sheet = sheet_from_cells(vec![(0, 0, Data::Int(2024)), (1, 0, Data::Int(1))]);
        assert_eq!(sheet.header().unwrap(), vec!["2024"]);
    }

    #[test]
    fn bigint_accepts_round_floats_only() {
        let round = Cell {
            row: 0,
            column: 0,
            value: Data::Float(42.0),
        };
        let fractional = Cell {
            row: 0,
            column: 0,
            value: Data::Float(42.5),
        };
        assert!(round.is_bigint());
        assert_eq!(round.get_bigint(), Some(42));
        assert!(!fractional.is_bigint());
        assert!(fractional.is_double());
        assert_eq!(fractional.get_double(), Some(42.5));
    }

    #[test]
    fn out_of_bounds_lookup_returns_none() {
        let sheet = sheet_from_cells(vec![(0, 0, Data::Int(1))]);
        assert!(sheet.get(0, 0).is_some());
        assert!(sheet.get(5, 5).is_none());
    }

    #[test]
    fn error_cells_surface_positioned_errors() {
        let cell = Cell {
            row: 2,
            column: 0,
            value: Data::Error(calamine::CellErrorType::Div0),
        };
        match cell.get_error() {
            Some(SpreadsheetError::InvalidCellValue { position, .. }) => {
                assert_eq!(position, "A3")
            }
            other => panic!("expected invalid cell value, got {other:?}"),
        }
    }
}
