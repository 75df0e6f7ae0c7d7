//! # Record Set
//!
//! The in-memory table handed from the Transform stage to the Load stage:
//! named, typed columns inferred from the sheet, plus row-major values.
//! Immutable once built; consumed entirely by the destination writer and
//! discarded at process exit.
use crate::spreadsheet::{Sheet, SpreadsheetError};
use anyhow::Result;

pub mod column;
pub mod value;

pub use column::{Column, ColumnType};
pub use value::Value;

/// Fully materialized tabular record set.
#[derive(Debug)]
pub struct DataFrame {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl DataFrame {
    /// Builds the record set from a parsed sheet.
    ///
    /// Column names come from the header row, column types from inference
    /// over every data row. Cells missing at the tail of a ragged row become
    /// nulls. A sheet with a header but no data rows is an empty sheet: this
    /// job appends rows, and a run with nothing to append is a faulted run.
    pub fn from_sheet(sheet: &Sheet) -> Result<DataFrame, SpreadsheetError> {
        let columns = Column::analyze(sheet)?;
        if sheet.data_row_count() == 0 {
            return Err(SpreadsheetError::EmptySheet);
        }

        let rows = (sheet.data_row_lower_bound()..=sheet.row_upper_bound)
            .map(|row| {
                columns
                    .iter()
                    .zip(sheet.column_lower_bound..=sheet.column_upper_bound)
                    .map(|(column, index)| Value::from_cell(sheet.get(row, index), column.kind))
                    .collect::<Result<Vec<Value>, SpreadsheetError>>()
            })
            .collect::<Result<Vec<Vec<Value>>, SpreadsheetError>>()?;

        Ok(DataFrame { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// One-line schema rendition for operator-visible logging.
    pub fn schema_description(&self) -> String {
        self.columns
            .iter()
            .map(|column| format!("{} {}", column.name, column.kind.as_str()))
            .collect::<Vec<String>>()
            .join(", ")
    }
}
