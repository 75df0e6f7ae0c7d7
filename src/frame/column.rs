use crate::spreadsheet::{Cell, Sheet, SpreadsheetError};

/// Column data types carried by the record set.
///
/// Each variant maps to the Postgres type the Load stage binds against.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    /// Boolean values (true/false)
    Boolean,
    /// 64-bit signed integers
    BigInt,
    /// Double-precision floating point numbers
    Double,
    /// Variable-length strings
    Varchar,
    /// Date and time with microsecond precision
    Timestamp,
    /// Date without time component
    Date,
    /// Time without date component
    Time,
}

/// A named, typed column of the record set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    /// Column name from the header row
    pub name: String,
    /// Inferred column data type
    pub kind: ColumnType,
}

impl ColumnType {
    /// Postgres name of the column type, used in schema logging.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::BigInt => "bigint",
            ColumnType::Double => "double precision",
            ColumnType::Varchar => "text",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
        }
    }
}

impl Column {
    /// Infers one typed column per header cell by examining every data row.
    ///
    /// A column gets the most specific type that all of its non-empty cells
    /// share, walking from most to least specific: boolean, bigint, double,
    /// time, date, timestamp. Mixed or unrecognized content falls back to
    /// text, as does a column with no data at all.
    pub fn analyze(sheet: &Sheet) -> Result<Vec<Column>, SpreadsheetError> {
        let row_lower_bound = sheet.data_row_lower_bound();
        let row_upper_bound = sheet.row_upper_bound + 1;

        sheet
            .header()?
            .into_iter()
            .zip(sheet.column_lower_bound..=sheet.column_upper_bound)
            .map(|(name, column)| {
                let cells: Vec<&Cell> = (row_lower_bound..row_upper_bound)
                    .filter_map(|row| sheet.get(row, column))
                    .filter(|cell| cell.is_varchar())
                    .collect();

                let kind = if cells.is_empty() {
                    ColumnType::Varchar
                } else if cells.iter().all(|cell| cell.is_bool()) {
                    ColumnType::Boolean
                } else if cells.iter().all(|cell| cell.is_bigint()) {
                    ColumnType::BigInt
                } else if cells.iter().all(|cell| cell.is_double()) {
                    ColumnType::Double
                } else if cells.iter().all(|cell| cell.is_time()) {
                    ColumnType::Time
                } else if cells.iter().all(|cell| cell.is_date()) {
                    ColumnType::Date
                } else if cells.iter().all(|cell| cell.is_datetime()) {
                    ColumnType::Timestamp
                } else {
                    ColumnType::Varchar
                };
                Ok(Column { name, kind })
            })
            .collect()
    }
}
