use crate::frame::column::ColumnType;
use crate::spreadsheet::{Cell, SpreadsheetError};
use bytes::BytesMut;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::error::Error;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

/// A single typed cell value of the record set.
///
/// Values are converted from sheet cells once, according to the column's
/// inferred type, and bound to the destination statement as-is afterwards.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    BigInt(i64),
    Double(f64),
    Varchar(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Value {
    /// Converts a sheet cell into a value of the column's type.
    ///
    /// Absent and empty cells become `Null`. Error cells abort the run with
    /// the cell position. A non-empty cell that cannot be read as the column
    /// type is a conversion error, also positioned.
    pub fn from_cell(cell: Option<&Cell>, kind: ColumnType) -> Result<Value, SpreadsheetError> {
        let Some(cell) = cell else {
            return Ok(Value::Null);
        };
        if let Some(error) = cell.get_error() {
            return Err(error);
        }
        if cell.is_empty() {
            return Ok(Value::Null);
        }

        let value = match kind {
            ColumnType::Boolean => cell.get_bool().map(Value::Boolean),
            ColumnType::BigInt => cell.get_bigint().map(Value::BigInt),
            ColumnType::Double => cell.get_double().map(Value::Double),
            ColumnType::Varchar => cell.get_varchar().map(Value::Varchar),
            ColumnType::Timestamp => cell.get_datetime().map(Value::Timestamp),
            ColumnType::Date => cell.get_date().map(Value::Date),
            ColumnType::Time => cell.get_time().map(Value::Time),
        };
        value.ok_or_else(|| SpreadsheetError::InvalidCellValue {
            position: cell.position(),
            message: format!("cast to {} failed", kind.as_str()),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl ToSql for Value {
    /// Binds the value against the destination column's wire type.
    ///
    /// Narrower destination columns are served by checked downcasts (bigint
    /// into int/smallint, timestamp into timestamptz), matching the implicit
    /// numeric widening a JDBC append write performs. A value that cannot fit
    /// the destination type errors here, before anything is committed.
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Boolean(value) => value.to_sql(ty, out),
            Value::BigInt(value) => {
                if *ty == Type::INT2 {
                    i16::try_from(*value)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*value)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*value as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*value as f64).to_sql(ty, out)
                } else {
                    value.to_sql(ty, out)
                }
            }
            Value::Double(value) => {
                if *ty == Type::FLOAT4 {
                    (*value as f32).to_sql(ty, out)
                } else {
                    value.to_sql(ty, out)
                }
            }
            Value::Varchar(value) => value.to_sql(ty, out),
            Value::Timestamp(value) => {
                if *ty == Type::TIMESTAMPTZ {
                    value.and_utc().to_sql(ty, out)
                } else {
                    value.to_sql(ty, out)
                }
            }
            Value::Date(value) => value.to_sql(ty, out),
            Value::Time(value) => value.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        [
            Type::BOOL,
            Type::INT2,
            Type::INT4,
            Type::INT8,
            Type::FLOAT4,
            Type::FLOAT8,
            Type::TEXT,
            Type::VARCHAR,
            Type::BPCHAR,
            Type::TIMESTAMP,
            Type::TIMESTAMPTZ,
            Type::DATE,
            Type::TIME,
        ]
        .contains(ty)
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Data;

    fn cell(value: Data) -> Cell {
        Cell {
            row: 1,
            column: 0,
            value,
        }
    }

    #[test]
    fn absent_and_empty_cells_become_null() {
        assert_eq!(
            Value::from_cell(None, ColumnType::BigInt).unwrap(),
            Value::Null
        );
        assert_eq!(
            Value::from_cell(Some(&cell(Data::Empty)), ColumnType::Varchar).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn cells_convert_by_column_type() {
        assert_eq!(
            Value::from_cell(Some(&cell(Data::Float(3.0))), ColumnType::BigInt).unwrap(),
            Value::BigInt(3)
        );
        assert_eq!(
            Value::from_cell(Some(&cell(Data::Int(3))), ColumnType::Double).unwrap(),
            Value::Double(3.0)
        );
        assert_eq!(
            Value::from_cell(Some(&cell(Data::Bool(true))), ColumnType::Varchar).unwrap(),
            Value::Varchar("true".to_string())
        );
    }

    #[test]
    fn incompatible_cell_reports_position() {
        let result = Value::from_cell(
            Some(&cell(Data::String("Ann".to_string()))),
            ColumnType::BigInt,
        );
        match result {
            Err(SpreadsheetError::InvalidCellValue { position, message }) => {
                assert_eq!(position, "A2");
                assert!(message.contains("bigint"));
            }
            other => panic!("expected invalid cell value, got {other:?}"),
        }
    }

    #[test]
    fn error_cells_abort_conversion() {
        let result = Value::from_cell(
            Some(&cell(Data::Error(calamine::CellErrorType::Value))),
            ColumnType::Varchar,
        );
        assert!(matches!(
            result,
            Err(SpreadsheetError::InvalidCellValue { .. })
        ));
    }

    #[test]
    fn value_accepts_destination_wire_types() {
        assert!(<Value as ToSql>::accepts(&Type::INT4));
        assert!(<Value as ToSql>::accepts(&Type::TEXT));
        assert!(<Value as ToSql>::accepts(&Type::TIMESTAMPTZ));
        assert!(!<Value as ToSql>::accepts(&Type::BYTEA));
    }

    #[test]
    fn bigint_downcast_rejects_overflow() {
        let mut out = BytesMut::new();
        let fits = Value::BigInt(7).to_sql(&Type::INT4, &mut out);
        assert!(fits.is_ok());

        let mut out = BytesMut::new();
        let overflow = Value::BigInt(i64::MAX).to_sql(&Type::INT4, &mut out);
        assert!(overflow.is_err());
    }
}
