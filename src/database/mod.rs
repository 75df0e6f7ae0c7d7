//! # Destination Database
//!
//! The Load stage: one connection to the destination Postgres, rows appended
//! with batched multi-row INSERT statements. Existing destination rows are
//! never read, updated, or deleted; the only durable effect of the whole
//! program happens here.
use crate::frame::{Column, ColumnType};
use anyhow::Result;
use thiserror::Error;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, NoTls, Statement};
use tracing::error;

pub mod writer;

pub use writer::AppendWriter;

/// Errors raised while connecting to or writing the destination.
///
/// All are fatal: there is no partial-write recovery and no rollback beyond
/// whatever a single multi-row INSERT provides.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The destination is unreachable
    #[error("Destination unreachable: {0}")]
    ConnectionRefused(String),

    /// The destination rejected the supplied credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Inferred columns are incompatible with the destination table
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Any other database failure, passed through unclassified
    #[error("{0}")]
    Database(tokio_postgres::Error),
}

/// Connects to the destination and spawns the connection driver task.
///
/// The driver task lives for the rest of the process; the run holds exactly
/// one destination connection.
pub async fn connect(config: &tokio_postgres::Config) -> Result<Client, LoadError> {
    let (client, connection) = config.connect(NoTls).await.map_err(classify)?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            error!("destination connection error: {error}");
        }
    });
    Ok(client)
}

/// Server-reported fault classes this program distinguishes.
enum DbFault {
    Authentication(String),
    Schema(String),
    Other,
}

fn inspect(error: &tokio_postgres::Error) -> Option<DbFault> {
    let db = error.as_db_error()?;
    let code = db.code();
    if code == &SqlState::INVALID_PASSWORD
        || code == &SqlState::INVALID_AUTHORIZATION_SPECIFICATION
    {
        Some(DbFault::Authentication(db.message().to_string()))
    } else if code == &SqlState::UNDEFINED_TABLE
        || code == &SqlState::UNDEFINED_COLUMN
        || code == &SqlState::DATATYPE_MISMATCH
        || code == &SqlState::INVALID_TEXT_REPRESENTATION
        || code == &SqlState::CANNOT_COERCE
    {
        Some(DbFault::Schema(db.message().to_string()))
    } else {
        Some(DbFault::Other)
    }
}

/// Maps a driver error onto the load-stage taxonomy.
pub(crate) fn classify(error: tokio_postgres::Error) -> LoadError {
    match inspect(&error) {
        Some(DbFault::Authentication(message)) => LoadError::AuthenticationFailed(message),
        Some(DbFault::Schema(message)) => LoadError::SchemaMismatch(message),
        Some(DbFault::Other) => LoadError::Database(error),
        // No server response at all: transport-level failure.
        None => LoadError::ConnectionRefused(error.to_string()),
    }
}

/// Verifies inferred columns against the destination's parameter types.
///
/// Runs after preparing a single-row INSERT and before writing anything, so
/// an incompatible destination fails the run with the table untouched.
pub(crate) fn check_schema(columns: &[Column], statement: &Statement) -> Result<(), LoadError> {
    for (column, ty) in columns.iter().zip(statement.params()) {
        if !compatible(column.kind, ty) {
            return Err(LoadError::SchemaMismatch(format!(
                "column '{}' inferred as {} cannot be written to destination type {}",
                column.name,
                column.kind.as_str(),
                ty
            )));
        }
    }
    Ok(())
}

/// Column-type compatibility with a destination wire type.
///
/// Mirrors the coercions `Value::to_sql` performs: integers narrow into
/// smaller integer columns and widen into floats, timestamps serve both
/// timestamp flavors, text serves every character type.
pub(crate) fn compatible(kind: ColumnType, ty: &Type) -> bool {
    match kind {
        ColumnType::Boolean => *ty == Type::BOOL,
        ColumnType::BigInt => [
            Type::INT2,
            Type::INT4,
            Type::INT8,
            Type::FLOAT4,
            Type::FLOAT8,
        ]
        .contains(ty),
        ColumnType::Double => [Type::FLOAT4, Type::FLOAT8].contains(ty),
        ColumnType::Varchar => [Type::TEXT, Type::VARCHAR, Type::BPCHAR].contains(ty),
        ColumnType::Timestamp => [Type::TIMESTAMP, Type::TIMESTAMPTZ].contains(ty),
        ColumnType::Date => *ty == Type::DATE,
        ColumnType::Time => *ty == Type::TIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_columns_fit_every_numeric_destination() {
        assert!(compatible(ColumnType::BigInt, &Type::INT4));
        assert!(compatible(ColumnType::BigInt, &Type::INT8));
        assert!(compatible(ColumnType::BigInt, &Type::FLOAT8));
        assert!(!compatible(ColumnType::BigInt, &Type::TEXT));
    }

    #[test]
    fn text_columns_fit_character_destinations_only() {
        assert!(compatible(ColumnType::Varchar, &Type::TEXT));
        assert!(compatible(ColumnType::Varchar, &Type::VARCHAR));
        assert!(!compatible(ColumnType::Varchar, &Type::INT4));
        assert!(!compatible(ColumnType::Varchar, &Type::DATE));
    }

    #[test]
    fn temporal_columns_are_exact() {
        assert!(compatible(ColumnType::Timestamp, &Type::TIMESTAMPTZ));
        assert!(compatible(ColumnType::Date, &Type::DATE));
        assert!(!compatible(ColumnType::Date, &Type::TIMESTAMP));
        assert!(!compatible(ColumnType::Time, &Type::DATE));
    }

    #[test]
    fn doubles_never_narrow_to_integers() {
        assert!(compatible(ColumnType::Double, &Type::FLOAT4));
        assert!(!compatible(ColumnType::Double, &Type::INT8));
    }
}
