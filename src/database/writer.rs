//! Append-only writer for the destination table.

use crate::database::{check_schema, classify, LoadError};
use crate::frame::DataFrame;
use anyhow::Result;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Statement};
use tracing::{debug, info};

/// Upper bound on rows per INSERT statement.
const BATCH_ROWS: usize = 500;

/// Wire protocol limit on bind parameters per statement.
const MAX_PARAMETERS: usize = u16::MAX as usize;

/// Appends record set rows to a fixed destination table.
///
/// Rows are written with batched multi-row INSERT statements; each batch is
/// one statement and one round trip. No deduplication, no upsert: running
/// the same input twice appends the rows twice.
pub struct AppendWriter<'a> {
    client: &'a Client,
    /// Validated `schema.name` or bare `name` of the destination table
    table: &'a str,
}

impl<'a> AppendWriter<'a> {
    pub fn new(client: &'a Client, table: &'a str) -> AppendWriter<'a> {
        AppendWriter { client, table }
    }

    /// Appends every row of the frame, returning the appended row count.
    ///
    /// A single-row statement is prepared first and the inferred schema is
    /// checked against the destination's parameter types, so schema problems
    /// surface before any row is written. After that, a failure mid-run
    /// leaves earlier batches in place; rerun policy belongs to the hosting
    /// job runner.
    pub async fn append(&self, frame: &DataFrame) -> Result<u64, LoadError> {
        let probe = insert_statement(self.table, frame, 1);
        let statement = self.client.prepare(&probe).await.map_err(classify)?;
        check_schema(frame.columns(), &statement)?;

        // Full batches share one prepared statement; the trailing partial
        // batch gets its own ad-hoc statement.
        let batch_rows = rows_per_batch(frame.num_columns());
        let full_batch: Option<Statement> = if frame.num_rows() >= batch_rows {
            let sql = insert_statement(self.table, frame, batch_rows);
            Some(self.client.prepare(&sql).await.map_err(classify)?)
        } else {
            None
        };

        let mut appended = 0u64;
        for chunk in frame.rows().chunks(batch_rows) {
            let params: Vec<&(dyn ToSql + Sync)> = chunk
                .iter()
                .flatten()
                .map(|value| value as &(dyn ToSql + Sync))
                .collect();

            let count = match &full_batch {
                Some(statement) if chunk.len() == batch_rows => self
                    .client
                    .execute(statement, &params)
                    .await
                    .map_err(classify)?,
                _ => {
                    let sql = insert_statement(self.table, frame, chunk.len());
                    self.client
                        .execute(sql.as_str(), &params)
                        .await
                        .map_err(classify)?
                }
            };

            appended += count;
            debug!(appended, total = frame.num_rows(), "appended batch");
        }

        info!(
            rows = appended,
            table = self.table,
            "append write completed"
        );
        Ok(appended)
    }
}

/// Rows per statement, bounded by the bind-parameter limit for wide frames.
fn rows_per_batch(num_columns: usize) -> usize {
    (MAX_PARAMETERS / num_columns.max(1)).clamp(1, BATCH_ROWS)
}

/// Builds a multi-row INSERT statement for the destination table.
fn insert_statement(table: &str, frame: &DataFrame, rows: usize) -> String {
    let num_columns = frame.num_columns();
    let names = frame
        .columns()
        .iter()
        .map(|column| quote_identifier(&column.name))
        .collect::<Vec<String>>()
        .join(", ");

    let groups = (0..rows)
        .map(|row| {
            let placeholders = (1..=num_columns)
                .map(|index| format!("${}", row * num_columns + index))
                .collect::<Vec<String>>()
                .join(", ");
            format!("({placeholders})")
        })
        .collect::<Vec<String>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_table(table),
        names,
        groups
    )
}

/// Quotes a possibly schema-qualified table name part by part.
fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(quote_identifier)
        .collect::<Vec<String>>()
        .join(".")
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::{Cell, Sheet};
    use calamine::Data;
    use std::collections::HashMap;

    fn customers_frame() -> DataFrame {
        let cells = vec![
            (0, 0, Data::String("id".to_string())),
            (0, 1, Data::String("name".to_string())),
            (0, 2, Data::String("email".to_string())),
            (1, 0, Data::Int(1)),
            (1, 1, Data::String("Ann".to_string())),
            (1, 2, Data::String("a@x.com".to_string())),
            (2, 0, Data::Int(2)),
            (2, 1, Data::String("Bo".to_string())),
            (2, 2, Data::String("b@x.com".to_string())),
            (3, 0, Data::Int(3)),
            (3, 1, Data::String("Cy".to_string())),
            (3, 2, Data::String("c@x.com".to_string())),
        ];
        let mut indexes = HashMap::new();
        let cells: Vec<Cell> = cells
            .into_iter()
            .enumerate()
            .map(|(index, (row, column, value))| {
                indexes.insert((row, column), index);
                Cell { row, column, value }
            })
            .collect();
        let sheet = Sheet {
            name: "Sheet1".to_string(),
            row_lower_bound: 0,
            row_upper_bound: 3,
            column_lower_bound: 0,
            column_upper_bound: 2,
            cells,
            indexes,
        };
        DataFrame::from_sheet(&sheet).unwrap()
    }

    #[test]
    fn statement_numbers_placeholders_row_major() {
        let frame = customers_frame();
        let sql = insert_statement("public.customers", &frame, 3);
        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"customers\" (\"id\", \"name\", \"email\") \
             VALUES ($1, $2, $3), ($4, $5, $6), ($7, $8, $9)"
        );
    }

    #[test]
    fn single_row_statement_has_one_group() {
        let frame = customers_frame();
        let sql = insert_statement("customers", &frame, 1);
        assert_eq!(
            sql,
            "INSERT INTO \"customers\" (\"id\", \"name\", \"email\") VALUES ($1, $2, $3)"
        );
    }

    #[test]
    fn identifiers_escape_embedded_quotes() {
        assert_eq!(quote_identifier("plain"), "\"plain\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_table("public.customers"), "\"public\".\"customers\"");
        assert_eq!(quote_table("customers"), "\"customers\"");
    }

    #[test]
    fn batch_size_respects_parameter_limit() {
        assert_eq!(rows_per_batch(3), BATCH_ROWS);
        assert_eq!(rows_per_batch(1000), 65);
        assert_eq!(rows_per_batch(0), BATCH_ROWS);
        assert!(rows_per_batch(MAX_PARAMETERS * 2) >= 1);
    }
}
