use thiserror::Error;

/// Top-level error for the loader.
///
/// Aggregates the per-stage errors. Propagation policy is uniform: nothing
/// below `main` catches or recovers, every failure aborts the run and the
/// process exits non-zero with the stage's own diagnostic message.
#[derive(Error, Debug)]
pub enum SheetloadError {
    #[error("{0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("{0}")]
    Fetch(#[from] crate::store::FetchError),

    #[error("{0}")]
    Spreadsheet(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    Load(#[from] crate::database::LoadError),
}
