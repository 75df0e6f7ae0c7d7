//! # sheetload
//!
//! A one-shot batch job that loads a spreadsheet from object storage into a
//! relational table: fetch an object from S3 by bucket and key, parse it as
//! a single-workbook spreadsheet with the schema inferred from the first
//! sheet's header row, and append every row to a Postgres table.
//!
//! ## Pipeline
//!
//! Control flow is strictly linear — Fetch → Transform → Load — with one
//! blocking call per stage and no work overlapped between stages:
//!
//! - [`store`]: retrieve the object's full byte content
//! - [`spreadsheet`] + [`frame`]: parse the first sheet and adapt it into a
//!   typed, fully materialized record set
//! - [`database`]: append the record set to the destination table
//!
//! ## Failure policy
//!
//! Any failure in any stage aborts the run: no retry, no partial-write
//! recovery, no rollback beyond what a single batch statement provides. The
//! hosting job runner owns rerun and alerting policy.
pub mod config;
pub mod database;
pub mod error;
pub mod frame;
pub mod job;
pub mod spreadsheet;
pub mod store;

pub use config::JobConfig;
pub use error::SheetloadError;
pub use job::Job;
