//! Job lifecycle around the three-stage run.
//!
//! A run is a single linear pass: Fetch → Transform → Load, then commit.
//! The job itself is a scoped resource: acquired before the first stage,
//! released on every exit path. There are exactly two terminal states,
//! committed and failed; a job dropped without commit has failed.
use crate::config::JobConfig;
use crate::database::{self, AppendWriter};
use crate::error::SheetloadError;
use crate::frame::DataFrame;
use crate::spreadsheet::Workbook;
use crate::store;
use anyhow::Result;
use std::time::Instant;
use tracing::{info, warn};

/// One managed batch run.
pub struct Job {
    config: JobConfig,
    started: Instant,
    committed: bool,
}

impl Job {
    /// Validates the configuration and opens the job lifecycle.
    pub fn init(config: JobConfig) -> Result<Job, SheetloadError> {
        config.validate()?;
        info!(job = %config.job_name, "job started");
        Ok(Job {
            config,
            started: Instant::now(),
            committed: false,
        })
    }

    /// Drives the three stages strictly in order.
    ///
    /// Each stage issues one blocking call and the next stage does not start
    /// until it returns. Any stage error propagates untouched; no stage
    /// retries or recovers.
    pub async fn run(&self) -> Result<(), SheetloadError> {
        let config = &self.config;

        // Fetch
        let client = store::make_client().await;
        let bytes = store::fetch_object(&client, &config.bucket, &config.key).await?;

        // Transform
        let mut workbook = Workbook::from_bytes(bytes)?;
        let sheet = workbook.first_sheet()?;
        let frame = DataFrame::from_sheet(&sheet)?;
        info!(
            sheet = %sheet.name,
            rows = frame.num_rows(),
            schema = %frame.schema_description(),
            "inferred schema"
        );

        // Load
        let destination = config.destination()?;
        let client = database::connect(&destination).await?;
        AppendWriter::new(&client, &config.table)
            .append(&frame)
            .await?;
        Ok(())
    }

    /// Marks the committed terminal state.
    pub fn commit(mut self) {
        self.committed = true;
        info!(
            job = %self.config.job_name,
            elapsed = ?self.started.elapsed(),
            "job committed"
        );
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if !self.committed {
            warn!(
                job = %self.config.job_name,
                elapsed = ?self.started.elapsed(),
                "job released without commit"
            );
        }
    }
}
