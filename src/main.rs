use clap::Parser;
use sheetload::{Job, JobConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = JobConfig::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(config).await {
        eprintln!("ERROR: {error}");
        std::process::exit(1);
    }
}

/// One run: acquire the job, drive the pipeline, commit.
async fn run(config: JobConfig) -> Result<(), sheetload::SheetloadError> {
    let job = Job::init(config)?;
    job.run().await?;
    job.commit();
    Ok(())
}
