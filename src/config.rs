//! Run configuration, resolved at startup from the command line and the
//! environment. Nothing about the source object or the destination is
//! hardcoded; the hosting job runner supplies everything per invocation.
use anyhow::Result;
use clap::Parser;
use thiserror::Error;
use url::Url;

/// Errors raised while validating the supplied configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration option '{name}' must not be empty")]
    EmptyOption { name: &'static str },

    #[error("Invalid destination URL: {message}")]
    InvalidDestinationUrl { message: String },

    #[error("Invalid destination table name '{name}'")]
    InvalidTableName { name: String },
}

/// Externally supplied configuration for one run.
///
/// Every option is settable as a flag or as a `SHEETLOAD_*` environment
/// variable; the job runner typically supplies the environment and passes
/// only the job name on the command line.
#[derive(Parser, Debug)]
#[clap(
    name = "sheetload",
    version,
    about = "One-shot batch job that loads a spreadsheet from object storage into a Postgres table"
)]
pub struct JobConfig {
    /// Job name, used to identify this run in logs
    pub job_name: String,

    /// Source bucket in the object store
    #[clap(long, env = "SHEETLOAD_BUCKET")]
    pub bucket: String,

    /// Source object key within the bucket
    #[clap(long, env = "SHEETLOAD_KEY")]
    pub key: String,

    /// Destination database URL, e.g. postgres://db.example.com:5432/prod
    #[clap(long, env = "SHEETLOAD_DESTINATION_URL")]
    pub destination_url: String,

    /// Destination table, schema-qualified or bare
    #[clap(long, env = "SHEETLOAD_TABLE")]
    pub table: String,

    /// Destination database user
    #[clap(long, env = "SHEETLOAD_USER")]
    pub user: String,

    /// Destination database password
    #[clap(long, env = "SHEETLOAD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl JobConfig {
    /// Checks every option before any stage runs.
    ///
    /// A bad configuration must fail here, while the destination table is
    /// still untouched and no remote call has been made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let options: [(&'static str, &str); 6] = [
            ("JOB_NAME", &self.job_name),
            ("bucket", &self.bucket),
            ("key", &self.key),
            ("destination-url", &self.destination_url),
            ("table", &self.table),
            ("user", &self.user),
        ];
        for (name, value) in options {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyOption { name });
            }
        }
        validate_table_name(&self.table)?;
        self.destination()?;
        Ok(())
    }

    /// Builds the destination connection descriptor from the URL and the
    /// separately supplied credentials.
    pub fn destination(&self) -> Result<tokio_postgres::Config, ConfigError> {
        let url =
            Url::parse(&self.destination_url).map_err(|error| ConfigError::InvalidDestinationUrl {
                message: error.to_string(),
            })?;
        if url.scheme() != "postgres" && url.scheme() != "postgresql" {
            return Err(ConfigError::InvalidDestinationUrl {
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::InvalidDestinationUrl {
                message: "missing host".to_string(),
            })?;
        let dbname = url.path().trim_start_matches('/');
        if dbname.is_empty() {
            return Err(ConfigError::InvalidDestinationUrl {
                message: "missing database name".to_string(),
            });
        }

        let mut config = tokio_postgres::Config::new();
        config
            .application_name("sheetload")
            .host(host)
            .port(url.port().unwrap_or(5432))
            .dbname(dbname)
            .user(self.user.as_str())
            .password(self.password.as_str());
        Ok(config)
    }
}

/// Accepts a bare identifier or a `schema.table` pair.
///
/// The table name is interpolated into INSERT statements, so anything that
/// is not a plain identifier is rejected up front.
fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let mut parts = name.split('.');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(table), None, None) => valid_part(table),
        (Some(schema), Some(table), None) => valid_part(schema) && valid_part(table),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidTableName {
            name: name.to_string(),
        })
    }
}
