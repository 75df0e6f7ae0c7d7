//! # Object Store Fetch
//!
//! Retrieves the source spreadsheet object from S3 by bucket and key. One
//! blocking GetObject per run, body collected fully into memory; there is no
//! retry and no size limit beyond what the process can hold.
use anyhow::Result;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::Client;
use thiserror::Error;
use tracing::debug;

/// Errors raised while fetching the source object.
///
/// Any of these aborts the run; transient failures are not retried here, the
/// hosting job runner owns rerun policy.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The key does not exist in the bucket
    #[error("Object 's3://{bucket}/{key}' not found")]
    ObjectNotFound { bucket: String, key: String },

    /// Ambient credentials lack read permission on the object
    #[error("Access denied reading 's3://{bucket}/{key}'")]
    AccessDenied { bucket: String, key: String },

    /// Connectivity or transport failure talking to the object store
    #[error("Object store request failed: {0}")]
    Network(String),
}

/// Builds an S3 client from the ambient environment.
///
/// Credentials and region come from the usual provider chain (environment,
/// profile, instance role); nothing is configured by this program.
pub async fn make_client() -> Client {
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    Client::new(&config)
}

/// Fetches the full byte content of one object.
pub async fn fetch_object(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<Vec<u8>, FetchError> {
    let output = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|error| match error.as_service_error() {
            Some(service) if service.is_no_such_key() => FetchError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            Some(service) if service.code() == Some("AccessDenied") => FetchError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            Some(service) => FetchError::Network(service.to_string()),
            None => FetchError::Network(error.to_string()),
        })?;

    let bytes = output
        .body
        .collect()
        .await
        .map_err(|error| FetchError::Network(error.to_string()))?
        .into_bytes()
        .to_vec();
    debug!(bucket, key, size = bytes.len(), "fetched object");
    Ok(bytes)
}
