use std::path::Path;

use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::info;
use uuid::Uuid;

use crate::config::UploadSettings;
use crate::error::SyncError;

/// Uploads each result file under a `<stem>-<uuid>.csv` key. The binary is
/// otherwise synchronous; a current-thread runtime drives the SDK for this
/// step only.
pub fn upload_results(settings: &UploadSettings, files: &[&Path]) -> Result<(), SyncError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| SyncError::Upload(err.to_string()))?;
    runtime.block_on(upload_all(settings, files))
}

async fn upload_all(settings: &UploadSettings, files: &[&Path]) -> Result<(), SyncError> {
    let credentials = Credentials::new(
        &settings.access_key,
        &settings.secret_key,
        None,
        None,
        "bio-sync-link",
    );
    let config = aws_sdk_s3::Config::builder()
        .credentials_provider(credentials)
        .region(Region::new(settings.region.clone()))
        .build();
    let client = Client::from_conf(config);

    for file in files {
        let stem = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results".to_string());
        let key = format!("{stem}-{}.csv", Uuid::new_v4());
        let body = ByteStream::from_path(file)
            .await
            .map_err(|err| SyncError::Upload(err.to_string()))?;
        client
            .put_object()
            .bucket(&settings.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|err| SyncError::Upload(err.to_string()))?;
        info!(bucket = %settings.bucket, %key, "uploaded result file");
    }
    Ok(())
}
