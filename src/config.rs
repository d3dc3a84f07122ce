use crate::error::SyncError;

pub const DEFAULT_JOBS: usize = 10;
pub const DEFAULT_BUCKET: &str = "ggbn-ena-mapping";
pub const DEFAULT_REGION: &str = "eu-west-1";

const ACCESS_KEY_VAR: &str = "ACCESS_KEY";
const SECRET_KEY_VAR: &str = "SECRET_KEY";

/// Where and with which credentials the result files get uploaded.
/// Credentials come from the environment only; they never appear on the
/// command line.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

impl UploadSettings {
    pub fn from_env(bucket: Option<String>, region: Option<String>) -> Result<Self, SyncError> {
        let access_key = require_env(ACCESS_KEY_VAR)?;
        let secret_key = require_env(SECRET_KEY_VAR)?;
        Ok(Self {
            bucket: bucket.unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            region: region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key,
            secret_key,
        })
    }
}

fn require_env(name: &'static str) -> Result<String, SyncError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SyncError::MissingCredential(name)),
    }
}
