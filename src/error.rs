use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("ENA portal request failed: {0}")]
    EnaHttp(String),

    #[error("ENA portal returned status {status}: {message}")]
    EnaStatus { status: u16, message: String },

    #[error("failed to decode ENA portal response: {0}")]
    EnaDecode(String),

    #[error("ENA SAH request failed: {0}")]
    SahHttp(String),

    #[error("ENA SAH returned status {status}: {message}")]
    SahStatus { status: u16, message: String },

    #[error("failed to decode ENA SAH response: {0}")]
    SahDecode(String),

    #[error("clearinghouse request failed: {0}")]
    CurationHttp(String),

    #[error("clearinghouse returned status {status}: {message}")]
    CurationStatus { status: u16, message: String },

    #[error("institution table not found at {0}")]
    MissingInstitutionTable(PathBuf),

    #[error("failed to read institution table: {0}")]
    InstitutionTableRead(String),

    #[error("failed to open dump file at {0}")]
    DumpOpen(PathBuf),

    #[error("failed to read dump row: {0}")]
    DumpRead(String),

    #[error("failed to write result row: {0}")]
    OutputWrite(String),

    #[error("missing credential environment variable {0}")]
    MissingCredential(&'static str),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("worker thread panicked")]
    WorkerPanic,

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
