//! Error types for the reader, store, reconciler and upload gate.

use thiserror::Error;

/// A required selection was missing or invalid. Raised before any store access.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("unknown department: {0}")]
    UnknownDepartment(String),

    #[error("semester must be between 1 and 8, got {0}")]
    SemesterOutOfRange(i64),

    #[error("{0} must be an integer")]
    NotAnInteger(&'static str),
}

#[derive(Debug, Error)]
pub enum SheetError {
    /// The source could not be opened, fetched or parsed.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The remote source rejected the configured credentials.
    #[error("source rejected credentials: {0}")]
    Auth(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid stored value: {0}")]
    InvalidState(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload failed: {0}")]
    Source(#[from] SheetError),

    #[error("upload failed: {0}")]
    Store(#[from] StoreError),

    /// The sheet has data rows but no column for a required student/exam field.
    #[error("upload failed: sheet has no '{0}' column")]
    MissingColumn(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("uploads are disabled: no upload code is configured")]
    Disabled,

    #[error("invalid upload code")]
    InvalidCode,

    #[error("session is missing or expired")]
    InvalidSession,
}
