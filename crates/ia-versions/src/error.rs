//! Version ledger errors

use ia_core::{Id, ValidationErrors};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Version not found: {0}")]
    NotFound(Id),
    #[error("Invalid version: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("Version {0} has no stored snapshot")]
    MissingSnapshot(Id),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Store error: {0}")]
    Store(String),
}

pub type VersionResult<T> = Result<T, VersionError>;
