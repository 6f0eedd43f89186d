//! Repository errors

use ia_attachments::AttachmentError;
use ia_versions::VersionError;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for AttachmentError {
    fn from(e: RepositoryError) -> Self {
        AttachmentError::Store(e.to_string())
    }
}

impl From<RepositoryError> for VersionError {
    fn from(e: RepositoryError) -> Self {
        VersionError::Store(e.to_string())
    }
}
