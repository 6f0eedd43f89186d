//! Import errors

use ia_attachments::AttachmentError;
use thiserror::Error;

/// Import errors.
///
/// `Parse` is recoverable: the importer turns it into an error on the
/// owner's attachment. Everything else stops the pass.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("has_importable_attachment: {0}")]
    InvalidOptions(String),
    #[error("[importable_attachments] .{0} not implemented")]
    NotImplemented(&'static str),
    #[error("{0}")]
    Parse(String),
    #[error("attachment must be saved before it can be imported")]
    UnsavedAttachment,
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
}

pub type ImportResult<T> = Result<T, ImportError>;
