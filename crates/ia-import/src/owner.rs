//! Importable owners
//!
//! An owner holds at most one attachment and carries its own error
//! collection. Failures found while importing are recorded on both.

use ia_attachments::Attachment;
use ia_core::{EntityRef, ValidationErrors};

pub const INVALID_ATTACHMENT: &str = "invalid attachment";

/// An entity that can import rows from its attachment
pub trait ImportableOwner: Send {
    /// Polymorphic reference to this owner, once saved
    fn owner_ref(&self) -> Option<EntityRef>;

    fn attachment(&self) -> Option<&Attachment>;

    fn attachment_mut(&mut self) -> Option<&mut Attachment>;

    fn errors(&self) -> &ValidationErrors;

    fn errors_mut(&mut self) -> &mut ValidationErrors;

    /// Record `msg` on the attachment and mark the owner's attachment invalid
    fn invalid_attachment_error(&mut self, msg: &str) {
        if let Some(attachment) = self.attachment_mut() {
            attachment.errors.add_base(msg);
        }
        mark_attachment_invalid(self.errors_mut());
    }

    /// Associated-record validation: an attachment carrying errors makes the
    /// owner invalid too
    fn validate_attachment_association(&mut self) -> bool {
        let invalid = self.attachment().is_some_and(|a| !a.errors.is_empty());
        if invalid {
            mark_attachment_invalid(self.errors_mut());
        }
        !invalid
    }

    fn attachment_file_name(&self) -> Option<&str> {
        self.attachment().map(|a| a.file_name.as_str())
    }
}

fn mark_attachment_invalid(errors: &mut ValidationErrors) {
    if !errors.has_message("attachment", INVALID_ATTACHMENT) {
        errors.add("attachment", INVALID_ATTACHMENT);
    }
}
