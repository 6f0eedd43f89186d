//! Attachment validation
//!
//! Checks an attachment's metadata before it is persisted: the file must be
//! non-empty, name and content type are charset-restricted, and a polymorphic
//! owner type must resolve through the type registry.

use std::sync::Arc;

use ia_core::validation::{is_alpha_numeric_punctuation, validate_present_alpha_numeric};
use ia_core::{Contract, TypeResolver, ValidationErrors, ValidationResult};

use crate::model::Attachment;

const INVALID_CHARSET: &str = "is invalid. Only letters, numbers and punctuation are allowed";

/// Validates attachments on create and update
pub struct AttachmentContract {
    resolver: Arc<dyn TypeResolver>,
}

impl AttachmentContract {
    pub fn new(resolver: Arc<dyn TypeResolver>) -> Self {
        Self { resolver }
    }

    fn validate_owner(&self, attachment: &Attachment, errors: &mut ValidationErrors) {
        match (&attachment.owner_type, &attachment.owner_id) {
            (None, None) => {}
            (None, Some(_)) => errors.add("owner_type", "can't be blank"),
            (Some(owner_type), owner_id) => {
                if !is_alpha_numeric_punctuation(owner_type) {
                    errors.add("owner_type", INVALID_CHARSET);
                } else if self.resolver.resolve(owner_type).is_err() {
                    errors.add("owner_type", "unknown polymorph owner_type");
                }

                if let Some(id) = owner_id {
                    if !is_alpha_numeric_punctuation(id) {
                        errors.add("owner_id", INVALID_CHARSET);
                    }
                }
            }
        }
    }
}

impl Contract<Attachment> for AttachmentContract {
    fn validate(&self, attachment: &Attachment) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        if attachment.file_size <= 0 {
            errors.add("file", "can't be blank");
        }

        validate_present_alpha_numeric("file_name", &attachment.file_name, true, &mut errors);
        if matches!(attachment.file_name.as_str(), "." | "..") {
            errors.add("file_name", "is reserved");
        }
        validate_present_alpha_numeric(
            "content_type",
            &attachment.content_type,
            false,
            &mut errors,
        );

        self.validate_owner(attachment, &mut errors);

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ia_core::{EntityRef, TypeRegistry};

    fn contract() -> AttachmentContract {
        AttachmentContract::new(Arc::new(TypeRegistry::with_types(["Order", "Billing::Invoice"])))
    }

    fn valid() -> Attachment {
        Attachment::new("invoice.csv", "text/csv", 120).for_owner(&EntityRef::new("Order", 7))
    }

    #[test]
    fn test_valid_attachment() {
        assert!(contract().validate(&valid()).is_ok());
    }

    #[test]
    fn test_namespaced_owner_type() {
        let attachment = Attachment::new("invoice.csv", "text/csv", 120)
            .for_owner(&EntityRef::new("Billing::Invoice", 1));
        assert!(contract().validate(&attachment).is_ok());
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let mut attachment = valid();
        attachment.file_size = 0;

        let errors = contract().validate(&attachment).unwrap_err();
        assert!(errors.has_message("file", "can't be blank"));
    }

    #[test]
    fn test_file_name_allows_spaces_but_not_control_chars() {
        let mut attachment = valid();
        attachment.file_name = "march invoice.csv".to_string();
        assert!(contract().validate(&attachment).is_ok());

        attachment.file_name = "invoice\n.csv".to_string();
        let errors = contract().validate(&attachment).unwrap_err();
        assert!(errors.has_error("file_name"));
    }

    #[test]
    fn test_dot_file_names_are_reserved() {
        for name in [".", ".."] {
            let mut attachment = valid();
            attachment.file_name = name.to_string();

            let errors = contract().validate(&attachment).unwrap_err();
            assert!(errors.has_message("file_name", "is reserved"), "name: {:?}", name);
        }

        let mut attachment = valid();
        attachment.file_name = "..csv".to_string();
        assert!(contract().validate(&attachment).is_ok());
    }

    #[test]
    fn test_content_type_rejects_spaces() {
        let mut attachment = valid();
        attachment.content_type = "text / csv".to_string();

        let errors = contract().validate(&attachment).unwrap_err();
        assert!(errors.has_message("content_type", INVALID_CHARSET));
    }

    #[test]
    fn test_blank_metadata() {
        let attachment = Attachment::new("", "", 10);

        let errors = contract().validate(&attachment).unwrap_err();
        assert!(errors.has_message("file_name", "can't be blank"));
        assert!(errors.has_message("content_type", "can't be blank"));
    }

    #[test]
    fn test_owner_type_with_bad_characters() {
        let mut attachment = valid();
        attachment.owner_type = Some("Or der".to_string());

        let errors = contract().validate(&attachment).unwrap_err();
        assert!(errors.has_message("owner_type", INVALID_CHARSET));
    }

    #[test]
    fn test_unknown_owner_type() {
        let mut attachment = valid();
        attachment.owner_type = Some("Shipment".to_string());

        let errors = contract().validate(&attachment).unwrap_err();
        assert!(errors.has_message("owner_type", "unknown polymorph owner_type"));
    }

    #[test]
    fn test_owner_type_without_id_is_allowed() {
        let mut attachment = Attachment::new("invoice.csv", "text/csv", 120);
        attachment.owner_type = Some("Order".to_string());
        assert!(contract().validate(&attachment).is_ok());
    }

    #[test]
    fn test_owner_id_without_type() {
        let mut attachment = Attachment::new("invoice.csv", "text/csv", 120);
        attachment.owner_id = Some("7".to_string());

        let errors = contract().validate(&attachment).unwrap_err();
        assert!(errors.has_message("owner_type", "can't be blank"));
    }
}
