//! Configuration types and loading
//!
//! Feature flags that gate optional behaviour are passed explicitly to the
//! services that honour them:
//!
//! - `versioning.enabled`: attachment mutations append version rows
//! - `versioning.validate_item_type_constants`: version item types must
//!   resolve through the type registry
//! - `attachments.include_revision_in_filename`: URLs and storage keys are
//!   rendered from the revision-aware templates

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("template {template} must contain {placeholder}")]
    InvalidTemplate {
        template: String,
        placeholder: &'static str,
    },
}

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImportableConfig {
    pub versioning: VersioningConfig,
    pub attachments: AttachmentsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersioningConfig {
    pub enabled: bool,
    pub validate_item_type_constants: bool,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            validate_item_type_constants: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttachmentsConfig {
    /// Root directory for the local storage backend
    pub storage_root: String,
    pub include_revision_in_filename: bool,
    /// Templates used when revisions are not part of the filename
    pub plain: PathTemplate,
    /// Templates used when `include_revision_in_filename` is set
    pub versioned: PathTemplate,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            storage_root: "public/system".to_string(),
            include_revision_in_filename: false,
            plain: PathTemplate {
                url: "/system/attachments/:id/:filename".to_string(),
                path: "attachments/:id/:filename".to_string(),
            },
            versioned: PathTemplate {
                url: "/system/attachments/:id/:revision/:filename".to_string(),
                path: "attachments/:id/:revision/:filename".to_string(),
            },
        }
    }
}

impl AttachmentsConfig {
    /// The template pair selected by `include_revision_in_filename`
    pub fn active_template(&self) -> &PathTemplate {
        if self.include_revision_in_filename {
            &self.versioned
        } else {
            &self.plain
        }
    }
}

/// URL and storage-key templates.
///
/// Supported placeholders: `:id`, `:revision`, `:filename`, `:basename`,
/// `:extension`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PathTemplate {
    pub url: String,
    pub path: String,
}

impl ImportableConfig {
    /// Load configuration from environment variables, starting from defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let parse_bool = |key: &str, v: String| -> Result<bool, ConfigError> {
            match v.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: v,
                }),
            }
        };

        if let Ok(v) = std::env::var("IMPORTABLE_VERSIONING_ENABLED") {
            config.versioning.enabled = parse_bool("IMPORTABLE_VERSIONING_ENABLED", v)?;
        }
        if let Ok(v) = std::env::var("IMPORTABLE_VALIDATE_ITEM_TYPES") {
            config.versioning.validate_item_type_constants =
                parse_bool("IMPORTABLE_VALIDATE_ITEM_TYPES", v)?;
        }

        if let Ok(v) = std::env::var("IMPORTABLE_INCLUDE_REVISION_IN_FILENAME") {
            config.attachments.include_revision_in_filename =
                parse_bool("IMPORTABLE_INCLUDE_REVISION_IN_FILENAME", v)?;
        }
        if let Ok(root) = std::env::var("IMPORTABLE_STORAGE_ROOT") {
            config.attachments.storage_root = root;
        }
        if let Ok(url) = std::env::var("IMPORTABLE_ATTACHMENTS_URL") {
            config.attachments.plain.url = url;
        }
        if let Ok(path) = std::env::var("IMPORTABLE_ATTACHMENTS_PATH") {
            config.attachments.plain.path = path;
        }
        if let Ok(url) = std::env::var("IMPORTABLE_VERSIONED_URL") {
            config.attachments.versioned.url = url;
        }
        if let Ok(path) = std::env::var("IMPORTABLE_VERSIONED_PATH") {
            config.attachments.versioned.path = path;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check templates for the placeholders they need.
    ///
    /// Every storage path must contain `:id` so attachments never share a key,
    /// and the versioned path must contain `:revision`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let require = |template: &str, placeholder: &'static str| {
            if template.contains(placeholder) {
                Ok(())
            } else {
                Err(ConfigError::InvalidTemplate {
                    template: template.to_string(),
                    placeholder,
                })
            }
        };

        require(&self.attachments.plain.path, ":id")?;
        require(&self.attachments.versioned.path, ":id")?;
        require(&self.attachments.versioned.path, ":revision")?;
        Ok(())
    }
}
