//! Base contract system
//!
//! A contract validates an entity before it is persisted and reports every
//! problem it finds as field-level [`ValidationErrors`].

use crate::error::ValidationErrors;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// Base contract trait
pub trait Contract<T>: Send + Sync {
    /// Validate the entity
    fn validate(&self, entity: &T) -> ValidationResult;
}
