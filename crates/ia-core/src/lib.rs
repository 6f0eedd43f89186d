//! # ia-core
//!
//! Core types, traits, and utilities shared by the importable-attachments crates.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Error taxonomy and field-level validation errors
//! - Polymorphic entity references and the type registry that resolves them
//! - Character-set and timestamp validation helpers
//! - The contract trait used to validate entities
//! - Configuration types

pub mod config;
pub mod contract;
pub mod error;
pub mod registry;
pub mod types;
pub mod validation;

pub use config::{AttachmentsConfig, ConfigError, ImportableConfig, PathTemplate, VersioningConfig};
pub use contract::{Contract, ValidationResult};
pub use error::*;
pub use registry::{TypeRegistry, TypeResolver, UnresolvableReference};
pub use types::*;
