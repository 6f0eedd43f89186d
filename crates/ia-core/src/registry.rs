//! Type registry
//!
//! Polymorphic `*_type` columns hold plain strings. Before one is trusted it is
//! resolved here; names that no longer exist (renamed or deleted entity types)
//! come back as [`UnresolvableReference`] so callers can turn them into
//! validation errors.

use std::collections::HashSet;
use std::sync::RwLock;

use thiserror::Error;

/// A type name that could not be resolved
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("uninitialized constant {type_name}")]
pub struct UnresolvableReference {
    pub type_name: String,
}

/// Resolves polymorphic type names
pub trait TypeResolver: Send + Sync {
    /// Resolve a (possibly `::`-namespaced) type name
    fn resolve(&self, type_name: &str) -> Result<(), UnresolvableReference>;

    fn is_known(&self, type_name: &str) -> bool {
        self.resolve(type_name).is_ok()
    }
}

/// In-process registry of known entity types.
///
/// Registering `Billing::Invoice` also registers the `Billing` namespace, so
/// each path segment resolves on its own.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashSet<String>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of type names
    pub fn with_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = Self::new();
        for t in types {
            registry.register(t.as_ref());
        }
        registry
    }

    pub fn register(&self, type_name: &str) {
        let mut types = match self.types.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut path = String::new();
        for segment in type_name.split("::") {
            if !path.is_empty() {
                path.push_str("::");
            }
            path.push_str(segment);
            types.insert(path.clone());
        }
    }

    /// Forget a type, e.g. after an entity type was removed
    pub fn unregister(&self, type_name: &str) {
        let mut types = match self.types.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        types.remove(type_name);
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve(&self, type_name: &str) -> Result<(), UnresolvableReference> {
        let types = match self.types.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let unresolvable = || UnresolvableReference {
            type_name: type_name.to_string(),
        };

        if type_name.is_empty() {
            return Err(unresolvable());
        }

        // Walk the namespace one segment at a time
        let mut path = String::new();
        for segment in type_name.split("::") {
            if segment.is_empty() {
                return Err(unresolvable());
            }
            if !path.is_empty() {
                path.push_str("::");
            }
            path.push_str(segment);
            if !types.contains(&path) {
                return Err(unresolvable());
            }
        }

        Ok(())
    }
}
