//! Common types used across the workspace

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key type
pub type Id = i64;

/// Polymorphic reference to an entity: a type tag plus the entity's id.
///
/// Ids are carried as strings because the polymorphic id columns are text;
/// integer ids are stringified on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub type_name: String,
    pub id: String,
}

impl EntityRef {
    pub fn new(type_name: impl Into<String>, id: impl ToString) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Option<Id>;

    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }

    fn is_new_record(&self) -> bool {
        !self.is_persisted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_stringifies_ids() {
        let by_int = EntityRef::new("Order", 7);
        let by_str = EntityRef::new("Order", "7");
        assert_eq!(by_int, by_str);
        assert_eq!(by_int.to_string(), "Order#7");
    }
}
