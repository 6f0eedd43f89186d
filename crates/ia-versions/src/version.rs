//! Version Model
//!
//! One row per create/update/destroy of a versioned entity.

use chrono::{DateTime, Utc};
use ia_core::{EntityRef, Id};
use serde::{Deserialize, Serialize};

use crate::error::{VersionError, VersionResult};
use crate::snapshot::{Changeset, Snapshot};

/// Lifecycle event that produced a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionEvent {
    Create,
    Update,
    Destroy,
}

impl VersionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "destroy" => Some(Self::Destroy),
            _ => None,
        }
    }
}

impl std::fmt::Display for VersionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Version ID, assigned on append
    pub id: Option<Id>,
    /// Type of the versioned entity
    pub item_type: String,
    /// ID of the versioned entity
    pub item_id: String,
    pub event: VersionEvent,
    /// Who made the change ("whodunnit")
    pub actor: Option<String>,
    /// YAML snapshot of the entity's attributes
    pub object: Option<String>,
    /// YAML changeset
    pub object_changes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Version {
    pub fn new(item: &EntityRef, event: VersionEvent) -> Self {
        Self {
            id: None,
            item_type: item.type_name.clone(),
            item_id: item.id.clone(),
            event,
            actor: None,
            object: None,
            object_changes: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn item(&self) -> EntityRef {
        EntityRef::new(self.item_type.clone(), self.item_id.clone())
    }

    pub fn is_for(&self, item: &EntityRef) -> bool {
        self.item_type == item.type_name && self.item_id == item.id
    }

    /// Case-sensitive substring match against the stored snapshot
    pub fn object_contains(&self, pattern: &str) -> bool {
        self.object
            .as_deref()
            .map_or(false, |object| object.contains(pattern))
    }

    /// Parse the stored snapshot back into attributes.
    ///
    /// Corrupt content is an error; a partially parsed object is never returned.
    pub fn to_structured_object(&self) -> VersionResult<Snapshot> {
        let object = self
            .object
            .as_deref()
            .ok_or(VersionError::MissingSnapshot(self.id.unwrap_or_default()))?;
        Snapshot::from_yaml(object)
    }

    /// Parse the stored changeset; versions without one yield an empty changeset
    pub fn changeset(&self) -> VersionResult<Changeset> {
        match self.object_changes.as_deref() {
            Some(text) => Changeset::from_yaml(text),
            None => Ok(Changeset::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_conversion() {
        assert_eq!(VersionEvent::Update.as_str(), "update");
        assert_eq!(VersionEvent::from_str("destroy"), Some(VersionEvent::Destroy));
        assert_eq!(VersionEvent::from_str("touch"), None);
    }

    #[test]
    fn test_version_for_item() {
        let item = EntityRef::new("Order", 7);
        let version = Version::new(&item, VersionEvent::Create).with_actor("admin");

        assert!(version.is_for(&item));
        assert!(!version.is_for(&EntityRef::new("Order", 8)));
        assert_eq!(version.item(), item);
        assert_eq!(version.actor.as_deref(), Some("admin"));
    }

    #[test]
    fn test_missing_snapshot_is_an_error() {
        let mut version = Version::new(&EntityRef::new("Order", 7), VersionEvent::Create);
        version.id = Some(3);

        assert!(matches!(
            version.to_structured_object(),
            Err(VersionError::MissingSnapshot(3))
        ));
        assert!(version.changeset().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let mut version = Version::new(&EntityRef::new("Order", 7), VersionEvent::Destroy);
        version.object = Some("status: \"unterminated".to_string());

        assert!(matches!(
            version.to_structured_object(),
            Err(VersionError::MalformedSnapshot(_))
        ));
    }
}
