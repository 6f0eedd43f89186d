//! Snapshot and changeset serialization
//!
//! A snapshot is the full attribute state of an entity; a changeset holds only
//! the attributes that changed, as `attribute -> [old, new]`. Both are stored
//! as YAML text in the `object` and `object_changes` columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{VersionError, VersionResult};

/// Full attribute state of an entity at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub fields: BTreeMap<String, JsonValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style [`Snapshot::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    /// Get a field value as a specific type
    pub fn get_as<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn to_yaml(&self) -> VersionResult<String> {
        serde_yaml::to_string(&self.fields).map_err(|e| VersionError::Serialization(e.to_string()))
    }

    /// Parse a stored snapshot. Anything that is not a mapping is rejected.
    pub fn from_yaml(text: &str) -> VersionResult<Self> {
        serde_yaml::from_str::<BTreeMap<String, JsonValue>>(text)
            .map(|fields| Self { fields })
            .map_err(|e| VersionError::MalformedSnapshot(e.to_string()))
    }
}

/// Attributes that changed, mapped to `[old, new]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Changeset {
    pub changes: BTreeMap<String, [JsonValue; 2]>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change
    pub fn add(&mut self, key: impl Into<String>, old: JsonValue, new: JsonValue) {
        self.changes.insert(key.into(), [old, new]);
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        old: impl Into<JsonValue>,
        new: impl Into<JsonValue>,
    ) -> Self {
        self.add(key, old.into(), new.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, key: &str) -> Option<&[JsonValue; 2]> {
        self.changes.get(key)
    }

    /// Compute the changeset between two snapshots, skipping `ignore`d keys.
    ///
    /// Added attributes diff against `null`, removed ones against `null` too.
    pub fn compute(old: &Snapshot, new: &Snapshot, ignore: &[&str]) -> Self {
        let mut changeset = Self::new();

        for (key, new_value) in &new.fields {
            if ignore.contains(&key.as_str()) {
                continue;
            }
            match old.fields.get(key) {
                Some(old_value) if old_value == new_value => {}
                Some(old_value) => changeset.add(key.clone(), old_value.clone(), new_value.clone()),
                None => changeset.add(key.clone(), JsonValue::Null, new_value.clone()),
            }
        }

        for (key, old_value) in &old.fields {
            if ignore.contains(&key.as_str()) || new.fields.contains_key(key) {
                continue;
            }
            changeset.add(key.clone(), old_value.clone(), JsonValue::Null);
        }

        changeset
    }

    pub fn to_yaml(&self) -> VersionResult<String> {
        serde_yaml::to_string(&self.changes).map_err(|e| VersionError::Serialization(e.to_string()))
    }

    pub fn from_yaml(text: &str) -> VersionResult<Self> {
        serde_yaml::from_str::<BTreeMap<String, [JsonValue; 2]>>(text)
            .map(|changes| Self { changes })
            .map_err(|e| VersionError::MalformedSnapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_snapshot() -> Snapshot {
        Snapshot::new()
            .with("id", 7)
            .with("status", "old")
            .with("total", 12.5)
            .with("reference", "0042")
            .with("tags", vec!["a", "b"])
            .with("shipped_at", JsonValue::Null)
    }

    #[test]
    fn test_snapshot_yaml_round_trip() {
        let snapshot = order_snapshot();
        let yaml = snapshot.to_yaml().unwrap();

        assert!(yaml.contains("status: old"));
        assert_eq!(Snapshot::from_yaml(&yaml).unwrap(), snapshot);
    }

    #[test]
    fn test_snapshot_get_as() {
        let snapshot = order_snapshot();
        assert_eq!(snapshot.get_as::<i64>("id"), Some(7));
        assert_eq!(snapshot.get_as::<String>("reference"), Some("0042".to_string()));
        assert_eq!(snapshot.get_as::<i64>("missing"), None);
    }

    #[test]
    fn test_malformed_snapshot_is_rejected() {
        assert!(matches!(
            Snapshot::from_yaml("- just\n- a list\n"),
            Err(VersionError::MalformedSnapshot(_))
        ));
        assert!(matches!(
            Snapshot::from_yaml("status: [unclosed"),
            Err(VersionError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_changeset_compute() {
        let old = Snapshot::new()
            .with("status", "old")
            .with("note", "gone soon")
            .with("updated_at", "2024-01-01T00:00:00Z");
        let new = Snapshot::new()
            .with("status", "new")
            .with("total", 3)
            .with("updated_at", "2024-02-01T00:00:00Z");

        let changeset = Changeset::compute(&old, &new, &["updated_at"]);

        assert_eq!(changeset.len(), 3);
        assert_eq!(changeset.get("status"), Some(&[json!("old"), json!("new")]));
        assert_eq!(changeset.get("total"), Some(&[JsonValue::Null, json!(3)]));
        assert_eq!(changeset.get("note"), Some(&[json!("gone soon"), JsonValue::Null]));
        assert!(changeset.get("updated_at").is_none());
    }

    #[test]
    fn test_changeset_yaml_round_trip() {
        let changeset = Changeset::new().with("status", "old", "new");
        let yaml = changeset.to_yaml().unwrap();
        assert_eq!(Changeset::from_yaml(&yaml).unwrap(), changeset);
    }

    #[test]
    fn test_identical_snapshots_have_empty_changeset() {
        let snapshot = order_snapshot();
        assert!(Changeset::compute(&snapshot, &snapshot, &[]).is_empty());
    }
}
