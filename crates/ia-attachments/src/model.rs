//! Attachment Model
//!
//! An attachment is one stored file plus its metadata, bound to at most one
//! owner through a polymorphic `owner_type`/`owner_id` pair.

use chrono::{DateTime, Utc};
use ia_core::{EntityRef, Id, Identifiable, ValidationErrors};
use ia_versions::{Snapshot, VersionError};
use serde::{Deserialize, Serialize};

/// An attachment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment ID
    pub id: Option<Id>,
    /// Owner type (e.g., "Order"); may be set before the owner has an id
    pub owner_type: Option<String>,
    /// Owner ID
    pub owner_id: Option<String>,
    /// Original filename
    pub file_name: String,
    /// Content type declared by the uploader
    pub content_type: String,
    /// File size in bytes
    pub file_size: i64,
    /// Last modification time of the uploaded file
    pub file_modified_at: Option<DateTime<Utc>>,
    /// SHA256 digest of the stored blob
    pub digest: Option<String>,
    /// Revision the current blob was written under; rendered as `:revision`
    #[serde(default)]
    pub file_revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Errors collected on this record (validation and import failures)
    #[serde(skip)]
    pub errors: ValidationErrors,
    /// Set when this value was rebuilt from a historical version
    #[serde(skip)]
    pub reified_from: Option<Id>,
}

impl Attachment {
    /// Type name used for version history
    pub const ITEM_TYPE: &'static str = "Attachment";

    /// Create a new, unsaved attachment
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, file_size: i64) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            owner_type: None,
            owner_id: None,
            file_name: file_name.into(),
            content_type: content_type.into(),
            file_size,
            file_modified_at: None,
            digest: None,
            file_revision: 0,
            created_at: now,
            updated_at: now,
            errors: ValidationErrors::new(),
            reified_from: None,
        }
    }

    /// Set the owner
    pub fn for_owner(mut self, owner: &EntityRef) -> Self {
        self.owner_type = Some(owner.type_name.clone());
        self.owner_id = Some(owner.id.clone());
        self
    }

    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.file_modified_at = Some(at);
        self
    }

    /// The owner reference, once both halves are known
    pub fn owner(&self) -> Option<EntityRef> {
        match (&self.owner_type, &self.owner_id) {
            (Some(t), Some(id)) => Some(EntityRef::new(t.clone(), id.clone())),
            _ => None,
        }
    }

    /// Check if this has an owner
    pub fn is_attached(&self) -> bool {
        self.owner().is_some()
    }

    pub fn belongs_to(&self, owner: &EntityRef) -> bool {
        self.owner_type.as_deref() == Some(owner.type_name.as_str())
            && self.owner_id.as_deref() == Some(owner.id.as_str())
    }

    /// Reference used for this attachment's version history
    pub fn item_ref(&self) -> Option<EntityRef> {
        self.id.map(|id| EntityRef::new(Self::ITEM_TYPE, id))
    }

    /// True for the current state, false for a value rebuilt from history
    pub fn is_live(&self) -> bool {
        self.reified_from.is_none()
    }

    /// Human-readable file size
    pub fn human_filesize(&self) -> String {
        let size = self.file_size as f64;
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

        if size <= 0.0 {
            return "0 B".to_string();
        }

        let base = 1024.0_f64;
        let i = (size.ln() / base.ln()).floor() as usize;
        let i = i.min(UNITS.len() - 1);

        let value = size / base.powi(i as i32);
        format!("{:.1} {}", value, UNITS[i])
    }

    /// Attribute snapshot recorded in version history
    pub fn to_snapshot(&self) -> Snapshot {
        // every field serializes to plain JSON, so the object arm always matches
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Snapshot {
                fields: map.into_iter().collect(),
            },
            _ => Snapshot::new(),
        }
    }

    /// Rebuild an attachment from a version snapshot
    pub fn from_snapshot(snapshot: &Snapshot, version_id: Id) -> Result<Self, VersionError> {
        let map: serde_json::Map<String, serde_json::Value> = snapshot
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut attachment: Attachment = serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| VersionError::MalformedSnapshot(e.to_string()))?;
        attachment.reified_from = Some(version_id);
        Ok(attachment)
    }
}

impl Identifiable for Attachment {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

/// Parameters for attaching a file
#[derive(Debug, Clone)]
pub struct AttachParams {
    pub file_name: String,
    pub content_type: String,
    /// Declared size; defaults to the payload length
    pub file_size: Option<i64>,
    pub modified_at: Option<DateTime<Utc>>,
    pub owner_type: Option<String>,
    pub owner_id: Option<String>,
}

impl AttachParams {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            file_size: None,
            modified_at: None,
            owner_type: None,
            owner_id: None,
        }
    }

    pub fn file_size(mut self, size: i64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }

    pub fn owner(mut self, owner: &EntityRef) -> Self {
        self.owner_type = Some(owner.type_name.clone());
        self.owner_id = Some(owner.id.clone());
        self
    }

    /// Only the owner type; the id follows once the owner is saved
    pub fn owner_type(mut self, owner_type: impl Into<String>) -> Self {
        self.owner_type = Some(owner_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_creation() {
        let attachment = Attachment::new("invoice.csv", "text/csv", 120);

        assert_eq!(attachment.file_name, "invoice.csv");
        assert!(attachment.is_new_record());
        assert!(attachment.is_live());
        assert!(!attachment.is_attached());
        assert!(attachment.item_ref().is_none());
    }

    #[test]
    fn test_attachment_with_owner() {
        let order = EntityRef::new("Order", 7);
        let attachment = Attachment::new("invoice.csv", "text/csv", 120).for_owner(&order);

        assert!(attachment.is_attached());
        assert!(attachment.belongs_to(&order));
        assert!(!attachment.belongs_to(&EntityRef::new("Order", 8)));
        assert_eq!(attachment.owner(), Some(order));
    }

    #[test]
    fn test_owner_type_without_id_is_not_attached() {
        let mut attachment = Attachment::new("invoice.csv", "text/csv", 120);
        attachment.owner_type = Some("Order".to_string());
        assert!(!attachment.is_attached());
    }

    #[test]
    fn test_human_filesize() {
        let cases = [
            (0, "0 B"),
            (512, "512.0 B"),
            (1536, "1.5 KB"),
            (1024 * 1024, "1.0 MB"),
        ];

        for (size, expected) in cases {
            let attachment = Attachment::new("a.bin", "application/octet-stream", size);
            assert_eq!(attachment.human_filesize(), expected, "Size: {}", size);
        }
    }

    #[test]
    fn test_snapshot_round_trip_marks_value_historical() {
        let mut attachment = Attachment::new("invoice.csv", "text/csv", 120)
            .for_owner(&EntityRef::new("Order", 7));
        attachment.id = Some(3);
        attachment.errors.add_base("not part of the snapshot");

        let snapshot = attachment.to_snapshot();
        assert_eq!(snapshot.get_as::<String>("file_name").as_deref(), Some("invoice.csv"));
        assert!(snapshot.get("errors").is_none());

        let restored = Attachment::from_snapshot(&snapshot, 11).unwrap();
        assert_eq!(restored.id, Some(3));
        assert_eq!(restored.owner_id.as_deref(), Some("7"));
        assert_eq!(restored.reified_from, Some(11));
        assert!(!restored.is_live());
        assert!(restored.errors.is_empty());
    }

    #[test]
    fn test_from_incomplete_snapshot_fails() {
        let snapshot = Snapshot::new().with("file_name", "invoice.csv");
        assert!(matches!(
            Attachment::from_snapshot(&snapshot, 1),
            Err(VersionError::MalformedSnapshot(_))
        ));
    }
}
