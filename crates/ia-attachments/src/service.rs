//! Attachment Service
//!
//! Orchestrates validation, blob storage, metadata persistence and version
//! recording for attachments.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use ia_core::{Contract, EntityRef, Id, ImportableConfig, TypeResolver, ValidationErrors};
use ia_versions::{Changeset, Snapshot, VersionError, VersionEvent, VersionLedger};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::contract::AttachmentContract;
use crate::model::{AttachParams, Attachment};
use crate::path::{interpolate, PathParams};
use crate::sniffer::{essence, MimeSniffer};
use crate::storage::{Storage, StorageError};

/// Attributes left out of recorded changesets
const IGNORED_ATTRIBUTES: &[&str] = &["updated_at"];

/// Service errors
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Attachment not found: {0}")]
    NotFound(Id),
    #[error("Invalid attachment: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Version error: {0}")]
    Version(#[from] VersionError),
    #[error("Versioning is not enabled")]
    VersioningDisabled,
    #[error("Version {0} does not belong to an attachment")]
    ForeignVersion(Id),
    #[error("Attachment store error: {0}")]
    Store(String),
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;

/// Attachment store trait
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Create an attachment record, assigning its id
    async fn create(&self, attachment: &mut Attachment) -> AttachmentResult<Id>;

    /// Get an attachment by ID
    async fn get(&self, id: Id) -> AttachmentResult<Option<Attachment>>;

    /// Get attachments bound to an owner
    async fn get_for_owner(&self, owner: &EntityRef) -> AttachmentResult<Vec<Attachment>>;

    /// Update an attachment
    async fn update(&self, attachment: &Attachment) -> AttachmentResult<()>;

    /// Delete an attachment
    async fn delete(&self, id: Id) -> AttachmentResult<()>;
}

/// In-memory attachment store for testing
pub struct MemoryAttachmentStore {
    attachments: RwLock<Vec<Attachment>>,
    next_id: std::sync::atomic::AtomicI64,
}

impl Default for MemoryAttachmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self {
            attachments: RwLock::new(Vec::new()),
            next_id: std::sync::atomic::AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn create(&self, attachment: &mut Attachment) -> AttachmentResult<Id> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        attachment.id = Some(id);

        let mut attachments = self.attachments.write().await;
        attachments.push(attachment.clone());

        Ok(id)
    }

    async fn get(&self, id: Id) -> AttachmentResult<Option<Attachment>> {
        let attachments = self.attachments.read().await;
        Ok(attachments.iter().find(|a| a.id == Some(id)).cloned())
    }

    async fn get_for_owner(&self, owner: &EntityRef) -> AttachmentResult<Vec<Attachment>> {
        let attachments = self.attachments.read().await;
        Ok(attachments
            .iter()
            .filter(|a| a.belongs_to(owner))
            .cloned()
            .collect())
    }

    async fn update(&self, attachment: &Attachment) -> AttachmentResult<()> {
        let mut attachments = self.attachments.write().await;
        match attachments.iter().position(|a| a.id == attachment.id) {
            Some(pos) => {
                attachments[pos] = attachment.clone();
                Ok(())
            }
            None => Err(AttachmentError::NotFound(attachment.id.unwrap_or_default())),
        }
    }

    async fn delete(&self, id: Id) -> AttachmentResult<()> {
        let mut attachments = self.attachments.write().await;
        attachments.retain(|a| a.id != Some(id));
        Ok(())
    }
}

/// Attachment service
pub struct AttachmentService<St: AttachmentStore, S: Storage> {
    store: Arc<St>,
    storage: Arc<S>,
    sniffer: Arc<dyn MimeSniffer>,
    contract: AttachmentContract,
    ledger: Option<Arc<VersionLedger>>,
    actor: Option<String>,
    config: ImportableConfig,
}

impl<St: AttachmentStore, S: Storage> AttachmentService<St, S> {
    pub fn new(
        store: Arc<St>,
        storage: Arc<S>,
        sniffer: Arc<dyn MimeSniffer>,
        resolver: Arc<dyn TypeResolver>,
        config: ImportableConfig,
    ) -> Self {
        Self {
            store,
            storage,
            sniffer,
            contract: AttachmentContract::new(resolver),
            ledger: None,
            actor: None,
            config,
        }
    }

    /// Record versions through `ledger` (only while versioning is enabled)
    pub fn with_ledger(mut self, ledger: Arc<VersionLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Attribute recorded versions to `actor`
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn config(&self) -> &ImportableConfig {
        &self.config
    }

    fn versioning(&self) -> Option<&VersionLedger> {
        self.ledger
            .as_deref()
            .filter(|_| self.config.versioning.enabled)
    }

    /// Build and validate an unsaved attachment.
    ///
    /// Failures come back as [`AttachmentError::Invalid`] with per-field
    /// messages.
    pub fn build(&self, params: AttachParams, data: &[u8]) -> AttachmentResult<Attachment> {
        let mut attachment = Attachment::new(
            params.file_name,
            params.content_type,
            params.file_size.unwrap_or(data.len() as i64),
        );
        attachment.owner_type = params.owner_type;
        attachment.owner_id = params.owner_id;
        attachment.file_modified_at = params.modified_at;

        self.check(&attachment, data)?;
        Ok(attachment)
    }

    fn check(&self, attachment: &Attachment, data: &[u8]) -> Result<(), ValidationErrors> {
        let mut errors = match self.contract.validate(attachment) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if data.is_empty() && !errors.has_message("file", "can't be blank") {
            errors.add("file", "can't be blank");
        }
        errors.into_result()
    }

    /// Validate, store and persist a new attachment.
    ///
    /// A failure after the record is created removes both the record and the
    /// blob again.
    #[instrument(skip(self, params, data), fields(file_name = %params.file_name, size = data.len()))]
    pub async fn attach(&self, params: AttachParams, data: Bytes) -> AttachmentResult<Attachment> {
        let mut attachment = self.build(params, &data)?;
        attachment.file_revision = if self.versioning().is_some() { 1 } else { 0 };

        let id = self.store.create(&mut attachment).await?;
        let key = self.render(&self.config.attachments.active_template().path, &attachment, id);

        if let Err(e) = self.persist_new(&mut attachment, &key, data).await {
            warn!(id = id, key = %key, error = %e, "Attachment not saved, removing record");
            self.discard(id, &key).await;
            return Err(e);
        }

        info!(
            id = id,
            owner = ?attachment.owner(),
            storage = self.storage.name(),
            "Attachment created"
        );

        Ok(attachment)
    }

    async fn persist_new(
        &self,
        attachment: &mut Attachment,
        key: &str,
        data: Bytes,
    ) -> AttachmentResult<()> {
        let blob = self.storage.put(key, data).await?;
        attachment.digest = Some(blob.digest);
        self.store.update(attachment).await?;

        self.record(
            attachment,
            VersionEvent::Create,
            Some(&Changeset::compute(
                &Snapshot::new(),
                &attachment.to_snapshot(),
                IGNORED_ATTRIBUTES,
            )),
        )
        .await
    }

    /// Replace the stored file, keeping the owner
    #[instrument(skip(self, params, data), fields(file_name = %params.file_name))]
    pub async fn replace_file(
        &self,
        id: Id,
        params: AttachParams,
        data: Bytes,
    ) -> AttachmentResult<Attachment> {
        let before = self.find(id).await?;

        let mut attachment = before.clone();
        attachment.file_size = params.file_size.unwrap_or(data.len() as i64);
        attachment.file_name = params.file_name;
        attachment.content_type = params.content_type;
        attachment.file_modified_at = params.modified_at;
        self.check(&attachment, &data)?;
        self.check_recordable(&attachment)?;

        attachment.file_revision = self.next_revision(&attachment).await?;
        attachment.updated_at = Utc::now();

        let template = self.config.attachments.active_template();
        let old_key = self.render(&template.path, &before, id);
        let key = self.render(&template.path, &attachment, id);

        let blob = self.storage.put(&key, data).await?;
        attachment.digest = Some(blob.digest);

        if let Err(e) = self.commit_update(&before, &attachment).await {
            // only a newly rendered key is safe to drop
            if key != old_key {
                self.remove_blob(&key).await;
            }
            return Err(e);
        }

        // without :revision in the path no history points at the old key
        if key != old_key && !template.path.contains(":revision") {
            self.remove_blob(&old_key).await;
        }

        info!(id = id, revision = attachment.file_revision, "Attachment file replaced");

        Ok(attachment)
    }

    /// Bind an attachment to an owner
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn attach_to(&self, id: Id, owner: &EntityRef) -> AttachmentResult<Attachment> {
        let before = self.find(id).await?;

        let mut attachment = before.clone().for_owner(owner);
        self.contract.validate(&attachment)?;
        self.check_recordable(&attachment)?;
        attachment.updated_at = Utc::now();

        self.commit_update(&before, &attachment).await?;

        info!(id = id, "Attachment attached to owner");
        Ok(attachment)
    }

    /// Unset the owner link on every attachment of a deleted owner
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn nullify_owner(&self, owner: &EntityRef) -> AttachmentResult<usize> {
        let attachments = self.store.get_for_owner(owner).await?;
        let count = attachments.len();

        for before in attachments {
            let mut attachment = before.clone();
            attachment.owner_type = None;
            attachment.owner_id = None;
            attachment.updated_at = Utc::now();

            self.check_recordable(&attachment)?;
            self.commit_update(&before, &attachment).await?;
        }

        info!(count = count, "Owner links nullified");
        Ok(count)
    }

    /// Delete the record. The blob stays so historical paths keep resolving.
    #[instrument(skip(self))]
    pub async fn destroy(&self, id: Id) -> AttachmentResult<Attachment> {
        let attachment = self.find(id).await?;
        self.check_recordable(&attachment)?;

        self.store.delete(id).await?;
        self.record(&attachment, VersionEvent::Destroy, None).await?;

        info!(id = id, file_name = %attachment.file_name, "Attachment destroyed");
        Ok(attachment)
    }

    /// Get an attachment by ID
    pub async fn find(&self, id: Id) -> AttachmentResult<Attachment> {
        self.store
            .get(id)
            .await?
            .ok_or(AttachmentError::NotFound(id))
    }

    pub async fn find_for_owner(&self, owner: &EntityRef) -> AttachmentResult<Vec<Attachment>> {
        self.store.get_for_owner(owner).await
    }

    /// The attachment as recorded by version `version_id`
    pub async fn version_at(&self, version_id: Id) -> AttachmentResult<Attachment> {
        let ledger = self
            .ledger
            .as_deref()
            .ok_or(AttachmentError::VersioningDisabled)?;

        let version = ledger.find(version_id).await?;
        if version.item_type != Attachment::ITEM_TYPE {
            return Err(AttachmentError::ForeignVersion(version_id));
        }

        let snapshot = version.to_structured_object()?;
        Ok(Attachment::from_snapshot(&snapshot, version_id)?)
    }

    /// Revision of `attachment`: its version count when live, the index of
    /// the version it was rebuilt from otherwise
    pub async fn revision_number(&self, attachment: &Attachment) -> AttachmentResult<usize> {
        let (Some(ledger), Some(item)) = (self.ledger.as_deref(), attachment.item_ref()) else {
            return Ok(0);
        };

        match attachment.reified_from {
            None => Ok(ledger.revision_number(&item, None).await?),
            Some(version_id) => {
                let version = ledger.find(version_id).await?;
                Ok(ledger.revision_number(&item, Some(&version)).await?)
            }
        }
    }

    /// MIME type of the attachment.
    ///
    /// Unsaved attachments report the declared content type. Saved ones are
    /// sniffed from the stored bytes; `None` when the blob cannot be read.
    #[instrument(skip(self, attachment), fields(id = ?attachment.id))]
    pub async fn mime_type(&self, attachment: &Attachment) -> Option<String> {
        let Some(key) = self.storage_key(attachment) else {
            return Some(essence(&attachment.content_type));
        };

        match self.storage.get(&key).await {
            Ok(bytes) => {
                let mime = self.sniffer.sniff_named(&bytes, &attachment.file_name);
                debug!(key = %key, mime = %mime, "Sniffed stored file");
                Some(mime)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Stored file unreadable, mime type unknown");
                None
            }
        }
    }

    /// Load the stored bytes
    pub async fn read(&self, attachment: &Attachment) -> AttachmentResult<Bytes> {
        let id = attachment.id.ok_or(AttachmentError::NotFound(0))?;
        let key = self.render(&self.config.attachments.active_template().path, attachment, id);
        Ok(self.storage.get(&key).await?)
    }

    /// Storage key of a saved attachment
    pub fn storage_key(&self, attachment: &Attachment) -> Option<String> {
        attachment
            .id
            .map(|id| self.render(&self.config.attachments.active_template().path, attachment, id))
    }

    /// Public URL of a saved attachment
    pub fn url(&self, attachment: &Attachment) -> Option<String> {
        attachment
            .id
            .map(|id| self.render(&self.config.attachments.active_template().url, attachment, id))
    }

    fn render(&self, template: &str, attachment: &Attachment, id: Id) -> String {
        interpolate(
            template,
            &PathParams {
                id,
                revision: attachment.file_revision.max(0) as usize,
                file_name: &attachment.file_name,
            },
        )
    }

    /// Revision the next recorded version will bring the attachment to
    async fn next_revision(&self, attachment: &Attachment) -> AttachmentResult<i64> {
        match (self.versioning(), attachment.item_ref()) {
            (Some(ledger), Some(item)) => {
                Ok(ledger.revision_number(&item, None).await? as i64 + 1)
            }
            _ => Ok(0),
        }
    }

    /// Write `after` and record the update; the row is put back to
    /// `before` when the version cannot be recorded
    async fn commit_update(&self, before: &Attachment, after: &Attachment) -> AttachmentResult<()> {
        self.store.update(after).await?;

        let changes = Changeset::compute(
            &before.to_snapshot(),
            &after.to_snapshot(),
            IGNORED_ATTRIBUTES,
        );
        if let Err(e) = self.record(after, VersionEvent::Update, Some(&changes)).await {
            if let Err(restore) = self.store.update(before).await {
                warn!(id = ?before.id, error = %restore, "Failed to restore attachment");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Reject changes the ledger would refuse before anything is written
    fn check_recordable(&self, attachment: &Attachment) -> AttachmentResult<()> {
        if let (Some(ledger), Some(item)) = (self.versioning(), attachment.item_ref()) {
            ledger.validate_item(&item).map_err(VersionError::from)?;
        }
        Ok(())
    }

    async fn discard(&self, id: Id, key: &str) {
        if let Err(e) = self.store.delete(id).await {
            warn!(id = id, error = %e, "Failed to remove attachment record");
        }
        self.remove_blob(key).await;
    }

    async fn remove_blob(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            warn!(key = %key, error = %e, "Failed to remove blob");
        }
    }

    async fn record(
        &self,
        attachment: &Attachment,
        event: VersionEvent,
        changes: Option<&Changeset>,
    ) -> AttachmentResult<()> {
        let (Some(ledger), Some(item)) = (self.versioning(), attachment.item_ref()) else {
            return Ok(());
        };

        ledger
            .record(
                &item,
                event,
                self.actor.as_deref(),
                &attachment.to_snapshot(),
                changes,
            )
            .await?;
        Ok(())
    }
}
