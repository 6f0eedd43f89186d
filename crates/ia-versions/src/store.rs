//! Version persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ia_core::{EntityRef, Id};
use tokio::sync::RwLock;

use crate::error::VersionResult;
use crate::version::Version;

/// Version store trait for persistence.
///
/// Stores are append-only: there is no update operation, and every query
/// returns versions in append (id) order.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Append a version, returning its assigned id
    async fn append(&self, version: &Version) -> VersionResult<Id>;

    /// Get a version by ID
    async fn get(&self, id: Id) -> VersionResult<Option<Version>>;

    /// All versions of one entity
    async fn for_item(&self, item: &EntityRef) -> VersionResult<Vec<Version>>;

    /// Number of versions of one entity
    async fn count_for_item(&self, item: &EntityRef) -> VersionResult<usize>;

    /// Versions whose snapshot contains `pattern`
    async fn object_contains(&self, pattern: &str) -> VersionResult<Vec<Version>>;

    /// Versions created strictly after `since`
    async fn created_after(&self, since: DateTime<Utc>) -> VersionResult<Vec<Version>>;
}

/// In-memory version store for testing
pub struct MemoryVersionStore {
    versions: RwLock<Vec<Version>>,
    next_id: std::sync::atomic::AtomicI64,
}

impl Default for MemoryVersionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self {
            versions: RwLock::new(Vec::new()),
            next_id: std::sync::atomic::AtomicI64::new(1),
        }
    }

    /// Overwrite a stored snapshot, simulating corruption at rest
    #[cfg(test)]
    pub(crate) async fn corrupt(&self, id: Id, object: &str) {
        let mut versions = self.versions.write().await;
        if let Some(v) = versions.iter_mut().find(|v| v.id == Some(id)) {
            v.object = Some(object.to_string());
        }
    }

    /// Shift a version's timestamp into the past
    #[cfg(test)]
    pub(crate) async fn backdate(&self, id: Id, by: chrono::Duration) {
        let mut versions = self.versions.write().await;
        if let Some(v) = versions.iter_mut().find(|v| v.id == Some(id)) {
            v.created_at = v.created_at - by;
        }
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn append(&self, version: &Version) -> VersionResult<Id> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut version = version.clone();
        version.id = Some(id);

        let mut versions = self.versions.write().await;
        versions.push(version);

        Ok(id)
    }

    async fn get(&self, id: Id) -> VersionResult<Option<Version>> {
        let versions = self.versions.read().await;
        Ok(versions.iter().find(|v| v.id == Some(id)).cloned())
    }

    async fn for_item(&self, item: &EntityRef) -> VersionResult<Vec<Version>> {
        let versions = self.versions.read().await;
        Ok(versions.iter().filter(|v| v.is_for(item)).cloned().collect())
    }

    async fn count_for_item(&self, item: &EntityRef) -> VersionResult<usize> {
        let versions = self.versions.read().await;
        Ok(versions.iter().filter(|v| v.is_for(item)).count())
    }

    async fn object_contains(&self, pattern: &str) -> VersionResult<Vec<Version>> {
        let versions = self.versions.read().await;
        Ok(versions
            .iter()
            .filter(|v| v.object_contains(pattern))
            .cloned()
            .collect())
    }

    async fn created_after(&self, since: DateTime<Utc>) -> VersionResult<Vec<Version>> {
        let versions = self.versions.read().await;
        Ok(versions
            .iter()
            .filter(|v| v.created_at > since)
            .cloned()
            .collect())
    }
}
