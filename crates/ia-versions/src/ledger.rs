//! Version Ledger
//!
//! Records create/update/destroy events of versioned entities and answers
//! history queries over them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ia_core::validation::is_alpha_numeric_punctuation;
use ia_core::{EntityRef, Id, TypeResolver, ValidationErrors, VersioningConfig};
use tracing::{debug, instrument};

use crate::error::{VersionError, VersionResult};
use crate::snapshot::{Changeset, Snapshot};
use crate::store::VersionStore;
use crate::version::{Version, VersionEvent};

/// Append-only ledger of entity versions
pub struct VersionLedger {
    store: Arc<dyn VersionStore>,
    resolver: Arc<dyn TypeResolver>,
    config: VersioningConfig,
}

impl VersionLedger {
    pub fn new(
        store: Arc<dyn VersionStore>,
        resolver: Arc<dyn TypeResolver>,
        config: VersioningConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    /// Validate an item reference.
    ///
    /// Type names that no longer resolve are only rejected when
    /// `validate_item_type_constants` is on; otherwise dangling references
    /// are kept as history.
    pub fn validate_item(&self, item: &EntityRef) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !is_alpha_numeric_punctuation(&item.id) {
            errors.add("item_id", "is invalid. Only letters, numbers and punctuation are allowed");
        }

        if !is_alpha_numeric_punctuation(&item.type_name) {
            errors.add(
                "item_type",
                "is invalid. Only letters, numbers and punctuation are allowed",
            );
        } else if self.config.validate_item_type_constants
            && !self.resolver.is_known(&item.type_name)
        {
            errors.add("item_type", "unknown module or class");
        }

        errors.into_result()
    }

    /// Append a version for `item`.
    ///
    /// `snapshot` is stored as the version's `object`; `changes`, when given,
    /// as its `object_changes`.
    #[instrument(skip(self, snapshot, changes), fields(item = %item, event = %event))]
    pub async fn record(
        &self,
        item: &EntityRef,
        event: VersionEvent,
        actor: Option<&str>,
        snapshot: &Snapshot,
        changes: Option<&Changeset>,
    ) -> VersionResult<Version> {
        self.validate_item(item)?;

        let mut version = Version::new(item, event);
        version.actor = actor.map(str::to_string);
        version.object = Some(snapshot.to_yaml()?);
        version.object_changes = match changes {
            Some(c) if !c.is_empty() => Some(c.to_yaml()?),
            _ => None,
        };

        let id = self.store.append(&version).await?;
        version.id = Some(id);

        debug!(version_id = id, actor = ?version.actor, "Version recorded");

        Ok(version)
    }

    /// Get a version by ID
    pub async fn find(&self, id: Id) -> VersionResult<Version> {
        self.store.get(id).await?.ok_or(VersionError::NotFound(id))
    }

    /// All versions of `item`, oldest first
    pub async fn history(&self, item: &EntityRef) -> VersionResult<Vec<Version>> {
        self.store.for_item(item).await
    }

    /// Versions whose serialized snapshot contains `pattern` (case-sensitive)
    pub async fn object_has(&self, pattern: &str) -> VersionResult<Vec<Version>> {
        self.store.object_contains(pattern).await
    }

    /// Versions created within the last `duration`.
    ///
    /// Durations reaching past the earliest representable time match every
    /// version.
    pub async fn in_the_last(&self, duration: Duration) -> VersionResult<Vec<Version>> {
        let since = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|span| Utc::now().checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.store.created_after(since).await
    }

    /// Revision number of `item`.
    ///
    /// For the live entity (`at == None`) this is the number of versions; for
    /// a historical state it is the zero-based position of `at` in the item's
    /// history. Items without versions are at revision 0.
    pub async fn revision_number(
        &self,
        item: &EntityRef,
        at: Option<&Version>,
    ) -> VersionResult<usize> {
        match at {
            None => self.store.count_for_item(item).await,
            Some(version) => {
                let history = self.store.for_item(item).await?;
                Ok(history
                    .iter()
                    .position(|v| v.id.is_some() && v.id == version.id)
                    .unwrap_or(0))
            }
        }
    }

    /// Rebuild the attributes stored with version `id`
    pub async fn reify(&self, id: Id) -> VersionResult<Snapshot> {
        self.find(id).await?.to_structured_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryVersionStore;
    use ia_core::TypeRegistry;
    use serde_json::json;

    fn ledger_with(config: VersioningConfig) -> (Arc<MemoryVersionStore>, VersionLedger) {
        let store = Arc::new(MemoryVersionStore::new());
        let registry = Arc::new(TypeRegistry::with_types(["Order", "Billing::Invoice"]));
        let ledger = VersionLedger::new(store.clone(), registry, config);
        (store, ledger)
    }

    fn ledger() -> (Arc<MemoryVersionStore>, VersionLedger) {
        ledger_with(VersioningConfig::default())
    }

    fn strict() -> VersioningConfig {
        VersioningConfig {
            enabled: true,
            validate_item_type_constants: true,
        }
    }

    #[tokio::test]
    async fn test_record_update() {
        let (_, ledger) = ledger();
        let order = EntityRef::new("Order", "7");

        let snapshot = Snapshot::new().with("status", "old");
        let changes = Changeset::new().with("status", "old", "new");

        let version = ledger
            .record(&order, VersionEvent::Update, Some("admin"), &snapshot, Some(&changes))
            .await
            .unwrap();

        assert!(version.id.is_some());
        assert_eq!(version.event, VersionEvent::Update);
        assert_eq!(version.actor.as_deref(), Some("admin"));
        assert_eq!(version.changeset().unwrap(), changes);

        let recent = ledger.in_the_last(Duration::from_secs(3600)).await.unwrap();
        assert!(recent.iter().any(|v| v.id == version.id));
    }

    #[tokio::test]
    async fn test_in_the_last_excludes_older_versions() {
        let (_, ledger) = ledger();
        let order = EntityRef::new("Order", "7");

        let version = ledger
            .record(
                &order,
                VersionEvent::Update,
                None,
                &Snapshot::new().with("status", "old"),
                Some(&Changeset::new().with("status", "old", "new")),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;

        let none = ledger.in_the_last(Duration::from_secs(0)).await.unwrap();
        assert!(none.iter().all(|v| v.id != version.id));

        let hour = ledger.in_the_last(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(hour.len(), 1);
    }

    #[tokio::test]
    async fn test_in_the_last_with_backdated_version() {
        let (store, ledger) = ledger();
        let order = EntityRef::new("Order", "1");
        let snapshot = Snapshot::new().with("status", "open");

        let old = ledger
            .record(&order, VersionEvent::Create, None, &snapshot, None)
            .await
            .unwrap();
        let fresh = ledger
            .record(&order, VersionEvent::Update, None, &snapshot, None)
            .await
            .unwrap();
        store.backdate(old.id.unwrap(), chrono::Duration::days(2)).await;

        let recent = ledger.in_the_last(Duration::from_secs(86400)).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, fresh.id);
    }

    #[tokio::test]
    async fn test_structured_object_round_trip() {
        let (_, ledger) = ledger();
        let order = EntityRef::new("Order", 7);
        let snapshot = Snapshot::new()
            .with("id", 7)
            .with("status", "shipped")
            .with("lines", json!([{"sku": "A-1", "qty": 2}]));

        let version = ledger
            .record(&order, VersionEvent::Destroy, None, &snapshot, None)
            .await
            .unwrap();

        assert_eq!(version.to_structured_object().unwrap(), snapshot);
        assert_eq!(ledger.reify(version.id.unwrap()).await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_reify_corrupt_snapshot_fails() {
        let (store, ledger) = ledger();
        let order = EntityRef::new("Order", 7);

        let version = ledger
            .record(&order, VersionEvent::Destroy, None, &Snapshot::new().with("a", 1), None)
            .await
            .unwrap();
        store.corrupt(version.id.unwrap(), "a: [1, 2").await;

        assert!(matches!(
            ledger.reify(version.id.unwrap()).await,
            Err(VersionError::MalformedSnapshot(_))
        ));
    }

    #[tokio::test]
    async fn test_object_has_matches_substring_case_sensitively() {
        let (_, ledger) = ledger();

        let shipped = ledger
            .record(
                &EntityRef::new("Order", 1),
                VersionEvent::Update,
                None,
                &Snapshot::new().with("status", "Shipped"),
                None,
            )
            .await
            .unwrap();
        ledger
            .record(
                &EntityRef::new("Order", 2),
                VersionEvent::Update,
                None,
                &Snapshot::new().with("status", "pending"),
                None,
            )
            .await
            .unwrap();

        let found = ledger.object_has("Shipped").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, shipped.id);

        assert!(ledger.object_has("shipped").await.unwrap().is_empty());
        assert_eq!(ledger.object_has("status").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_revision_number() {
        let (_, ledger) = ledger();
        let order = EntityRef::new("Order", 7);
        let snapshot = Snapshot::new().with("status", "open");

        assert_eq!(ledger.revision_number(&order, None).await.unwrap(), 0);

        let first = ledger
            .record(&order, VersionEvent::Create, None, &snapshot, None)
            .await
            .unwrap();
        let second = ledger
            .record(&order, VersionEvent::Update, None, &snapshot, None)
            .await
            .unwrap();
        ledger
            .record(&EntityRef::new("Order", 8), VersionEvent::Create, None, &snapshot, None)
            .await
            .unwrap();

        assert_eq!(ledger.revision_number(&order, None).await.unwrap(), 2);
        assert_eq!(ledger.revision_number(&order, None).await.unwrap(), 2);
        assert_eq!(ledger.revision_number(&order, Some(&first)).await.unwrap(), 0);
        assert_eq!(ledger.revision_number(&order, Some(&second)).await.unwrap(), 1);

        let history = ledger.history(&order).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event, VersionEvent::Create);
    }

    #[tokio::test]
    async fn test_invalid_item_reference_is_rejected() {
        let (_, ledger) = ledger();
        let snapshot = Snapshot::new();

        let result = ledger
            .record(&EntityRef::new("Order Item", 1), VersionEvent::Create, None, &snapshot, None)
            .await;
        match result {
            Err(VersionError::Validation(errors)) => assert!(errors.has_error("item_type")),
            other => panic!("expected validation error, got {:?}", other),
        }

        let result = ledger
            .record(&EntityRef::new("Order", "7\n"), VersionEvent::Create, None, &snapshot, None)
            .await;
        assert!(matches!(result, Err(VersionError::Validation(_))));
    }

    #[tokio::test]
    async fn test_dangling_item_type_tolerated_unless_strict() {
        let snapshot = Snapshot::new().with("a", 1);
        let removed = EntityRef::new("RetiredThing", 1);

        let (_, lenient) = ledger();
        assert!(lenient
            .record(&removed, VersionEvent::Destroy, None, &snapshot, None)
            .await
            .is_ok());

        let (_, strict) = ledger_with(strict());
        match strict
            .record(&removed, VersionEvent::Destroy, None, &snapshot, None)
            .await
        {
            Err(VersionError::Validation(errors)) => {
                assert_eq!(
                    errors.get("item_type"),
                    Some(&vec!["unknown module or class".to_string()])
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        assert!(strict
            .record(&EntityRef::new("Billing::Invoice", 3), VersionEvent::Create, None, &snapshot, None)
            .await
            .is_ok());
        assert!(strict
            .record(&EntityRef::new("Billing::Refund", 3), VersionEvent::Create, None, &snapshot, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_in_the_last_with_huge_duration_matches_everything() {
        let (_, ledger) = ledger();
        ledger
            .record(&EntityRef::new("Order", 1), VersionEvent::Create, None, &Snapshot::new(), None)
            .await
            .unwrap();

        let all = ledger
            .in_the_last(Duration::from_secs(10_000_000_000_000))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        let all = ledger.in_the_last(Duration::MAX).await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
