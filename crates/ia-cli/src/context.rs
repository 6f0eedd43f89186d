//! Service wiring shared by the commands

use std::sync::Arc;

use ia_attachments::{Attachment, AttachmentService, LocalStorage, SignatureSniffer};
use ia_core::{ImportableConfig, TypeRegistry};
use ia_db::{Database, DatabaseConfig, PgAttachmentStore, PgVersionStore};
use ia_versions::VersionLedger;
use tracing::info;

pub type CliAttachmentService = AttachmentService<PgAttachmentStore, LocalStorage>;

/// Connected services for one command run
pub struct Context {
    pub db: Database,
    pub config: ImportableConfig,
    pub registry: Arc<TypeRegistry>,
    pub ledger: Arc<VersionLedger>,
}

impl Context {
    /// Connect to the database and build the ledger.
    ///
    /// `owner_types` are registered so owner references to them validate.
    pub async fn connect(owner_types: &[&str]) -> anyhow::Result<Self> {
        let config = ImportableConfig::from_env()?;
        let db = Database::connect(&DatabaseConfig::from_env()).await?;
        info!("Connected to database");

        let registry = Arc::new(TypeRegistry::with_types(
            std::iter::once(Attachment::ITEM_TYPE).chain(owner_types.iter().copied()),
        ));
        let ledger = Arc::new(VersionLedger::new(
            Arc::new(PgVersionStore::new(db.pool().clone())),
            registry.clone(),
            config.versioning.clone(),
        ));

        Ok(Self {
            db,
            config,
            registry,
            ledger,
        })
    }

    pub fn attachments(&self) -> CliAttachmentService {
        let service = AttachmentService::new(
            Arc::new(PgAttachmentStore::new(self.db.pool().clone())),
            Arc::new(LocalStorage::new(&self.config.attachments.storage_root)),
            Arc::new(SignatureSniffer),
            self.registry.clone(),
            self.config.clone(),
        )
        .with_ledger(self.ledger.clone());

        match std::env::var("USER") {
            Ok(user) if !user.is_empty() => service.with_actor(user),
            _ => service,
        }
    }
}
