//! # ia-db
//!
//! PostgreSQL persistence for the attachment and version stores, using SQLx.

pub mod attachments;
pub mod error;
pub mod pool;
pub mod schema;
pub mod versions;

pub use attachments::{AttachmentRow, PgAttachmentStore};
pub use error::{RepositoryError, RepositoryResult};
pub use pool::{Database, DatabaseConfig};
pub use schema::{ensure_schema, SCHEMA};
pub use versions::{PgVersionStore, VersionRow};
