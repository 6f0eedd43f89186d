//! # ia-versions
//!
//! Append-only version history for versioned entities.
//!
//! Every create, update and destroy of a versioned entity appends one
//! [`Version`] carrying a YAML snapshot of the entity and, for updates, the
//! changed attributes. Versions are never edited after they are written.

pub mod error;
pub mod ledger;
pub mod snapshot;
pub mod store;
pub mod version;

pub use error::{VersionError, VersionResult};
pub use ledger::VersionLedger;
pub use snapshot::{Changeset, Snapshot};
pub use store::{MemoryVersionStore, VersionStore};
pub use version::{Version, VersionEvent};
