//! # ia-attachments
//!
//! File attachments bound to a polymorphic owner.
//!
//! - Metadata validation (charset, size, owner type resolution)
//! - Blob storage backends (local disk, in-memory)
//! - Revision-aware URL and storage-key templates
//! - Byte-level MIME detection for persisted files
//! - Version recording through [`ia_versions::VersionLedger`]

pub mod contract;
pub mod model;
pub mod path;
pub mod service;
pub mod sniffer;
pub mod storage;

pub use contract::AttachmentContract;
pub use model::{AttachParams, Attachment};
pub use service::{
    AttachmentError, AttachmentResult, AttachmentService, AttachmentStore, MemoryAttachmentStore,
};
pub use sniffer::{MimeSniffer, SignatureSniffer};
pub use storage::{LocalStorage, MemoryStorage, Storage, StorageError, StorageResult, StoredBlob};
