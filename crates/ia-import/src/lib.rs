//! # ia-import
//!
//! Spreadsheet import for owners that carry an attachment.
//!
//! An owner type declares the columns it expects and the association rows go
//! into ([`ImportableOptions`]), and supplies an [`ImportStrategy`] that
//! parses the file and imports its rows. The [`Importer`] runs the strategy
//! once, right after the owner is created, and records missing columns and
//! failed rows as errors on both the owner and its attachment.

pub mod error;
pub mod importer;
pub mod options;
pub mod owner;
pub mod report;
pub mod strategy;

pub use error::{ImportError, ImportResult};
pub use importer::{ImportOutcome, ImportState, Importer, RowsOutcome, SaveEvent};
pub use options::{ImportableOptions, DEFAULT_IMPORT_METHOD};
pub use owner::{ImportableOwner, INVALID_ATTACHMENT};
pub use report::ImportReport;
pub use strategy::{ImportSource, ImportStrategy, ImportTarget, ParsedSheet};
