//! Import orchestration
//!
//! Runs one import pass over an owner's attachment right after the owner is
//! created:
//!
//! `Idle -> AttachmentBound -> Sniffed -> RowsImported -> Reported`
//!
//! Owners without an attachment stop at `Idle`. Updates never import.

use std::fmt;
use std::sync::Arc;

use ia_attachments::{AttachmentService, AttachmentStore, Storage};
use tracing::{debug, info, instrument, warn};

use crate::error::{ImportError, ImportResult};
use crate::options::ImportableOptions;
use crate::owner::ImportableOwner;
use crate::report::ImportReport;
use crate::strategy::{ImportSource, ImportStrategy, ImportTarget};

/// Which save just happened to the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveEvent {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowsOutcome {
    Success,
    PartialFailure,
}

/// Import pass states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Idle,
    AttachmentBound,
    Sniffed,
    RowsImported(RowsOutcome),
    Reported(RowsOutcome),
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportState::Idle => write!(f, "idle"),
            ImportState::AttachmentBound => write!(f, "attachment_bound"),
            ImportState::Sniffed => write!(f, "sniffed"),
            ImportState::RowsImported(RowsOutcome::Success) => write!(f, "rows_imported"),
            ImportState::RowsImported(RowsOutcome::PartialFailure) => {
                write!(f, "rows_imported_with_failures")
            }
            ImportState::Reported(RowsOutcome::Success) => write!(f, "reported"),
            ImportState::Reported(RowsOutcome::PartialFailure) => {
                write!(f, "reported_with_failures")
            }
        }
    }
}

/// Result of one import pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub state: ImportState,
    pub rows_imported: usize,
    pub columns_not_found: Vec<String>,
    pub row_errors: Vec<String>,
}

impl ImportOutcome {
    fn skipped() -> Self {
        Self {
            state: ImportState::Idle,
            rows_imported: 0,
            columns_not_found: Vec::new(),
            row_errors: Vec::new(),
        }
    }

    fn reported(report: ImportReport) -> Self {
        let outcome = if report.has_failures() {
            RowsOutcome::PartialFailure
        } else {
            RowsOutcome::Success
        };
        Self {
            state: ImportState::Reported(outcome),
            rows_imported: report.rows_imported,
            columns_not_found: report.columns_not_found,
            row_errors: report.row_errors,
        }
    }

    /// True when no import ran
    pub fn is_skipped(&self) -> bool {
        self.state == ImportState::Idle
    }

    pub fn is_success(&self) -> bool {
        self.state == ImportState::Reported(RowsOutcome::Success)
    }
}

/// Imports spreadsheet attachments for one owner type
pub struct Importer<St: AttachmentStore, S: Storage> {
    attachments: Arc<AttachmentService<St, S>>,
    strategy: Arc<dyn ImportStrategy>,
    options: ImportableOptions,
}

impl<St: AttachmentStore, S: Storage> Importer<St, S> {
    pub fn new(
        attachments: Arc<AttachmentService<St, S>>,
        strategy: Arc<dyn ImportStrategy>,
        options: ImportableOptions,
    ) -> Self {
        Self {
            attachments,
            strategy,
            options,
        }
    }

    pub fn options(&self) -> &ImportableOptions {
        &self.options
    }

    /// Save hook: imports on creation only
    pub async fn after_save<O: ImportableOwner>(
        &self,
        owner: &mut O,
        event: SaveEvent,
    ) -> ImportResult<ImportOutcome> {
        match event {
            SaveEvent::Created => self.after_create(owner).await,
            SaveEvent::Updated => Ok(ImportOutcome::skipped()),
        }
    }

    /// Import the owner's attachment and report failures on both records
    #[instrument(skip(self, owner), fields(owner = ?owner.owner_ref(), into = %self.options.import_into))]
    pub async fn after_create<O: ImportableOwner>(
        &self,
        owner: &mut O,
    ) -> ImportResult<ImportOutcome> {
        let Some(attachment) = owner.attachment().cloned() else {
            debug!("No attachment bound, nothing to import");
            return Ok(ImportOutcome::skipped());
        };
        if attachment.id.is_none() {
            return Err(ImportError::UnsavedAttachment);
        }
        let mut state = ImportState::AttachmentBound;
        debug!(state = %state, attachment_id = ?attachment.id, "Attachment bound");

        let source = ImportSource {
            mime_type: self.attachments.mime_type(&attachment).await,
            bytes: self.attachments.read(&attachment).await?,
            file_name: attachment.file_name.clone(),
        };
        state = ImportState::Sniffed;
        debug!(state = %state, mime = ?source.mime_type, "Attachment sniffed");

        let mut report = ImportReport::new();
        let target = ImportTarget {
            expected_columns: &self.options.spreadsheet_columns,
            import_into: &self.options.import_into,
            import_method: &self.options.import_method,
        };

        let imported = match self.strategy.import_attachment(&source).await {
            Ok(sheet) => self.strategy.import_rows(&sheet, &target, &mut report).await,
            Err(e) => Err(e),
        };

        match imported {
            Ok(()) => {}
            Err(ImportError::Parse(msg)) => {
                warn!(error = %msg, "Attachment could not be imported");
                owner.invalid_attachment_error(&msg);
                return Ok(ImportOutcome {
                    state: ImportState::Reported(RowsOutcome::PartialFailure),
                    rows_imported: report.rows_imported,
                    columns_not_found: report.columns_not_found,
                    row_errors: report.row_errors,
                });
            }
            Err(e) => return Err(e),
        }

        state = ImportState::RowsImported(if report.has_failures() {
            RowsOutcome::PartialFailure
        } else {
            RowsOutcome::Success
        });
        debug!(state = %state, rows = report.rows_imported, "Rows imported");

        Self::report_failures(owner, &report);

        let outcome = ImportOutcome::reported(report);
        info!(
            state = %outcome.state,
            rows = outcome.rows_imported,
            missing_columns = outcome.columns_not_found.len(),
            failed_rows = outcome.row_errors.len(),
            "Import finished"
        );

        Ok(outcome)
    }

    fn report_failures<O: ImportableOwner>(owner: &mut O, report: &ImportReport) {
        if !report.columns_not_found.is_empty() {
            owner.invalid_attachment_error(&format!(
                "column(s) not found: {}",
                report.columns_not_found.join(", ")
            ));
        }

        if !report.row_errors.is_empty() {
            owner.invalid_attachment_error(&format!(
                "failed to import {} record(s)",
                report.row_errors.len()
            ));
            if let Some(attachment) = owner.attachment_mut() {
                for row in &report.row_errors {
                    attachment.errors.add_base(row.clone());
                }
            }
        }
    }

    /// Public URL of the owner's attachment
    pub fn attachment_url<O: ImportableOwner>(&self, owner: &O) -> Option<String> {
        owner.attachment().and_then(|a| self.attachments.url(a))
    }
}
