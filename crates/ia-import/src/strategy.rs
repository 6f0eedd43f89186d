//! Import strategy extension point
//!
//! Owner types supply the parsing and row-import logic. Both default methods
//! fail with [`ImportError::NotImplemented`] so a missing override is loud.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ImportError, ImportResult};
use crate::report::ImportReport;

/// The stored file handed to a strategy
#[derive(Debug, Clone)]
pub struct ImportSource {
    pub file_name: String,
    /// Sniffed MIME type, `None` when detection failed
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

/// A spreadsheet reduced to a header and data rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedSheet {
    /// Index of `column` in the header
    pub fn column(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == column)
    }
}

/// Where parsed rows go
#[derive(Debug, Clone, Copy)]
pub struct ImportTarget<'a> {
    pub expected_columns: &'a [String],
    pub import_into: &'a str,
    pub import_method: &'a str,
}

#[async_trait]
pub trait ImportStrategy: Send + Sync {
    /// Turn the stored file into rows
    async fn import_attachment(&self, _source: &ImportSource) -> ImportResult<ParsedSheet> {
        Err(ImportError::NotImplemented("import_attachment"))
    }

    /// Import parsed rows into `target`, reporting missing columns and
    /// per-row failures on `report`
    async fn import_rows(
        &self,
        _sheet: &ParsedSheet,
        _target: &ImportTarget<'_>,
        _report: &mut ImportReport,
    ) -> ImportResult<()> {
        Err(ImportError::NotImplemented("import_rows"))
    }
}
