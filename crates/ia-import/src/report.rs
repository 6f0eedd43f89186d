//! Per-pass import bookkeeping
//!
//! Scratch state for a single import pass: which expected columns were
//! absent and why individual rows failed. Never persisted.

use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub columns_not_found: Vec<String>,
    pub row_errors: Vec<String>,
    pub rows_imported: usize,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every `expected` column missing from `header`.
    ///
    /// Header cells are compared after trimming. Returns true when all
    /// columns are present.
    pub fn check_header<E, H>(&mut self, expected: &[E], header: &[H]) -> bool
    where
        E: AsRef<str>,
        H: AsRef<str>,
    {
        for column in expected {
            let column = column.as_ref();
            let present = header.iter().any(|h| h.as_ref().trim() == column);
            if !present && !self.columns_not_found.iter().any(|c| c == column) {
                self.columns_not_found.push(column.to_string());
            }
        }
        self.columns_not_found.is_empty()
    }

    pub fn row_imported(&mut self) {
        self.rows_imported += 1;
    }

    /// Record a failed row; `reason` is kept verbatim
    pub fn row_failed(&mut self, row: usize, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(row = row, reason = %reason, "Row failed to import");
        self.row_errors.push(reason);
    }

    pub fn has_failures(&self) -> bool {
        !self.columns_not_found.is_empty() || !self.row_errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_header() {
        let mut report = ImportReport::new();

        assert!(report.check_header(&["sku", "qty"], &["sku ", "qty", "note"]));
        assert!(!report.check_header(&["sku", "total"], &["sku", "qty"]));
        assert!(!report.check_header(&["total"], &["sku"]));

        assert_eq!(report.columns_not_found, vec!["total"]);
        assert!(report.has_failures());
    }

    #[test]
    fn test_rows() {
        let mut report = ImportReport::new();
        report.row_imported();
        report.row_failed(2, "total must be numeric");
        report.row_imported();

        assert_eq!(report.rows_imported, 2);
        assert_eq!(report.row_errors, vec!["total must be numeric"]);
        assert!(report.has_failures());
    }
}
