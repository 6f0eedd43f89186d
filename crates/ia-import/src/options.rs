//! Per-owner-type import declaration

use crate::error::{ImportError, ImportResult};

/// Default strategy entry point
pub const DEFAULT_IMPORT_METHOD: &str = "import_rows";

/// What an importable owner type expects from its spreadsheets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportableOptions {
    /// Expected column names, in order
    pub spreadsheet_columns: Vec<String>,
    /// Association the rows are imported into
    pub import_into: String,
    /// Strategy entry point, passed through to the strategy
    pub import_method: String,
}

impl ImportableOptions {
    /// Declare an importable owner type.
    ///
    /// Fails when no columns or no target association are given.
    pub fn new<I, S>(spreadsheet_columns: I, import_into: impl Into<String>) -> ImportResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spreadsheet_columns: Vec<String> =
            spreadsheet_columns.into_iter().map(Into::into).collect();
        let import_into = import_into.into();

        if spreadsheet_columns.is_empty() {
            return Err(ImportError::InvalidOptions(
                "needs :spreadsheet_columns".to_string(),
            ));
        }
        if import_into.trim().is_empty() {
            return Err(ImportError::InvalidOptions("needs :import_into".to_string()));
        }

        Ok(Self {
            spreadsheet_columns,
            import_into,
            import_method: DEFAULT_IMPORT_METHOD.to_string(),
        })
    }

    pub fn import_method(mut self, method: impl Into<String>) -> Self {
        self.import_method = method.into();
        self
    }
}
