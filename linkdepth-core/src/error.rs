use linkdepth_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Seed input problems. Raised before any fetch starts.
    #[error("Input error: {0}")]
    Input(String),

    #[error("Failed to write {path}: {reason}")]
    Export { path: PathBuf, reason: String },

    #[error("Crawler error: {0}")]
    Scan(#[from] ScanError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn export(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CoreError::Export {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
