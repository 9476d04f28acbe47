//! Error types for datalens-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of an error, used to pick the user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or empty CSV
    Parse,
    /// Fetch, store or classifier failure
    Network,
    /// The store denied a write
    Permission,
}

/// Context attached to a denied store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionContext {
    /// Operation that was denied (`get`, `create`, `update`, `delete`)
    pub operation: String,
    /// Document path the operation targeted
    pub path: String,
    /// Placeholder summary of the request payload
    pub request_data: Option<String>,
}

impl std::fmt::Display for PermissionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "the following {} request was denied at path: {}",
            self.operation, self.path
        )
    }
}

/// Errors that can occur in datalens-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input had no lines after trimming
    #[error("CSV is empty or invalid")]
    EmptyInput,

    /// CSV error from the csv crate
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// The document store denied an operation
    #[error("missing or insufficient permissions: {0}")]
    PermissionDenied(PermissionContext),

    /// The document store failed for a reason other than permissions
    #[error("document store error: {0}")]
    Store(String),

    /// A classifier answered with the wrong number of classifications
    #[error("highlighter returned {found} classifications for {expected} rows")]
    HighlightLengthMismatch { expected: usize, found: usize },

    /// A classifier failed
    #[error("highlighter failed: {0}")]
    Highlighter(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyInput | Error::Csv(_) => ErrorKind::Parse,
            Error::PermissionDenied(_) => ErrorKind::Permission,
            _ => ErrorKind::Network,
        }
    }

    /// Message suitable for showing to a user
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Parse => format!("Could not read the CSV data: {}", self),
            ErrorKind::Permission => {
                "You do not have permission to upload this file. Please sign in.".to_string()
            }
            ErrorKind::Network => format!("Request failed: {}", self),
        }
    }

    /// Detailed diagnostic for development builds
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Error::PermissionDenied(ctx) => {
                let mut out = format!("operation: {}\npath: {}", ctx.operation, ctx.path);
                if let Some(data) = &ctx.request_data {
                    out.push_str(&format!("\nrequest data: {}", data));
                }
                Some(out)
            }
            _ => None,
        }
    }
}
