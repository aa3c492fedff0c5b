//! Error taxonomy for report ingestion and analysis.
//!
//! Parse-time failures are never fatal to a run: the pipeline logs them and
//! continues with the remaining inputs. Only contract violations (invalid
//! filter patterns, broken configuration) propagate as hard errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CovError {
    /// File system I/O failure while reading a report or source file.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// None of the known report schemas matched the document.
    #[error("unrecognized report format: {path}")]
    UnrecognizedFormat { path: PathBuf },

    /// The document matched a schema but its structure is broken.
    #[error("malformed {format} report: {message}")]
    MalformedReport { format: String, message: String },

    /// A filter pattern without a `+`/`-` prefix or with an uncompilable body.
    #[error("invalid filter pattern '{pattern}': {message}")]
    InvalidFilter { pattern: String, message: String },

    /// Configuration file problems.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl CovError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CovError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(format: &str, message: impl Into<String>) -> Self {
        CovError::MalformedReport {
            format: format.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_filter(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        CovError::InvalidFilter {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}
