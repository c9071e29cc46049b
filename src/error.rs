//! Error handling for OpenAQ gridding operations.
//!
//! Provides error types with context for grid description parsing,
//! record decoding, output writing and archive retrieval failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenAqError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Unreadable path while globbing: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("Invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("Malformed JSON record in {path} at line {line}: {source}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid GRIDDESC file {path} at line {line}: {reason}")]
    InvalidGridDesc {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Grid {name} not found in {path}")]
    GridNotFound { name: String, path: PathBuf },

    #[error("Unsupported map projection type GDTYP={gdtyp} for coordinate system {name}")]
    UnsupportedProjection { name: String, gdtyp: i32 },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl OpenAqError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpenAqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_location() {
        let error = OpenAqError::InvalidGridDesc {
            path: PathBuf::from("GRIDDESC"),
            line: 4,
            reason: "undefined coordinate system 'LAM_X'".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid GRIDDESC file GRIDDESC at line 4: undefined coordinate system 'LAM_X'"
        );

        let error = OpenAqError::GridNotFound {
            name: "36US3".to_string(),
            path: PathBuf::from("GRIDDESC"),
        };
        assert_eq!(error.to_string(), "Grid 36US3 not found in GRIDDESC");
    }

    #[test]
    fn test_configuration_helper() {
        let error = OpenAqError::configuration("nothing to do");
        assert!(matches!(error, OpenAqError::Configuration { .. }));
        assert_eq!(error.to_string(), "Configuration error: nothing to do");
    }
}
