//! Error types for sos-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.
//! Listing, copy and walk failures wrap the backend error that caused them and
//! carry enough context (bucket, key, cursor) for a caller to resume.

use thiserror::Error;

/// Result type alias for sos-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sos-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Alias not found
    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication or permission failure
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// A listing call failed. `cursor` is the last continuation token the
    /// traversal consumed; pass it to `Pages::resume` to pick up from there.
    #[error("Listing {bucket}/{prefix} failed (cursor: {}): {source}", .cursor.as_deref().unwrap_or("<start>"))]
    ListFailed {
        bucket: String,
        prefix: String,
        cursor: Option<String>,
        #[source]
        source: Box<Error>,
    },

    /// Reading the headers and metadata of a copy source failed
    #[error("Unable to retrieve object information for {bucket}/{key}: {source}")]
    SourceFetchFailed {
        bucket: String,
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// Reading the ACL of a copy source failed; no write was issued
    #[error("Unable to retrieve object ACL for {bucket}/{key}: {source}")]
    AclFetchFailed {
        bucket: String,
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// The in-place copy request itself failed
    #[error("Unable to copy {bucket}/{key} in place: {source}")]
    CopyFailed {
        bucket: String,
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// A walk visitor failed; remaining objects were not visited
    #[error("Walk over {bucket} stopped at {key}: {source}")]
    WalkAborted {
        bucket: String,
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// Traversal cancelled between two page fetches
    #[error("Operation interrupted")]
    Interrupted,

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    ///
    /// Wrapping variants report the exit code of the error they wrap.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) | Error::InvalidUrl(_) => 2, // UsageError
            Error::Network(_) => 3,                                               // NetworkError
            Error::Auth(_) => 4,                                                  // AuthError
            Error::NotFound(_) | Error::AliasNotFound(_) => 5,                    // NotFound
            Error::Interrupted => 130,                                            // Interrupted
            Error::ListFailed { source, .. }
            | Error::SourceFetchFailed { source, .. }
            | Error::AclFetchFailed { source, .. }
            | Error::CopyFailed { source, .. }
            | Error::WalkAborted { source, .. } => source.exit_code(),
            _ => 1, // GeneralError
        }
    }

    /// Continuation token to resume a failed listing from, if any
    pub fn cursor(&self) -> Option<&str> {
        match self {
            Error::ListFailed { cursor, .. } => cursor.as_deref(),
            Error::WalkAborted { source, .. } => source.cursor(),
            _ => None,
        }
    }

    /// Whether a write may have reached the backend before this error
    pub fn write_attempted(&self) -> bool {
        match self {
            Error::CopyFailed { .. } => true,
            Error::WalkAborted { source, .. } => source.write_attempted(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::Network("test".into()).exit_code(), 3);
        assert_eq!(Error::Auth("test".into()).exit_code(), 4);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::AliasNotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::Interrupted.exit_code(), 130);
        assert_eq!(Error::General("test".into()).exit_code(), 1);
    }

    #[test]
    fn test_wrapped_exit_codes() {
        let err = Error::AclFetchFailed {
            bucket: "b".into(),
            key: "k".into(),
            source: Box::new(Error::Auth("denied".into())),
        };
        assert_eq!(err.exit_code(), 4);

        let err = Error::WalkAborted {
            bucket: "b".into(),
            key: "k".into(),
            source: Box::new(Error::CopyFailed {
                bucket: "b".into(),
                key: "k".into(),
                source: Box::new(Error::Network("reset".into())),
            }),
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.write_attempted());
    }

    #[test]
    fn test_list_failed_cursor() {
        let err = Error::ListFailed {
            bucket: "photos".into(),
            prefix: "2024/".into(),
            cursor: Some("T1".into()),
            source: Box::new(Error::Network("timeout".into())),
        };
        assert_eq!(err.cursor(), Some("T1"));
        assert!(!err.write_attempted());
        assert_eq!(
            err.to_string(),
            "Listing photos/2024/ failed (cursor: T1): Network error: timeout"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::AliasNotFound("exo".into());
        assert_eq!(err.to_string(), "Alias not found: exo");

        let err = Error::SourceFetchFailed {
            bucket: "b".into(),
            key: "a.txt".into(),
            source: Box::new(Error::NotFound("b/a.txt".into())),
        };
        assert_eq!(
            err.to_string(),
            "Unable to retrieve object information for b/a.txt: Not found: b/a.txt"
        );
    }
}
