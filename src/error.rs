//! Error types for background library operations

use std::path::Path;
use thiserror::Error;

/// Result type alias for background library operations
pub type Result<T> = std::result::Result<T, BackgroundsError>;

/// Error types for background library operations
#[derive(Error, Debug)]
pub enum BackgroundsError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No install-path candidate exists for the current (or fallback) OS
    #[error("operating system {os} is not supported for \"{app}\"")]
    UnsupportedPlatform { app: String, os: String },

    /// A path candidate existed but failed existence validation
    #[error("no usable {kind} for \"{app}\"; attempted: {attempted:?}")]
    PathNotFound {
        app: String,
        kind: String,
        attempted: Vec<String>,
    },

    /// Metadata index open or write errors
    #[error("metadata sync failed for '{store}': {message}")]
    MetadataSync { store: String, message: String },

    /// Target folder of an `open` request does not exist
    #[error("Folder does not exist: {0}")]
    FolderNotFound(String),

    /// Network fetch errors
    #[error("network error: {0}")]
    Network(String),

    /// Malformed or missing catalog documents, or unknown catalog keys
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl BackgroundsError {
    /// Create a new catalog error
    pub fn catalog<S: Into<String>>(msg: S) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a network error with source context
    pub fn network_error<S: Into<String>, E: std::fmt::Display>(msg: S, error: E) -> Self {
        Self::Network(format!("{}: {}", msg.into(), error))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<Path>>(operation: &str, path: P, error: &std::io::Error) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create an external-process invocation error
    pub fn process_error(command: &str, error: &std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to run {}: {}", command, error),
        ))
    }

    /// Create a metadata sync error for a store file
    pub fn metadata_sync<P: AsRef<Path>, E: std::fmt::Display>(store: P, error: E) -> Self {
        Self::MetadataSync {
            store: store.as_ref().display().to_string(),
            message: error.to_string(),
        }
    }

    /// Create an unsupported-platform error
    pub fn unsupported_platform<S: Into<String>, O: std::fmt::Display>(app: S, os: O) -> Self {
        Self::UnsupportedPlatform {
            app: app.into(),
            os: os.to_string(),
        }
    }

    /// Create a path-not-found error carrying every attempted path
    pub fn path_not_found<S: Into<String>>(
        app: S,
        kind: &str,
        attempted: Vec<std::path::PathBuf>,
    ) -> Self {
        Self::PathNotFound {
            app: app.into(),
            kind: kind.to_string(),
            attempted: attempted
                .into_iter()
                .map(|p| p.display().to_string())
                .collect(),
        }
    }

    /// Create a folder-not-found error
    pub fn folder_not_found<P: AsRef<Path>>(path: P) -> Self {
        Self::FolderNotFound(path.as_ref().display().to_string())
    }
}
