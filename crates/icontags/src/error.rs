//! Error types for IconTags.

use std::path::PathBuf;

/// Result type alias for IconTags operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while indexing, loading icons, or persisting state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The host database rejected a statement.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The icon index table has not been created (or was torn down).
    #[error("Icon index is not initialized")]
    NotInitialized,

    /// File I/O error.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An icon file could not be decoded.
    #[error("Failed to load icon '{path}': {message}")]
    ImageLoad { path: PathBuf, message: String },

    /// UI state or preferences could not be read or written.
    #[error("Invalid settings in '{path}': {message}")]
    Settings { path: PathBuf, message: String },

    /// An icon name that can never appear in a shortcode.
    #[error("Invalid icon name '{0}'")]
    InvalidIconName(String),
}

impl Error {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an image load error.
    pub fn image_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ImageLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a settings error.
    pub fn settings(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Settings {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error means "the index is not there yet".
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }
}
