//! Error types for the vfy library
//!
//! Most errors raised while walking the trees are recovered by the comparator:
//! they are counted in the [`Summary`](crate::summary::Summary) and the walk
//! moves on to the next sibling. Only configuration problems and unusable root
//! directories stop a run, and they do so before traversal begins.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the vfy library
pub type Result<T> = std::result::Result<T, VfyError>;

/// Main error type for all vfy operations
#[derive(Debug, Error)]
pub enum VfyError {
    /// A path could not be stat'ed
    #[error("Cannot stat {path:?}: {source}")]
    Stat {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A symbolic link could not be read or resolved
    #[error("Cannot read symlink {path:?}: {reason}")]
    SymlinkRead {
        /// Path of the link
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// An I/O failure while reading a sample window
    #[error("Sample read failed on {path:?} at offset {offset}: {source}")]
    SampleRead {
        /// File being sampled
        path: PathBuf,
        /// Byte offset of the failed window
        offset: u64,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A root argument exists but is not a directory
    #[error("{role} root {path:?} is not a directory")]
    RootNotDirectory {
        /// Either "original" or "backup"
        role: &'static str,
        /// The offending path
        path: PathBuf,
    },

    /// Thread pool construction failed
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Errors while serialising a report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VfyError {
    /// Create a configuration error with a custom message
    pub fn config(msg: impl Into<String>) -> Self {
        VfyError::Config(msg.into())
    }

    /// Create a stat error for `path`
    pub fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VfyError::Stat {
            path: path.into(),
            source,
        }
    }

    /// Create a symlink read error for `path`
    pub fn symlink_read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        VfyError::SymlinkRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error must abort the run
    ///
    /// Fatal errors are raised before traversal starts. Everything else is
    /// counted against the item that caused it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VfyError::Config(_) | VfyError::RootNotDirectory { .. } | VfyError::ThreadPool(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            VfyError::Config(msg) => {
                format!("{}. Run with --help to see the accepted options.", msg)
            }
            VfyError::RootNotDirectory { role, path } => {
                format!(
                    "You gave a file as the {} directory ({:?}). Both arguments must be directories.",
                    role, path
                )
            }
            VfyError::Stat { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                format!("{:?} does not exist.", path)
            }
            _ => self.to_string(),
        }
    }
}
