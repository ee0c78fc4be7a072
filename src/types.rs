//! Core data types used throughout the vfy library
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **Traversal**: `PathPair` - the unit of comparison carried on the recursion stack
//! - **Classification**: `EntryKind`, `ComparisonOutcome` - what a path is and how it compared
//! - **Reporting**: `LogPrefix`, `ItemReport` - per-item log lines
//! - **Configuration**: `VerifyConfig` - options for one verification run
//!
//! ## Examples
//!
//! ```rust
//! use vfy::types::VerifyConfig;
//!
//! let config = VerifyConfig {
//!     sample_count: 16,
//!     one_filesystem: true,
//!     ..Default::default()
//! };
//! assert_eq!(config.sample_width, 32);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default number of bytes read per sample window
pub const DEFAULT_SAMPLE_WIDTH: usize = 32;

/// Classification of a single filesystem path at a point in time
///
/// Obtained with `lstat`, so a symbolic link is always `Symlink` regardless of
/// what it points to. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A directory
    Directory,
    /// A regular file
    RegularFile,
    /// A symbolic link (not followed)
    Symlink,
    /// FIFO, socket, block or character device
    Other,
    /// Nonexistent or unreadable
    Missing,
}

impl EntryKind {
    /// Whether the path exists and could be stat'ed
    pub fn exists(self) -> bool {
        !matches!(self, EntryKind::Missing)
    }
}

/// Result of comparing one [`PathPair`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOutcome {
    /// Backup matches the original
    Identical,
    /// Both sides exist with the same kind but their content differs
    Different,
    /// Present in the original, absent or unreadable in the backup
    MissingInBackup,
    /// One side is a directory and the other is not
    TypeMismatch,
    /// Link vs non-link, or links with different targets
    SymlinkMismatch,
    /// Not compared (ignored, other filesystem, unfollowed link)
    Skipped,
    /// Could not be compared because of an I/O error
    Error,
}

impl ComparisonOutcome {
    /// Whether this outcome counts as a discrepancy in the backup
    pub fn is_discrepancy(self) -> bool {
        !matches!(self, ComparisonOutcome::Identical | ComparisonOutcome::Skipped)
    }
}

/// Prefix of a per-item log line
///
/// These prefixes are scraped by existing tooling and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogPrefix {
    /// Directory in original missing from (or mismatched in) the backup
    Dir,
    /// File in original missing from, or different in, the backup
    File,
    /// Directory skipped because it matched the ignore list
    Skip,
    /// Symlink mismatch
    SymMis,
    /// Symlink to a directory not followed
    Symlink,
    /// Directory on a different filesystem, not descended into
    DiffS,
    /// Error reading a file or directory
    Error,
    /// Debug information
    Debug,
}

impl LogPrefix {
    /// The literal prefix text
    pub fn as_str(self) -> &'static str {
        match self {
            LogPrefix::Dir => "DIR",
            LogPrefix::File => "FILE",
            LogPrefix::Skip => "SKIP",
            LogPrefix::SymMis => "SYMMIS",
            LogPrefix::Symlink => "SYMLINK",
            LogPrefix::DiffS => "DIFFS",
            LogPrefix::Error => "ERROR",
            LogPrefix::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One per-item log line produced by the comparator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    /// Log line prefix
    pub prefix: LogPrefix,
    /// Outcome that produced the line
    pub outcome: ComparisonOutcome,
    /// Path relative to the roots
    pub path: PathBuf,
    /// Extra human-readable detail, may be empty
    pub detail: String,
}

impl fmt::Display for ItemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.prefix, self.path.display())?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

/// The unit of comparison: an original path and its counterpart in the backup
///
/// The backup path is always derived from the original by swapping the root
/// and keeping the relative sub-path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPair {
    /// Path inside the original tree
    pub original: PathBuf,
    /// Corresponding path inside the backup tree
    pub backup: PathBuf,
    /// Path relative to both roots (empty for the roots themselves)
    pub relative: PathBuf,
}

impl PathPair {
    /// Pair for the two roots
    pub fn root(original: impl Into<PathBuf>, backup: impl Into<PathBuf>) -> Self {
        Self {
            original: original.into(),
            backup: backup.into(),
            relative: PathBuf::new(),
        }
    }

    /// Pair for the entry `name` inside this pair's directories
    pub fn child(&self, name: &OsStr) -> Self {
        Self {
            original: self.original.join(name),
            backup: self.backup.join(name),
            relative: self.relative.join(name),
        }
    }

    /// Relative path used in log lines (`.` for the roots)
    pub fn display_path(&self) -> &Path {
        if self.relative.as_os_str().is_empty() {
            Path::new(".")
        } else {
            &self.relative
        }
    }
}

/// Configuration for one verification run
///
/// Built by [`VerifierBuilder`](crate::verifier::VerifierBuilder) and passed
/// read-only to the comparator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Report identical items at debug level
    pub verbose: bool,
    /// Do not descend into directories on another device
    pub one_filesystem: bool,
    /// Descend into matching symlinks that point to directories
    pub follow_symlinks: bool,
    /// Directory names (or glob patterns) never descended into
    pub ignore_dirs: BTreeSet<String>,
    /// Number of random samples per file pair (0 = size comparison only)
    pub sample_count: usize,
    /// Width of each sample window in bytes
    pub sample_width: usize,
    /// Weight a missing or mismatched directory by its descendant count
    pub count_unmatched: bool,
    /// Number of worker threads for sibling comparisons (1 = sequential)
    pub parallel_workers: usize,
    /// Render the summary as a single key:value line
    pub machine_readable: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            one_filesystem: false,
            follow_symlinks: false,
            ignore_dirs: BTreeSet::new(),
            sample_count: 0,
            sample_width: DEFAULT_SAMPLE_WIDTH,
            count_unmatched: true,
            parallel_workers: 1,
            machine_readable: false,
        }
    }
}
