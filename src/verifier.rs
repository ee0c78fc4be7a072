//! Verification runs
//!
//! [`Verifier`] ties one pair of roots to one configuration. It validates the
//! roots up front, which is the only point where a run can fail as a whole,
//! then drives a [`TreeComparator`] over them and packages the counters into a
//! [`VerificationReport`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vfy::VerifierBuilder;
//!
//! # fn main() -> vfy::Result<()> {
//! let verifier = VerifierBuilder::new()
//!     .sample_count(16)
//!     .one_filesystem(true)
//!     .ignore_dir(".cache")
//!     .build("/home/alice", "/mnt/backup/alice")?;
//!
//! let report = verifier.verify()?;
//! println!("{}", report.render_human());
//! # Ok(())
//! # }
//! ```

use crate::comparator::TreeComparator;
use crate::error::{Result, VfyError};
use crate::probe::{DeviceLookup, FsDeviceLookup};
use crate::report::VerificationReport;
use crate::sink::{NullSink, ReportSink};
use crate::summary::Summary;
use crate::types::{VerifyConfig, DEFAULT_SAMPLE_WIDTH};

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Parse a sample count argument
///
/// # Errors
///
/// - [`VfyError::Config`] unless `value` is a non-negative integer
///
/// # Examples
///
/// ```rust
/// use vfy::verifier::parse_sample_count;
///
/// assert_eq!(parse_sample_count("12").unwrap(), 12);
/// assert!(parse_sample_count("-1").is_err());
/// assert!(parse_sample_count("lots").is_err());
/// ```
pub fn parse_sample_count(value: &str) -> Result<usize> {
    value.trim().parse::<usize>().map_err(|_| {
        VfyError::config(format!(
            "sample count must be a non-negative integer, got {:?}",
            value
        ))
    })
}

/// One configured verification of a backup against its original
pub struct Verifier {
    original_root: PathBuf,
    backup_root: PathBuf,
    config: VerifyConfig,
    devices: Box<dyn DeviceLookup>,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("original_root", &self.original_root)
            .field("backup_root", &self.backup_root)
            .field("config", &self.config)
            .field("parallel", &self.pool.is_some())
            .finish()
    }
}

impl Verifier {
    /// Create a verifier with default settings
    ///
    /// # Errors
    ///
    /// Same as [`VerifierBuilder::build`].
    pub fn new(original: impl AsRef<Path>, backup: impl AsRef<Path>) -> Result<Self> {
        VerifierBuilder::new().build(original, backup)
    }

    /// Canonical path of the original root
    pub fn original_root(&self) -> &Path {
        &self.original_root
    }

    /// Canonical path of the backup root
    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Configuration of this run
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Run the verification, discarding per-item reports
    pub fn verify(&self) -> Result<VerificationReport> {
        self.verify_with_sink(&NullSink)
    }

    /// Run the verification, sending every per-item report to `sink`
    ///
    /// Each call starts from an empty [`Summary`], so repeated runs never
    /// share counters.
    ///
    /// # Errors
    ///
    /// Only if the original root became unreadable since the verifier was
    /// built. Problems below the roots are counted in the report.
    pub fn verify_with_sink(&self, sink: &dyn ReportSink) -> Result<VerificationReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut comparator =
            TreeComparator::new(&self.original_root, &self.backup_root, &self.config, sink)?
                .with_device_lookup(self.devices.as_ref());
        if let Some(pool) = &self.pool {
            comparator = comparator.with_thread_pool(pool);
        }

        let mut summary = Summary::new();
        comparator.compare(&mut summary)?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "Verified {:?} against {:?} in {}ms: {} items, {} different ({:.2}%)",
            self.backup_root,
            self.original_root,
            elapsed_ms,
            summary.item_count,
            summary.diff_count,
            summary.diff_percent()
        );

        Ok(VerificationReport {
            original_root: self.original_root.clone(),
            backup_root: self.backup_root.clone(),
            started_at,
            elapsed_ms,
            summary,
        })
    }
}

/// Builder for configuring a [`Verifier`]
///
/// ## Default Configuration
///
/// - `sample_count`: 0 (size comparison only)
/// - `sample_width`: 32 bytes
/// - `one_filesystem`: false
/// - `follow_symlinks`: false
/// - `count_unmatched`: true
/// - `parallel_workers`: 1 (sequential walk)
pub struct VerifierBuilder {
    config: VerifyConfig,
    devices: Box<dyn DeviceLookup>,
}

impl std::fmt::Debug for VerifierBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VerifierBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: VerifyConfig::default(),
            devices: Box::new(FsDeviceLookup),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: VerifyConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    /// Report identical items too
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Stay on the filesystem each directory started on
    pub fn one_filesystem(mut self, one_filesystem: bool) -> Self {
        self.config.one_filesystem = one_filesystem;
        self
    }

    /// Descend into matching symlinks that point to directories
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.follow_symlinks = follow;
        self
    }

    /// Add a directory name or glob pattern to the ignore list
    pub fn ignore_dir(mut self, pattern: impl Into<String>) -> Self {
        self.config.ignore_dirs.insert(pattern.into());
        self
    }

    /// Add several entries to the ignore list
    pub fn ignore_dirs<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .ignore_dirs
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Number of random samples taken per file pair
    ///
    /// 0 trusts equal sizes without reading any content.
    pub fn sample_count(mut self, count: usize) -> Self {
        self.config.sample_count = count;
        self
    }

    /// Bytes read per sample window (must be at least 1)
    pub fn sample_width(mut self, width: usize) -> Self {
        self.config.sample_width = width;
        self
    }

    /// Weight missing directories by their descendant count
    pub fn count_unmatched(mut self, count: bool) -> Self {
        self.config.count_unmatched = count;
        self
    }

    /// Number of worker threads (0 = one per CPU, 1 = sequential)
    pub fn parallel_workers(mut self, workers: usize) -> Self {
        self.config.parallel_workers = if workers == 0 {
            num_cpus::get()
        } else {
            workers
        };
        self
    }

    /// Render summaries as a single key:value line
    pub fn machine_readable(mut self, machine: bool) -> Self {
        self.config.machine_readable = machine;
        self
    }

    /// Replace the device id source used by the boundary check
    pub fn device_lookup(mut self, devices: impl DeviceLookup + 'static) -> Self {
        self.devices = Box::new(devices);
        self
    }

    /// Validate the configuration and both roots
    ///
    /// # Errors
    ///
    /// - [`VfyError::Config`] if the sample width is 0 or an ignore pattern is invalid
    /// - [`VfyError::Stat`] if a root does not exist or the original root cannot be listed
    /// - [`VfyError::RootNotDirectory`] if a root is not a directory
    /// - [`VfyError::ThreadPool`] if the worker pool cannot be created
    pub fn build(self, original: impl AsRef<Path>, backup: impl AsRef<Path>) -> Result<Verifier> {
        if self.config.sample_width == 0 {
            return Err(VfyError::config(format!(
                "sample width must be at least 1 (default {})",
                DEFAULT_SAMPLE_WIDTH
            )));
        }
        crate::comparator::IgnoreList::new(&self.config.ignore_dirs)?;

        let original_root = validate_root(original.as_ref(), "original")?;
        let backup_root = validate_root(backup.as_ref(), "backup")?;
        fs::read_dir(&original_root).map_err(|e| VfyError::stat(&original_root, e))?;

        let pool = if self.config.parallel_workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.parallel_workers)
                .thread_name(|i| format!("vfy-worker-{}", i))
                .build()
                .map_err(|e| VfyError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        debug!(
            "Verifier ready: {:?} -> {:?} ({} workers)",
            original_root, backup_root, self.config.parallel_workers
        );

        Ok(Verifier {
            original_root,
            backup_root,
            config: self.config,
            devices: self.devices,
            pool,
        })
    }
}

impl Default for VerifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_root(path: &Path, role: &'static str) -> Result<PathBuf> {
    let metadata = fs::metadata(path).map_err(|e| VfyError::stat(path, e))?;
    if !metadata.is_dir() {
        return Err(VfyError::RootNotDirectory {
            role,
            path: path.to_path_buf(),
        });
    }
    fs::canonicalize(path).map_err(|e| VfyError::stat(path, e))
}
