//! Recursive tree comparison
//!
//! [`TreeComparator`] walks the original tree depth-first and, for every
//! entry, looks up the entry at the same relative path in the backup. Entries
//! that exist only in the backup are never looked at.
//!
//! ## Dispatch order
//!
//! For each [`PathPair`]:
//!
//! 1. Classify both sides (`lstat`, links are not followed)
//! 2. Backup missing or unreadable → `MissingInBackup`
//! 3. Either side a symlink → symlink rules (before any directory/file check)
//! 4. Both directories → ignore list, boundary guard, recurse
//! 5. Both regular files → size, then random sampling
//! 6. Anything else → `TypeMismatch`
//!
//! ## Counting
//!
//! Every entry of an original directory adds exactly one item. A directory
//! that is missing or mismatched in the backup additionally adds its
//! descendant count to both items and diffs, so a missing subtree weighs as
//! much as the files it holds. A mismatched link to a directory weighs its
//! target's subtree the same way, followed or not. Skipped directories
//! (ignored, other filesystem, matching unfollowed links) add nothing beyond
//! their own item.
//!
//! ## Parallelism
//!
//! With a thread pool attached, the siblings of each directory are compared
//! on the pool. Each sibling counts into its own [`Summary`] and the partial
//! summaries are merged when the directory is done, so the final counts match
//! a sequential walk exactly. Only the order of reported lines changes.

use crate::boundary;
use crate::error::{Result, VfyError};
use crate::probe::{self, DeviceLookup, FsDeviceLookup};
use crate::sampler::ContentSampler;
use crate::sink::ReportSink;
use crate::summary::Summary;
use crate::types::{ComparisonOutcome, EntryKind, ItemReport, LogPrefix, PathPair, VerifyConfig};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Compiled form of the ignore list
///
/// Entries without a `/` are matched against the directory name, entries with
/// one against the path relative to the roots. Both accept glob syntax; a
/// plain name only matches itself.
#[derive(Debug, Clone)]
pub struct IgnoreList {
    names: GlobSet,
    paths: GlobSet,
    empty: bool,
}

impl IgnoreList {
    /// Compile the ignore patterns
    ///
    /// # Errors
    ///
    /// - [`VfyError::Config`] if a pattern is not a valid glob
    pub fn new<'p>(patterns: impl IntoIterator<Item = &'p String>) -> Result<Self> {
        let mut names = GlobSetBuilder::new();
        let mut paths = GlobSetBuilder::new();
        let mut empty = true;

        for pattern in patterns {
            let trimmed = pattern.trim_end_matches('/');
            let glob = GlobBuilder::new(trimmed)
                .literal_separator(true)
                .build()
                .map_err(|e| VfyError::config(format!("bad ignore pattern {:?}: {}", pattern, e)))?;
            if trimmed.contains('/') {
                paths.add(glob);
            } else {
                names.add(glob);
            }
            empty = false;
        }

        let build = |builder: GlobSetBuilder| {
            builder
                .build()
                .map_err(|e| VfyError::config(format!("bad ignore list: {}", e)))
        };

        Ok(Self {
            names: build(names)?,
            paths: build(paths)?,
            empty,
        })
    }

    /// Whether the directory at `pair` is on the ignore list
    pub fn is_ignored(&self, pair: &PathPair) -> bool {
        if self.empty {
            return false;
        }
        let by_name = pair
            .relative
            .file_name()
            .map(|name| self.names.is_match(name))
            .unwrap_or(false);
        by_name || self.paths.is_match(&pair.relative)
    }
}

/// Device ids of one directory on both sides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DirDevices {
    original: Option<u64>,
    backup: Option<u64>,
}

/// Canonical paths of the directories above the current one
///
/// Only tracked while following symlinks, where a link to an ancestor would
/// otherwise recurse forever.
#[derive(Debug)]
struct Lineage<'p> {
    canonical: PathBuf,
    parent: Option<&'p Lineage<'p>>,
}

impl Lineage<'_> {
    fn contains(&self, path: &Path) -> bool {
        let mut current = Some(self);
        while let Some(node) = current {
            if node.canonical == path {
                return true;
            }
            current = node.parent;
        }
        false
    }
}

/// What a directory hands down to its entries
#[derive(Debug, Clone, Copy, Default)]
struct DirContext<'p> {
    devices: DirDevices,
    lineage: Option<&'p Lineage<'p>>,
}

/// Where a symbolic link points, relative to the tree it lives in
#[derive(Debug, PartialEq, Eq)]
enum LinkTarget {
    InTree(PathBuf),
    External(PathBuf),
}

impl LinkTarget {
    fn new(target: PathBuf, root: &Path) -> Self {
        match target.strip_prefix(root) {
            Ok(relative) => LinkTarget::InTree(relative.to_path_buf()),
            Err(_) => LinkTarget::External(target),
        }
    }
}

/// The recursive comparison engine
///
/// Borrowed configuration and sink, one walk per call to
/// [`compare`](Self::compare). The [`Summary`] is passed in by the caller and
/// is the only thing mutated.
///
/// # Examples
///
/// ```rust,no_run
/// use vfy::comparator::TreeComparator;
/// use vfy::sink::NullSink;
/// use vfy::{Summary, VerifyConfig};
/// use std::path::Path;
///
/// # fn main() -> vfy::Result<()> {
/// let config = VerifyConfig::default();
/// let comparator = TreeComparator::new(
///     Path::new("/data"),
///     Path::new("/mnt/backup/data"),
///     &config,
///     &NullSink,
/// )?;
///
/// let mut summary = Summary::new();
/// comparator.compare(&mut summary)?;
/// println!("{:.2}% different", summary.diff_percent());
/// # Ok(())
/// # }
/// ```
pub struct TreeComparator<'a> {
    original_root: PathBuf,
    backup_root: PathBuf,
    config: &'a VerifyConfig,
    sampler: ContentSampler,
    ignore: IgnoreList,
    devices: &'a dyn DeviceLookup,
    sink: &'a dyn ReportSink,
    pool: Option<&'a rayon::ThreadPool>,
}

impl<'a> TreeComparator<'a> {
    /// Create a comparator for two root directories
    ///
    /// The roots should be absolute so that symlink targets can be matched
    /// against them.
    ///
    /// # Errors
    ///
    /// - [`VfyError::Config`] if an ignore pattern is invalid
    pub fn new(
        original_root: &Path,
        backup_root: &Path,
        config: &'a VerifyConfig,
        sink: &'a dyn ReportSink,
    ) -> Result<Self> {
        Ok(Self {
            original_root: original_root.to_path_buf(),
            backup_root: backup_root.to_path_buf(),
            config,
            sampler: ContentSampler::new(config.sample_count, config.sample_width),
            ignore: IgnoreList::new(&config.ignore_dirs)?,
            devices: &FsDeviceLookup,
            sink,
            pool: None,
        })
    }

    /// Use a custom source of device ids for the boundary check
    pub fn with_device_lookup(mut self, devices: &'a dyn DeviceLookup) -> Self {
        self.devices = devices;
        self
    }

    /// Compare siblings on `pool`
    pub fn with_thread_pool(mut self, pool: &'a rayon::ThreadPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Walk both trees and accumulate into `summary`
    ///
    /// The roots themselves are not counted as items.
    ///
    /// # Errors
    ///
    /// - [`VfyError::Stat`] if the original root cannot be read. Errors below
    ///   the roots are counted, never returned.
    pub fn compare(&self, summary: &mut Summary) -> Result<()> {
        match self.pool {
            Some(pool) => pool.install(|| self.compare_roots(summary)),
            None => self.compare_roots(summary),
        }
    }

    fn compare_roots(&self, summary: &mut Summary) -> Result<()> {
        let root = PathPair::root(&self.original_root, &self.backup_root);
        let names = read_entries(&root.original).map_err(|e| VfyError::stat(&root.original, e))?;

        let devices = self.directory_devices(&root)?;
        let lineage = if self.config.follow_symlinks {
            Some(Lineage {
                canonical: fs::canonicalize(&root.original)
                    .map_err(|e| VfyError::stat(&root.original, e))?,
                parent: None,
            })
        } else {
            None
        };
        let ctx = DirContext {
            devices,
            lineage: lineage.as_ref(),
        };

        self.compare_entries(&root, names, ctx, summary);
        Ok(())
    }

    /// Compare a single pair outside of a walk
    ///
    /// Parent device ids are unknown here, so the boundary check passes for
    /// `pair` itself. The pair is not counted as an item; its descendants are.
    pub fn compare_pair(&self, pair: &PathPair, summary: &mut Summary) -> ComparisonOutcome {
        self.compare_in(pair, DirContext::default(), summary)
    }

    fn compare_in(
        &self,
        pair: &PathPair,
        parent: DirContext<'_>,
        summary: &mut Summary,
    ) -> ComparisonOutcome {
        let original_kind = match probe::try_classify(&pair.original) {
            Ok(EntryKind::Missing) => {
                return self.error(pair, summary, "vanished from original during walk");
            }
            Ok(kind) => kind,
            Err(e) => return self.error(pair, summary, e.to_string()),
        };

        let backup_kind = match probe::try_classify(&pair.backup) {
            Ok(kind) => kind,
            Err(e) => {
                debug!("Backup side unreadable, treating as missing: {}", e);
                EntryKind::Missing
            }
        };

        if !backup_kind.exists() {
            return self.unmatched(
                pair,
                original_kind,
                ComparisonOutcome::MissingInBackup,
                "missing in backup",
                summary,
            );
        }

        match (original_kind, backup_kind) {
            (EntryKind::Symlink, EntryKind::Symlink) => {
                return self.compare_symlinks(pair, parent, summary);
            }
            (EntryKind::Symlink, other) | (other, EntryKind::Symlink) => {
                let detail = if original_kind == EntryKind::Symlink {
                    format!("symlink in original, {:?} in backup", other)
                } else {
                    format!("{:?} in original, symlink in backup", other)
                };
                return self.unmatched(
                    pair,
                    original_kind,
                    ComparisonOutcome::SymlinkMismatch,
                    detail,
                    summary,
                );
            }
            _ => {}
        }

        match (original_kind, backup_kind) {
            (EntryKind::Directory, EntryKind::Directory) => {
                self.compare_directories(pair, parent, summary)
            }
            (EntryKind::RegularFile, EntryKind::RegularFile) => self.compare_files(pair, summary),
            (EntryKind::Other, EntryKind::Other) => self.identical(pair),
            (original, backup) => self.unmatched(
                pair,
                original_kind,
                ComparisonOutcome::TypeMismatch,
                format!("{:?} in original, {:?} in backup", original, backup),
                summary,
            ),
        }
    }

    fn compare_symlinks(
        &self,
        pair: &PathPair,
        parent: DirContext<'_>,
        summary: &mut Summary,
    ) -> ComparisonOutcome {
        let targets = probe::symlink_target(&pair.original)
            .and_then(|original| probe::symlink_target(&pair.backup).map(|backup| (original, backup)));
        let (original_target, backup_target) = match targets {
            Ok(targets) => targets,
            Err(e) => {
                summary.add_symlink_errors(1);
                summary.add_diffs(1);
                self.emit(LogPrefix::Error, ComparisonOutcome::Error, pair, e.to_string());
                return ComparisonOutcome::Error;
            }
        };

        let same_target = original_target == backup_target
            || LinkTarget::new(original_target.clone(), &self.original_root)
                == LinkTarget::new(backup_target.clone(), &self.backup_root);
        if !same_target {
            let weight = self.subtree_weight(pair, EntryKind::Symlink);
            summary.add_items(weight);
            summary.add_diffs(1 + weight);
            summary.add_symlink_mismatches(1);
            self.emit(
                LogPrefix::SymMis,
                ComparisonOutcome::SymlinkMismatch,
                pair,
                format!(
                    "{} != {}",
                    original_target.display(),
                    backup_target.display()
                ),
            );
            return ComparisonOutcome::SymlinkMismatch;
        }

        if !probe::points_to_directory(&pair.original) {
            return self.identical(pair);
        }

        if !self.config.follow_symlinks {
            summary.add_skipped(1);
            self.emit(
                LogPrefix::Symlink,
                ComparisonOutcome::Skipped,
                pair,
                format!("-> {}, not following", original_target.display()),
            );
            return ComparisonOutcome::Skipped;
        }

        if !probe::points_to_directory(&pair.backup) {
            return self.unmatched(
                pair,
                EntryKind::Symlink,
                ComparisonOutcome::TypeMismatch,
                "link target is not a directory in backup",
                summary,
            );
        }

        self.compare_directories(pair, parent, summary)
    }

    fn compare_directories(
        &self,
        pair: &PathPair,
        parent: DirContext<'_>,
        summary: &mut Summary,
    ) -> ComparisonOutcome {
        if self.ignore.is_ignored(pair) {
            summary.add_skipped(1);
            self.emit(LogPrefix::Skip, ComparisonOutcome::Skipped, pair, "");
            return ComparisonOutcome::Skipped;
        }

        let devices = match self.directory_devices(pair) {
            Ok(devices) => devices,
            Err(e) => return self.error(pair, summary, e.to_string()),
        };
        let one_fs = self.config.one_filesystem;
        if !boundary::should_descend(parent.devices.original, devices.original, one_fs)
            || !boundary::should_descend(parent.devices.backup, devices.backup, one_fs)
        {
            summary.add_skipped(1);
            self.emit(
                LogPrefix::DiffS,
                ComparisonOutcome::Skipped,
                pair,
                "different filesystem",
            );
            return ComparisonOutcome::Skipped;
        }

        let lineage = if self.config.follow_symlinks {
            let canonical = match fs::canonicalize(&pair.original) {
                Ok(path) => path,
                Err(e) => return self.error(pair, summary, e.to_string()),
            };
            if parent.lineage.is_some_and(|l| l.contains(&canonical)) {
                summary.add_skipped(1);
                self.emit(
                    LogPrefix::Symlink,
                    ComparisonOutcome::Skipped,
                    pair,
                    format!("{} is an ancestor, not following", canonical.display()),
                );
                return ComparisonOutcome::Skipped;
            }
            Some(Lineage {
                canonical,
                parent: parent.lineage,
            })
        } else {
            None
        };

        let names = match read_entries(&pair.original) {
            Ok(names) => names,
            Err(e) => return self.error(pair, summary, e.to_string()),
        };

        let ctx = DirContext {
            devices,
            lineage: lineage.as_ref(),
        };
        self.compare_entries(pair, names, ctx, summary);
        self.identical(pair)
    }

    fn compare_entries(
        &self,
        pair: &PathPair,
        names: Vec<OsString>,
        ctx: DirContext<'_>,
        summary: &mut Summary,
    ) {
        if self.pool.is_some() {
            let partial = names
                .par_iter()
                .map(|name| {
                    let mut local = Summary::new();
                    local.add_items(1);
                    self.compare_in(&pair.child(name), ctx, &mut local);
                    local
                })
                .reduce(Summary::new, Summary::merge);
            *summary += partial;
        } else {
            for name in &names {
                summary.add_items(1);
                self.compare_in(&pair.child(name), ctx, summary);
            }
        }
    }

    fn compare_files(&self, pair: &PathPair, summary: &mut Summary) -> ComparisonOutcome {
        let sizes = probe::size(&pair.original)
            .and_then(|original| probe::size(&pair.backup).map(|backup| (original, backup)));
        let (original_size, backup_size) = match sizes {
            Ok(sizes) => sizes,
            Err(e) => return self.error(pair, summary, e.to_string()),
        };

        if original_size != backup_size {
            summary.add_errors(1);
            summary.add_diffs(1);
            self.emit(
                LogPrefix::File,
                ComparisonOutcome::Different,
                pair,
                format!("size {} != {}", original_size, backup_size),
            );
            return ComparisonOutcome::Different;
        }

        match self
            .sampler
            .sample_equal(&pair.original, &pair.backup, original_size)
        {
            Ok(true) => self.identical(pair),
            Ok(false) => {
                summary.add_diffs(1);
                self.emit(
                    LogPrefix::File,
                    ComparisonOutcome::Different,
                    pair,
                    format!("content differs in {} samples", self.sampler.sample_count()),
                );
                ComparisonOutcome::Different
            }
            Err(e) => {
                summary.add_errors(1);
                summary.add_diffs(1);
                self.emit(LogPrefix::Error, ComparisonOutcome::Different, pair, e.to_string());
                ComparisonOutcome::Different
            }
        }
    }

    /// Record a missing or mismatched entry, weighted by its subtree
    fn unmatched(
        &self,
        pair: &PathPair,
        original_kind: EntryKind,
        outcome: ComparisonOutcome,
        detail: impl Into<String>,
        summary: &mut Summary,
    ) -> ComparisonOutcome {
        let weight = self.subtree_weight(pair, original_kind);
        summary.add_items(weight);
        summary.add_diffs(1 + weight);

        let prefix = match (outcome, original_kind) {
            (ComparisonOutcome::SymlinkMismatch, _) => {
                summary.add_symlink_mismatches(1);
                LogPrefix::SymMis
            }
            (_, EntryKind::Directory) => LogPrefix::Dir,
            _ => LogPrefix::File,
        };
        let mut detail = detail.into();
        if weight > 0 {
            detail.push_str(&format!(", {} entries below", weight));
        }
        self.emit(prefix, outcome, pair, detail);
        outcome
    }

    /// Descendants to add on top of the entry itself when it does not match
    fn subtree_weight(&self, pair: &PathPair, original_kind: EntryKind) -> u64 {
        if !self.config.count_unmatched {
            return 0;
        }
        match original_kind {
            EntryKind::Directory => probe::count_entries(&pair.original),
            EntryKind::Symlink if probe::points_to_directory(&pair.original) => {
                probe::count_entries(&pair.original)
            }
            _ => 0,
        }
    }

    /// Device ids of both sides, only looked up when the boundary check is on
    fn directory_devices(&self, pair: &PathPair) -> Result<DirDevices> {
        if !self.config.one_filesystem {
            return Ok(DirDevices::default());
        }
        Ok(DirDevices {
            original: self.devices.device_id(&pair.original)?,
            backup: self.devices.device_id(&pair.backup)?,
        })
    }

    fn error(
        &self,
        pair: &PathPair,
        summary: &mut Summary,
        detail: impl Into<String>,
    ) -> ComparisonOutcome {
        summary.add_errors(1);
        summary.add_diffs(1);
        self.emit(LogPrefix::Error, ComparisonOutcome::Error, pair, detail);
        ComparisonOutcome::Error
    }

    fn identical(&self, pair: &PathPair) -> ComparisonOutcome {
        debug!("{} identical", pair.display_path().display());
        if self.config.verbose {
            self.emit(LogPrefix::Debug, ComparisonOutcome::Identical, pair, "ok");
        }
        ComparisonOutcome::Identical
    }

    fn emit(
        &self,
        prefix: LogPrefix,
        outcome: ComparisonOutcome,
        pair: &PathPair,
        detail: impl Into<String>,
    ) {
        self.sink.report(&ItemReport {
            prefix,
            outcome,
            path: pair.display_path().to_path_buf(),
            detail: detail.into(),
        });
    }
}

/// Entry names of a directory, sorted for a stable walk order
fn read_entries(dir: &Path) -> std::io::Result<Vec<OsString>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        match entry {
            Ok(entry) => names.push(entry.file_name()),
            Err(e) => warn!("Skipping unreadable entry in {:?}: {}", dir, e),
        }
    }
    names.sort();
    Ok(names)
}
