//! Result aggregation
//!
//! A [`Summary`] holds the counters of one verification run. It is created
//! empty, mutated only by the comparator while it walks, and read once at the
//! end to compute the difference percentage.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Counters accumulated during one verification run
///
/// # Examples
///
/// ```rust
/// use vfy::Summary;
///
/// let mut summary = Summary::default();
/// summary.add_items(4);
/// summary.add_diffs(1);
/// assert_eq!(summary.diff_percent(), 25.0);
/// assert_eq!(summary.similar_count(), 3);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Items in the original tree that were accounted for
    pub item_count: u64,
    /// Items missing from or different in the backup
    pub diff_count: u64,
    /// Directories skipped (ignored, other filesystem, unfollowed links)
    pub skipped_count: u64,
    /// Stat and read errors
    pub error_count: u64,
    /// Symlinks whose target could not be read
    pub symlink_error_count: u64,
    /// Symlink mismatches (link vs non-link, or different targets)
    pub symlink_mismatch_count: u64,
}

impl Summary {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the item count
    pub fn add_items(&mut self, n: u64) {
        self.item_count += n;
    }

    /// Add to the diff count
    pub fn add_diffs(&mut self, n: u64) {
        self.diff_count += n;
    }

    /// Add to the skipped count
    pub fn add_skipped(&mut self, n: u64) {
        self.skipped_count += n;
    }

    /// Add to the error count
    pub fn add_errors(&mut self, n: u64) {
        self.error_count += n;
    }

    /// Add to the symlink error count
    pub fn add_symlink_errors(&mut self, n: u64) {
        self.symlink_error_count += n;
    }

    /// Add to the symlink mismatch count
    pub fn add_symlink_mismatches(&mut self, n: u64) {
        self.symlink_mismatch_count += n;
    }

    /// Percentage of items that differ, 0 when nothing was counted
    pub fn diff_percent(&self) -> f64 {
        if self.item_count == 0 {
            0.0
        } else {
            self.diff_count as f64 / self.item_count as f64 * 100.0
        }
    }

    /// Items that matched
    pub fn similar_count(&self) -> u64 {
        self.item_count.saturating_sub(self.diff_count)
    }

    /// Percentage of items that matched
    pub fn similarity_percent(&self) -> f64 {
        100.0 - self.diff_percent()
    }

    /// Whether the backup had no discrepancies and no errors
    pub fn is_clean(&self) -> bool {
        self.diff_count == 0 && self.error_count == 0 && self.symlink_error_count == 0
    }

    /// Add another summary's counters to this one
    pub fn merge(mut self, other: Summary) -> Summary {
        self += other;
        self
    }
}

impl AddAssign for Summary {
    fn add_assign(&mut self, other: Summary) {
        self.item_count += other.item_count;
        self.diff_count += other.diff_count;
        self.skipped_count += other.skipped_count;
        self.error_count += other.error_count;
        self.symlink_error_count += other.symlink_error_count;
        self.symlink_mismatch_count += other.symlink_mismatch_count;
    }
}
