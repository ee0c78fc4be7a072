//! Verification reports and their renderings
//!
//! A [`VerificationReport`] wraps the final [`Summary`] of a run with the
//! roots, start time and duration. It renders three ways:
//!
//! - **Human**: one labelled line per counter
//! - **Machine**: a single `key:value` line with a fixed field order, for
//!   shell scripts and health checks
//! - **JSON**: the whole report through `serde_json`

use crate::error::Result;
use crate::summary::Summary;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one verification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Canonical original root
    pub original_root: PathBuf,
    /// Canonical backup root
    pub backup_root: PathBuf,
    /// When the walk started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
    /// Final counters
    pub summary: Summary,
}

impl VerificationReport {
    /// Whether the difference percentage is above `max_percent`
    pub fn exceeds(&self, max_percent: f64) -> bool {
        self.summary.diff_percent() > max_percent
    }

    /// Multi-line report for people
    pub fn render_human(&self) -> String {
        let s = &self.summary;
        let rows = [
            ("Original", self.original_root.display().to_string()),
            ("Backup", self.backup_root.display().to_string()),
            ("Items", s.item_count.to_string()),
            ("Differences", s.diff_count.to_string()),
            (
                "Similar",
                format!("{} ({:.2}%)", s.similar_count(), s.similarity_percent()),
            ),
            ("Skipped", s.skipped_count.to_string()),
            ("Errors", s.error_count.to_string()),
            ("Symlink errors", s.symlink_error_count.to_string()),
            ("Symlink mismatches", s.symlink_mismatch_count.to_string()),
            ("Difference", format!("{:.2}%", s.diff_percent())),
            (
                "Elapsed",
                humantime::format_duration(Duration::from_millis(self.elapsed_ms)).to_string(),
            ),
        ];

        rows.iter()
            .map(|(label, value)| format!("{:<20}{}", format!("{}:", label), value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Single `key:value` line with a stable field order
    pub fn render_machine(&self) -> String {
        let s = &self.summary;
        format!(
            "items:{} diffs:{} similar:{} similarity:{:.2} skipped:{} errors:{} \
             symlink_errors:{} symlink_mismatches:{} diff_percent:{:.2}",
            s.item_count,
            s.diff_count,
            s.similar_count(),
            s.similarity_percent(),
            s.skipped_count,
            s.error_count,
            s.symlink_error_count,
            s.symlink_mismatch_count,
            s.diff_percent()
        )
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
