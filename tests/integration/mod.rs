//! Integration tests for vfy
//!
//! Builds realistic original trees, mirrors them into a backup, damages the
//! backup in controlled ways and checks the counters a full run produces.

use ::vfy::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

/// Test harness holding one original/backup pair
pub struct BackupHarness {
    pub original: TempDir,
    pub backup: TempDir,
    pub file_generator: FileGenerator,
}

/// Shape of a generated project tree
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub max_depth: usize,
    pub dirs_per_level: usize,
    pub files_per_dir: usize,
    pub file_size_range: Range<usize>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            dirs_per_level: 3,
            files_per_dir: 4,
            file_size_range: Range {
                start: 64,
                end: 2048,
            },
        }
    }
}

/// Deterministic file content generator
pub struct FileGenerator {
    pub rng: StdRng,
}

impl FileGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate_file_content(&mut self, size_range: Range<usize>) -> Vec<u8> {
        let len = self.rng.random_range(size_range);
        let mut content = vec![0u8; len];
        self.rng.fill(&mut content[..]);
        content
    }
}

impl BackupHarness {
    /// Create a harness with two empty roots
    pub fn new() -> Self {
        Self {
            original: TempDir::new().unwrap(),
            backup: TempDir::new().unwrap(),
            file_generator: FileGenerator::new(42),
        }
    }

    pub fn original_path(&self) -> &Path {
        self.original.path()
    }

    pub fn backup_path(&self) -> &Path {
        self.backup.path()
    }

    /// Generate a nested project in the original root
    pub fn generate_project(&mut self, config: &ProjectConfig) -> anyhow::Result<()> {
        let root = self.original.path().to_path_buf();

        for dir_depth in 1..=config.max_depth {
            for dir_idx in 0..config.dirs_per_level {
                let mut path = root.clone();
                for level in 0..dir_depth {
                    path = path.join(format!("dir_{}_{}", level, dir_idx));
                }
                fs::create_dir_all(&path)?;

                for file_idx in 0..config.files_per_dir {
                    let content = self
                        .file_generator
                        .generate_file_content(config.file_size_range.clone());
                    fs::write(path.join(format!("file_{}.bin", file_idx)), content)?;
                }
            }
        }

        Ok(())
    }

    /// Copy the whole original tree into the backup root
    pub fn mirror(&self) -> anyhow::Result<()> {
        let root = self.original.path();
        for entry in walkdir::WalkDir::new(root).min_depth(1) {
            let entry = entry?;
            let target = self.backup.path().join(entry.path().strip_prefix(root)?);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    /// All regular files of the original, relative to its root, sorted
    pub fn original_files(&self) -> Vec<PathBuf> {
        let root = self.original.path();
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }

    /// Number of entries below `rel` in the original (everything when empty)
    pub fn count_original(&self, rel: &str) -> u64 {
        walkdir::WalkDir::new(self.original.path().join(rel))
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .count() as u64
    }

    /// Run a verification with the given builder and collect reports
    pub fn verify(&self, builder: VerifierBuilder) -> (VerificationReport, Vec<ItemReport>) {
        let verifier = builder
            .build(self.original.path(), self.backup.path())
            .unwrap();
        let sink = CollectingSink::new();
        let report = verifier.verify_with_sink(&sink).unwrap();
        info!("{}", report.render_machine());
        (report, sink.take())
    }
}

impl Default for BackupHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirrored_project() -> BackupHarness {
        let mut harness = BackupHarness::new();
        harness.generate_project(&ProjectConfig::default()).unwrap();
        harness.mirror().unwrap();
        harness
    }

    #[test]
    fn test_fresh_mirror_is_clean() {
        let harness = mirrored_project();
        let (report, reports) = harness.verify(VerifierBuilder::new().sample_count(8));

        assert_eq!(report.summary.item_count, harness.count_original(""));
        assert_eq!(report.summary.diff_count, 0);
        assert!(report.summary.is_clean());
        assert_eq!(report.summary.diff_percent(), 0.0);
        assert!(reports.is_empty());
    }

    #[test]
    fn test_repeated_runs_are_idempotent() {
        let harness = mirrored_project();
        fs::remove_file(harness.backup_path().join("dir_0_1/file_2.bin")).unwrap();

        let verifier = VerifierBuilder::new()
            .build(harness.original_path(), harness.backup_path())
            .unwrap();
        let first = verifier.verify().unwrap();
        let second = verifier.verify().unwrap();

        assert_eq!(first.summary, second.summary);
        assert_eq!(first.summary.diff_count, 1);
    }

    #[test]
    fn test_missing_subtree_counts_every_entry() {
        let harness = mirrored_project();
        fs::remove_dir_all(harness.backup_path().join("dir_0_0")).unwrap();

        let below = harness.count_original("dir_0_0");
        let (report, reports) = harness.verify(VerifierBuilder::new());

        // The directory itself plus everything below it
        assert_eq!(report.summary.diff_count, below + 1);
        assert_eq!(report.summary.item_count, harness.count_original(""));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].prefix, LogPrefix::Dir);
        assert_eq!(reports[0].outcome, ComparisonOutcome::MissingInBackup);
        assert_eq!(reports[0].path, PathBuf::from("dir_0_0"));
    }

    #[test]
    fn test_missing_subtree_without_counting() {
        let harness = mirrored_project();
        fs::remove_dir_all(harness.backup_path().join("dir_0_0")).unwrap();

        let below = harness.count_original("dir_0_0");
        let (report, _) = harness.verify(VerifierBuilder::new().count_unmatched(false));

        assert_eq!(report.summary.diff_count, 1);
        assert_eq!(report.summary.item_count, harness.count_original("") - below);
    }

    #[test]
    fn test_stale_content_detected_by_sampling() {
        let harness = mirrored_project();
        let stale = harness.backup_path().join("dir_0_2/dir_1_2/file_0.bin");
        let inverted: Vec<u8> = fs::read(&stale).unwrap().iter().map(|b| !b).collect();
        fs::write(&stale, inverted).unwrap();

        let (weak, _) = harness.verify(VerifierBuilder::new());
        assert_eq!(weak.summary.diff_count, 0);

        let (sampled, reports) = harness.verify(VerifierBuilder::new().sample_count(4));
        assert_eq!(sampled.summary.diff_count, 1);
        assert_eq!(sampled.summary.error_count, 0);
        assert_eq!(reports[0].path, PathBuf::from("dir_0_2/dir_1_2/file_0.bin"));
        assert_eq!(reports[0].outcome, ComparisonOutcome::Different);
    }

    #[test]
    fn test_extra_backup_content_is_ignored() {
        let harness = mirrored_project();
        fs::create_dir(harness.backup_path().join("only_in_backup")).unwrap();
        fs::write(harness.backup_path().join("only_in_backup/x"), b"x").unwrap();
        fs::write(harness.backup_path().join("dir_0_0/new.txt"), b"new").unwrap();

        let (report, _) = harness.verify(VerifierBuilder::new());
        assert_eq!(report.summary.item_count, harness.count_original(""));
        assert_eq!(report.summary.diff_count, 0);
    }

    #[test]
    fn test_ignore_glob_skips_matching_directories() {
        let harness = mirrored_project();
        // Damage inside an ignored directory must not be noticed
        fs::remove_dir_all(harness.backup_path().join("dir_0_1/dir_1_1")).unwrap();
        fs::create_dir(harness.backup_path().join("dir_0_1/dir_1_1")).unwrap();

        let config = ProjectConfig::default();
        let ignored_below: u64 = (0..config.dirs_per_level)
            .map(|i| harness.count_original(&format!("dir_0_{}/dir_1_{}", i, i)))
            .sum();

        let (report, reports) = harness.verify(VerifierBuilder::new().ignore_dir("dir_1_*"));
        assert_eq!(report.summary.diff_count, 0);
        assert_eq!(report.summary.skipped_count, config.dirs_per_level as u64);
        assert_eq!(
            report.summary.item_count,
            harness.count_original("") - ignored_below
        );
        assert!(reports.iter().all(|r| r.prefix == LogPrefix::Skip));
    }

    #[test]
    fn test_parallel_run_matches_sequential() {
        let harness = mirrored_project();
        fs::remove_dir_all(harness.backup_path().join("dir_0_2/dir_1_2")).unwrap();
        fs::write(harness.backup_path().join("dir_0_0/file_1.bin"), b"short").unwrap();
        fs::remove_file(harness.backup_path().join("dir_0_1/file_3.bin")).unwrap();

        let (sequential, mut seq_reports) = harness.verify(VerifierBuilder::new().sample_count(2));
        let (parallel, mut par_reports) =
            harness.verify(VerifierBuilder::new().sample_count(2).parallel_workers(4));

        assert_eq!(sequential.summary, parallel.summary);
        seq_reports.sort_by(|a, b| a.path.cmp(&b.path));
        par_reports.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(seq_reports, par_reports);
    }

    #[test]
    fn test_machine_line_reflects_counts() {
        let mut harness = BackupHarness::new();
        harness
            .generate_project(&ProjectConfig {
                max_depth: 1,
                dirs_per_level: 1,
                files_per_dir: 4,
                ..Default::default()
            })
            .unwrap();
        harness.mirror().unwrap();
        fs::remove_file(harness.backup_path().join("dir_0_0/file_0.bin")).unwrap();

        // dir_0_0 and four files, one of them missing
        let (report, _) = harness.verify(VerifierBuilder::new());
        assert_eq!(
            report.render_machine(),
            "items:5 diffs:1 similar:4 similarity:80.00 skipped:0 errors:0 \
             symlink_errors:0 symlink_mismatches:0 diff_percent:20.00"
        );
    }

    #[test]
    fn test_json_report_round_trips_summary() {
        let harness = mirrored_project();
        let (report, _) = harness.verify(VerifierBuilder::new());

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["summary"]["item_count"].as_u64(),
            Some(report.summary.item_count)
        );
        assert_eq!(value["summary"]["diff_count"].as_u64(), Some(0));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_subtree_followed_on_request() {
        use std::os::unix::fs::symlink;

        let harness = mirrored_project();
        symlink("dir_0_0", harness.original_path().join("latest")).unwrap();
        symlink("dir_0_0", harness.backup_path().join("latest")).unwrap();
        let below = harness.count_original("dir_0_0");

        let (plain, _) = harness.verify(VerifierBuilder::new());
        assert_eq!(plain.summary.skipped_count, 1);

        let (followed, _) = harness.verify(VerifierBuilder::new().follow_symlinks(true));
        assert_eq!(followed.summary.skipped_count, 0);
        assert_eq!(followed.summary.item_count, plain.summary.item_count + below);
        assert_eq!(followed.summary.diff_count, 0);
    }
}
