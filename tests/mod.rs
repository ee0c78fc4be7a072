//! Main test module for vfy
//!
//! This module includes all test suites:
//! - Integration tests for realistic backup scenarios
//! - Chaos tests for injected backup damage
//! - Property-based tests for counting invariants

pub mod integration;

#[cfg(test)]
mod edge_cases {
    use ::vfy::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_roots() {
        let original = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();

        let report = Verifier::new(original.path(), backup.path())
            .unwrap()
            .verify()
            .unwrap();
        assert_eq!(report.summary, Summary::new());
        assert_eq!(report.summary.diff_percent(), 0.0);
        assert_eq!(report.summary.similarity_percent(), 100.0);
    }

    #[test]
    fn test_same_directory_as_both_roots() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), "b").unwrap();

        let report = VerifierBuilder::new()
            .sample_count(16)
            .build(dir.path(), dir.path())
            .unwrap()
            .verify()
            .unwrap();
        assert_eq!(report.summary.item_count, 3);
        assert!(report.summary.is_clean());
    }

    #[test]
    fn test_special_filenames() {
        let original = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();

        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file.with.dots.txt",
            "file@with#special$chars.txt",
            "file(with)parens.txt",
            "file[with]brackets.txt",
            "file{with}braces.txt",
            "ファイル.txt",
        ];

        let mut written = 0;
        for name in &special_names {
            let content = format!("Content of {}", name);
            if fs::write(original.path().join(name), &content).is_err() {
                // Skip if OS doesn't support this filename
                continue;
            }
            fs::write(backup.path().join(name), &content).unwrap();
            written += 1;
        }

        let report = VerifierBuilder::new()
            .sample_count(4)
            .build(original.path(), backup.path())
            .unwrap()
            .verify()
            .unwrap();
        assert_eq!(report.summary.item_count, written);
        assert_eq!(report.summary.diff_count, 0);
    }

    #[test]
    fn test_ignore_patterns_are_globs() {
        let original = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        for name in ["c", "d"] {
            fs::create_dir(original.path().join(name)).unwrap();
            fs::write(original.path().join(name).join("x"), "x").unwrap();
            fs::create_dir(backup.path().join(name)).unwrap();
        }

        // "[abc]" matches "c" but not "d"; only d/x is missing
        let report = VerifierBuilder::new()
            .ignore_dir("[abc]")
            .build(original.path(), backup.path())
            .unwrap()
            .verify()
            .unwrap();
        assert_eq!(report.summary.skipped_count, 1);
        assert_eq!(report.summary.item_count, 3);
        assert_eq!(report.summary.diff_count, 1);
    }

    #[test]
    fn test_deep_nesting() {
        let original = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();

        let mut rel = std::path::PathBuf::new();
        for level in 0..40 {
            rel.push(format!("l{}", level));
        }
        fs::create_dir_all(original.path().join(&rel)).unwrap();
        fs::create_dir_all(backup.path().join(&rel)).unwrap();
        fs::write(original.path().join(&rel).join("leaf"), "leaf").unwrap();
        fs::write(backup.path().join(&rel).join("leaf"), "leaf").unwrap();

        let report = Verifier::new(original.path(), backup.path())
            .unwrap()
            .verify()
            .unwrap();
        assert_eq!(report.summary.item_count, 41);
        assert_eq!(report.summary.diff_count, 0);
    }

    #[test]
    fn test_empty_files_are_identical_under_sampling() {
        let original = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        fs::write(original.path().join("empty"), "").unwrap();
        fs::write(backup.path().join("empty"), "").unwrap();

        let report = VerifierBuilder::new()
            .sample_count(10)
            .build(original.path(), backup.path())
            .unwrap()
            .verify()
            .unwrap();
        assert_eq!(report.summary.diff_count, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_backup_file_counts_as_difference() {
        use std::os::unix::fs::PermissionsExt;

        let original = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        fs::write(original.path().join("secret"), "0123456789").unwrap();
        let locked = backup.path().join("secret");
        fs::write(&locked, "0123456789").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root can read anything; nothing to check then
        if fs::read(&locked).is_ok() {
            return;
        }

        let report = VerifierBuilder::new()
            .sample_count(3)
            .build(original.path(), backup.path())
            .unwrap()
            .verify()
            .unwrap();
        assert_eq!(report.summary.diff_count, 1);
        assert_eq!(report.summary.error_count, 1);
    }
}
