//! # vfy - Backup verification
//!
//! Checks that a backup directory tree is a faithful, recent copy of an
//! original tree and condenses the answer into one number: the percentage of
//! original items that are missing from or different in the backup.
//!
//! ## Overview
//!
//! vfy walks the original tree and looks up each entry at the same relative
//! path in the backup:
//! - Entries missing from the backup are reported, and a missing directory
//!   counts once per entry it contains
//! - Files are compared by size and, optionally, by random byte samples
//! - Symlinks are compared by target and not followed unless asked to
//! - Directories on other filesystems or on the ignore list are skipped
//! - Entries that exist only in the backup are ignored
//!
//! Neither tree is ever modified.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vfy::VerifierBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = VerifierBuilder::new()
//!     .sample_count(8)
//!     .build("/srv/photos", "/mnt/nas/photos")?;
//!
//! let report = verifier.verify()?;
//! if report.exceeds(1.0) {
//!     eprintln!("backup is stale: {:.2}% different", report.summary.diff_percent());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Per-item reports
//!
//! Every discrepancy is handed to a [`ReportSink`] as an [`ItemReport`] whose
//! prefix tells what happened:
//!
//! | Prefix    | Meaning                                              |
//! |-----------|------------------------------------------------------|
//! | `DIR`     | Directory missing from, or mismatched in, the backup |
//! | `FILE`    | File missing from, or different in, the backup       |
//! | `SKIP`    | Directory on the ignore list                         |
//! | `SYMMIS`  | Symlink mismatch                                     |
//! | `SYMLINK` | Symlink to a directory, not followed                 |
//! | `DIFFS`   | Directory on a different filesystem, not descended   |
//! | `ERROR`   | Error reading a file or directory                    |
//! | `DEBUG`   | Identical item (verbose mode only)                   |
//!
//! ```rust,no_run
//! use vfy::{ItemReport, VerifierBuilder};
//!
//! # fn main() -> vfy::Result<()> {
//! let verifier = VerifierBuilder::new().build("/srv/photos", "/mnt/nas/photos")?;
//! let print = |item: &ItemReport| println!("{}", item);
//! let report = verifier.verify_with_sink(&print)?;
//! println!("{}", report.render_machine());
//! # Ok(())
//! # }
//! ```
//!
//! ## Sampling
//!
//! With `sample_count == 0` files of equal size are accepted as identical.
//! With a positive count, that many 32-byte windows are read at random
//! offsets and the files are considered identical as soon as one window
//! matches. This catches stale or truncated copies cheaply; it is not a
//! checksum.
//!
//! ## Module Organization
//!
//! - [`verifier`]: Root validation, configuration builder and runs
//! - [`comparator`]: The recursive comparison engine
//! - [`probe`]: Filesystem queries (kind, size, device, symlink target)
//! - [`sampler`]: Random content sampling
//! - [`boundary`]: One-filesystem check
//! - [`summary`]: Counters and the difference percentage
//! - [`report`]: Human, machine and JSON renderings
//! - [`sink`]: Receivers for per-item reports
//! - [`types`]: Shared data types
//! - [`error`]: Error types

pub mod boundary;
pub mod comparator;
pub mod error;
pub mod probe;
pub mod report;
pub mod sampler;
pub mod sink;
pub mod summary;
pub mod types;
pub mod verifier;

pub use comparator::TreeComparator;
pub use error::{Result, VfyError};
pub use report::VerificationReport;
pub use sampler::ContentSampler;
pub use sink::{CollectingSink, NullSink, ReportSink};
pub use summary::Summary;
pub use types::*;
pub use verifier::{Verifier, VerifierBuilder};
