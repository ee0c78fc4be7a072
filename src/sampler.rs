//! Random content sampling
//!
//! Two files of equal length are compared by reading a handful of short byte
//! windows at random offsets from both. This is a spot check, not a proof:
//!
//! - With `sample_count == 0` size equality alone is accepted (weak mode).
//! - The files are declared equal as soon as **one** window matches. More
//!   samples make a false "equal" less likely but never impossible.
//! - Offsets come from [`rand::rng()`], an OS-seeded CSPRNG, so repeated runs
//!   over the same files look at different byte ranges.
//!
//! ## Example
//!
//! ```rust,no_run
//! use vfy::sampler::ContentSampler;
//! use std::path::Path;
//!
//! # fn example() -> vfy::Result<()> {
//! let sampler = ContentSampler::new(8, 32);
//! let same = sampler.sample_equal(Path::new("a.bin"), Path::new("b.bin"), 4096)?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, VfyError};
use crate::types::DEFAULT_SAMPLE_WIDTH;
use rand::Rng;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Samples byte windows from pairs of equal-length files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSampler {
    sample_count: usize,
    sample_width: usize,
}

impl Default for ContentSampler {
    fn default() -> Self {
        Self::new(0, DEFAULT_SAMPLE_WIDTH)
    }
}

impl ContentSampler {
    /// Create a sampler drawing `sample_count` windows of `sample_width` bytes
    pub fn new(sample_count: usize, sample_width: usize) -> Self {
        Self {
            sample_count,
            sample_width,
        }
    }

    /// Number of windows drawn per file pair
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Compare two files of `size` bytes by random sampling
    ///
    /// The caller must already have checked that both files are `size` bytes
    /// long.
    ///
    /// # Errors
    ///
    /// - [`VfyError::SampleRead`] if either file cannot be opened or read.
    ///   A failed read is never treated as a match.
    pub fn sample_equal(&self, file_a: &Path, file_b: &Path, size: u64) -> Result<bool> {
        self.sample_equal_with_rng(file_a, file_b, size, &mut rand::rng())
    }

    /// Same as [`sample_equal`](Self::sample_equal) with a caller-supplied
    /// random source
    pub fn sample_equal_with_rng<R: Rng>(
        &self,
        file_a: &Path,
        file_b: &Path,
        size: u64,
        rng: &mut R,
    ) -> Result<bool> {
        if self.sample_count == 0 || size == 0 {
            return Ok(true);
        }

        let mut a = SampledFile::open(file_a)?;
        let mut b = SampledFile::open(file_b)?;
        let width = self.sample_width.max(1) as u64;
        let mut buf_a = vec![0u8; width as usize];
        let mut buf_b = vec![0u8; width as usize];

        for trial in 0..self.sample_count {
            let start = rng.random_range(0..size);
            let len = width.min(size - start) as usize;

            a.read_window(start, &mut buf_a[..len])?;
            b.read_window(start, &mut buf_b[..len])?;

            if buf_a[..len] == buf_b[..len] {
                trace!(
                    "Sample {} at offset {} matched for {:?}",
                    trial,
                    start,
                    file_a
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}

/// Compare two equal-length files with `sample_count` windows of `sample_width` bytes
///
/// Convenience wrapper around [`ContentSampler::sample_equal`].
pub fn sample_equal(
    file_a: &Path,
    file_b: &Path,
    size: u64,
    sample_count: usize,
    sample_width: usize,
) -> Result<bool> {
    ContentSampler::new(sample_count, sample_width).sample_equal(file_a, file_b, size)
}

struct SampledFile {
    path: PathBuf,
    file: File,
}

impl SampledFile {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| VfyError::SampleRead {
            path: path.to_path_buf(),
            offset: 0,
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn read_window(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|source| VfyError::SampleRead {
                path: self.path.clone(),
                offset,
                source,
            })
    }
}
