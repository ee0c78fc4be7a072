//! Filesystem probe
//!
//! Read-only queries the comparator makes about a single path: what kind of
//! entry it is, how big it is, which device it lives on, and where a symbolic
//! link points. Nothing here holds state and nothing here writes to disk.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vfy::probe::{self, EntryKind};
//! use std::path::Path;
//!
//! # fn example() -> vfy::Result<()> {
//! match probe::classify(Path::new("/srv/data/report.pdf")) {
//!     EntryKind::RegularFile => println!("{} bytes", probe::size(Path::new("/srv/data/report.pdf"))?),
//!     EntryKind::Symlink => println!("-> {:?}", probe::symlink_target(Path::new("/srv/data/report.pdf"))?),
//!     other => println!("{:?}", other),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Cross-Platform Behavior
//!
//! - **Unix**: device ids come from `st_dev`
//! - **Other platforms**: there is no device id, so [`device_id`] returns
//!   `None` and the boundary check always passes

use crate::error::{Result, VfyError};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{trace, warn};
use walkdir::WalkDir;

pub use crate::types::EntryKind;

/// Classify a path without following symbolic links
///
/// Never fails: an unreadable or nonexistent path is reported as
/// [`EntryKind::Missing`]. Use [`try_classify`] to see why.
pub fn classify(path: &Path) -> EntryKind {
    try_classify(path).unwrap_or(EntryKind::Missing)
}

/// Classify a path, surfacing stat failures other than "not found"
///
/// # Errors
///
/// - [`VfyError::Stat`] if the path exists but cannot be stat'ed
pub fn try_classify(path: &Path) -> Result<EntryKind> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Ok(kind_of(&metadata.file_type())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            trace!("{:?} does not exist", path);
            Ok(EntryKind::Missing)
        }
        Err(e) => Err(VfyError::stat(path, e)),
    }
}

fn kind_of(file_type: &fs::FileType) -> EntryKind {
    // Links win over whatever they point at
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::RegularFile
    } else {
        EntryKind::Other
    }
}

/// Size of a file in bytes
///
/// # Errors
///
/// - [`VfyError::Stat`] if the path is inaccessible
pub fn size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| VfyError::stat(path, e))
}

/// Device identifier of the filesystem holding `path`
///
/// Follows symbolic links, so a followed link to a directory reports the
/// device of its target.
///
/// # Errors
///
/// - [`VfyError::Stat`] if the path cannot be stat'ed
#[cfg(unix)]
pub fn device_id(path: &Path) -> Result<Option<u64>> {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path)
        .map(|m| Some(m.dev()))
        .map_err(|e| VfyError::stat(path, e))
}

/// Device identifier (platforms without one)
#[cfg(not(unix))]
pub fn device_id(path: &Path) -> Result<Option<u64>> {
    fs::metadata(path).map_err(|e| VfyError::stat(path, e))?;
    Ok(None)
}

/// Source of device identifiers for the boundary check
///
/// [`FsDeviceLookup`] asks the operating system. Closures can be used to
/// override the answer, e.g. to treat bind mounts as separate filesystems.
pub trait DeviceLookup: Send + Sync {
    /// Device id of `path`, or `None` when the platform has no such concept
    fn device_id(&self, path: &Path) -> Result<Option<u64>>;
}

/// Device lookup backed by `stat`
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDeviceLookup;

impl DeviceLookup for FsDeviceLookup {
    fn device_id(&self, path: &Path) -> Result<Option<u64>> {
        device_id(path)
    }
}

impl<F> DeviceLookup for F
where
    F: Fn(&Path) -> Result<Option<u64>> + Send + Sync,
{
    fn device_id(&self, path: &Path) -> Result<Option<u64>> {
        self(path)
    }
}

/// Resolved absolute target of a symbolic link
///
/// Relative link text is joined to the directory containing the link and
/// normalised lexically. The returned path is that lexical form, but the link
/// must resolve: a dangling link is an error.
///
/// # Errors
///
/// - [`VfyError::SymlinkRead`] if `path` is not a symlink, cannot be read, or
///   its target does not exist
pub fn symlink_target(path: &Path) -> Result<PathBuf> {
    let metadata =
        fs::symlink_metadata(path).map_err(|e| VfyError::symlink_read(path, e.to_string()))?;
    if !metadata.file_type().is_symlink() {
        return Err(VfyError::symlink_read(path, "not a symbolic link"));
    }

    let target = fs::read_link(path).map_err(|e| VfyError::symlink_read(path, e.to_string()))?;
    let absolute = if target.is_absolute() {
        target
    } else {
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        let parent = if parent.is_absolute() {
            parent.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| VfyError::symlink_read(path, e.to_string()))?
                .join(parent)
        };
        parent.join(target)
    };
    let absolute = normalize_lexically(&absolute);

    fs::metadata(path).map_err(|e| {
        VfyError::symlink_read(path, format!("cannot resolve {}: {}", absolute.display(), e))
    })?;

    Ok(absolute)
}

/// Remove `.` and `..` components without touching the filesystem
///
/// `..` at the root stays at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Whether `path` is a symlink whose target is a directory
pub fn points_to_directory(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Count every entry below `dir`, not including `dir` itself
///
/// Symbolic links are counted but never followed. Entries that cannot be
/// read are logged and left out of the count.
pub fn count_entries(dir: &Path) -> u64 {
    let mut count = 0u64;
    for entry in WalkDir::new(dir).min_depth(1).follow_links(false) {
        match entry {
            Ok(_) => count += 1,
            Err(e) => warn!("Cannot count entries under {:?}: {}", dir, e),
        }
    }
    trace!("{:?} holds {} entries", dir, count);
    count
}
