//! Filesystem boundary guard
//!
//! Keeps the walk on the device it started on when `--one-filesystem` is
//! set. A directory that fails the check is skipped as a whole and is left
//! out of the difference percentage.

/// Decide whether a child directory may be descended into
///
/// Returns `true` unless `one_filesystem` is set and both device ids are
/// known and differ. An unknown id (`None`) never blocks descent.
///
/// # Examples
///
/// ```rust
/// use vfy::boundary::should_descend;
///
/// assert!(should_descend(Some(1), Some(1), true));
/// assert!(!should_descend(Some(1), Some(2), true));
/// assert!(should_descend(Some(1), Some(2), false));
/// assert!(should_descend(None, Some(2), true));
/// ```
pub fn should_descend(parent: Option<u64>, child: Option<u64>, one_filesystem: bool) -> bool {
    match (parent, child) {
        (Some(parent), Some(child)) if one_filesystem => parent == child,
        _ => true,
    }
}
