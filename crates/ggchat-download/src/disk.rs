//! Free-space lookup for the download destination.

use std::path::{Path, PathBuf};

use sysinfo::Disks;

/// Bytes available on the volume holding `dir`.
///
/// Picks the mounted disk with the longest mount point that prefixes the
/// canonical path. `None` when no disk matches, which happens in some
/// sandboxes; callers then skip the check.
pub fn available_space(dir: &Path) -> Option<u64> {
    let target = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let disks = Disks::new_with_refreshed_list();
    let mounts: Vec<(PathBuf, u64)> = disks
        .list()
        .iter()
        .map(|d| (d.mount_point().to_path_buf(), d.available_space()))
        .collect();
    space_for(&target, &mounts)
}

fn space_for(target: &Path, mounts: &[(PathBuf, u64)]) -> Option<u64> {
    mounts
        .iter()
        .filter(|(mount, _)| target.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, available)| *available)
}
