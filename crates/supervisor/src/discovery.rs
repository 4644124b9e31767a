// SPDX-License-Identifier: MIT

//! Non-recursive directory scan for candidate scripts.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Whether `path` looks like something we should try to admit: a `.sh` file
/// with any executable bit set. Does not probe it.
pub fn is_candidate(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("sh") {
        return false;
    }
    is_executable(path)
}

pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

/// List every candidate `.sh` file directly inside `dir` (non-recursive).
pub fn scan(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    Ok(list_sh_files(dir)?.into_iter().filter(|p| is_executable(p)).collect())
}

/// List every `.sh` file directly inside `dir`, regardless of executable
/// bit. Used by the permission-flip poller, which needs to notice files
/// that are not (yet) candidates.
pub fn list_sh_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("sh") {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
