// SPDX-License-Identifier: MIT

use super::*;
use std::os::unix::fs::PermissionsExt;

fn touch(dir: &tempfile::TempDir, name: &str, mode: u32) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
    path
}

#[test]
fn scan_finds_executable_sh_files_only() {
    let dir = tempfile::tempdir().unwrap();
    let good = touch(&dir, "greet.sh", 0o755);
    touch(&dir, "notes.txt", 0o755);
    touch(&dir, "disabled.sh", 0o644);

    let found = scan(dir.path()).unwrap();
    assert_eq!(found, vec![good]);
}

#[test]
fn scan_is_not_recursive() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    std::fs::write(nested.join("inner.sh"), "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(nested.join("inner.sh"), std::fs::Permissions::from_mode(0o755))
        .unwrap();

    let found = scan(dir.path()).unwrap();
    assert!(found.is_empty());
}

#[test]
fn is_candidate_rejects_non_sh_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = touch(&dir, "run.py", 0o755);
    assert!(!is_candidate(&path));
}
