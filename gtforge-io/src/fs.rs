//! Filesystem helpers for dataset output

use gtforge_core::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Make sure `path` and all of its parents exist
///
/// Walks up to the first existing ancestor, then creates the missing
/// components top-down. Existing directories are left untouched.
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let mut missing = Vec::new();
    let mut current = Some(path);

    while let Some(dir) = current {
        if dir.as_os_str().is_empty() || dir.is_dir() {
            break;
        }
        missing.push(dir);
        current = dir.parent();
    }

    for dir in missing.into_iter().rev() {
        match fs::create_dir(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && dir.is_dir() => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Files in `dir` with the given extension (case-insensitive), sorted by file name
pub fn list_files_with_extension<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Zero-padded frame file name (`{index:06}.{extension}`)
pub fn frame_file_name(index: usize, extension: &str) -> String {
    format!("{index:06}.{extension}")
}

/// Zero-padded frame/instance file name (`{frame:06}_{instance:06}.{extension}`)
pub fn frame_instance_file_name(frame: usize, instance: usize, extension: &str) -> String {
    format!("{frame:06}_{instance:06}.{extension}")
}
