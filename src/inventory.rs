use anyhow::{bail, Context, Result};
use std::path::Path;
use walkdir::WalkDir;

use crate::record::{normalize_separators, FileRecord};
// Local inventory: every regular file under the sync root

/// Enumerate regular files beneath `root`, sorted per directory by name.
///
/// The root itself must be a readable directory; entries below it that
/// cannot be read are skipped.
pub fn scan(root: &Path) -> Result<Vec<FileRecord>> {
    let md = std::fs::metadata(root)
        .with_context(|| format!("cannot read sync directory {}", root.display()))?;
    if !md.is_dir() {
        bail!("sync directory {} is not a directory", root.display());
    }

    let mut records = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = match entry {
            Ok(e) => e,
            // Unreadable root is fatal, anything deeper is skipped
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("scan {}", root.display()))
            }
            Err(_) => continue,
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            if let Some(path) = to_relative_slash_path(root, entry.path()) {
                records.push(FileRecord::new(path, metadata.len()));
            }
        } // else: skip unreadable entries
    }

    Ok(records)
}

/// Path of `path` relative to `root` with forward-slash separators.
/// Returns None when `path` is not under `root` or is the root itself.
pub fn to_relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(normalize_separators(&parts.join("/")))
}
