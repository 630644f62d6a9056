//! Frame header codec and path safety helpers shared by the transport and
//! the download pipeline.

use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};

use crate::protocol::{HEADER_LEN, MAGIC, MAX_FRAME_SIZE, VERSION};

/// Resolve a server-provided relative path under the sync root.
/// Rejects absolute paths, parent components and NUL bytes so a download
/// can never land outside `root`.
pub fn normalize_under_root(root: &Path, p: &Path) -> Result<PathBuf> {
    use Component::{CurDir, Normal, ParentDir, Prefix, RootDir};

    if p.to_string_lossy().contains('\0') {
        bail!("path contains NUL byte");
    }

    let mut safe = PathBuf::new();
    for component in p.components() {
        match component {
            CurDir => {}
            Normal(s) => {
                // On Windows, reject components with ':' (ADS)
                #[cfg(windows)]
                if s.to_string_lossy().contains(':') {
                    bail!("path component contains colon");
                }
                safe.push(s);
            }
            ParentDir | RootDir | Prefix(_) => {
                bail!("path contains disallowed component: {:?}", component);
            }
        }
    }
    if safe.as_os_str().is_empty() {
        bail!("path {:?} does not name a file", p);
    }

    let joined = root.join(&safe);
    check_contained(root, &joined)
        .with_context(|| format!("path {:?} escapes root {:?}", p, root))?;

    Ok(joined)
}

/// The nearest existing ancestor of `path` (or `path` itself) must resolve
/// under `root` once symlinks are followed. A dangling symlink fails.
pub fn check_contained(root: &Path, path: &Path) -> Result<()> {
    let canon_root = root
        .canonicalize()
        .with_context(|| format!("canonicalize {}", root.display()))?;

    let mut existing = path;
    while existing.symlink_metadata().is_err() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => bail!("no existing ancestor of {}", path.display()),
        }
    }
    let canon = existing
        .canonicalize()
        .with_context(|| format!("canonicalize {}", existing.display()))?;
    if !canon.starts_with(&canon_root) {
        bail!("{} resolves outside {}", existing.display(), canon_root.display());
    }
    Ok(())
}

/// Resolve `rel` under `root` and make it ready to be created: parents are
/// created, re-checked against the root, and an existing symlink or
/// directory at the destination is refused.
pub async fn prepare_destination(root: &Path, rel: &Path) -> Result<PathBuf> {
    let dest = normalize_under_root(root, rel)?;
    ensure_parent_exists(&dest).await?;
    if let Some(parent) = dest.parent() {
        check_contained(root, parent)?;
    }
    match tokio::fs::symlink_metadata(&dest).await {
        Ok(md) if md.file_type().is_symlink() => {
            bail!("refusing to write through symlink {}", dest.display())
        }
        Ok(md) if md.is_dir() => bail!("{} is a directory", dest.display()),
        _ => {}
    }
    Ok(dest)
}

/// Validate a frame payload length against `MAX_FRAME_SIZE`
pub fn validate_frame_size(size: usize) -> Result<()> {
    if size > MAX_FRAME_SIZE {
        bail!("frame payload too large: {} bytes (max: {})", size, MAX_FRAME_SIZE);
    }
    Ok(())
}

/// Build frame header (11 bytes)
/// Format: MAGIC (4) | VERSION (2) | TYPE (1) | LENGTH (4)
pub fn build_frame_header(frame_type: u8, payload_len: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(MAGIC);
    header[4..6].copy_from_slice(&VERSION.to_le_bytes());
    header[6] = frame_type;
    header[7..11].copy_from_slice(&payload_len.to_le_bytes());
    header
}

/// Parse frame header
/// Returns: (frame_type, payload_length)
pub fn parse_frame_header(header: &[u8; HEADER_LEN]) -> Result<(u8, u32)> {
    if &header[0..4] != MAGIC {
        bail!("invalid magic in frame header");
    }

    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != VERSION {
        bail!("protocol version mismatch: got {}, expected {}", version, VERSION);
    }

    let frame_type = header[6];
    let payload_len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]);

    Ok((frame_type, payload_len))
}

/// Create parent directory if needed
pub async fn ensure_parent_exists(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_under_root_safe_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let result = normalize_under_root(root, Path::new("docs/b.txt")).unwrap();
        assert_eq!(result, root.join("docs").join("b.txt"));

        let result = normalize_under_root(root, Path::new("./docs/./b.txt")).unwrap();
        assert_eq!(result, root.join("docs").join("b.txt"));
    }

    #[test]
    fn test_normalize_under_root_unsafe_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        assert!(normalize_under_root(root, Path::new("../etc/passwd")).is_err());
        assert!(normalize_under_root(root, Path::new("docs/../../etc/passwd")).is_err());
        assert!(normalize_under_root(root, Path::new("/etc/passwd")).is_err());
        assert!(normalize_under_root(root, Path::new("file\0.txt")).is_err());
        assert!(normalize_under_root(root, Path::new(".")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_rejects_symlinked_parent_outside_root() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(outside.path(), root.join("link")).unwrap();

        assert!(normalize_under_root(root, Path::new("link/file.txt")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_rejects_missing_dirs_below_symlinked_dir() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(outside.path(), root.join("link")).unwrap();

        assert!(normalize_under_root(root, Path::new("link/sub/deeper/f.txt")).is_err());
        assert!(!outside.path().join("sub").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_rejects_dangling_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("gone"), root.join("dangling")).unwrap();

        assert!(normalize_under_root(root, Path::new("dangling")).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prepare_destination_refuses_symlinked_leaf() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        // Link target inside the root still must not be written through
        fs::write(root.join("real.txt"), b"keep").unwrap();
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("b.txt")).unwrap();

        assert!(prepare_destination(root, Path::new("b.txt")).await.is_err());
        assert_eq!(fs::read(root.join("real.txt")).unwrap(), b"keep");
    }

    #[tokio::test]
    async fn test_prepare_destination_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let dest = prepare_destination(root, Path::new("docs/sub/b.txt")).await.unwrap();
        assert_eq!(dest, root.join("docs/sub/b.txt"));
        assert!(root.join("docs/sub").is_dir());

        fs::create_dir(root.join("docs/sub/dir")).unwrap();
        assert!(prepare_destination(root, Path::new("docs/sub/dir")).await.is_err());
    }

    #[test]
    fn test_frame_header_round_trip() {
        let header = build_frame_header(crate::protocol::frame::BLOCK, 12345);
        let (parsed_type, parsed_len) = parse_frame_header(&header).unwrap();

        assert_eq!(parsed_type, crate::protocol::frame::BLOCK);
        assert_eq!(parsed_len, 12345);
    }

    #[test]
    fn test_parse_frame_header_invalid_magic() {
        let mut header = build_frame_header(1, 100);
        header[0..4].copy_from_slice(b"WRNG");

        assert!(parse_frame_header(&header).is_err());
    }

    #[test]
    fn test_parse_frame_header_wrong_version() {
        let mut header = build_frame_header(1, 100);
        header[4..6].copy_from_slice(&999u16.to_le_bytes());

        assert!(parse_frame_header(&header).is_err());
    }

    #[test]
    fn test_validate_frame_size_edge_cases() {
        assert!(validate_frame_size(0).is_ok()); // Empty payload is valid
        assert!(validate_frame_size(MAX_FRAME_SIZE).is_ok());
        assert!(validate_frame_size(MAX_FRAME_SIZE + 1).is_err());
    }

    #[tokio::test]
    async fn test_ensure_parent_exists() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("new").join("nested").join("file.txt");

        assert!(!file_path.parent().unwrap().exists());
        ensure_parent_exists(&file_path).await.unwrap();
        assert!(fs::metadata(file_path.parent().unwrap()).unwrap().is_dir());

        // Idempotent
        ensure_parent_exists(&file_path).await.unwrap();
    }
}
