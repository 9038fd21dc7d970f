//! Where exported documents go and how they get there.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;

use crate::error::Result;

/// Picks the destination for an exported document.
///
/// - no `out`: `./{stem}.{extension}`
/// - an existing directory: `{out}/{stem}.{extension}`
/// - anything else: `out` as given
pub fn resolve_output_path(out: Option<&Path>, stem: &str, extension: &str) -> PathBuf {
    let file_name = format!("{}.{}", stem, extension);
    match out {
        None => PathBuf::from(file_name),
        Some(dir) if dir.is_dir() => dir.join(file_name),
        Some(path) => path.to_path_buf(),
    }
}

/// Writes `bytes` to `path` atomically.
///
/// The bytes go to a temp file next to the destination, which is flushed,
/// synced and then renamed over `path`. On failure the destination is left
/// untouched and the temp file is removed.
pub fn write_document(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_directory_and_file_targets() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_output_path(None, "a", "xlsx"),
            PathBuf::from("a.xlsx")
        );
        assert_eq!(
            resolve_output_path(Some(dir.path()), "a", "pdf"),
            dir.path().join("a.pdf")
        );
        let file = dir.path().join("custom.bin");
        assert_eq!(resolve_output_path(Some(&file), "a", "pdf"), file);
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("out.xlsx");
        write_document(&path, b"first").unwrap();
        write_document(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
