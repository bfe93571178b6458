//! Replace a file's content without leaving it half-written

use crate::error::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Write new content for `dest` through a temporary file in the same
/// directory, then rename it over `dest`
///
/// The permissions of an existing `dest` are carried over to the new file.
pub(crate) fn replace_file<F>(dest: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    // Replace the link target, not the link
    let resolved;
    let dest = match fs::symlink_metadata(dest) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            resolved = fs::canonicalize(dest)?;
            resolved.as_path()
        }
        _ => dest,
    };

    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut temp = NamedTempFile::new_in(&dir)?;
    write(temp.as_file_mut())?;
    temp.as_file_mut().flush()?;

    if let Ok(metadata) = fs::metadata(dest) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }
    temp.persist(dest)?;
    Ok(())
}
