use super::PersistError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Replaces `path` with `bytes` through a sibling `.tmp` file and a rename,
/// so readers see either the old or the new content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let tmp = temp_path(path);
    let result = write_then_rename(&tmp, path, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let mut file = File::create(tmp).map_err(|err| PersistError::io(tmp, err))?;
    file.write_all(bytes).map_err(|err| PersistError::io(tmp, err))?;
    file.sync_all().map_err(|err| PersistError::io(tmp, err))?;
    drop(file);
    fs::rename(tmp, path).map_err(|err| PersistError::io(path, err))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "file replaced");
    Ok(())
}
