//! Private-file helpers.
//!
//! Directories holding state are created `0700` and files `0600` on unix.
//! Existing permissions are never changed, only inspected.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{PersistError, PersistResult};

/// Mode for directories holding state.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Mode for state and log files.
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Path of the temporary sibling used by [`write_atomic`].
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map_or_else(|| OsString::from("state"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

fn private_file_options() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    #[cfg(unix)]
    options.mode(PRIVATE_FILE_MODE);
    options
}

/// Creates `dir` (and parents) if missing; a newly created `dir` gets `0700`.
pub async fn ensure_private_dir(dir: &Path) -> PersistResult<()> {
    if fs::try_exists(dir)
        .await
        .map_err(|e| PersistError::io(dir, e))?
    {
        return Ok(());
    }

    fs::create_dir_all(dir)
        .await
        .map_err(|e| PersistError::io(dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, std::fs::Permissions::from_mode(PRIVATE_DIR_MODE))
            .await
            .map_err(|e| PersistError::io(dir, e))?;
    }

    debug!(dir = %dir.display(), "created private directory");
    Ok(())
}

/// Writes `data` to `path` via a temporary file and an atomic rename.
///
/// The parent directory is created if needed. The file ends up `0600`.
pub async fn write_atomic(path: &Path, data: &[u8]) -> PersistResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_private_dir(parent).await?;
    }

    let tmp = temp_path(path);
    let result = write_then_rename(&tmp, path, data).await;
    if result.is_err() {
        // best effort, the original error is what matters
        let _ = fs::remove_file(&tmp).await;
    }
    result
}

async fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> PersistResult<()> {
    let mut file = private_file_options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(tmp)
        .await
        .map_err(|e| PersistError::io(tmp, e))?;
    file.write_all(data)
        .await
        .map_err(|e| PersistError::io(tmp, e))?;
    file.sync_all()
        .await
        .map_err(|e| PersistError::io(tmp, e))?;
    drop(file);

    fs::rename(tmp, path)
        .await
        .map_err(|e| PersistError::io(path, e))
}

/// Appends `line` plus a newline to `path` with a single write call.
///
/// The file is created `0600` if it does not exist.
pub async fn append_line(path: &Path, line: &str) -> PersistResult<()> {
    let mut record = String::with_capacity(line.len() + 1);
    record.push_str(line);
    record.push('\n');

    let mut file = private_file_options()
        .append(true)
        .create(true)
        .open(path)
        .await
        .map_err(|e| PersistError::io(path, e))?;
    file.write_all(record.as_bytes())
        .await
        .map_err(|e| PersistError::io(path, e))?;
    file.flush().await.map_err(|e| PersistError::io(path, e))
}

/// Permission bits of `path`, or `None` if it does not exist.
///
/// Always `None` on platforms without unix permissions.
pub async fn mode_of(path: &Path) -> io::Result<Option<u32>> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(permission_bits(&meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn permission_bits(meta: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permission_bits(_meta: &std::fs::Metadata) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_is_a_sibling() {
        let tmp = temp_path(Path::new("/var/lib/aegis/vault.enc"));
        assert_eq!(tmp, PathBuf::from("/var/lib/aegis/vault.enc.tmp"));
    }

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.enc");

        write_atomic(&path, b"first").await.expect("write");
        write_atomic(&path, b"second").await.expect("overwrite");

        let content = fs::read(&path).await.expect("read");
        assert_eq!(content, b"second");
        assert!(!fs::try_exists(temp_path(&path)).await.expect("exists"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn written_files_and_dirs_are_private() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state_dir = dir.path().join("state");
        let path = state_dir.join("state.enc");

        write_atomic(&path, b"data").await.expect("write");

        assert_eq!(mode_of(&state_dir).await.expect("mode"), Some(PRIVATE_DIR_MODE));
        assert_eq!(mode_of(&path).await.expect("mode"), Some(PRIVATE_FILE_MODE));
    }

    #[tokio::test]
    async fn append_line_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");

        append_line(&path, "{\"a\":1}").await.expect("append 1");
        append_line(&path, "{\"a\":2}").await.expect("append 2");

        let content = fs::read_to_string(&path).await.expect("read");
        assert_eq!(content, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[tokio::test]
    async fn mode_of_missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mode = mode_of(&dir.path().join("missing")).await.expect("mode");
        assert!(mode.is_none());
    }
}
