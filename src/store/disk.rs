use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{StoreError, credential::StoreDocument};

/// Read and parse the store document. A missing file is an empty store.
pub(crate) fn read_document(path: &Path) -> Result<StoreDocument, StoreError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreDocument::default()),
        Err(source) => {
            return Err(StoreError::Unavailable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&text).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Serialize `doc` next to `path`, fsync, rename over `path`, then fsync the
/// directory so the rename itself is durable.
pub(crate) fn write_document(path: &Path, doc: &StoreDocument) -> Result<(), StoreError> {
    let text = toml::to_string_pretty(doc).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: format!("serialize: {e}"),
    })?;

    ensure_parent(path)?;
    let temp_path = path.with_extension("toml.tmp");
    let unavailable = |source| StoreError::Unavailable {
        path: temp_path.clone(),
        source,
    };

    let mut file = create_private(&temp_path).map_err(unavailable)?;
    file.write_all(text.as_bytes()).map_err(unavailable)?;
    file.sync_all().map_err(unavailable)?;
    drop(file);

    std::fs::rename(&temp_path, path).map_err(|source| StoreError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;
    sync_parent(path)?;
    tracing::debug!(path = %path.display(), serials = doc.serials.len(), "Store written");
    Ok(())
}

/// Create or truncate `path` readable by the owner only. The mode is applied
/// at creation and again afterwards, since an existing file keeps its old one.
#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    File::create(path)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|source| StoreError::Unavailable {
            path: dir.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Path of the advisory lock file guarding writers of `path`.
pub(crate) fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("toml.lock")
}

/// Open (creating if needed) the lock file for `path`.
pub(crate) fn open_lock_file(path: &Path) -> Result<File, StoreError> {
    ensure_parent(path)?;
    let lock_path = lock_path(path);
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|source| StoreError::Unavailable {
            path: lock_path,
            source,
        })
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Unavailable {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
