// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use almanac_ical::{Component, Environment, parse_string};
use fs2::FileExt;

use crate::set::SetBackend;
use crate::{SetKind, StoreConfig, StoreError};

/// Every component of the set in one iCalendar file.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    safe_save: bool,
    lock: Option<File>,
}

impl FileBackend {
    /// Opens the file named by `config.path`, taking its lock if
    /// `config.lock` is set. The file itself is created on first commit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another handle holds the lock.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        tracing::info!(path = %config.path.display(), read_only = config.read_only, "opening file set");
        let lock = match config.lock {
            true => Some(acquire_lock(&lock_path(&config.path), config.read_only)?),
            false => None,
        };
        Ok(Self {
            path: config.path.clone(),
            safe_save: config.safe_save,
            lock,
        })
    }
}

impl SetBackend for FileBackend {
    fn kind(&self) -> SetKind {
        SetKind::File
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn cluster_keys(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(vec![String::new()])
    }

    fn cluster_key(&self, _component: &Component) -> Result<String, StoreError> {
        Ok(String::new())
    }

    fn load(&mut self, _key: &str, env: &Environment) -> Result<Vec<Component>, StoreError> {
        read_components(&self.path, env)
    }

    fn store(&mut self, _key: &str, root: &Component) -> Result<(), StoreError> {
        write_components(&self.path, root, self.safe_save)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(lock) = self.lock.take() {
            tracing::debug!(path = %self.path.display(), "releasing lock");
            FileExt::unlock(&lock).map_err(|e| StoreError::io(lock_path(&self.path), e))?;
        }
        Ok(())
    }
}

/// The sidecar file locked on behalf of `path`.
pub(crate) fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

/// Takes an advisory lock on `path`, shared for readers and exclusive for
/// writers, without waiting.
pub(crate) fn acquire_lock(path: &Path, shared: bool) -> Result<File, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;

    let locked = match shared {
        true => FileExt::try_lock_shared(&file),
        false => FileExt::try_lock_exclusive(&file),
    };
    match locked {
        Ok(()) => Ok(file),
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
            tracing::warn!(path = %path.display(), "lock is held by another handle");
            Err(StoreError::Locked(path.to_owned()))
        }
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Reads the components of an iCalendar file; a missing file holds none.
/// Several top-level components come back wrapped in one XROOT.
pub(crate) fn read_components(
    path: &Path,
    env: &Environment,
) -> Result<Vec<Component>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no file yet, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };
    Ok(vec![parse_string(&text, env)?])
}

/// Writes the children of `root` to `path`, through a temporary file
/// renamed over the original when `safe_save` is set.
pub(crate) fn write_components(
    path: &Path,
    root: &Component,
    safe_save: bool,
) -> Result<(), StoreError> {
    let text = almanac_ical::formatter::format(root).map_err(|e| StoreError::io(path, e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    if safe_save {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        let temp = path.with_file_name(name);
        fs::write(&temp, text).map_err(|e| StoreError::io(&temp, e))?;
        fs::rename(&temp, path).map_err(|e| StoreError::io(path, e))?;
    } else {
        fs::write(path, text).map_err(|e| StoreError::io(path, e))?;
    }
    tracing::debug!(path = %path.display(), safe_save, "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_is_a_sibling() {
        assert_eq!(
            lock_path(Path::new("/var/cal/work.ics")),
            PathBuf::from("/var/cal/work.ics.lock")
        );
    }

    #[test]
    fn exclusive_lock_excludes_readers() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("set.ics.lock");

        let writer = acquire_lock(&path, false).expect("Failed to lock");
        let err = acquire_lock(&path, true).expect_err("Lock should be held");
        assert!(matches!(err, StoreError::Locked(_)));

        drop(writer);
        let _reader = acquire_lock(&path, true).expect("Failed to lock after release");
        let _another = acquire_lock(&path, true).expect("Shared locks should coexist");
    }
}
