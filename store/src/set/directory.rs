// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use almanac_ical::{Component, Environment};
use fs2::FileExt;
use uuid::Uuid;

use crate::set::SetBackend;
use crate::set::file::{acquire_lock, read_components, write_components};
use crate::{SetKind, StoreConfig, StoreError};

const LOCK_FILE: &str = ".lock";

/// One iCalendar file per month, named `YYYYMM.ics`, in a directory.
///
/// A component goes into the month of its `DTSTAMP`, or of its `DTSTART`
/// when it has none.
#[derive(Debug)]
pub struct DirectoryBackend {
    dir: PathBuf,
    safe_save: bool,
    lock: Option<File>,
}

impl DirectoryBackend {
    /// Opens the directory named by `config.path`, creating it unless the
    /// set is read-only.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another handle holds the lock, or
    /// an I/O error if the directory cannot be created.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        tracing::info!(dir = %config.path.display(), read_only = config.read_only, "opening directory set");
        if !config.read_only {
            fs::create_dir_all(&config.path).map_err(|e| StoreError::io(&config.path, e))?;
        }
        let lock = match config.lock {
            true => Some(acquire_lock(&config.path.join(LOCK_FILE), config.read_only)?),
            false => None,
        };
        Ok(Self {
            dir: config.path.clone(),
            safe_save: config.safe_save,
            lock,
        })
    }

    fn cluster_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.ics"))
    }
}

impl SetBackend for DirectoryBackend {
    fn kind(&self) -> SetKind {
        SetKind::Directory
    }

    fn location(&self) -> &Path {
        &self.dir
    }

    fn cluster_keys(&mut self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            if path.extension().is_none_or(|ext| ext != "ics") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_month_key(stem) => keys.push(stem.to_string()),
                _ => tracing::debug!(path = %path.display(), "skipping file outside the month layout"),
            }
        }
        keys.sort();
        tracing::debug!(dir = %self.dir.display(), clusters = keys.len(), "listed clusters");
        Ok(keys)
    }

    fn cluster_key(&self, component: &Component) -> Result<String, StoreError> {
        let time = component
            .dtstamp()
            .or_else(|| component.dtstart())
            .ok_or_else(|| {
                StoreError::BadArgument(format!(
                    "{} has neither DTSTAMP nor DTSTART",
                    component.name()
                ))
            })?;
        let date = time.civil_date();
        Ok(format!("{:04}{:02}", date.year(), date.month()))
    }

    fn prepare(&mut self, component: &mut Component) {
        if component.uid().is_none() {
            let uid = Uuid::new_v4().to_string();
            tracing::debug!(uid, "generated UID");
            component.set_uid(uid);
        }
    }

    fn load(&mut self, key: &str, env: &Environment) -> Result<Vec<Component>, StoreError> {
        read_components(&self.cluster_path(key), env)
    }

    fn store(&mut self, key: &str, root: &Component) -> Result<(), StoreError> {
        write_components(&self.cluster_path(key), root, self.safe_save)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(lock) = self.lock.take() {
            tracing::debug!(dir = %self.dir.display(), "releasing lock");
            FileExt::unlock(&lock).map_err(|e| StoreError::io(self.dir.join(LOCK_FILE), e))?;
        }
        Ok(())
    }
}

fn is_month_key(stem: &str) -> bool {
    stem.len() == 6 && stem.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use almanac_ical::{Environment, parse_string};

    use super::*;

    fn backend(dir: &Path) -> DirectoryBackend {
        let config = StoreConfig::new(SetKind::Directory, dir);
        DirectoryBackend::open(&config).expect("Failed to open directory")
    }

    #[test]
    fn keys_come_from_dtstamp_then_dtstart() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let backend = backend(dir.path());
        let env = Environment::default();

        let stamped = parse_string(
            "BEGIN:VEVENT\r\nDTSTAMP:20250102T030405Z\r\nDTSTART:20261201T090000Z\r\nEND:VEVENT\r\n",
            &env,
        )
        .expect("Failed to parse");
        assert_eq!(backend.cluster_key(&stamped).expect("No key"), "202501");

        let started = parse_string(
            "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nDTSTART;VALUE=DATE:20260930\r\nEND:VTODO\r\nEND:VCALENDAR\r\n",
            &env,
        )
        .expect("Failed to parse");
        assert_eq!(backend.cluster_key(&started).expect("No key"), "202609");

        let bare = Component::new(almanac_ical::ComponentKind::VJournal);
        assert!(matches!(
            backend.cluster_key(&bare),
            Err(StoreError::BadArgument(_))
        ));
    }

    #[test]
    fn only_month_files_are_clusters() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for name in ["202503.ics", "202501.ics", "notes.ics", "202502.txt", "2025.ics"] {
            fs::write(dir.path().join(name), "").expect("Failed to write file");
        }
        let mut backend = backend(dir.path());
        assert_eq!(
            backend.cluster_keys().expect("Failed to list"),
            vec!["202501", "202503"]
        );
    }

    #[test]
    fn prepare_keeps_existing_uids() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut backend = backend(dir.path());

        let mut fresh = Component::new(almanac_ical::ComponentKind::VEvent);
        backend.prepare(&mut fresh);
        let uid = fresh.uid().expect("UID should be generated").to_string();
        assert_eq!(uid.len(), 36);

        backend.prepare(&mut fresh);
        assert_eq!(fresh.uid(), Some(uid.as_str()));
    }
}
