use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::atomic_io::{remove_if_exists, write_bytes_atomic};
use crate::slot::{SlotId, SlotLayout};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup {operation} failed for {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BackupError {
    fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome<T> {
    /// Backup `index` validated and now also sits at the primary path.
    Recovered { index: u32, value: T },
    Exhausted { tried: u32 },
}

/// Keeps up to `max_backups` byte-identical copies of each slot's primary
/// file, index 0 newest.
#[derive(Debug, Clone)]
pub struct BackupManager {
    layout: SlotLayout,
    max_backups: u32,
}

impl BackupManager {
    pub fn new(layout: SlotLayout, max_backups: u32) -> Self {
        Self {
            layout,
            max_backups,
        }
    }

    pub fn max_backups(&self) -> u32 {
        self.max_backups
    }

    /// Shifts `n -> n + 1`, evicting the oldest, then copies the current primary
    /// into backup 0. Call only after the primary write has completed.
    ///
    /// Returns how many backups the slot has afterwards.
    pub fn create_backup(&self, slot: SlotId) -> Result<u32, BackupError> {
        if self.max_backups == 0 {
            return Ok(0);
        }
        let primary = self.layout.primary_path(slot);
        let bytes = fs::read(&primary).map_err(|error| BackupError::io("read", &primary, error))?;

        let oldest_kept = self.max_backups - 1;
        for index in self.backup_indices(slot)? {
            if index >= oldest_kept {
                let path = self.layout.backup_path(slot, index);
                remove_if_exists(&path).map_err(|error| BackupError::io("evict", &path, error))?;
                debug!(slot = %slot, index, "backup_evicted");
            }
        }
        for index in (0..oldest_kept).rev() {
            let from = self.layout.backup_path(slot, index);
            if !from.exists() {
                continue;
            }
            let to = self.layout.backup_path(slot, index + 1);
            fs::rename(&from, &to).map_err(|error| BackupError::io("shift", &from, error))?;
        }

        let newest = self.layout.backup_path(slot, 0);
        write_bytes_atomic(&newest, &bytes)
            .map_err(|error| BackupError::io("write", &newest, error))?;

        let count = u32::try_from(self.backup_indices(slot)?.len()).unwrap_or(u32::MAX);
        info!(slot = %slot, backups = count, "backup_rotated");
        Ok(count)
    }

    /// Backup indices present on disk for `slot`, ascending (newest first).
    pub fn backup_indices(&self, slot: SlotId) -> Result<Vec<u32>, BackupError> {
        let dir = self.layout.save_dir();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(BackupError::io("list", dir, error)),
        };

        let mut indices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| BackupError::io("list", dir, error))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(index) = self.layout.parse_backup_index(slot, file_name) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    pub fn backup_paths(&self, slot: SlotId) -> Result<Vec<(u32, PathBuf)>, BackupError> {
        Ok(self
            .backup_indices(slot)?
            .into_iter()
            .map(|index| (index, self.layout.backup_path(slot, index)))
            .collect())
    }

    /// Tries backups newest to oldest. The first one `validate` accepts is
    /// copied over the primary and its decoded value returned.
    pub fn recover<T, E, F>(
        &self,
        slot: SlotId,
        mut validate: F,
    ) -> Result<RecoveryOutcome<T>, BackupError>
    where
        E: Display,
        F: FnMut(&[u8]) -> Result<T, E>,
    {
        let mut tried = 0u32;
        for (index, path) in self.backup_paths(slot)? {
            tried += 1;
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(error) => {
                    warn!(slot = %slot, index, error = %error, "backup_unreadable");
                    continue;
                }
            };
            match validate(&bytes) {
                Ok(value) => {
                    let primary = self.layout.primary_path(slot);
                    write_bytes_atomic(&primary, &bytes)
                        .map_err(|error| BackupError::io("restore", &primary, error))?;
                    info!(slot = %slot, index, "backup_restored");
                    return Ok(RecoveryOutcome::Recovered { index, value });
                }
                Err(error) => {
                    warn!(slot = %slot, index, error = %error, "backup_invalid");
                }
            }
        }
        Ok(RecoveryOutcome::Exhausted { tried })
    }

    pub fn delete_backups(&self, slot: SlotId) -> Result<usize, BackupError> {
        let mut removed = 0usize;
        for (_, path) in self.backup_paths(slot)? {
            if remove_if_exists(&path).map_err(|error| BackupError::io("delete", &path, error))? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
