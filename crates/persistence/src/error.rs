use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::backup::BackupError;
use crate::config::ConfigError;
use crate::migration::MigrationError;
use crate::pipeline::PipelineError;
use crate::profile::ProfileError;
use crate::slot::SlotId;

/// Coarse failure classes reported to the host and carried on events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveErrorKind {
    InvalidSlot,
    NotFound,
    Corrupted,
    IoFailure,
    ComponentSerializationFailure,
    UnsupportedVersion,
    NoMigrationPath,
    MigrationFailed,
    Busy,
    Unrecoverable,
    NoActiveSlot,
    Pipeline,
    Config,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("slot {slot} is out of range (max_save_slots = {max_slots})")]
    InvalidSlot { slot: SlotId, max_slots: u32 },
    #[error("no save file for slot {slot} at {path}")]
    NotFound { slot: SlotId, path: PathBuf },
    #[error("save file {path} is corrupted: {source}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: PipelineError,
    },
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("save file {path} was written by a newer build: {source}")]
    UnsupportedFormat {
        path: PathBuf,
        #[source]
        source: PipelineError,
    },
    #[error(transparent)]
    Pipeline(PipelineError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error("slot {slot} already has a save or load in progress")]
    Busy { slot: SlotId },
    #[error("slot {slot} is corrupted and none of its {backups_tried} backups could be loaded")]
    Unrecoverable { slot: SlotId, backups_tried: u32 },
    #[error("no active slot is set")]
    NoActiveSlot,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl SaveError {
    pub(crate) fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Classifies a decode failure of the file at `path`.
    pub(crate) fn from_decode(path: &Path, source: PipelineError) -> Self {
        if source.is_corruption() {
            Self::Corrupted {
                path: path.to_path_buf(),
                source,
            }
        } else if source.is_newer_format() {
            Self::UnsupportedFormat {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Self::Pipeline(source)
        }
    }

    pub fn kind(&self) -> SaveErrorKind {
        match self {
            Self::InvalidSlot { .. } => SaveErrorKind::InvalidSlot,
            Self::NotFound { .. } => SaveErrorKind::NotFound,
            Self::Corrupted { .. } => SaveErrorKind::Corrupted,
            Self::Io { .. } | Self::Backup(_) => SaveErrorKind::IoFailure,
            Self::UnsupportedFormat { .. } => SaveErrorKind::UnsupportedVersion,
            Self::Pipeline(_) => SaveErrorKind::Pipeline,
            Self::Migration(error) => match error {
                MigrationError::UnsupportedVersion { .. } => SaveErrorKind::UnsupportedVersion,
                MigrationError::NoMigrationPath { .. } => SaveErrorKind::NoMigrationPath,
                MigrationError::StepFailed { .. }
                | MigrationError::DuplicateStep { .. }
                | MigrationError::StepBeyondCurrent { .. } => SaveErrorKind::MigrationFailed,
            },
            Self::Busy { .. } => SaveErrorKind::Busy,
            Self::Unrecoverable { .. } => SaveErrorKind::Unrecoverable,
            Self::NoActiveSlot => SaveErrorKind::NoActiveSlot,
            Self::Config(_) => SaveErrorKind::Config,
            Self::Profile(ProfileError::Io { .. }) => SaveErrorKind::IoFailure,
            Self::Profile(ProfileError::Corrupted { .. }) => SaveErrorKind::Corrupted,
            Self::Profile(ProfileError::InvalidId { .. }) => SaveErrorKind::Config,
            Self::Profile(ProfileError::Encode { .. }) => SaveErrorKind::Pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ContainerError;

    #[test]
    fn migration_errors_map_to_distinct_kinds() {
        let unsupported = SaveError::from(MigrationError::UnsupportedVersion {
            found: 4,
            current: 2,
        });
        let gap = SaveError::from(MigrationError::NoMigrationPath { from: 1, current: 2 });
        assert_eq!(unsupported.kind(), SaveErrorKind::UnsupportedVersion);
        assert_eq!(gap.kind(), SaveErrorKind::NoMigrationPath);
    }

    #[test]
    fn decode_failures_split_by_cause() {
        let path = Path::new("save_0.sav");
        let damaged = SaveError::from_decode(
            path,
            PipelineError::Container(ContainerError::Malformed("invalid magic")),
        );
        let newer = SaveError::from_decode(
            path,
            PipelineError::Container(ContainerError::UnsupportedContainerVersion {
                found: 2,
                expected: 1,
            }),
        );
        let keyless = SaveError::from_decode(path, PipelineError::CipherUnavailable);
        assert_eq!(damaged.kind(), SaveErrorKind::Corrupted);
        assert_eq!(newer.kind(), SaveErrorKind::UnsupportedVersion);
        assert_eq!(keyless.kind(), SaveErrorKind::Pipeline);
    }

    #[test]
    fn invalid_slot_message_names_the_bound() {
        let error = SaveError::InvalidSlot {
            slot: SlotId::Index(5),
            max_slots: 5,
        };
        assert_eq!(
            error.to_string(),
            "slot 5 is out of range (max_save_slots = 5)"
        );
    }
}
