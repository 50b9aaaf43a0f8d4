use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::atomic_io::{remove_if_exists, write_text_atomic};
use crate::slot::SlotId;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile id '{id}': use ASCII letters, digits, '_' or '-'")]
    InvalidId { id: String },
    #[error("failed to {operation} profile file {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("profile file {path} is invalid: {message}")]
    Corrupted { path: PathBuf, message: String },
    #[error("failed to encode profile '{id}': {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Cross-save player identity, stored apart from slot files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub profile_id: String,
    pub display_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub last_slot: Option<SlotId>,
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl PlayerProfile {
    pub fn new(
        profile_id: impl Into<String>,
        display_name: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            display_name: display_name.into(),
            created_at,
            last_slot: None,
            settings: BTreeMap::new(),
        }
    }
}

/// Reads and writes `profile_{id}.json` files in one directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, profile_id: &str) -> Result<PathBuf, ProfileError> {
        validate_profile_id(profile_id)?;
        Ok(self.dir.join(format!("profile_{profile_id}.json")))
    }

    pub fn load(&self, profile_id: &str) -> Result<Option<PlayerProfile>, ProfileError> {
        let path = self.path_for(profile_id)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProfileError::Io {
                    operation: "read",
                    path,
                    source,
                })
            }
        };

        let profile = parse_profile_json(&raw).map_err(|message| ProfileError::Corrupted {
            path: path.clone(),
            message,
        })?;
        if profile.profile_id != profile_id {
            return Err(ProfileError::Corrupted {
                path,
                message: format!(
                    "profile_id '{}' does not match file name id '{profile_id}'",
                    profile.profile_id
                ),
            });
        }
        debug!(profile_id, "profile_loaded");
        Ok(Some(profile))
    }

    pub fn save(&self, profile: &PlayerProfile) -> Result<PathBuf, ProfileError> {
        let path = self.path_for(&profile.profile_id)?;
        let json = serde_json::to_string_pretty(profile).map_err(|source| ProfileError::Encode {
            id: profile.profile_id.clone(),
            source,
        })?;
        write_text_atomic(&path, &json).map_err(|source| ProfileError::Io {
            operation: "write",
            path: path.clone(),
            source,
        })?;
        info!(profile_id = %profile.profile_id, path = %path.display(), "profile_saved");
        Ok(path)
    }

    /// Returns whether a file was removed.
    pub fn delete(&self, profile_id: &str) -> Result<bool, ProfileError> {
        let path = self.path_for(profile_id)?;
        remove_if_exists(&path).map_err(|source| ProfileError::Io {
            operation: "delete",
            path,
            source,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn validate_profile_id(profile_id: &str) -> Result<(), ProfileError> {
    let valid = !profile_id.is_empty()
        && profile_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ProfileError::InvalidId {
            id: profile_id.to_string(),
        })
    }
}

fn parse_profile_json(raw: &str) -> Result<PlayerProfile, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, PlayerProfile>(&mut deserializer) {
        Ok(profile) => Ok(profile),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(source.to_string())
            } else {
                Err(format!("at {path}: {source}"))
            }
        }
    }
}
