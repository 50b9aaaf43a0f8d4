use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::pipeline::CodecKind;

pub const DEFAULT_FILE_EXTENSION: &str = "sav";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SaveConfig {
    pub save_dir: PathBuf,
    pub file_extension: String,
    pub max_save_slots: u32,
    pub enable_encryption: bool,
    pub encryption_key: Option<String>,
    pub enable_compression: bool,
    pub enable_backups: bool,
    pub max_backups_per_slot: u32,
    /// `0` turns the timer off.
    pub auto_save_interval_seconds: u32,
    pub save_on_checkpoint: bool,
    pub save_on_scene_transition: bool,
    pub save_on_quit: bool,
    pub codec: CodecKind,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("saves"),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            max_save_slots: 10,
            enable_encryption: false,
            encryption_key: None,
            enable_compression: true,
            enable_backups: true,
            max_backups_per_slot: 3,
            auto_save_interval_seconds: 300,
            save_on_checkpoint: true,
            save_on_scene_transition: true,
            save_on_quit: true,
            codec: CodecKind::default(),
        }
    }
}

impl SaveConfig {
    pub fn with_save_dir(mut self, save_dir: impl Into<PathBuf>) -> Self {
        self.save_dir = save_dir.into();
        self
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn from_json_str(raw: &str) -> Result<Self, String> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        match serde_path_to_error::deserialize::<_, SaveConfig>(&mut deserializer) {
            Ok(config) => Ok(config),
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

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_storage()?;
        if self.enable_encryption && self.encryption_key.as_deref().map_or(true, str::is_empty) {
            return Err(missing_encryption_key());
        }
        Ok(())
    }

    /// Everything except the encryption key, which a caller-supplied cipher replaces.
    pub(crate) fn validate_storage(&self) -> Result<(), ConfigError> {
        if self.max_save_slots == 0 {
            return Err(invalid("max_save_slots", "must be at least 1"));
        }
        if self.enable_backups && self.max_backups_per_slot == 0 {
            return Err(invalid(
                "max_backups_per_slot",
                "must be at least 1 when backups are enabled",
            ));
        }
        let extension = self.file_extension.trim_start_matches('.');
        if extension.is_empty()
            || !extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid(
                "file_extension",
                format!("'{}' is not a plain file extension", self.file_extension),
            ));
        }
        if extension == "tmp" {
            return Err(invalid("file_extension", "'tmp' is reserved for partial writes"));
        }
        Ok(())
    }
}

pub(crate) fn missing_encryption_key() -> ConfigError {
    invalid("encryption_key", "required when enable_encryption is true")
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}
