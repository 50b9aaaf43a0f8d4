use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const QUICK_SLOT_NAME: &str = "quick";

/// A save slot: either a numbered slot in `[0, max_save_slots)` or the reserved quick-save slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SlotId {
    Index(u32),
    Quick,
}

impl SlotId {
    pub fn is_quick(self) -> bool {
        matches!(self, Self::Quick)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Quick => f.write_str(QUICK_SLOT_NAME),
        }
    }
}

impl From<u32> for SlotId {
    fn from(index: u32) -> Self {
        Self::Index(index)
    }
}

impl FromStr for SlotId {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(QUICK_SLOT_NAME) {
            return Ok(Self::Quick);
        }
        trimmed
            .parse::<u32>()
            .map(Self::Index)
            .map_err(|_| {
                format!("invalid slot '{raw}' (expected a slot index or '{QUICK_SLOT_NAME}')")
            })
    }
}

impl TryFrom<String> for SlotId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotId> for String {
    fn from(slot: SlotId) -> Self {
        slot.to_string()
    }
}

/// File naming for one save directory.
///
/// Primary: `save_{slot}.{ext}`. Backup `n`: `save_{slot}_backup_{n}.{ext}`.
#[derive(Debug, Clone)]
pub struct SlotLayout {
    save_dir: PathBuf,
    extension: String,
}

impl SlotLayout {
    pub fn new(save_dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            save_dir: save_dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn primary_path(&self, slot: SlotId) -> PathBuf {
        self.save_dir.join(format!("save_{slot}.{}", self.extension))
    }

    pub fn backup_path(&self, slot: SlotId, index: u32) -> PathBuf {
        self.save_dir
            .join(format!("save_{slot}_backup_{index}.{}", self.extension))
    }

    /// Returns the backup index if `file_name` is a backup of `slot`.
    pub(crate) fn parse_backup_index(&self, slot: SlotId, file_name: &str) -> Option<u32> {
        let prefix = format!("save_{slot}_backup_");
        let suffix = format!(".{}", self.extension);
        let index = file_name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
        if index.is_empty() || !index.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        index.parse().ok()
    }
}
