use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use crate::document::SaveDocument;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("save schema version {found} is newer than this build supports ({current})")]
    UnsupportedVersion { found: u32, current: u32 },
    #[error("no migration step registered from schema version {from} (current {current})")]
    NoMigrationPath { from: u32, current: u32 },
    #[error("migration step '{label}' ({from} -> {to}) failed: {message}")]
    StepFailed {
        from: u32,
        to: u32,
        label: String,
        message: String,
    },
    #[error("a migration step from schema version {from} is already registered")]
    DuplicateStep { from: u32 },
    #[error("migration step from schema version {from} would go past current version {current}")]
    StepBeyondCurrent { from: u32, current: u32 },
}

type StepFn = dyn Fn(SaveDocument) -> Result<SaveDocument, String>;

struct MigrationStep {
    label: String,
    apply: Box<StepFn>,
}

/// Ordered chain of `N -> N + 1` document upgrades ending at `current_version`.
pub struct VersionMigrator {
    current_version: u32,
    steps: BTreeMap<u32, MigrationStep>,
}

impl VersionMigrator {
    pub fn new(current_version: u32) -> Self {
        Self {
            current_version,
            steps: BTreeMap::new(),
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// Registers the upgrade from `from` to `from + 1`. The step must not touch
    /// `schema_version`; the migrator stamps it.
    pub fn register_step<F>(
        &mut self,
        from: u32,
        label: impl Into<String>,
        apply: F,
    ) -> Result<(), MigrationError>
    where
        F: Fn(SaveDocument) -> Result<SaveDocument, String> + 'static,
    {
        if from >= self.current_version {
            return Err(MigrationError::StepBeyondCurrent {
                from,
                current: self.current_version,
            });
        }
        if self.steps.contains_key(&from) {
            return Err(MigrationError::DuplicateStep { from });
        }
        self.steps.insert(
            from,
            MigrationStep {
                label: label.into(),
                apply: Box::new(apply),
            },
        );
        Ok(())
    }

    pub fn needs_migration(&self, stored_version: u32) -> bool {
        stored_version < self.current_version
    }

    /// Fails before running any step if the chain from the stored version has a gap.
    pub fn check_path(&self, stored_version: u32) -> Result<(), MigrationError> {
        if stored_version > self.current_version {
            return Err(MigrationError::UnsupportedVersion {
                found: stored_version,
                current: self.current_version,
            });
        }
        for from in stored_version..self.current_version {
            if !self.steps.contains_key(&from) {
                return Err(MigrationError::NoMigrationPath {
                    from,
                    current: self.current_version,
                });
            }
        }
        Ok(())
    }

    /// A document already at the current version is returned unchanged.
    pub fn migrate(&self, mut document: SaveDocument) -> Result<SaveDocument, MigrationError> {
        self.check_path(document.schema_version)?;

        while document.schema_version < self.current_version {
            let from = document.schema_version;
            let to = from + 1;
            let step = self
                .steps
                .get(&from)
                .ok_or(MigrationError::NoMigrationPath {
                    from,
                    current: self.current_version,
                })?;
            document = (step.apply)(document).map_err(|message| MigrationError::StepFailed {
                from,
                to,
                label: step.label.clone(),
                message,
            })?;
            document.schema_version = to;
            info!(from, to, step = %step.label, "save_migration_step_applied");
        }
        Ok(document)
    }
}
