//! The public save/load surface and the error boundary for the subsystem.
//!
//! A save gathers component blobs, runs them through the pipeline, writes the
//! slot file atomically and only then rotates backups. A load decodes the
//! primary, falls back to backups on corruption, migrates old documents and
//! hands blobs back to registered components.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::atomic_io::{remove_if_exists, temp_path_for, write_bytes_atomic};
use crate::backup::{BackupManager, RecoveryOutcome};
use crate::config::{missing_encryption_key, SaveConfig};
use crate::document::{ComponentId, SaveDocument, SaveMetadata};
use crate::error::SaveError;
use crate::events::{HookLists, SaveEvent, SaveTrigger};
use crate::locks::{SlotGuard, SlotLocks};
use crate::migration::VersionMigrator;
use crate::pipeline::{Cipher, Codec, Compressor, KeystreamCipher, PipelineError, SavePipeline};
use crate::profile::{PlayerProfile, ProfileStore};
use crate::registry::{ComponentFailure, ComponentRegistry, Saveable};
use crate::slot::{SlotId, SlotLayout};

/// Schema version written when no migrator is supplied.
pub const DEFAULT_SCHEMA_VERSION: u32 = 1;

/// Progress fields copied into metadata on every save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionProgress {
    pub location: String,
    pub completion_percent: f32,
    pub death_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub slot: SlotId,
    pub path: PathBuf,
    pub trigger: SaveTrigger,
    pub incremental: bool,
    pub bytes_written: usize,
    /// Components whose state was serialized for this write.
    pub components_serialized: usize,
    /// Blobs carried forward unchanged from the previous document or orphans.
    pub components_reused: usize,
    pub failures: Vec<ComponentFailure>,
    /// Backup count after rotation, `None` when backups are off or rotation failed.
    pub backups: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub slot: SlotId,
    pub schema_version: u32,
    pub migrated_from: Option<u32>,
    pub recovered_from_backup: Option<u32>,
    pub metadata: SaveMetadata,
    pub components_loaded: Vec<ComponentId>,
    pub orphaned_components: Vec<ComponentId>,
    pub failures: Vec<ComponentFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Valid {
        schema_version: u32,
        metadata: SaveMetadata,
    },
    /// The bytes are damaged: checksum, container or decode failure.
    Corrupted { reason: String },
    /// The file could not be checked, e.g. I/O error or missing cipher.
    Unreadable { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotInspection {
    pub slot: SlotId,
    pub primary: Option<FileReport>,
    pub backups: Vec<(u32, FileReport)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotSummary {
    pub slot: SlotId,
    pub file: FileReport,
}

pub struct SaveCoordinatorBuilder {
    config: SaveConfig,
    codec: Option<Box<dyn Codec>>,
    compressor: Option<Box<dyn Compressor>>,
    cipher: Option<Box<dyn Cipher>>,
    migrator: Option<VersionMigrator>,
    locks: Option<SlotLocks>,
}

impl SaveCoordinatorBuilder {
    /// Overrides the codec chosen by `config.codec`.
    pub fn codec(mut self, codec: Box<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn compressor(mut self, compressor: Box<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Replaces the keystream cipher derived from `config.encryption_key`.
    pub fn cipher(mut self, cipher: Box<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn migrator(mut self, migrator: VersionMigrator) -> Self {
        self.migrator = Some(migrator);
        self
    }

    /// Shares busy flags with other owners of the same save directory.
    pub fn slot_locks(mut self, locks: SlotLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    pub fn build(self) -> Result<SaveCoordinator, SaveError> {
        let config = self.config;
        config.validate_storage()?;

        let cipher = match (self.cipher, config.encryption_key.as_deref()) {
            (Some(cipher), _) => Some(cipher),
            (None, Some(key)) if !key.is_empty() => Some(Box::new(
                KeystreamCipher::new(key).map_err(|error| SaveError::Pipeline(error.into()))?,
            ) as Box<dyn Cipher>),
            (None, _) => None,
        };

        let codec = self.codec.unwrap_or_else(|| config.codec.codec());
        let mut pipeline = SavePipeline::new(codec).with_compression(config.enable_compression);
        if let Some(compressor) = self.compressor {
            pipeline = pipeline.with_compressor(compressor);
        }
        if let Some(cipher) = cipher {
            pipeline = pipeline.with_cipher(cipher);
        }
        pipeline = pipeline.with_encryption(config.enable_encryption);
        if config.enable_encryption && !pipeline.has_cipher() {
            return Err(missing_encryption_key().into());
        }

        fs::create_dir_all(&config.save_dir)
            .map_err(|error| SaveError::io("create save directory", &config.save_dir, error))?;

        let layout = SlotLayout::new(config.save_dir.clone(), &config.file_extension);
        let backups = BackupManager::new(layout.clone(), config.max_backups_per_slot);
        let profiles = ProfileStore::new(config.save_dir.clone());
        let migrator = self
            .migrator
            .unwrap_or_else(|| VersionMigrator::new(DEFAULT_SCHEMA_VERSION));

        info!(
            save_dir = %config.save_dir.display(),
            codec = pipeline.codec_name(),
            compression = pipeline.compresses(),
            encryption = pipeline.encrypts(),
            schema_version = migrator.current_version(),
            "save_coordinator_ready"
        );

        let autosave_remaining = autosave_interval(&config);
        Ok(SaveCoordinator {
            config,
            layout,
            pipeline,
            registry: ComponentRegistry::new(),
            migrator,
            backups,
            locks: self.locks.unwrap_or_default(),
            hooks: HookLists::default(),
            profiles,
            active_slot: None,
            progress: SessionProgress::default(),
            playtime_seconds: 0.0,
            autosave_remaining,
        })
    }
}

fn autosave_interval(config: &SaveConfig) -> Option<f64> {
    (config.auto_save_interval_seconds > 0).then(|| f64::from(config.auto_save_interval_seconds))
}

pub struct SaveCoordinator {
    config: SaveConfig,
    layout: SlotLayout,
    pipeline: SavePipeline,
    registry: ComponentRegistry,
    migrator: VersionMigrator,
    backups: BackupManager,
    locks: SlotLocks,
    hooks: HookLists,
    profiles: ProfileStore,
    active_slot: Option<SlotId>,
    progress: SessionProgress,
    playtime_seconds: f64,
    autosave_remaining: Option<f64>,
}

impl SaveCoordinator {
    pub fn builder(config: SaveConfig) -> SaveCoordinatorBuilder {
        SaveCoordinatorBuilder {
            config,
            codec: None,
            compressor: None,
            cipher: None,
            migrator: None,
            locks: None,
        }
    }

    pub fn new(config: SaveConfig) -> Result<Self, SaveError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    pub fn slot_locks(&self) -> SlotLocks {
        self.locks.clone()
    }

    pub fn current_schema_version(&self) -> u32 {
        self.migrator.current_version()
    }

    // ---- components ----

    pub fn register_saveable<C>(&mut self, id: impl Into<ComponentId>, component: C) -> bool
    where
        C: Saveable + 'static,
    {
        self.registry.register(id, component)
    }

    pub fn unregister_saveable(&mut self, id: &str) -> bool {
        self.registry.unregister(id)
    }

    pub fn mark_dirty(&mut self, id: &str) -> bool {
        self.registry.mark_dirty(id)
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // ---- hooks ----

    pub fn on_event(&mut self, listener: impl FnMut(&SaveEvent) + 'static) {
        self.hooks.add_listener(Box::new(listener));
    }

    /// Runs after the document is assembled and before it is encoded.
    pub fn add_pre_save_hook(&mut self, hook: impl FnMut(SlotId, &mut SaveDocument) + 'static) {
        self.hooks.add_pre_save(Box::new(hook));
    }

    /// Runs after components received their blobs.
    pub fn add_post_load_hook(&mut self, hook: impl FnMut(SlotId, &SaveDocument) + 'static) {
        self.hooks.add_post_load(Box::new(hook));
    }

    // ---- session state ----

    pub fn active_slot(&self) -> Option<SlotId> {
        self.active_slot
    }

    pub fn set_active_slot(&mut self, slot: SlotId) -> Result<(), SaveError> {
        self.validate_slot(slot)?;
        self.active_slot = Some(slot);
        Ok(())
    }

    pub fn clear_active_slot(&mut self) {
        self.active_slot = None;
    }

    pub fn progress(&self) -> &SessionProgress {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut SessionProgress {
        &mut self.progress
    }

    pub fn playtime_seconds(&self) -> f64 {
        self.playtime_seconds
    }

    /// Seconds until the timer autosave fires, `None` when the timer is off.
    pub fn autosave_remaining(&self) -> Option<f64> {
        self.autosave_remaining
    }

    // ---- save ----

    pub fn save_game(&mut self, slot: SlotId, name: Option<&str>) -> Result<SaveReport, SaveError> {
        self.run_save(slot, name, SaveTrigger::Manual, false)
    }

    /// Re-serializes only dirty components and carries every other blob forward
    /// from the slot's current file. Without a readable base file this is a full save.
    pub fn incremental_save(&mut self, slot: SlotId) -> Result<SaveReport, SaveError> {
        self.run_save(slot, None, SaveTrigger::Manual, true)
    }

    pub fn quick_save(&mut self) -> Result<SaveReport, SaveError> {
        self.save_game(SlotId::Quick, None)
    }

    /// Saves over the slot last saved or loaded, keeping its display name.
    pub fn save_active_slot(&mut self) -> Result<SaveReport, SaveError> {
        let slot = self.active_slot.ok_or(SaveError::NoActiveSlot)?;
        self.save_game(slot, None)
    }

    /// Advances playtime and the autosave countdown. Returns the autosave
    /// result when the timer fired and an active slot was set.
    pub fn tick(&mut self, dt_seconds: f64) -> Option<Result<SaveReport, SaveError>> {
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return None;
        }
        self.playtime_seconds += dt_seconds;

        let remaining = self.autosave_remaining.as_mut()?;
        *remaining -= dt_seconds;
        if *remaining > 0.0 {
            return None;
        }
        self.reset_autosave_timer();
        self.notify(SaveTrigger::Timer)
    }

    /// Handles a save-triggering game event. Returns `None` when the trigger is
    /// turned off in config or no active slot is set.
    pub fn notify(&mut self, trigger: SaveTrigger) -> Option<Result<SaveReport, SaveError>> {
        let enabled = match trigger {
            SaveTrigger::Manual => true,
            SaveTrigger::Timer => self.config.auto_save_interval_seconds > 0,
            SaveTrigger::Checkpoint => self.config.save_on_checkpoint,
            SaveTrigger::SceneTransition => self.config.save_on_scene_transition,
            SaveTrigger::ApplicationQuit => self.config.save_on_quit,
        };
        if !enabled {
            debug!(?trigger, "autosave_trigger_disabled");
            return None;
        }
        let Some(slot) = self.active_slot else {
            debug!(?trigger, "autosave_skipped_no_active_slot");
            return None;
        };
        Some(self.run_save(slot, None, trigger, false))
    }

    fn run_save(
        &mut self,
        slot: SlotId,
        name: Option<&str>,
        trigger: SaveTrigger,
        incremental: bool,
    ) -> Result<SaveReport, SaveError> {
        match self.write_slot(slot, name, trigger, incremental) {
            Ok(report) => {
                info!(
                    slot = %slot,
                    ?trigger,
                    incremental = report.incremental,
                    bytes = report.bytes_written,
                    serialized = report.components_serialized,
                    reused = report.components_reused,
                    failed = report.failures.len(),
                    "save_completed"
                );
                self.reset_autosave_timer();
                if !slot.is_quick() {
                    self.active_slot = Some(slot);
                }
                self.hooks.emit(&SaveEvent::SaveCompleted {
                    slot,
                    trigger,
                    incremental: report.incremental,
                });
                Ok(report)
            }
            Err(save_error) => {
                error!(
                    slot = %slot,
                    ?trigger,
                    kind = ?save_error.kind(),
                    error = %save_error,
                    "save_failed"
                );
                self.hooks.emit(&SaveEvent::SaveFailed {
                    slot,
                    trigger,
                    kind: save_error.kind(),
                    message: save_error.to_string(),
                });
                Err(save_error)
            }
        }
    }

    fn write_slot(
        &mut self,
        slot: SlotId,
        name: Option<&str>,
        trigger: SaveTrigger,
        incremental: bool,
    ) -> Result<SaveReport, SaveError> {
        self.validate_slot(slot)?;
        let _guard = self.acquire(slot)?;
        let primary = self.layout.primary_path(slot);

        let previous = match self.read_document(&primary) {
            Ok(previous) => previous,
            Err(read_error) => {
                warn!(slot = %slot, error = %read_error, "previous_save_unreadable");
                None
            }
        };

        let base = if incremental {
            match previous.clone().map(|doc| self.migrator.migrate(doc)) {
                Some(Ok(doc)) => Some(doc),
                Some(Err(migration_error)) => {
                    warn!(
                        slot = %slot,
                        error = %migration_error,
                        "incremental_base_not_migratable"
                    );
                    None
                }
                None => {
                    debug!(slot = %slot, "incremental_base_missing");
                    None
                }
            }
        } else {
            None
        };
        let gathered = match &base {
            Some(base) => self.registry.gather_dirty(&base.component_blobs),
            None => self.registry.gather_all(),
        };

        let now = OffsetDateTime::now_utc();
        let display_name = name
            .map(str::to_string)
            .or_else(|| previous.as_ref().map(|doc| doc.metadata.display_name.clone()))
            .unwrap_or_else(|| default_display_name(slot));
        let mut metadata = SaveMetadata::new(display_name, now);
        if let Some(previous) = &previous {
            metadata.created_at = previous.metadata.created_at;
        }
        metadata.playtime_seconds = self.playtime_seconds;
        metadata.location = self.progress.location.clone();
        metadata.completion_percent = self.progress.completion_percent;
        metadata.death_count = self.progress.death_count;

        let mut document = SaveDocument {
            schema_version: self.migrator.current_version(),
            metadata,
            component_blobs: gathered.blobs,
        };
        self.hooks.run_pre_save(slot, &mut document);

        let bytes = self.pipeline.encode(&document).map_err(SaveError::Pipeline)?;
        write_bytes_atomic(&primary, &bytes)
            .map_err(|io_error| SaveError::io("write save file", &primary, io_error))?;
        self.registry.clear_dirty(&gathered.serialized);

        let backups = if self.config.enable_backups {
            match self.backups.create_backup(slot) {
                Ok(count) => Some(count),
                Err(backup_error) => {
                    warn!(slot = %slot, error = %backup_error, "backup_rotation_failed");
                    None
                }
            }
        } else {
            None
        };

        let components_serialized = gathered.serialized.len();
        Ok(SaveReport {
            slot,
            path: primary,
            trigger,
            incremental: base.is_some(),
            bytes_written: bytes.len(),
            components_serialized,
            components_reused: document
                .component_blobs
                .len()
                .saturating_sub(components_serialized),
            failures: gathered.failures,
            backups,
        })
    }

    // ---- load ----

    pub fn load_game(&mut self, slot: SlotId) -> Result<LoadReport, SaveError> {
        match self.read_slot(slot) {
            Ok(report) => {
                info!(
                    slot = %slot,
                    schema_version = report.schema_version,
                    migrated_from = ?report.migrated_from,
                    recovered_from_backup = ?report.recovered_from_backup,
                    loaded = report.components_loaded.len(),
                    orphaned = report.orphaned_components.len(),
                    failed = report.failures.len(),
                    "load_completed"
                );
                self.hooks.emit(&SaveEvent::LoadCompleted {
                    slot,
                    recovered_from_backup: report.recovered_from_backup,
                    migrated_from: report.migrated_from,
                });
                Ok(report)
            }
            Err(load_error) => {
                error!(
                    slot = %slot,
                    kind = ?load_error.kind(),
                    error = %load_error,
                    "load_failed"
                );
                self.hooks.emit(&SaveEvent::LoadFailed {
                    slot,
                    kind: load_error.kind(),
                    message: load_error.to_string(),
                });
                Err(load_error)
            }
        }
    }

    pub fn quick_load(&mut self) -> Result<LoadReport, SaveError> {
        self.load_game(SlotId::Quick)
    }

    fn read_slot(&mut self, slot: SlotId) -> Result<LoadReport, SaveError> {
        self.validate_slot(slot)?;
        let _guard = self.acquire(slot)?;
        let primary = self.layout.primary_path(slot);

        let bytes = match fs::read(&primary) {
            Ok(bytes) => bytes,
            Err(io_error) if io_error.kind() == io::ErrorKind::NotFound => {
                return Err(SaveError::NotFound {
                    slot,
                    path: primary,
                })
            }
            Err(io_error) => return Err(SaveError::io("read save file", &primary, io_error)),
        };

        let (document, recovered_from_backup) = match self.pipeline.decode(&bytes) {
            Ok(document) => (document, None),
            Err(decode_error) if decode_error.is_corruption() => {
                warn!(slot = %slot, error = %decode_error, "save_corrupted_trying_backups");
                let (document, index) = self.recover_document(slot, primary, decode_error)?;
                (document, Some(index))
            }
            Err(decode_error) => return Err(SaveError::from_decode(&primary, decode_error)),
        };

        let stored_version = document.schema_version;
        let migrated_from = self
            .migrator
            .needs_migration(stored_version)
            .then_some(stored_version);
        let document = self.migrator.migrate(document)?;

        let distributed = self.registry.distribute(&document.component_blobs);
        self.hooks.run_post_load(slot, &document);

        self.playtime_seconds = document.metadata.playtime_seconds;
        self.progress = SessionProgress {
            location: document.metadata.location.clone(),
            completion_percent: document.metadata.completion_percent,
            death_count: document.metadata.death_count,
        };
        if !slot.is_quick() {
            self.active_slot = Some(slot);
        }
        self.reset_autosave_timer();

        Ok(LoadReport {
            slot,
            schema_version: document.schema_version,
            migrated_from,
            recovered_from_backup,
            metadata: document.metadata,
            components_loaded: distributed.loaded,
            orphaned_components: distributed.orphaned,
            failures: distributed.failures,
        })
    }

    fn recover_document(
        &self,
        slot: SlotId,
        primary: PathBuf,
        cause: PipelineError,
    ) -> Result<(SaveDocument, u32), SaveError> {
        if !self.config.enable_backups {
            return Err(SaveError::Corrupted {
                path: primary,
                source: cause,
            });
        }
        match self.backups.recover(slot, |bytes| self.loadable_backup(bytes))? {
            RecoveryOutcome::Recovered { index, value } => Ok((value, index)),
            RecoveryOutcome::Exhausted { tried } => {
                warn!(slot = %slot, error = %cause, tried, "save_backups_exhausted");
                Err(SaveError::Unrecoverable {
                    slot,
                    backups_tried: tried,
                })
            }
        }
    }

    /// A backup only replaces the primary if this build can decode and migrate it.
    fn loadable_backup(&self, bytes: &[u8]) -> Result<SaveDocument, SaveError> {
        let document = self.pipeline.decode(bytes).map_err(SaveError::Pipeline)?;
        self.migrator.check_path(document.schema_version)?;
        Ok(document)
    }

    /// Runs the backup fallback chain without touching components. Returns the
    /// backup index that now sits at the primary path.
    pub fn restore_from_backup(&mut self, slot: SlotId) -> Result<u32, SaveError> {
        self.validate_slot(slot)?;
        let _guard = self.acquire(slot)?;
        match self.backups.recover(slot, |bytes| self.loadable_backup(bytes))? {
            RecoveryOutcome::Recovered { index, .. } => Ok(index),
            RecoveryOutcome::Exhausted { tried } => Err(SaveError::Unrecoverable {
                slot,
                backups_tried: tried,
            }),
        }
    }

    // ---- delete ----

    /// Removes the primary file and every backup. Returns how many files were
    /// removed; an empty slot is not an error.
    pub fn delete_save(&mut self, slot: SlotId) -> Result<usize, SaveError> {
        self.validate_slot(slot)?;
        let _guard = self.acquire(slot)?;
        let primary = self.layout.primary_path(slot);

        let mut removed = 0usize;
        for path in [temp_path_for(&primary), primary] {
            let existed = remove_if_exists(&path)
                .map_err(|io_error| SaveError::io("delete", &path, io_error))?;
            if existed {
                removed += 1;
            }
        }
        removed += self.backups.delete_backups(slot)?;
        info!(slot = %slot, removed, "save_deleted");
        Ok(removed)
    }

    // ---- inspection ----

    /// Decodes the slot's metadata without migrating or loading components.
    pub fn save_metadata(&self, slot: SlotId) -> Option<SaveMetadata> {
        match self.read_metadata(slot) {
            Ok(metadata) => metadata,
            Err(read_error) => {
                debug!(slot = %slot, error = %read_error, "save_metadata_unavailable");
                None
            }
        }
    }

    pub fn read_metadata(&self, slot: SlotId) -> Result<Option<SaveMetadata>, SaveError> {
        self.validate_slot(slot)?;
        let primary = self.layout.primary_path(slot);
        Ok(self.read_document(&primary)?.map(|document| document.metadata))
    }

    /// Every occupied slot, numbered slots first, then the quick slot.
    pub fn list_slots(&self) -> Vec<SlotSummary> {
        self.all_slots()
            .filter_map(|slot| {
                let file = self.inspect_file(&self.layout.primary_path(slot))?;
                Some(SlotSummary { slot, file })
            })
            .collect()
    }

    pub fn inspect_slot(&self, slot: SlotId) -> Result<SlotInspection, SaveError> {
        self.validate_slot(slot)?;
        let primary = self.inspect_file(&self.layout.primary_path(slot));
        let backups = self
            .backups
            .backup_paths(slot)?
            .into_iter()
            .filter_map(|(index, path)| Some((index, self.inspect_file(&path)?)))
            .collect();
        Ok(SlotInspection {
            slot,
            primary,
            backups,
        })
    }

    // ---- profiles ----

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn load_profile(&self, profile_id: &str) -> Result<Option<PlayerProfile>, SaveError> {
        Ok(self.profiles.load(profile_id)?)
    }

    /// Stamps the active slot on the profile before writing it.
    pub fn save_profile(&self, profile: &mut PlayerProfile) -> Result<PathBuf, SaveError> {
        if let Some(slot) = self.active_slot {
            profile.last_slot = Some(slot);
        }
        Ok(self.profiles.save(profile)?)
    }

    // ---- helpers ----

    fn validate_slot(&self, slot: SlotId) -> Result<(), SaveError> {
        match slot {
            SlotId::Index(index) if index >= self.config.max_save_slots => {
                Err(SaveError::InvalidSlot {
                    slot,
                    max_slots: self.config.max_save_slots,
                })
            }
            _ => Ok(()),
        }
    }

    fn acquire(&self, slot: SlotId) -> Result<SlotGuard, SaveError> {
        self.locks
            .try_acquire(slot)
            .ok_or(SaveError::Busy { slot })
    }

    fn all_slots(&self) -> impl Iterator<Item = SlotId> {
        (0..self.config.max_save_slots)
            .map(SlotId::Index)
            .chain(std::iter::once(SlotId::Quick))
    }

    fn read_document(&self, path: &Path) -> Result<Option<SaveDocument>, SaveError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(io_error) if io_error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(io_error) => return Err(SaveError::io("read save file", path, io_error)),
        };
        self.pipeline
            .decode(&bytes)
            .map(Some)
            .map_err(|decode_error| SaveError::from_decode(path, decode_error))
    }

    fn inspect_file(&self, path: &Path) -> Option<FileReport> {
        let status = match fs::read(path) {
            Ok(bytes) => match self.pipeline.decode(&bytes) {
                Ok(document) => FileStatus::Valid {
                    schema_version: document.schema_version,
                    metadata: document.metadata,
                },
                Err(decode_error) if decode_error.is_corruption() => FileStatus::Corrupted {
                    reason: decode_error.to_string(),
                },
                Err(decode_error) => FileStatus::Unreadable {
                    reason: decode_error.to_string(),
                },
            },
            Err(io_error) if io_error.kind() == io::ErrorKind::NotFound => return None,
            Err(io_error) => FileStatus::Unreadable {
                reason: io_error.to_string(),
            },
        };
        Some(FileReport {
            path: path.to_path_buf(),
            status,
        })
    }

    fn reset_autosave_timer(&mut self) {
        self.autosave_remaining = autosave_interval(&self.config);
    }
}

fn default_display_name(slot: SlotId) -> String {
    match slot {
        SlotId::Index(index) => format!("Slot {}", index + 1),
        SlotId::Quick => "Quick Save".to_string(),
    }
}
