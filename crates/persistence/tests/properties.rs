mod common;

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use persistence::{
    CodecKind, CompressionError, Compressor, Lz4Compressor, SaveConfig, SaveCoordinator,
    SaveErrorKind, SlotId, VersionMigrator,
};
use tempfile::TempDir;

use common::{
    config_in, coordinator_in, file_names, flip_last_byte, read_document, register_bytes, shared,
};

#[test]
fn every_component_round_trips_through_save_and_load() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    let inventory = shared(b"potion x3");
    let quests = shared(&[0, 1, 2, 255]);
    let empty = shared(b"");
    register_bytes(&mut coordinator, "inventory", &inventory);
    register_bytes(&mut coordinator, "quest_log", &quests);
    register_bytes(&mut coordinator, "empty", &empty);
    coordinator.progress_mut().location = "harbor".to_string();
    coordinator.progress_mut().death_count = 2;

    coordinator.save_game(SlotId::Index(0), Some("Round trip")).expect("save");
    *inventory.borrow_mut() = Vec::new();
    *quests.borrow_mut() = Vec::new();
    *empty.borrow_mut() = b"x".to_vec();
    coordinator.progress_mut().location.clear();

    let report = coordinator.load_game(SlotId::Index(0)).expect("load");
    assert_eq!(report.components_loaded.len(), 3);
    assert_eq!(*inventory.borrow(), b"potion x3");
    assert_eq!(*quests.borrow(), vec![0u8, 1, 2, 255]);
    assert!(empty.borrow().is_empty());
    assert_eq!(coordinator.progress().location, "harbor");
    assert_eq!(coordinator.progress().death_count, 2);
    assert_eq!(report.metadata.display_name, "Round trip");
}

#[test]
fn json_and_binary_files_are_both_readable() {
    let temp = TempDir::new().expect("temp");
    let state = shared(b"state");
    {
        let config = SaveConfig {
            codec: CodecKind::Json,
            ..config_in(&temp)
        };
        let mut json_writer = SaveCoordinator::new(config).expect("json coordinator");
        register_bytes(&mut json_writer, "world", &state);
        json_writer.save_game(SlotId::Index(0), None).expect("json save");
    }

    let mut binary_reader = coordinator_in(&temp);
    let loaded = shared(b"");
    register_bytes(&mut binary_reader, "world", &loaded);
    binary_reader.load_game(SlotId::Index(0)).expect("load");
    assert_eq!(*loaded.borrow(), b"state");
}

#[test]
fn saving_one_slot_leaves_other_slots_untouched() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    let state = shared(b"one");
    register_bytes(&mut coordinator, "world", &state);

    coordinator.save_game(SlotId::Index(1), None).expect("slot 1");
    let slot_one = coordinator.layout().primary_path(SlotId::Index(1));
    let slot_one_backup = coordinator.layout().backup_path(SlotId::Index(1), 0);
    let before = (
        fs::read(&slot_one).expect("primary"),
        fs::read(&slot_one_backup).expect("backup"),
    );

    *state.borrow_mut() = b"two".to_vec();
    coordinator.save_game(SlotId::Index(2), None).expect("slot 2");
    coordinator.quick_save().expect("quick");
    coordinator.delete_save(SlotId::Index(2)).expect("delete 2");

    let after = (
        fs::read(&slot_one).expect("primary"),
        fs::read(&slot_one_backup).expect("backup"),
    );
    assert_eq!(before, after);
}

#[test]
fn missing_slot_reports_not_found() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    let error = coordinator.load_game(SlotId::Index(4)).expect_err("missing");
    assert_eq!(error.kind(), SaveErrorKind::NotFound);
    assert!(coordinator.save_metadata(SlotId::Index(4)).is_none());
}

#[test]
fn corrupted_primary_and_backups_are_unrecoverable() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    coordinator.save_game(SlotId::Index(0), None).expect("save 1");
    coordinator.save_game(SlotId::Index(0), None).expect("save 2");

    let layout = coordinator.layout().clone();
    flip_last_byte(&layout.primary_path(SlotId::Index(0)));
    flip_last_byte(&layout.backup_path(SlotId::Index(0), 0));
    flip_last_byte(&layout.backup_path(SlotId::Index(0), 1));

    let error = coordinator.load_game(SlotId::Index(0)).expect_err("unrecoverable");
    assert_eq!(error.kind(), SaveErrorKind::Unrecoverable);
}

#[test]
fn corruption_without_backups_is_reported_as_corrupted() {
    let temp = TempDir::new().expect("temp");
    let config = SaveConfig {
        enable_backups: false,
        ..config_in(&temp)
    };
    let mut coordinator = SaveCoordinator::new(config).expect("coordinator");
    coordinator.save_game(SlotId::Index(0), None).expect("save");
    assert!(file_names(temp.path()).iter().all(|name| !name.contains("backup")));

    flip_last_byte(&coordinator.layout().primary_path(SlotId::Index(0)));
    let error = coordinator.load_game(SlotId::Index(0)).expect_err("corrupted");
    assert_eq!(error.kind(), SaveErrorKind::Corrupted);
}

#[test]
fn newer_schema_is_rejected_without_loading_components() {
    let temp = TempDir::new().expect("temp");
    {
        let mut future = SaveCoordinator::builder(config_in(&temp))
            .migrator(VersionMigrator::new(7))
            .build()
            .expect("future coordinator");
        let state = shared(b"future");
        register_bytes(&mut future, "world", &state);
        future.save_game(SlotId::Index(0), None).expect("future save");
    }

    let mut coordinator = coordinator_in(&temp);
    let world = shared(b"untouched");
    register_bytes(&mut coordinator, "world", &world);
    let error = coordinator.load_game(SlotId::Index(0)).expect_err("unsupported");
    assert_eq!(error.kind(), SaveErrorKind::UnsupportedVersion);
    assert_eq!(*world.borrow(), b"untouched");

    // Metadata stays readable for slot pickers.
    assert!(coordinator.save_metadata(SlotId::Index(0)).is_some());
}

#[test]
fn missing_migration_step_is_fatal() {
    let temp = TempDir::new().expect("temp");
    {
        let mut legacy = SaveCoordinator::builder(config_in(&temp))
            .migrator(VersionMigrator::new(0))
            .build()
            .expect("legacy coordinator");
        legacy.save_game(SlotId::Index(0), None).expect("legacy save");
    }

    let mut coordinator = coordinator_in(&temp);
    let error = coordinator.load_game(SlotId::Index(0)).expect_err("no path");
    assert_eq!(error.kind(), SaveErrorKind::NoMigrationPath);
}

#[test]
fn busy_slot_rejects_save_and_load_immediately() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    coordinator.save_game(SlotId::Index(0), None).expect("save");

    let locks = coordinator.slot_locks();
    let guard = locks.try_acquire(SlotId::Index(0)).expect("worker guard");
    assert_eq!(
        coordinator
            .save_game(SlotId::Index(0), None)
            .expect_err("busy")
            .kind(),
        SaveErrorKind::Busy
    );
    assert_eq!(
        coordinator
            .load_game(SlotId::Index(0))
            .expect_err("busy")
            .kind(),
        SaveErrorKind::Busy
    );
    coordinator
        .save_game(SlotId::Index(1), None)
        .expect("other slot is free");

    drop(guard);
    coordinator.load_game(SlotId::Index(0)).expect("free again");
}

#[test]
fn delete_is_idempotent_and_removes_backups() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    coordinator.save_game(SlotId::Index(0), None).expect("save");
    coordinator.save_game(SlotId::Index(0), None).expect("save again");

    assert_eq!(coordinator.delete_save(SlotId::Index(0)).expect("delete"), 3);
    assert_eq!(coordinator.delete_save(SlotId::Index(0)).expect("delete again"), 0);
    assert!(file_names(temp.path())
        .iter()
        .all(|name| !name.starts_with("save_0")));
}

#[test]
fn duplicate_registration_is_ignored() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    let first = shared(b"first");
    let second = shared(b"second");
    assert!(register_bytes(&mut coordinator, "inventory", &first));
    assert!(!register_bytes(&mut coordinator, "inventory", &second));

    coordinator.save_game(SlotId::Index(0), None).expect("save");
    let document = read_document(&coordinator.layout().primary_path(SlotId::Index(0)));
    assert_eq!(document.blob("inventory"), Some(&b"first"[..]));
}

#[test]
fn remigrating_a_current_document_changes_nothing() {
    let temp = TempDir::new().expect("temp");
    let mut migrator = VersionMigrator::new(1);
    migrator
        .register_step(0, "never_runs", |_| Err("ran on current document".to_string()))
        .expect("step");
    let mut coordinator = SaveCoordinator::builder(config_in(&temp))
        .migrator(migrator)
        .build()
        .expect("coordinator");

    coordinator.save_game(SlotId::Index(0), None).expect("save");
    let report = coordinator.load_game(SlotId::Index(0)).expect("load");
    assert_eq!(report.migrated_from, None);
    assert_eq!(report.schema_version, 1);
}

#[test]
fn unclaimed_blobs_survive_later_saves() {
    let temp = TempDir::new().expect("temp");
    {
        let mut old_build = coordinator_in(&temp);
        let removed = shared(b"feature data");
        register_bytes(&mut old_build, "removed_feature", &removed);
        old_build.save_game(SlotId::Index(0), None).expect("old save");
    }

    let mut coordinator = coordinator_in(&temp);
    let report = coordinator.load_game(SlotId::Index(0)).expect("load");
    assert_eq!(report.orphaned_components.len(), 1);
    coordinator.save_game(SlotId::Index(0), None).expect("resave");

    let document = read_document(&coordinator.layout().primary_path(SlotId::Index(0)));
    assert_eq!(document.blob("removed_feature"), Some(&b"feature data"[..]));

    let returning = shared(b"");
    register_bytes(&mut coordinator, "removed_feature", &returning);
    assert_eq!(*returning.borrow(), b"feature data");
}

#[test]
fn list_and_inspect_report_slot_health() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    coordinator.save_game(SlotId::Index(0), Some("Zero")).expect("save 0");
    coordinator.save_game(SlotId::Index(3), Some("Three")).expect("save 3");
    flip_last_byte(&coordinator.layout().primary_path(SlotId::Index(3)));

    let summaries = coordinator.list_slots();
    assert_eq!(
        summaries.iter().map(|s| s.slot).collect::<Vec<_>>(),
        vec![SlotId::Index(0), SlotId::Index(3)]
    );

    let inspection = coordinator.inspect_slot(SlotId::Index(3)).expect("inspect");
    assert!(matches!(
        inspection.primary.map(|file| file.status),
        Some(persistence::FileStatus::Corrupted { .. })
    ));
    assert_eq!(inspection.backups.len(), 1);

    assert_eq!(coordinator.restore_from_backup(SlotId::Index(3)).expect("restore"), 0);
    assert_eq!(
        coordinator
            .save_metadata(SlotId::Index(3))
            .map(|metadata| metadata.display_name),
        Some("Three".to_string())
    );
}

#[test]
fn corrupted_primary_with_no_backup_files_is_unrecoverable() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    coordinator.save_game(SlotId::Index(0), None).expect("save");
    let layout = coordinator.layout().clone();
    fs::remove_file(layout.backup_path(SlotId::Index(0), 0)).expect("remove backup");
    flip_last_byte(&layout.primary_path(SlotId::Index(0)));

    let error = coordinator.load_game(SlotId::Index(0)).expect_err("unrecoverable");
    assert_eq!(error.kind(), SaveErrorKind::Unrecoverable);
}

#[test]
fn newer_container_format_is_rejected_and_left_on_disk() {
    let temp = TempDir::new().expect("temp");
    let mut coordinator = coordinator_in(&temp);
    let state = shared(b"old");
    register_bytes(&mut coordinator, "world", &state);
    coordinator.save_game(SlotId::Index(0), None).expect("old save");
    *state.borrow_mut() = b"new".to_vec();
    coordinator.save_game(SlotId::Index(0), None).expect("new save");

    // Container version lives right after the magic.
    let layout = coordinator.layout().clone();
    let primary = layout.primary_path(SlotId::Index(0));
    for path in [primary.clone(), layout.backup_path(SlotId::Index(0), 0)] {
        let mut bytes = fs::read(&path).expect("read");
        bytes[4] = 2;
        fs::write(&path, bytes).expect("write");
    }
    let newer_primary = fs::read(&primary).expect("primary");
    *state.borrow_mut() = b"in memory".to_vec();

    let error = coordinator.load_game(SlotId::Index(0)).expect_err("newer format");
    assert_eq!(error.kind(), SaveErrorKind::UnsupportedVersion);
    assert_eq!(fs::read(&primary).expect("primary"), newer_primary);
    assert_eq!(*state.borrow(), b"in memory");
}

#[test]
fn recovery_skips_backups_with_a_newer_schema() {
    let temp = TempDir::new().expect("temp");
    {
        let mut current = coordinator_in(&temp);
        let state = shared(b"old");
        register_bytes(&mut current, "world", &state);
        current.save_game(SlotId::Index(0), None).expect("current save");
    }
    {
        let mut future = SaveCoordinator::builder(config_in(&temp))
            .migrator(VersionMigrator::new(7))
            .build()
            .expect("future coordinator");
        let state = shared(b"new");
        register_bytes(&mut future, "world", &state);
        future.save_game(SlotId::Index(0), None).expect("future save");
    }

    let mut coordinator = coordinator_in(&temp);
    let world = shared(b"");
    register_bytes(&mut coordinator, "world", &world);
    let layout = coordinator.layout().clone();
    flip_last_byte(&layout.primary_path(SlotId::Index(0)));
    let newest_backup = fs::read(layout.backup_path(SlotId::Index(0), 0)).expect("backup 0");

    let report = coordinator.load_game(SlotId::Index(0)).expect("load");
    assert_eq!(report.recovered_from_backup, Some(1));
    assert_eq!(*world.borrow(), b"old");
    assert_eq!(
        fs::read(layout.backup_path(SlotId::Index(0), 0)).expect("backup 0"),
        newest_backup
    );
}

#[test]
fn json_save_with_non_finite_progress_fails_and_keeps_previous_file() {
    let temp = TempDir::new().expect("temp");
    let config = SaveConfig {
        codec: CodecKind::Json,
        ..config_in(&temp)
    };
    let mut coordinator = SaveCoordinator::new(config).expect("coordinator");
    coordinator.progress_mut().completion_percent = 40.0;
    coordinator.save_game(SlotId::Index(0), Some("Good")).expect("save");
    let primary = coordinator.layout().primary_path(SlotId::Index(0));
    let before = fs::read(&primary).expect("primary");
    let names_before = file_names(temp.path());

    coordinator.progress_mut().completion_percent = f32::NAN;
    let error = coordinator
        .save_game(SlotId::Index(0), None)
        .expect_err("non-finite");
    assert_eq!(error.kind(), SaveErrorKind::Pipeline);
    assert_eq!(fs::read(&primary).expect("primary"), before);
    assert_eq!(file_names(temp.path()), names_before);

    let report = coordinator.load_game(SlotId::Index(0)).expect("load");
    assert_eq!(report.metadata.completion_percent, 40.0);
}

/// LZ4 until switched into failure mode.
struct SwitchableCompressor {
    failing: Arc<AtomicBool>,
}

impl Compressor for SwitchableCompressor {
    fn name(&self) -> &'static str {
        "switchable"
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CompressionError::Compress {
                compressor: self.name(),
                message: "disk budget exceeded".to_string(),
            });
        }
        Lz4Compressor.compress(bytes)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Lz4Compressor.decompress(bytes)
    }
}

#[test]
fn failed_save_leaves_files_and_dirty_set_untouched() {
    let temp = TempDir::new().expect("temp");
    let failing = Arc::new(AtomicBool::new(false));
    let mut coordinator = SaveCoordinator::builder(config_in(&temp))
        .compressor(Box::new(SwitchableCompressor {
            failing: failing.clone(),
        }))
        .build()
        .expect("coordinator");
    let inventory = shared(b"sword");
    register_bytes(&mut coordinator, "inventory", &inventory);
    coordinator.save_game(SlotId::Index(0), None).expect("first save");

    let primary = coordinator.layout().primary_path(SlotId::Index(0));
    let before = fs::read(&primary).expect("primary");
    let names_before = file_names(temp.path());

    *inventory.borrow_mut() = b"sword,shield".to_vec();
    assert!(coordinator.mark_dirty("inventory"));
    failing.store(true, Ordering::SeqCst);
    let error = coordinator
        .save_game(SlotId::Index(0), None)
        .expect_err("compressor fails");
    assert_eq!(error.kind(), SaveErrorKind::Pipeline);

    assert_eq!(fs::read(&primary).expect("primary"), before);
    assert_eq!(file_names(temp.path()), names_before);
    assert!(coordinator.registry().is_dirty("inventory"));
}
