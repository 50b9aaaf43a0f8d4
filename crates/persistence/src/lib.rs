mod atomic_io;
mod backup;
mod config;
mod coordinator;
mod document;
mod error;
mod events;
mod locks;
mod migration;
pub mod pipeline;
mod profile;
mod registry;
mod slot;

pub use backup::{BackupError, BackupManager, RecoveryOutcome};
pub use config::{ConfigError, SaveConfig, DEFAULT_FILE_EXTENSION};
pub use coordinator::{
    FileReport, FileStatus, LoadReport, SaveCoordinator, SaveCoordinatorBuilder, SaveReport,
    SessionProgress, SlotInspection, SlotSummary, DEFAULT_SCHEMA_VERSION,
};
pub use document::{ComponentBlobs, ComponentId, SaveDocument, SaveMetadata};
pub use error::{SaveError, SaveErrorKind};
pub use events::{SaveEvent, SaveTrigger};
pub use locks::{SlotGuard, SlotLocks};
pub use migration::{MigrationError, VersionMigrator};
pub use pipeline::{
    Cipher, CipherError, Codec, CodecError, CodecKind, Compressor, CompressionError,
    KeystreamCipher, Lz4Compressor, PipelineError, SavePipeline,
};
pub use profile::{PlayerProfile, ProfileError, ProfileStore};
pub use registry::{
    ComponentError, ComponentFailure, ComponentRegistry, ComponentStage, DistributeOutcome,
    GatherOutcome, SaveHooks, Saveable,
};
pub use slot::{SlotId, SlotLayout};
