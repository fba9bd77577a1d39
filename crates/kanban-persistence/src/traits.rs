use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanban_core::KanbanResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata for persistence operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceMetadata {
    /// Version of the persistence format
    pub format_version: u32,
    /// ID of the server instance that performed the save
    pub instance_id: Uuid,
    /// When this data was saved
    pub saved_at: DateTime<Utc>,
    /// Number of committed units of work since the store was created
    #[serde(default)]
    pub revision: u64,
}

impl PersistenceMetadata {
    pub fn new(format_version: u32, instance_id: Uuid, revision: u64) -> Self {
        Self {
            format_version,
            instance_id,
            saved_at: Utc::now(),
            revision,
        }
    }
}

/// Point-in-time snapshot of all data that needs to be persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Raw JSON bytes representing every table
    pub data: Vec<u8>,
    /// Metadata about this snapshot
    pub metadata: PersistenceMetadata,
}

/// Backend that durably holds the latest committed snapshot.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Save a snapshot to the store
    async fn save(&self, snapshot: StoreSnapshot) -> KanbanResult<PersistenceMetadata>;

    /// Load the current snapshot from the store
    async fn load(&self) -> KanbanResult<(StoreSnapshot, PersistenceMetadata)>;

    /// Check if the store holds any data yet
    async fn exists(&self) -> bool;

    /// Location of the store, for logging
    fn path(&self) -> &Path;
}
