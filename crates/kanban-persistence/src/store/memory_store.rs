use crate::traits::{PersistenceMetadata, PersistenceStore, StoreSnapshot};
use kanban_core::{KanbanError, KanbanResult};
use parking_lot::Mutex;
use std::path::Path;

/// Volatile store for tests and throwaway servers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<StoreSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision of the last saved snapshot, if any.
    pub fn revision(&self) -> Option<u64> {
        self.snapshot.lock().as_ref().map(|s| s.metadata.revision)
    }
}

#[async_trait::async_trait]
impl PersistenceStore for MemoryStore {
    async fn save(&self, mut snapshot: StoreSnapshot) -> KanbanResult<PersistenceMetadata> {
        snapshot.metadata.saved_at = chrono::Utc::now();
        let metadata = snapshot.metadata.clone();
        *self.snapshot.lock() = Some(snapshot);
        Ok(metadata)
    }

    async fn load(&self) -> KanbanResult<(StoreSnapshot, PersistenceMetadata)> {
        let snapshot = self
            .snapshot
            .lock()
            .clone()
            .ok_or_else(|| KanbanError::NotFound("in-memory snapshot".to_string()))?;
        let metadata = snapshot.metadata.clone();
        Ok((snapshot, metadata))
    }

    async fn exists(&self) -> bool {
        self.snapshot.lock().is_some()
    }

    fn path(&self) -> &Path {
        Path::new(":memory:")
    }
}
