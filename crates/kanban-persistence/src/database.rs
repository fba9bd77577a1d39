use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kanban_core::{AuditStamper, KanbanError, KanbanResult};
use tokio::sync::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use crate::store::MemoryStore;
use crate::tables::Tables;
use crate::traits::{PersistenceMetadata, PersistenceStore, StoreSnapshot, FORMAT_VERSION};
use crate::unit_of_work::UnitOfWork;

/// Committed tables plus the store that backs them.
///
/// Writers are serialized: a unit of work is applied to a staged copy, the
/// copy is saved, and only then replaces the committed tables. A failed apply
/// or save leaves readers on the previous state.
pub struct Database {
    tables: RwLock<Tables>,
    store: Arc<dyn PersistenceStore>,
    revision: AtomicU64,
    instance_id: Uuid,
}

impl Database {
    /// Open a database over `store`, loading its snapshot when one exists.
    pub async fn open(store: Arc<dyn PersistenceStore>) -> KanbanResult<Self> {
        let (tables, revision) = if store.exists().await {
            let (snapshot, metadata) = store.load().await?;
            let tables: Tables = serde_json::from_slice(&snapshot.data)
                .map_err(|e| KanbanError::Serialization(e.to_string()))?;
            (tables, metadata.revision)
        } else {
            tracing::info!(path = %store.path().display(), "no snapshot found, starting empty");
            (Tables::default(), 0)
        };

        Ok(Self {
            tables: RwLock::new(tables),
            store,
            revision: AtomicU64::new(revision),
            instance_id: Uuid::new_v4(),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            store: Arc::new(MemoryStore::new()),
            revision: AtomicU64::new(0),
            instance_id: Uuid::new_v4(),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub async fn commit(&self, uow: UnitOfWork) -> KanbanResult<()> {
        let actor = uow.actor().to_string();
        self.transact(&actor, move |_, pending| {
            *pending = uow;
            Ok(())
        })
        .await
        .map(|_| ())
    }

    /// Build and commit a unit of work against the latest committed tables,
    /// holding the write lock throughout so no other writer interleaves.
    ///
    /// The returned guard is downgraded from the write lock, so it shows
    /// exactly the state this unit of work produced. An empty unit of work
    /// saves nothing.
    pub async fn transact<T, F>(&self, actor: &str, build: F) -> KanbanResult<Committed<'_, T>>
    where
        F: FnOnce(&Tables, &mut UnitOfWork) -> KanbanResult<T> + Send,
        T: Send,
    {
        let mut committed = self.tables.write().await;

        let mut uow = UnitOfWork::new(actor);
        let value = build(&*committed, &mut uow)?;
        if uow.is_empty() {
            return Ok(Committed {
                value,
                tables: committed.downgrade(),
            });
        }

        let (actor, changes) = uow.into_changes();
        let change_count = changes.len();
        let stamper = AuditStamper::new(actor);
        let mut staged = committed.clone();
        for change in changes {
            staged.apply(change, &stamper)?;
        }

        let revision = self.revision() + 1;
        let data =
            serde_json::to_vec(&staged).map_err(|e| KanbanError::Serialization(e.to_string()))?;
        let snapshot = StoreSnapshot {
            data,
            metadata: PersistenceMetadata::new(FORMAT_VERSION, self.instance_id, revision),
        };
        self.store.save(snapshot).await?;

        *committed = staged;
        self.revision.store(revision, Ordering::SeqCst);
        tracing::info!(
            actor = stamper.actor(),
            changes = change_count,
            revision,
            "committed unit of work"
        );
        Ok(Committed {
            value,
            tables: committed.downgrade(),
        })
    }
}

/// Result of a unit of work plus a read view of the state it committed.
pub struct Committed<'a, T> {
    pub value: T,
    pub tables: RwLockReadGuard<'a, Tables>,
}
