//! Command and query operations.
//!
//! Every operation has the same shape: authenticate the caller, run the
//! access guard over the committed tables, build a unit of work, commit it,
//! then publish the board events it produced. Queries skip the last two
//! steps.

mod attachments;
mod boards;
mod columns;
mod comments;
mod labels;
mod members;
mod sprints;
mod subtasks;
mod tasks;
mod users;
mod watchers;

use std::sync::Arc;

use kanban_core::{AppConfig, KanbanError, KanbanResult, Record};
use kanban_domain::{
    AccessGuard, BoardEvent, BoardId, Caller, EventKind, Grant, Operation, ResourceRef,
};
use kanban_persistence::{Committed, Database, Entity, Table, Tables, UnitOfWork};
use tokio::sync::RwLockReadGuard;
use uuid::Uuid;

use crate::files::FileStorage;
use crate::notifier::ChangeNotifier;

pub use attachments::{AttachmentDownload, AttachmentUpload};
pub use boards::{BoardDetail, CreateBoard};
pub use columns::CreateColumn;
pub use labels::CreateLabel;
pub use members::AddMember;
pub use sprints::CreateSprint;
pub use tasks::{CreateTask, MoveTask, TaskDetail};

pub struct KanbanService {
    db: Arc<Database>,
    notifier: Arc<dyn ChangeNotifier>,
    files: Arc<dyn FileStorage>,
    config: Arc<AppConfig>,
}

impl KanbanService {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn ChangeNotifier>,
        files: Arc<dyn FileStorage>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            notifier,
            files,
            config,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Committed tables for a caller that passed the guard on `resource`.
    async fn view(
        &self,
        caller: &Caller,
        resource: ResourceRef,
        operation: Operation,
    ) -> KanbanResult<(RwLockReadGuard<'_, Tables>, Grant)> {
        let tables = self.db.read().await;
        let grant = AccessGuard::authorize(&*tables, caller, resource, operation)?;
        Ok((tables, grant))
    }

    /// Run `build` inside one unit of work owned by `caller`; publish the
    /// collected events once the commit succeeded.
    async fn write<T, F>(&self, caller: &Caller, build: F) -> KanbanResult<Committed<'_, T>>
    where
        F: FnOnce(&Tables, &mut Batch<'_>) -> KanbanResult<T> + Send,
        T: Send,
    {
        let mut events = Vec::new();
        let committed = self
            .db
            .transact(caller.user_id(), |tables, uow| {
                let mut batch = Batch {
                    uow,
                    events: &mut events,
                };
                build(tables, &mut batch)
            })
            .await?;

        for event in events {
            self.notifier.publish(event);
        }
        Ok(committed)
    }
}

/// Pending changes plus the events to publish once they are committed.
pub(crate) struct Batch<'a> {
    uow: &'a mut UnitOfWork,
    events: &'a mut Vec<BoardEvent>,
}

impl Batch<'_> {
    fn add(&mut self, record: impl Into<Entity>) -> &mut Self {
        self.uow.add(record);
        self
    }

    fn modify(&mut self, record: impl Into<Entity>) -> &mut Self {
        self.uow.modify(record);
        self
    }

    fn remove(&mut self, record: impl Into<Entity>) -> &mut Self {
        self.uow.remove(record);
        self
    }

    fn emit(&mut self, kind: EventKind, board_id: BoardId, resource_id: Uuid) -> &mut Self {
        self.events
            .push(BoardEvent::new(kind, board_id, resource_id));
        self
    }
}

/// Renumber `items` 0..n in their current order and return the ones whose
/// position changed.
fn renumber<T, P>(items: Vec<T>, mut position: P) -> Vec<T>
where
    P: FnMut(&mut T) -> &mut i32,
{
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, mut item)| {
            let slot = position(&mut item);
            if *slot == index as i32 {
                return None;
            }
            *slot = index as i32;
            Some(item)
        })
        .collect()
}

/// Clamp a requested position into `0..=len`; `None` appends.
fn insert_index(position: Option<i32>, len: usize) -> usize {
    match position {
        Some(position) if position >= 0 => (position as usize).min(len),
        Some(_) => 0,
        None => len,
    }
}

/// Clone a row the current unit of work just wrote.
fn fetch<R: Record + Clone>(table: &Table<R>, key: &R::Key) -> KanbanResult<R> {
    table
        .get(key)
        .cloned()
        .ok_or_else(|| KanbanError::Internal(format!("committed record {:?} missing", key)))
}

/// Clone a live row or fail with NotFound.
fn live<R: Record + Clone>(table: &Table<R>, key: &R::Key, what: &str) -> KanbanResult<R> {
    table
        .get(key)
        .cloned()
        .ok_or_else(|| KanbanError::NotFound(format!("{} {:?}", what, key)))
}
