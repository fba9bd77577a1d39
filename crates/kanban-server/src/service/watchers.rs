use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    AccessGuard, Caller, EventKind, Grant, Operation, ResourceRef, TaskId, UserId, WatchStatus,
    Watcher,
};
use kanban_persistence::Tables;

use super::KanbanService;

impl KanbanService {
    pub async fn list_watchers(&self, caller: &Caller, task_id: TaskId) -> KanbanResult<Vec<Watcher>> {
        let (tables, _) = self
            .view(caller, ResourceRef::Task(task_id), Operation::ViewBoard)
            .await?;
        Ok(tables
            .watchers
            .find_all(|w| w.task_id == task_id)
            .cloned()
            .collect())
    }

    /// Flip the caller's own watch on a task.
    pub async fn toggle_watch(&self, caller: &Caller, task_id: TaskId) -> KanbanResult<WatchStatus> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Task(task_id),
                    Operation::WatchTask,
                )?;
                let watching = match find_watcher(tables, task_id, caller.user_id()) {
                    Some(existing) => {
                        batch.remove(existing);
                        false
                    }
                    None => {
                        batch.add(Watcher::new(task_id, caller.user_id().to_string()));
                        true
                    }
                };
                batch.emit(EventKind::WatchersChanged, grant.board_id, task_id);
                Ok(watching)
            })
            .await?;
        Ok(WatchStatus {
            task_id,
            user_id: caller.user_id().to_string(),
            watching: committed.value,
        })
    }

    /// Watch a task, for the caller or on behalf of another member.
    /// Watching twice is a no-op.
    pub async fn watch(
        &self,
        caller: &Caller,
        task_id: TaskId,
        user_id: Option<UserId>,
    ) -> KanbanResult<WatchStatus> {
        let target = user_id.unwrap_or_else(|| caller.user_id().to_string());
        self.write(caller, |tables, batch| {
            let grant = authorize_watch(tables, caller, task_id, &target)?;
            if find_watcher(tables, task_id, &target).is_none() {
                batch
                    .add(Watcher::new(task_id, target.clone()))
                    .emit(EventKind::WatchersChanged, grant.board_id, task_id);
            }
            Ok(())
        })
        .await?;
        Ok(WatchStatus {
            task_id,
            user_id: target,
            watching: true,
        })
    }

    /// Inverse of [`KanbanService::watch`]; unwatching twice is a no-op.
    pub async fn unwatch(
        &self,
        caller: &Caller,
        task_id: TaskId,
        user_id: Option<UserId>,
    ) -> KanbanResult<WatchStatus> {
        let target = user_id.unwrap_or_else(|| caller.user_id().to_string());
        self.write(caller, |tables, batch| {
            let grant = authorize_watch(tables, caller, task_id, &target)?;
            if let Some(existing) = find_watcher(tables, task_id, &target) {
                batch
                    .remove(existing)
                    .emit(EventKind::WatchersChanged, grant.board_id, task_id);
            }
            Ok(())
        })
        .await?;
        Ok(WatchStatus {
            task_id,
            user_id: target,
            watching: false,
        })
    }
}

fn find_watcher(tables: &Tables, task_id: TaskId, user_id: &str) -> Option<Watcher> {
    tables
        .watchers
        .find(|w| w.task_id == task_id && w.user_id == user_id)
        .cloned()
}

/// Acting for someone else needs ManageWatchers, and they must belong to
/// the board.
fn authorize_watch(
    tables: &Tables,
    caller: &Caller,
    task_id: TaskId,
    target: &str,
) -> KanbanResult<Grant> {
    if target == caller.user_id() {
        return AccessGuard::authorize(tables, caller, ResourceRef::Task(task_id), Operation::WatchTask);
    }
    let grant = AccessGuard::authorize(
        tables,
        caller,
        ResourceRef::Task(task_id),
        Operation::ManageWatchers,
    )?;
    if tables.member(grant.board_id, target).is_none() {
        return Err(KanbanError::BadRequest(format!(
            "{} is not a member of this board",
            target
        )));
    }
    Ok(grant)
}
