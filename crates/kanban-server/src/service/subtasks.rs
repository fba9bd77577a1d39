use kanban_core::KanbanResult;
use kanban_domain::{
    AccessGuard, Caller, EventKind, Operation, ResourceRef, SubTask, SubTaskId, SubTaskUpdate,
    TaskId,
};
use kanban_persistence::Tables;

use super::{fetch, live, renumber, KanbanService};

impl KanbanService {
    pub async fn list_subtasks(&self, caller: &Caller, task_id: TaskId) -> KanbanResult<Vec<SubTask>> {
        let (tables, _) = self
            .view(caller, ResourceRef::Task(task_id), Operation::ViewBoard)
            .await?;
        Ok(ordered_subtasks(&tables, task_id))
    }

    /// Appends to the end of the checklist.
    pub async fn add_subtask(
        &self,
        caller: &Caller,
        task_id: TaskId,
        title: &str,
    ) -> KanbanResult<SubTask> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Task(task_id),
                    Operation::ManageSubTasks,
                )?;
                let position = ordered_subtasks(tables, task_id).len() as i32;
                let subtask = SubTask::new(task_id, title, position)?;
                let subtask_id = subtask.id;
                batch
                    .add(subtask)
                    .emit(EventKind::SubTaskAdded, grant.board_id, subtask_id);
                Ok(subtask_id)
            })
            .await?;
        fetch(&committed.tables.subtasks, &committed.value)
    }

    pub async fn update_subtask(
        &self,
        caller: &Caller,
        subtask_id: SubTaskId,
        updates: SubTaskUpdate,
    ) -> KanbanResult<SubTask> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::SubTask(subtask_id),
                    Operation::ManageSubTasks,
                )?;
                let mut subtask = live(&tables.subtasks, &subtask_id, "subtask")?;
                subtask.update(updates)?;
                batch
                    .modify(subtask)
                    .emit(EventKind::SubTaskUpdated, grant.board_id, subtask_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.subtasks, &subtask_id)
    }

    pub async fn delete_subtask(&self, caller: &Caller, subtask_id: SubTaskId) -> KanbanResult<()> {
        self.write(caller, |tables, batch| {
            let grant = AccessGuard::authorize(
                tables,
                caller,
                ResourceRef::SubTask(subtask_id),
                Operation::ManageSubTasks,
            )?;
            let subtask = live(&tables.subtasks, &subtask_id, "subtask")?;
            let remaining: Vec<SubTask> = ordered_subtasks(tables, subtask.task_id)
                .into_iter()
                .filter(|s| s.id != subtask_id)
                .collect();
            for shifted in renumber(remaining, |s| &mut s.position) {
                batch.modify(shifted);
            }
            batch
                .remove(subtask)
                .emit(EventKind::SubTaskDeleted, grant.board_id, subtask_id);
            Ok(())
        })
        .await?;
        Ok(())
    }
}

fn ordered_subtasks(tables: &Tables, task_id: TaskId) -> Vec<SubTask> {
    let mut subtasks: Vec<SubTask> = tables
        .subtasks
        .find_all(|s| s.task_id == task_id)
        .cloned()
        .collect();
    subtasks.sort_by_key(|s| s.position);
    subtasks
}
