use std::collections::HashMap;

use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    AccessGuard, BoardId, Caller, ColumnId, EventKind, FieldUpdate, Label, Operation,
    ResourceRef, SprintId, SubTask, Task, TaskFilter, TaskId, TaskPriority, TaskUpdate, UserId,
    Watcher,
};
use kanban_persistence::Tables;
use serde::{Deserialize, Serialize};

use super::{fetch, insert_index, live, renumber, Batch, KanbanService};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub column_id: ColumnId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
    /// Insert position within the column; appended when absent.
    #[serde(default)]
    pub position: Option<i32>,
}

impl CreateTask {
    pub fn titled(column_id: ColumnId, title: &str) -> Self {
        Self {
            column_id,
            title: title.to_string(),
            description: None,
            priority: None,
            due_date: None,
            assignee_id: None,
            sprint_id: None,
            position: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveTask {
    pub column_id: ColumnId,
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub task: Task,
    pub subtasks: Vec<SubTask>,
    pub labels: Vec<Label>,
    pub watchers: Vec<Watcher>,
}

impl KanbanService {
    /// Create a task in one of the board's columns. The board hands out the
    /// task number, so it is rewritten in the same unit of work.
    pub async fn create_task(
        &self,
        caller: &Caller,
        board_id: BoardId,
        request: CreateTask,
    ) -> KanbanResult<Task> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Column(request.column_id),
                    Operation::CreateTask,
                )?;
                if grant.board_id != board_id {
                    return Err(KanbanError::not_found(format!(
                        "column {} on board {}",
                        request.column_id, board_id
                    )));
                }

                let mut board = live(&tables.boards, &board_id, "board")?;
                let mut siblings: Vec<Task> = tables
                    .column_tasks(request.column_id)
                    .into_iter()
                    .cloned()
                    .collect();
                let index = insert_index(request.position, siblings.len());
                let mut task = Task::new(&mut board, request.column_id, &request.title, index as i32)?;

                if let Some(assignee) = &request.assignee_id {
                    require_member(tables, board_id, assignee)?;
                }
                if let Some(sprint_id) = request.sprint_id {
                    require_open_sprint(tables, board_id, sprint_id)?;
                }
                task.update(TaskUpdate {
                    description: request.description.clone().into(),
                    priority: request.priority,
                    due_date: request.due_date.into(),
                    assignee_id: request.assignee_id.clone().into(),
                    ..Default::default()
                })?;
                task.assign_sprint(request.sprint_id);
                let task_id = task.id;

                siblings.insert(index, task.clone());
                for shifted in renumber(siblings, |t| &mut t.position) {
                    if shifted.id != task_id {
                        batch.modify(shifted);
                    }
                }
                batch
                    .modify(board)
                    .add(task)
                    .emit(EventKind::TaskCreated, board_id, task_id);
                Ok(task_id)
            })
            .await?;
        fetch(&committed.tables.tasks, &committed.value)
    }

    /// Tasks of a board ordered by column, then position.
    pub async fn list_tasks(
        &self,
        caller: &Caller,
        board_id: BoardId,
        filter: TaskFilter,
    ) -> KanbanResult<Vec<Task>> {
        let (tables, _) = self
            .view(caller, ResourceRef::Board(board_id), Operation::ViewBoard)
            .await?;

        let column_order: HashMap<ColumnId, i32> = tables
            .board_columns(board_id)
            .into_iter()
            .map(|c| (c.id, c.position))
            .collect();
        let mut tasks: Vec<Task> = tables
            .tasks
            .find_all(|t| t.board_id == board_id && t.matches(&filter))
            .filter(|t| {
                filter
                    .label_id
                    .is_none_or(|label_id| tables.task_label_ids(t.id).contains(&label_id))
            })
            .cloned()
            .collect();
        tasks.sort_by_key(|t| {
            (
                column_order.get(&t.column_id).copied().unwrap_or(i32::MAX),
                t.position,
            )
        });
        Ok(tasks)
    }

    pub async fn get_task(&self, caller: &Caller, task_id: TaskId) -> KanbanResult<TaskDetail> {
        let (tables, _) = self
            .view(caller, ResourceRef::Task(task_id), Operation::ViewBoard)
            .await?;

        let task = live(&tables.tasks, &task_id, "task")?;
        let mut subtasks: Vec<SubTask> = tables
            .subtasks
            .find_all(|s| s.task_id == task_id)
            .cloned()
            .collect();
        subtasks.sort_by_key(|s| s.position);
        let labels = tables
            .task_label_ids(task_id)
            .into_iter()
            .filter_map(|id| tables.labels.get(&id).cloned())
            .collect();
        let watchers = tables
            .watchers
            .find_all(|w| w.task_id == task_id)
            .cloned()
            .collect();

        Ok(TaskDetail {
            task,
            subtasks,
            labels,
            watchers,
        })
    }

    pub async fn update_task(
        &self,
        caller: &Caller,
        task_id: TaskId,
        updates: TaskUpdate,
    ) -> KanbanResult<Task> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Task(task_id),
                    Operation::UpdateTask,
                )?;
                if let FieldUpdate::Set(assignee) = &updates.assignee_id {
                    require_member(tables, grant.board_id, assignee)?;
                }
                let mut task = live(&tables.tasks, &task_id, "task")?;
                task.update(updates)?;
                batch
                    .modify(task)
                    .emit(EventKind::TaskUpdated, grant.board_id, task_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.tasks, &task_id)
    }

    /// Move within or across columns of the same board. Both columns end up
    /// numbered 0..n without gaps.
    pub async fn move_task(
        &self,
        caller: &Caller,
        task_id: TaskId,
        request: MoveTask,
    ) -> KanbanResult<Task> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Task(task_id),
                    Operation::MoveTask,
                )?;
                let target = live(&tables.columns, &request.column_id, "column")?;
                if target.board_id != grant.board_id {
                    return Err(KanbanError::bad_request(
                        "tasks can only move between columns of the same board",
                    ));
                }

                let mut task = live(&tables.tasks, &task_id, "task")?;
                let source_column = task.column_id;
                let mut target_tasks: Vec<Task> = tables
                    .column_tasks(target.id)
                    .into_iter()
                    .filter(|t| t.id != task_id)
                    .cloned()
                    .collect();
                let index = insert_index(request.position, target_tasks.len());
                task.move_to_column(target.id, index as i32);
                target_tasks.insert(index, task.clone());

                for shifted in renumber(target_tasks, |t| &mut t.position) {
                    if shifted.id != task_id {
                        batch.modify(shifted);
                    }
                }
                if source_column != target.id {
                    close_gap(tables, batch, source_column, task_id);
                }
                batch
                    .modify(task)
                    .emit(EventKind::TaskMoved, grant.board_id, task_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.tasks, &task_id)
    }

    /// Put a task into a sprint of its board, or take it out with `None`.
    pub async fn assign_sprint(
        &self,
        caller: &Caller,
        task_id: TaskId,
        sprint_id: Option<SprintId>,
    ) -> KanbanResult<Task> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Task(task_id),
                    Operation::UpdateTask,
                )?;
                if let Some(sprint_id) = sprint_id {
                    require_open_sprint(tables, grant.board_id, sprint_id)?;
                }
                let mut task = live(&tables.tasks, &task_id, "task")?;
                task.assign_sprint(sprint_id);
                batch
                    .modify(task)
                    .emit(EventKind::TaskUpdated, grant.board_id, task_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.tasks, &task_id)
    }

    /// Soft delete; the column closes the gap.
    pub async fn delete_task(&self, caller: &Caller, task_id: TaskId) -> KanbanResult<()> {
        self.write(caller, |tables, batch| {
            let grant = AccessGuard::authorize(
                tables,
                caller,
                ResourceRef::Task(task_id),
                Operation::DeleteTask,
            )?;
            let task = live(&tables.tasks, &task_id, "task")?;
            close_gap(tables, batch, task.column_id, task_id);
            batch
                .remove(task)
                .emit(EventKind::TaskDeleted, grant.board_id, task_id);
            Ok(())
        })
        .await?;
        tracing::info!(%task_id, by = %caller, "task deleted");
        Ok(())
    }
}

/// Renumber a column as if `leaving` were no longer in it.
fn close_gap(tables: &Tables, batch: &mut Batch<'_>, column_id: ColumnId, leaving: TaskId) {
    let remaining: Vec<Task> = tables
        .column_tasks(column_id)
        .into_iter()
        .filter(|t| t.id != leaving)
        .cloned()
        .collect();
    for shifted in renumber(remaining, |t| &mut t.position) {
        batch.modify(shifted);
    }
}

fn require_member(tables: &Tables, board_id: BoardId, user_id: &str) -> KanbanResult<()> {
    match tables.member(board_id, user_id) {
        Some(_) => Ok(()),
        None => Err(KanbanError::BadRequest(format!(
            "{} is not a member of this board",
            user_id
        ))),
    }
}

fn require_open_sprint(tables: &Tables, board_id: BoardId, sprint_id: SprintId) -> KanbanResult<()> {
    match tables.sprints.get(&sprint_id) {
        Some(sprint) if sprint.board_id == board_id && sprint.is_open() => Ok(()),
        Some(sprint) if sprint.board_id == board_id => Err(KanbanError::bad_request(format!(
            "sprint '{}' is completed",
            sprint.name
        ))),
        _ => Err(KanbanError::not_found(format!("sprint {}", sprint_id))),
    }
}
