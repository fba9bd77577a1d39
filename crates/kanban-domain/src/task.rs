use chrono::{DateTime, Utc};
use kanban_core::{AuditInfo, KanbanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Board, BoardId};
use crate::column::ColumnId;
use crate::field_update::FieldUpdate;
use crate::identity::UserId;
use crate::label::LabelId;
use crate::sprint::SprintId;
use crate::validation::{required_text, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub board_id: BoardId,
    pub column_id: ColumnId,
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
    pub task_number: u32,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub position: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<UserId>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(Task, TaskId, soft_delete);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: FieldUpdate<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: FieldUpdate<DateTime<Utc>>,
    #[serde(default)]
    pub assignee_id: FieldUpdate<UserId>,
}

/// Query filter for listing a board's tasks. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub column_id: Option<ColumnId>,
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    #[serde(default)]
    pub label_id: Option<LabelId>,
}

impl Task {
    /// Create a task at `position` in `column_id`, consuming the board's next
    /// task number.
    pub fn new(board: &mut Board, column_id: ColumnId, title: &str, position: i32) -> KanbanResult<Self> {
        let title = required_text("task title", title, MAX_NAME_LENGTH)?;
        let task_number = board.allocate_task_number();
        Ok(Self {
            id: Uuid::new_v4(),
            board_id: board.id,
            column_id,
            sprint_id: None,
            task_number,
            title,
            description: None,
            priority: TaskPriority::Medium,
            position,
            due_date: None,
            assignee_id: None,
            deleted_at: None,
            audit: AuditInfo::default(),
        })
    }

    pub fn move_to_column(&mut self, column_id: ColumnId, position: i32) {
        self.column_id = column_id;
        self.position = position;
    }

    pub fn assign_sprint(&mut self, sprint_id: Option<SprintId>) {
        self.sprint_id = sprint_id;
    }

    pub fn update(&mut self, updates: TaskUpdate) -> KanbanResult<()> {
        if let Some(title) = updates.title {
            self.title = required_text("task title", &title, MAX_NAME_LENGTH)?;
        }
        if let Some(priority) = updates.priority {
            self.priority = priority;
        }
        updates
            .description
            .try_map(|d| required_text("description", &d, MAX_TEXT_LENGTH))?
            .apply_to(&mut self.description);
        updates.due_date.apply_to(&mut self.due_date);
        updates.assignee_id.apply_to(&mut self.assignee_id);
        Ok(())
    }

    pub fn matches(&self, filter: &TaskFilter) -> bool {
        filter.column_id.is_none_or(|id| self.column_id == id)
            && filter.sprint_id.is_none_or(|id| self.sprint_id == Some(id))
            && filter
                .assignee_id
                .as_deref()
                .is_none_or(|id| self.assignee_id.as_deref() == Some(id))
    }
}
