use kanban_core::{AuditInfo, KanbanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::TaskId;
use crate::validation::{required_text, MAX_NAME_LENGTH};

pub type SubTaskId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: SubTaskId,
    pub task_id: TaskId,
    pub title: String,
    #[serde(default)]
    pub is_done: bool,
    pub position: i32,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(SubTask, SubTaskId);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubTaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_done: Option<bool>,
}

impl SubTask {
    pub fn new(task_id: TaskId, title: &str, position: i32) -> KanbanResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            task_id,
            title: required_text("subtask title", title, MAX_NAME_LENGTH)?,
            is_done: false,
            position,
            audit: AuditInfo::default(),
        })
    }

    pub fn update(&mut self, updates: SubTaskUpdate) -> KanbanResult<()> {
        if let Some(title) = updates.title {
            self.title = required_text("subtask title", &title, MAX_NAME_LENGTH)?;
        }
        if let Some(is_done) = updates.is_done {
            self.is_done = is_done;
        }
        Ok(())
    }
}
