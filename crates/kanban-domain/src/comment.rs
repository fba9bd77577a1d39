use kanban_core::{AuditInfo, KanbanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::UserId;
use crate::task::TaskId;
use crate::validation::{required_text, MAX_TEXT_LENGTH};

pub type CommentId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub author_id: UserId,
    pub body: String,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(Comment, CommentId);

impl Comment {
    pub fn new(task_id: TaskId, author_id: UserId, body: &str) -> KanbanResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            task_id,
            author_id,
            body: required_text("comment", body, MAX_TEXT_LENGTH)?,
            audit: AuditInfo::default(),
        })
    }

    pub fn edit(&mut self, body: &str) -> KanbanResult<()> {
        self.body = required_text("comment", body, MAX_TEXT_LENGTH)?;
        Ok(())
    }

    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }
}
