use chrono::{DateTime, Utc};
use kanban_core::{AuditInfo, KanbanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::field_update::FieldUpdate;
use crate::validation::{optional_text, required_text, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

pub type BoardId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default = "default_next_task_number")]
    pub next_task_number: u32,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

fn default_next_task_number() -> u32 {
    1
}

audited_record!(Board, BoardId, soft_delete);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: FieldUpdate<String>,
}

impl Board {
    pub fn new(name: &str, description: Option<String>) -> KanbanResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: required_text("board name", name, MAX_NAME_LENGTH)?,
            description: optional_text("description", description, MAX_TEXT_LENGTH)?,
            archived: false,
            next_task_number: 1,
            deleted_at: None,
            audit: AuditInfo::default(),
        })
    }

    pub fn update(&mut self, updates: BoardUpdate) -> KanbanResult<()> {
        if let Some(name) = updates.name {
            self.name = required_text("board name", &name, MAX_NAME_LENGTH)?;
        }
        let description = updates
            .description
            .try_map(|d| required_text("description", &d, MAX_TEXT_LENGTH))?;
        description.apply_to(&mut self.description);
        Ok(())
    }

    pub fn archive(&mut self) {
        self.archived = true;
    }

    pub fn unarchive(&mut self) {
        self.archived = false;
    }

    pub fn allocate_task_number(&mut self) -> u32 {
        let number = self.next_task_number;
        self.next_task_number += 1;
        number
    }
}
