use kanban_core::{AuditInfo, KanbanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;
use crate::field_update::FieldUpdate;
use crate::validation::{required_text, MAX_NAME_LENGTH};

pub type ColumnId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub board_id: BoardId,
    pub name: String,
    pub position: i32,
    pub wip_limit: Option<u32>,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(Column, ColumnId);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub wip_limit: FieldUpdate<u32>,
}

impl Column {
    pub fn new(board_id: BoardId, name: &str, position: i32) -> KanbanResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            board_id,
            name: required_text("column name", name, MAX_NAME_LENGTH)?,
            position,
            wip_limit: None,
            audit: AuditInfo::default(),
        })
    }

    pub fn update(&mut self, updates: ColumnUpdate) -> KanbanResult<()> {
        if let Some(name) = updates.name {
            self.name = required_text("column name", &name, MAX_NAME_LENGTH)?;
        }
        updates.wip_limit.apply_to(&mut self.wip_limit);
        Ok(())
    }

    pub fn update_position(&mut self, position: i32) {
        self.position = position;
    }
}
