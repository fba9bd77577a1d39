use kanban_core::{AuditInfo, KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;
use crate::task::TaskId;
use crate::validation::{is_hex_color, required_text};

pub type LabelId = Uuid;
pub type TaskLabelId = Uuid;

const MAX_LABEL_LENGTH: usize = 50;
const DEFAULT_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub board_id: BoardId,
    pub name: String,
    pub color: String,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(Label, LabelId);

/// Join row between a task and a label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLabel {
    pub id: TaskLabelId,
    pub task_id: TaskId,
    pub label_id: LabelId,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(TaskLabel, TaskLabelId);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Label {
    pub fn new(board_id: BoardId, name: &str, color: Option<&str>) -> KanbanResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            board_id,
            name: required_text("label name", name, MAX_LABEL_LENGTH)?,
            color: normalize_color(color.unwrap_or(DEFAULT_COLOR))?,
            audit: AuditInfo::default(),
        })
    }

    pub fn update(&mut self, updates: LabelUpdate) -> KanbanResult<()> {
        if let Some(name) = updates.name {
            self.name = required_text("label name", &name, MAX_LABEL_LENGTH)?;
        }
        if let Some(color) = updates.color {
            self.color = normalize_color(&color)?;
        }
        Ok(())
    }

    /// Label names are unique per board, ignoring case.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

impl TaskLabel {
    pub fn new(task_id: TaskId, label_id: LabelId) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            label_id,
            audit: AuditInfo::default(),
        }
    }
}

fn normalize_color(color: &str) -> KanbanResult<String> {
    let color = color.trim();
    if !is_hex_color(color) {
        return Err(KanbanError::BadRequest(format!(
            "invalid label color '{}', expected #rrggbb",
            color
        )));
    }
    Ok(color.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_label_defaults_color() {
        let label = Label::new(Uuid::new_v4(), "bug", None).unwrap();
        assert_eq!(label.color, DEFAULT_COLOR);
    }

    #[test]
    fn test_color_validated_and_normalized() {
        let label = Label::new(Uuid::new_v4(), "bug", Some("#FF0000")).unwrap();
        assert_eq!(label.color, "#ff0000");
        assert!(Label::new(Uuid::new_v4(), "bug", Some("red")).is_err());
    }

    #[test]
    fn test_has_name_ignores_case() {
        let label = Label::new(Uuid::new_v4(), "Bug", None).unwrap();
        assert!(label.has_name("bug"));
        assert!(label.has_name(" BUG "));
        assert!(!label.has_name("feature"));
    }
}
