use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    BoardUpdated,
    BoardArchived,
    BoardUnarchived,
    BoardDeleted,
    MemberAdded,
    MemberUpdated,
    MemberRemoved,
    ColumnCreated,
    ColumnUpdated,
    ColumnDeleted,
    TaskCreated,
    TaskUpdated,
    TaskMoved,
    TaskDeleted,
    CommentAdded,
    CommentUpdated,
    CommentDeleted,
    SubTaskAdded,
    SubTaskUpdated,
    SubTaskDeleted,
    AttachmentAdded,
    AttachmentDeleted,
    WatchersChanged,
    SprintCreated,
    SprintUpdated,
    SprintStarted,
    SprintCompleted,
    SprintDeleted,
    LabelCreated,
    LabelUpdated,
    LabelDeleted,
    TaskLabelsChanged,
}

/// Change notification pushed to every subscriber of a board.
///
/// Member events carry the member record id as `resource_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEvent {
    #[serde(rename = "event")]
    pub kind: EventKind,
    pub board_id: BoardId,
    pub resource_id: Uuid,
}

impl BoardEvent {
    pub fn new(kind: EventKind, board_id: BoardId, resource_id: Uuid) -> Self {
        Self {
            kind,
            board_id,
            resource_id,
        }
    }

    /// Name of the real-time group this event is delivered to.
    pub fn group(&self) -> String {
        self.board_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let board_id = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let event = BoardEvent::new(EventKind::TaskDeleted, board_id, task_id);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "TaskDeleted");
        assert_eq!(json["board_id"], board_id.to_string());
        assert_eq!(json["resource_id"], task_id.to_string());
        assert_eq!(event.group(), board_id.to_string());
    }
}
