use kanban_core::AuditInfo;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::UserId;
use crate::task::TaskId;

pub type WatcherId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watcher {
    pub id: WatcherId,
    pub task_id: TaskId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(Watcher, WatcherId);

impl Watcher {
    pub fn new(task_id: TaskId, user_id: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            user_id,
            audit: AuditInfo::default(),
        }
    }
}

/// Watch state reported by watch, unwatch and toggle operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStatus {
    pub task_id: TaskId,
    pub user_id: UserId,
    pub watching: bool,
}
