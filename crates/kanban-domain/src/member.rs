use kanban_core::AuditInfo;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;
use crate::identity::UserId;

pub type MemberId = Uuid;

/// Board role, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BoardRole {
    Viewer,
    Member,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub board_id: BoardId,
    pub user_id: UserId,
    pub role: BoardRole,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(Member, MemberId);

impl Member {
    pub fn new(board_id: BoardId, user_id: UserId, role: BoardRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            board_id,
            user_id,
            role,
            audit: AuditInfo::default(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == BoardRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(BoardRole::Viewer < BoardRole::Member);
        assert!(BoardRole::Member < BoardRole::Admin);
    }
}
