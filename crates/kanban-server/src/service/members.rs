use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    AccessGuard, BoardId, BoardRole, Caller, EventKind, Member, Operation, ResourceRef, UserId,
};
use kanban_persistence::Tables;
use serde::Deserialize;

use super::{fetch, KanbanService};

#[derive(Debug, Clone, Deserialize)]
pub struct AddMember {
    pub user_id: UserId,
    pub role: BoardRole,
}

impl KanbanService {
    pub async fn list_members(&self, caller: &Caller, board_id: BoardId) -> KanbanResult<Vec<Member>> {
        let (tables, _) = self
            .view(caller, ResourceRef::Board(board_id), Operation::ViewBoard)
            .await?;
        Ok(tables.board_members(board_id).into_iter().cloned().collect())
    }

    /// Duplicate memberships are rejected with Conflict.
    pub async fn add_member(
        &self,
        caller: &Caller,
        board_id: BoardId,
        request: AddMember,
    ) -> KanbanResult<Member> {
        let user_id = request.user_id.trim().to_string();
        let committed = self
            .write(caller, |tables, batch| {
                AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Board(board_id),
                    Operation::ManageMembers,
                )?;
                if user_id.is_empty() {
                    return Err(KanbanError::bad_request("member user id must not be empty"));
                }
                if tables.member(board_id, &user_id).is_some() {
                    return Err(KanbanError::Conflict(format!(
                        "{} is already a member of this board",
                        user_id
                    )));
                }
                let member = Member::new(board_id, user_id.clone(), request.role);
                let member_id = member.id;
                batch
                    .add(member)
                    .emit(EventKind::MemberAdded, board_id, member_id);
                Ok(member_id)
            })
            .await?;
        fetch(&committed.tables.members, &committed.value)
    }

    pub async fn update_member_role(
        &self,
        caller: &Caller,
        board_id: BoardId,
        user_id: &str,
        role: BoardRole,
    ) -> KanbanResult<Member> {
        let committed = self
            .write(caller, |tables, batch| {
                AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Board(board_id),
                    Operation::ManageMembers,
                )?;
                let mut member = target_member(tables, board_id, user_id)?;
                if role != BoardRole::Admin && is_last_admin(tables, &member) {
                    tracing::warn!(%board_id, user_id, "demoting the last admin of the board");
                }
                member.role = role;
                let member_id = member.id;
                batch
                    .modify(member)
                    .emit(EventKind::MemberUpdated, board_id, member_id);
                Ok(member_id)
            })
            .await?;
        fetch(&committed.tables.members, &committed.value)
    }

    /// Admins may remove anyone; every member may remove themselves.
    pub async fn remove_member(
        &self,
        caller: &Caller,
        board_id: BoardId,
        user_id: &str,
    ) -> KanbanResult<()> {
        let operation = if user_id == caller.user_id() {
            Operation::ViewBoard
        } else {
            Operation::ManageMembers
        };

        self.write(caller, |tables, batch| {
            AccessGuard::authorize(tables, caller, ResourceRef::Board(board_id), operation)?;
            let member = target_member(tables, board_id, user_id)?;
            if is_last_admin(tables, &member) {
                tracing::warn!(%board_id, user_id, "removing the last admin of the board");
            }
            let member_id = member.id;
            batch
                .remove(member)
                .emit(EventKind::MemberRemoved, board_id, member_id);
            Ok(())
        })
        .await?;
        Ok(())
    }
}

fn target_member(tables: &Tables, board_id: BoardId, user_id: &str) -> KanbanResult<Member> {
    tables
        .member(board_id, user_id)
        .cloned()
        .ok_or_else(|| KanbanError::not_found(format!("member {} of board {}", user_id, board_id)))
}

fn is_last_admin(tables: &Tables, member: &Member) -> bool {
    member.is_admin()
        && tables
            .board_members(member.board_id)
            .iter()
            .filter(|m| m.is_admin())
            .count()
            == 1
}
