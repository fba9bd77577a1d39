//! Board-scoped access guard.
//!
//! Every resource reaches exactly one board through a single-parent chain.
//! The guard walks that chain over an [`OwnershipGraph`], checks the caller's
//! membership and hands the member's role to the role policy. Lookups on the
//! graph never return tombstoned rows, so a soft-deleted ancestor reads as
//! missing.

use kanban_core::{KanbanError, KanbanResult};

use crate::attachment::{Attachment, AttachmentId};
use crate::board::{Board, BoardId};
use crate::column::{Column, ColumnId};
use crate::comment::{Comment, CommentId};
use crate::identity::{Caller, UserId};
use crate::label::{Label, LabelId};
use crate::member::Member;
use crate::policy::{decide, Authorship, Operation};
use crate::sprint::{Sprint, SprintId};
use crate::subtask::{SubTask, SubTaskId};
use crate::task::{Task, TaskId};
use crate::user::User;

/// Read-only view of stored entities, with soft-deleted rows filtered out.
pub trait OwnershipGraph {
    fn user(&self, id: &str) -> Option<&User>;
    fn board(&self, id: BoardId) -> Option<&Board>;
    fn column(&self, id: ColumnId) -> Option<&Column>;
    fn task(&self, id: TaskId) -> Option<&Task>;
    fn subtask(&self, id: SubTaskId) -> Option<&SubTask>;
    fn comment(&self, id: CommentId) -> Option<&Comment>;
    fn attachment(&self, id: AttachmentId) -> Option<&Attachment>;
    fn sprint(&self, id: SprintId) -> Option<&Sprint>;
    fn label(&self, id: LabelId) -> Option<&Label>;
    fn membership(&self, board_id: BoardId, user_id: &str) -> Option<&Member>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Board(BoardId),
    Column(ColumnId),
    Task(TaskId),
    SubTask(SubTaskId),
    Comment(CommentId),
    Attachment(AttachmentId),
    Sprint(SprintId),
    Label(LabelId),
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Board(id) => write!(f, "Board {}", id),
            Self::Column(id) => write!(f, "Column {}", id),
            Self::Task(id) => write!(f, "Task {}", id),
            Self::SubTask(id) => write!(f, "SubTask {}", id),
            Self::Comment(id) => write!(f, "Comment {}", id),
            Self::Attachment(id) => write!(f, "Attachment {}", id),
            Self::Sprint(id) => write!(f, "Sprint {}", id),
            Self::Label(id) => write!(f, "Label {}", id),
        }
    }
}

/// Where a resource sits: its board and, for authored content, its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub board_id: BoardId,
    pub author: Option<UserId>,
}

/// Proof that the caller passed the guard for one resource and operation.
#[derive(Debug, Clone)]
pub struct Grant {
    pub board_id: BoardId,
    pub member: Member,
    pub author: Option<UserId>,
}

impl Grant {
    pub fn user_id(&self) -> &str {
        &self.member.user_id
    }
}

pub struct AccessGuard;

impl AccessGuard {
    /// Reject callers whose user record has been deactivated.
    pub fn authenticate<G: OwnershipGraph + ?Sized>(graph: &G, caller: &Caller) -> KanbanResult<()> {
        match graph.user(caller.user_id()) {
            Some(user) if !user.is_active => Err(KanbanError::Unauthorized(format!(
                "user {} is deactivated",
                caller
            ))),
            _ => Ok(()),
        }
    }

    /// Walk the ownership chain from `resource` up to its board.
    pub fn resolve<G: OwnershipGraph + ?Sized>(graph: &G, resource: ResourceRef) -> Option<Ownership> {
        let (board_id, author) = match resource {
            ResourceRef::Board(id) => (id, None),
            ResourceRef::Column(id) => (graph.column(id)?.board_id, None),
            ResourceRef::Task(id) => (graph.task(id)?.board_id, None),
            ResourceRef::SubTask(id) => {
                let subtask = graph.subtask(id)?;
                (graph.task(subtask.task_id)?.board_id, None)
            }
            ResourceRef::Comment(id) => {
                let comment = graph.comment(id)?;
                let task = graph.task(comment.task_id)?;
                (task.board_id, Some(comment.author_id.clone()))
            }
            ResourceRef::Attachment(id) => {
                let attachment = graph.attachment(id)?;
                let task = graph.task(attachment.task_id)?;
                (task.board_id, Some(attachment.uploaded_by.clone()))
            }
            ResourceRef::Sprint(id) => (graph.sprint(id)?.board_id, None),
            ResourceRef::Label(id) => (graph.label(id)?.board_id, None),
        };
        graph.board(board_id)?;
        Some(Ownership { board_id, author })
    }

    /// Authenticate, resolve ownership, check membership, then apply the role
    /// policy. Failures surface in that order: Unauthorized, NotFound,
    /// Forbidden.
    pub fn authorize<G: OwnershipGraph + ?Sized>(
        graph: &G,
        caller: &Caller,
        resource: ResourceRef,
        operation: Operation,
    ) -> KanbanResult<Grant> {
        Self::authenticate(graph, caller)?;

        let ownership =
            Self::resolve(graph, resource).ok_or_else(|| KanbanError::not_found(resource))?;

        let member = graph
            .membership(ownership.board_id, caller.user_id())
            .ok_or_else(|| {
                KanbanError::Forbidden(format!(
                    "{} is not a member of board {}",
                    caller, ownership.board_id
                ))
            })?;

        let authorship = Authorship::of(ownership.author.as_deref(), caller.user_id());
        if !decide(member.role, operation, authorship).is_allowed() {
            return Err(KanbanError::Forbidden(format!(
                "{:?} role may not {:?} on {}",
                member.role, operation, resource
            )));
        }

        Ok(Grant {
            board_id: ownership.board_id,
            member: member.clone(),
            author: ownership.author,
        })
    }
}
