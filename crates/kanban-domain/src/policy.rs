//! Board role policy.
//!
//! A pure mapping from a member's role and the kind of operation to an
//! allow/deny decision. Ownership of the target (comments, attachments) can
//! widen or narrow what the role alone would permit.

use serde::{Deserialize, Serialize};

use crate::member::BoardRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    ViewBoard,
    UpdateBoard,
    ArchiveBoard,
    DeleteBoard,
    ManageMembers,
    CreateColumn,
    UpdateColumn,
    DeleteColumn,
    CreateTask,
    UpdateTask,
    MoveTask,
    DeleteTask,
    CreateComment,
    UpdateComment,
    DeleteComment,
    ManageSubTasks,
    UploadAttachment,
    DeleteAttachment,
    /// Watch or unwatch a task for oneself.
    WatchTask,
    /// Add or remove another member as a watcher.
    ManageWatchers,
    CreateSprint,
    UpdateSprint,
    StartSprint,
    CompleteSprint,
    DeleteSprint,
    CreateLabel,
    UpdateLabel,
    DeleteLabel,
    TagTask,
}

/// Whether the caller authored the resource being acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorship {
    Author,
    NotAuthor,
    NotApplicable,
}

impl Authorship {
    pub fn of(author: Option<&str>, user_id: &str) -> Self {
        match author {
            Some(author) if author == user_id => Self::Author,
            Some(_) => Self::NotAuthor,
            None => Self::NotApplicable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

impl Operation {
    /// Least privileged role that may perform the operation on role alone.
    pub fn minimum_role(self) -> BoardRole {
        use Operation::*;
        match self {
            ViewBoard | WatchTask => BoardRole::Viewer,

            CreateColumn | UpdateColumn | CreateTask | UpdateTask | MoveTask | DeleteTask
            | CreateComment | ManageSubTasks | UploadAttachment | ManageWatchers
            | CreateSprint | UpdateSprint | StartSprint | CreateLabel | UpdateLabel
            | TagTask => BoardRole::Member,

            UpdateBoard | ArchiveBoard | DeleteBoard | ManageMembers | DeleteColumn
            | CompleteSprint | DeleteSprint | DeleteLabel | UpdateComment | DeleteComment
            | DeleteAttachment => BoardRole::Admin,
        }
    }
}

pub fn decide(role: BoardRole, operation: Operation, authorship: Authorship) -> Decision {
    let is_author = authorship == Authorship::Author;
    match operation {
        // Editing someone else's words is never allowed, whatever the role.
        Operation::UpdateComment => Decision::from_bool(is_author),
        Operation::DeleteComment | Operation::DeleteAttachment => {
            Decision::from_bool(is_author || role >= BoardRole::Admin)
        }
        _ => Decision::from_bool(role >= operation.minimum_role()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BoardRole::*;

    const ALL: [Operation; 29] = [
        Operation::ViewBoard,
        Operation::UpdateBoard,
        Operation::ArchiveBoard,
        Operation::DeleteBoard,
        Operation::ManageMembers,
        Operation::CreateColumn,
        Operation::UpdateColumn,
        Operation::DeleteColumn,
        Operation::CreateTask,
        Operation::UpdateTask,
        Operation::MoveTask,
        Operation::DeleteTask,
        Operation::CreateComment,
        Operation::UpdateComment,
        Operation::DeleteComment,
        Operation::ManageSubTasks,
        Operation::UploadAttachment,
        Operation::DeleteAttachment,
        Operation::WatchTask,
        Operation::ManageWatchers,
        Operation::CreateSprint,
        Operation::UpdateSprint,
        Operation::StartSprint,
        Operation::CompleteSprint,
        Operation::DeleteSprint,
        Operation::CreateLabel,
        Operation::UpdateLabel,
        Operation::DeleteLabel,
        Operation::TagTask,
    ];

    fn allowed(role: BoardRole, op: Operation) -> bool {
        decide(role, op, Authorship::NotApplicable).is_allowed()
    }

    #[test]
    fn test_viewer_is_read_only() {
        assert!(allowed(Viewer, Operation::ViewBoard));
        assert!(allowed(Viewer, Operation::WatchTask));
        for op in ALL {
            if !matches!(op, Operation::ViewBoard | Operation::WatchTask) {
                assert!(!allowed(Viewer, op), "viewer allowed {:?}", op);
            }
        }
    }

    #[test]
    fn test_member_cannot_destroy_shared_structure() {
        assert!(allowed(Member, Operation::MoveTask));
        assert!(allowed(Member, Operation::UploadAttachment));
        assert!(allowed(Member, Operation::CreateLabel));
        assert!(!allowed(Member, Operation::ArchiveBoard));
        assert!(!allowed(Member, Operation::DeleteBoard));
        assert!(!allowed(Member, Operation::DeleteColumn));
        assert!(!allowed(Member, Operation::CompleteSprint));
        assert!(!allowed(Member, Operation::DeleteSprint));
        assert!(!allowed(Member, Operation::DeleteLabel));
    }

    #[test]
    fn test_admin_has_full_control() {
        for op in ALL {
            if op != Operation::UpdateComment {
                assert!(allowed(Admin, op), "admin denied {:?}", op);
            }
        }
    }

    #[test]
    fn test_comment_update_requires_authorship() {
        for role in [Viewer, Member, Admin] {
            assert!(decide(role, Operation::UpdateComment, Authorship::Author).is_allowed());
            assert!(!decide(role, Operation::UpdateComment, Authorship::NotAuthor).is_allowed());
        }
    }

    #[test]
    fn test_comment_delete_by_author_or_admin() {
        assert!(decide(Viewer, Operation::DeleteComment, Authorship::Author).is_allowed());
        assert!(!decide(Member, Operation::DeleteComment, Authorship::NotAuthor).is_allowed());
        assert!(decide(Admin, Operation::DeleteComment, Authorship::NotAuthor).is_allowed());
        assert!(decide(Member, Operation::DeleteAttachment, Authorship::Author).is_allowed());
        assert!(!decide(Member, Operation::DeleteAttachment, Authorship::NotAuthor).is_allowed());
    }

    #[test]
    fn test_authorship_of() {
        assert_eq!(Authorship::of(Some("a"), "a"), Authorship::Author);
        assert_eq!(Authorship::of(Some("b"), "a"), Authorship::NotAuthor);
        assert_eq!(Authorship::of(None, "a"), Authorship::NotApplicable);
    }
}
