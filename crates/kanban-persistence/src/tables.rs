use kanban_core::{AuditStamper, KanbanError, KanbanResult};
use kanban_domain::{
    Attachment, AttachmentId, Board, BoardId, Column, ColumnId, Comment, CommentId, Label,
    LabelId, Member, OwnershipGraph, Sprint, SprintId, SubTask, SubTaskId, Task, TaskId,
    TaskLabel, User, Watcher,
};
use serde::{Deserialize, Serialize};

use crate::table::Table;
use crate::unit_of_work::{Change, ChangeKind, Entity};

/// Every table of the board store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub users: Table<User>,
    #[serde(default)]
    pub boards: Table<Board>,
    #[serde(default)]
    pub members: Table<Member>,
    #[serde(default)]
    pub columns: Table<Column>,
    #[serde(default)]
    pub tasks: Table<Task>,
    #[serde(default)]
    pub subtasks: Table<SubTask>,
    #[serde(default)]
    pub comments: Table<Comment>,
    #[serde(default)]
    pub attachments: Table<Attachment>,
    #[serde(default)]
    pub watchers: Table<Watcher>,
    #[serde(default)]
    pub sprints: Table<Sprint>,
    #[serde(default)]
    pub labels: Table<Label>,
    #[serde(default)]
    pub task_labels: Table<TaskLabel>,
}

impl Tables {
    /// Apply one change, enforcing the storage-level constraints.
    pub(crate) fn apply(&mut self, change: Change, stamper: &AuditStamper) -> KanbanResult<()> {
        let kind = change.kind;
        match change.entity {
            Entity::User(r) => self.users.apply(kind, r, stamper),
            Entity::Board(r) => self.boards.apply(kind, r, stamper),
            Entity::Member(r) => {
                if kind == ChangeKind::Added && self.member(r.board_id, &r.user_id).is_some() {
                    return Err(KanbanError::Conflict(format!(
                        "{} is already a member of board {}",
                        r.user_id, r.board_id
                    )));
                }
                self.members.apply(kind, r, stamper)
            }
            Entity::Column(r) => self.columns.apply(kind, r, stamper),
            Entity::Task(r) => self.tasks.apply(kind, r, stamper),
            Entity::SubTask(r) => self.subtasks.apply(kind, r, stamper),
            Entity::Comment(r) => self.comments.apply(kind, r, stamper),
            Entity::Attachment(r) => self.attachments.apply(kind, r, stamper),
            Entity::Watcher(r) => {
                if kind == ChangeKind::Added
                    && self
                        .watchers
                        .find(|w| w.task_id == r.task_id && w.user_id == r.user_id)
                        .is_some()
                {
                    return Err(KanbanError::Conflict(format!(
                        "{} already watches task {}",
                        r.user_id, r.task_id
                    )));
                }
                self.watchers.apply(kind, r, stamper)
            }
            Entity::Sprint(r) => self.sprints.apply(kind, r, stamper),
            Entity::Label(r) => {
                let label_id = r.id;
                self.labels.apply(kind, r, stamper)?;
                if kind == ChangeKind::Removed {
                    let purged = self.task_labels.purge(|tl| tl.label_id == label_id);
                    tracing::debug!(%label_id, purged, "cascaded label removal");
                }
                Ok(())
            }
            Entity::TaskLabel(r) => {
                if kind == ChangeKind::Added
                    && self
                        .task_labels
                        .find(|tl| tl.task_id == r.task_id && tl.label_id == r.label_id)
                        .is_some()
                {
                    return Err(KanbanError::Conflict(format!(
                        "label {} already applied to task {}",
                        r.label_id, r.task_id
                    )));
                }
                self.task_labels.apply(kind, r, stamper)
            }
        }
    }

    pub fn member(&self, board_id: BoardId, user_id: &str) -> Option<&Member> {
        self.members
            .find(|m| m.board_id == board_id && m.user_id == user_id)
    }

    pub fn board_members(&self, board_id: BoardId) -> Vec<&Member> {
        self.members.find_all(move |m| m.board_id == board_id).collect()
    }

    /// Columns of a board in display order.
    pub fn board_columns(&self, board_id: BoardId) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self
            .columns
            .find_all(move |c| c.board_id == board_id)
            .collect();
        columns.sort_by_key(|c| c.position);
        columns
    }

    /// Live tasks of a column in display order.
    pub fn column_tasks(&self, column_id: ColumnId) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .find_all(move |t| t.column_id == column_id)
            .collect();
        tasks.sort_by_key(|t| t.position);
        tasks
    }

    pub fn task_label_ids(&self, task_id: TaskId) -> Vec<LabelId> {
        self.task_labels
            .find_all(move |tl| tl.task_id == task_id)
            .map(|tl| tl.label_id)
            .collect()
    }
}

impl OwnershipGraph for Tables {
    fn user(&self, id: &str) -> Option<&User> {
        self.users.get(&id.to_string())
    }

    fn board(&self, id: BoardId) -> Option<&Board> {
        self.boards.get(&id)
    }

    fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(&id)
    }

    fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    fn subtask(&self, id: SubTaskId) -> Option<&SubTask> {
        self.subtasks.get(&id)
    }

    fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.get(&id)
    }

    fn attachment(&self, id: AttachmentId) -> Option<&Attachment> {
        self.attachments.get(&id)
    }

    fn sprint(&self, id: SprintId) -> Option<&Sprint> {
        self.sprints.get(&id)
    }

    fn label(&self, id: LabelId) -> Option<&Label> {
        self.labels.get(&id)
    }

    fn membership(&self, board_id: BoardId, user_id: &str) -> Option<&Member> {
        self.member(board_id, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_domain::BoardRole;

    fn add(tables: &mut Tables, entity: impl Into<Entity>) -> KanbanResult<()> {
        tables.apply(
            Change {
                kind: ChangeKind::Added,
                entity: entity.into(),
            },
            &AuditStamper::new("alice"),
        )
    }

    #[test]
    fn test_member_unique_per_board_and_user() {
        let mut tables = Tables::default();
        let board = Board::new("Board", None).unwrap();
        add(&mut tables, Member::new(board.id, "bob".into(), BoardRole::Viewer)).unwrap();

        let err = add(&mut tables, Member::new(board.id, "bob".into(), BoardRole::Admin))
            .unwrap_err();
        assert!(matches!(err, KanbanError::Conflict(_)));

        let other_board = Board::new("Other", None).unwrap();
        add(&mut tables, Member::new(other_board.id, "bob".into(), BoardRole::Admin)).unwrap();
    }

    #[test]
    fn test_label_removal_cascades_task_labels() {
        let mut tables = Tables::default();
        let board = Board::new("Board", None).unwrap();
        let label = Label::new(board.id, "bug", None).unwrap();
        let task_id = uuid::Uuid::new_v4();
        add(&mut tables, label.clone()).unwrap();
        add(&mut tables, TaskLabel::new(task_id, label.id)).unwrap();
        assert_eq!(tables.task_label_ids(task_id), vec![label.id]);

        tables
            .apply(
                Change {
                    kind: ChangeKind::Removed,
                    entity: label.into(),
                },
                &AuditStamper::new("alice"),
            )
            .unwrap();
        assert!(tables.task_label_ids(task_id).is_empty());
    }

    #[test]
    fn test_board_columns_sorted() {
        let mut tables = Tables::default();
        let board = Board::new("Board", None).unwrap();
        add(&mut tables, Column::new(board.id, "Done", 2).unwrap()).unwrap();
        add(&mut tables, Column::new(board.id, "Todo", 0).unwrap()).unwrap();
        add(&mut tables, Column::new(board.id, "Doing", 1).unwrap()).unwrap();

        let names: Vec<&str> = tables
            .board_columns(board.id)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Todo", "Doing", "Done"]);
    }
}
