use kanban_domain::{
    Attachment, Board, Column, Comment, Label, Member, Sprint, SubTask, Task, TaskLabel, User,
    Watcher,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// Any persisted record.
#[derive(Debug, Clone)]
pub enum Entity {
    User(User),
    Board(Board),
    Member(Member),
    Column(Column),
    Task(Task),
    SubTask(SubTask),
    Comment(Comment),
    Attachment(Attachment),
    Watcher(Watcher),
    Sprint(Sprint),
    Label(Label),
    TaskLabel(TaskLabel),
}

macro_rules! entity_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Entity {
                fn from(record: $variant) -> Self {
                    Entity::$variant(record)
                }
            }
        )*
    };
}

entity_from!(
    User, Board, Member, Column, Task, SubTask, Comment, Attachment, Watcher, Sprint, Label,
    TaskLabel,
);

#[derive(Debug, Clone)]
pub struct Change {
    pub kind: ChangeKind,
    pub entity: Entity,
}

/// Pending changes made by one actor for one operation.
///
/// Nothing is visible to readers until `Database::commit` applies the whole
/// batch.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    actor: String,
    changes: Vec<Change>,
}

impl UnitOfWork {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            changes: Vec::new(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn add(&mut self, record: impl Into<Entity>) -> &mut Self {
        self.push(ChangeKind::Added, record.into())
    }

    pub fn modify(&mut self, record: impl Into<Entity>) -> &mut Self {
        self.push(ChangeKind::Modified, record.into())
    }

    /// Mark for deletion. Soft-deletable records are tombstoned at commit.
    pub fn remove(&mut self, record: impl Into<Entity>) -> &mut Self {
        self.push(ChangeKind::Removed, record.into())
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn into_changes(self) -> (String, Vec<Change>) {
        (self.actor, self.changes)
    }

    fn push(&mut self, kind: ChangeKind, entity: Entity) -> &mut Self {
        self.changes.push(Change { kind, entity });
        self
    }
}
