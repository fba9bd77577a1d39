#[macro_use]
mod record;

pub mod access;
pub mod attachment;
pub mod board;
pub mod column;
pub mod comment;
pub mod events;
pub mod field_update;
pub mod identity;
pub mod label;
pub mod member;
pub mod policy;
pub mod sprint;
pub mod subtask;
pub mod task;
pub mod user;
pub mod validation;
pub mod watcher;

pub use access::{AccessGuard, Grant, OwnershipGraph, ResourceRef};
pub use attachment::{Attachment, AttachmentId};
pub use board::{Board, BoardId, BoardUpdate};
pub use column::{Column, ColumnId, ColumnUpdate};
pub use comment::{Comment, CommentId};
pub use events::{BoardEvent, EventKind};
pub use field_update::FieldUpdate;
pub use identity::{Caller, UserId};
pub use label::{Label, LabelId, LabelUpdate, TaskLabel, TaskLabelId};
pub use member::{BoardRole, Member, MemberId};
pub use policy::{Authorship, Decision, Operation};
pub use sprint::{Sprint, SprintId, SprintStatus, SprintUpdate};
pub use subtask::{SubTask, SubTaskId, SubTaskUpdate};
pub use task::{Task, TaskFilter, TaskId, TaskPriority, TaskUpdate};
pub use user::{ProfileUpdate, User, UserAdminUpdate};
pub use watcher::{WatchStatus, Watcher, WatcherId};
