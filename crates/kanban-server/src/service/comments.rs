use kanban_core::KanbanResult;
use kanban_domain::{
    AccessGuard, Caller, Comment, CommentId, EventKind, Operation, ResourceRef, TaskId,
};

use super::{fetch, live, KanbanService};

impl KanbanService {
    /// Comments of a task, oldest first.
    pub async fn list_comments(&self, caller: &Caller, task_id: TaskId) -> KanbanResult<Vec<Comment>> {
        let (tables, _) = self
            .view(caller, ResourceRef::Task(task_id), Operation::ViewBoard)
            .await?;
        let mut comments: Vec<Comment> = tables
            .comments
            .find_all(|c| c.task_id == task_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.audit.created_at);
        Ok(comments)
    }

    pub async fn add_comment(
        &self,
        caller: &Caller,
        task_id: TaskId,
        body: &str,
    ) -> KanbanResult<Comment> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Task(task_id),
                    Operation::CreateComment,
                )?;
                let comment = Comment::new(task_id, caller.user_id().to_string(), body)?;
                let comment_id = comment.id;
                batch
                    .add(comment)
                    .emit(EventKind::CommentAdded, grant.board_id, comment_id);
                Ok(comment_id)
            })
            .await?;
        fetch(&committed.tables.comments, &committed.value)
    }

    /// Only the author may edit a comment.
    pub async fn update_comment(
        &self,
        caller: &Caller,
        comment_id: CommentId,
        body: &str,
    ) -> KanbanResult<Comment> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Comment(comment_id),
                    Operation::UpdateComment,
                )?;
                let mut comment = live(&tables.comments, &comment_id, "comment")?;
                comment.edit(body)?;
                batch
                    .modify(comment)
                    .emit(EventKind::CommentUpdated, grant.board_id, comment_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.comments, &comment_id)
    }

    /// The author or a board admin may delete a comment.
    pub async fn delete_comment(&self, caller: &Caller, comment_id: CommentId) -> KanbanResult<()> {
        self.write(caller, |tables, batch| {
            let grant = AccessGuard::authorize(
                tables,
                caller,
                ResourceRef::Comment(comment_id),
                Operation::DeleteComment,
            )?;
            let comment = live(&tables.comments, &comment_id, "comment")?;
            batch
                .remove(comment)
                .emit(EventKind::CommentDeleted, grant.board_id, comment_id);
            Ok(())
        })
        .await?;
        Ok(())
    }
}
