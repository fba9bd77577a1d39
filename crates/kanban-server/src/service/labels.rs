use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    AccessGuard, BoardId, Caller, EventKind, Label, LabelId, LabelUpdate, Operation, ResourceRef,
    TaskId, TaskLabel,
};
use kanban_persistence::Tables;
use serde::Deserialize;

use super::{fetch, live, KanbanService};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLabel {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl KanbanService {
    pub async fn list_labels(&self, caller: &Caller, board_id: BoardId) -> KanbanResult<Vec<Label>> {
        let (tables, _) = self
            .view(caller, ResourceRef::Board(board_id), Operation::ViewBoard)
            .await?;
        let mut labels: Vec<Label> = tables
            .labels
            .find_all(|l| l.board_id == board_id)
            .cloned()
            .collect();
        labels.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(labels)
    }

    /// Label names are unique per board, ignoring case.
    pub async fn create_label(
        &self,
        caller: &Caller,
        board_id: BoardId,
        request: CreateLabel,
    ) -> KanbanResult<Label> {
        let committed = self
            .write(caller, |tables, batch| {
                AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Board(board_id),
                    Operation::CreateLabel,
                )?;
                let label = Label::new(board_id, &request.name, request.color.as_deref())?;
                ensure_unique_name(tables, board_id, &label.name, None)?;
                let label_id = label.id;
                batch
                    .add(label)
                    .emit(EventKind::LabelCreated, board_id, label_id);
                Ok(label_id)
            })
            .await?;
        fetch(&committed.tables.labels, &committed.value)
    }

    pub async fn update_label(
        &self,
        caller: &Caller,
        label_id: LabelId,
        updates: LabelUpdate,
    ) -> KanbanResult<Label> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Label(label_id),
                    Operation::UpdateLabel,
                )?;
                let mut label = live(&tables.labels, &label_id, "label")?;
                label.update(updates)?;
                ensure_unique_name(tables, grant.board_id, &label.name, Some(label_id))?;
                batch
                    .modify(label)
                    .emit(EventKind::LabelUpdated, grant.board_id, label_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.labels, &label_id)
    }

    /// Removes the label from every task as well.
    pub async fn delete_label(&self, caller: &Caller, label_id: LabelId) -> KanbanResult<()> {
        self.write(caller, |tables, batch| {
            let grant = AccessGuard::authorize(
                tables,
                caller,
                ResourceRef::Label(label_id),
                Operation::DeleteLabel,
            )?;
            let label = live(&tables.labels, &label_id, "label")?;
            batch
                .remove(label)
                .emit(EventKind::LabelDeleted, grant.board_id, label_id);
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Tag a task; tagging twice is a no-op. Returns the task's labels.
    pub async fn add_task_label(
        &self,
        caller: &Caller,
        task_id: TaskId,
        label_id: LabelId,
    ) -> KanbanResult<Vec<Label>> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = authorize_tagging(tables, caller, task_id, label_id)?;
                if !tables.task_label_ids(task_id).contains(&label_id) {
                    batch
                        .add(TaskLabel::new(task_id, label_id))
                        .emit(EventKind::TaskLabelsChanged, grant, task_id);
                }
                Ok(())
            })
            .await?;
        Ok(task_labels(&committed.tables, task_id))
    }

    /// Untag a task; removing an absent label is a no-op.
    pub async fn remove_task_label(
        &self,
        caller: &Caller,
        task_id: TaskId,
        label_id: LabelId,
    ) -> KanbanResult<Vec<Label>> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = authorize_tagging(tables, caller, task_id, label_id)?;
                if let Some(link) = tables
                    .task_labels
                    .find(|tl| tl.task_id == task_id && tl.label_id == label_id)
                {
                    batch
                        .remove(link.clone())
                        .emit(EventKind::TaskLabelsChanged, grant, task_id);
                }
                Ok(())
            })
            .await?;
        Ok(task_labels(&committed.tables, task_id))
    }
}

/// Both the task and the label must live on the same board. Returns that
/// board.
fn authorize_tagging(
    tables: &Tables,
    caller: &Caller,
    task_id: TaskId,
    label_id: LabelId,
) -> KanbanResult<BoardId> {
    let grant = AccessGuard::authorize(tables, caller, ResourceRef::Task(task_id), Operation::TagTask)?;
    match tables.labels.get(&label_id) {
        Some(label) if label.board_id == grant.board_id => Ok(grant.board_id),
        _ => Err(KanbanError::not_found(format!(
            "label {} on board {}",
            label_id, grant.board_id
        ))),
    }
}

fn ensure_unique_name(
    tables: &Tables,
    board_id: BoardId,
    name: &str,
    except: Option<LabelId>,
) -> KanbanResult<()> {
    let taken = tables
        .labels
        .find(|l| l.board_id == board_id && Some(l.id) != except && l.has_name(name));
    match taken {
        Some(existing) => Err(KanbanError::Conflict(format!(
            "label '{}' already exists on this board",
            existing.name
        ))),
        None => Ok(()),
    }
}

fn task_labels(tables: &Tables, task_id: TaskId) -> Vec<Label> {
    let mut labels: Vec<Label> = tables
        .task_label_ids(task_id)
        .into_iter()
        .filter_map(|id| tables.labels.get(&id).cloned())
        .collect();
    labels.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MockFileStorage;
    use crate::notifier::NoopNotifier;
    use crate::service::{AddMember, CreateBoard, CreateTask};
    use kanban_core::AppConfig;
    use kanban_domain::BoardRole;
    use kanban_persistence::Database;
    use std::sync::Arc;

    fn service() -> KanbanService {
        KanbanService::new(
            Arc::new(Database::in_memory()),
            Arc::new(NoopNotifier),
            Arc::new(MockFileStorage::new()),
            Arc::new(AppConfig::default()),
        )
    }

    fn label(name: &str) -> CreateLabel {
        CreateLabel {
            name: name.into(),
            color: None,
        }
    }

    #[tokio::test]
    async fn test_label_names_unique_ignoring_case() {
        let service = service();
        let alice = Caller::from_identity(Some("alice")).unwrap();
        let board = service
            .create_board(&alice, CreateBoard::named("Roadmap"))
            .await
            .unwrap();

        service.create_label(&alice, board.id, label("Bug")).await.unwrap();
        let err = service
            .create_label(&alice, board.id, label("bug"))
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::Conflict(_)));

        let feature = service
            .create_label(&alice, board.id, label("Feature"))
            .await
            .unwrap();
        let err = service
            .update_label(
                &alice,
                feature.id,
                LabelUpdate {
                    name: Some("BUG".into()),
                    color: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_tagging_is_idempotent_and_cleared_on_label_delete() {
        let service = service();
        let alice = Caller::from_identity(Some("alice")).unwrap();
        let board = service
            .create_board(&alice, CreateBoard::named("Roadmap"))
            .await
            .unwrap();
        let columns = service.list_columns(&alice, board.id).await.unwrap();
        let task = service
            .create_task(&alice, board.id, CreateTask::titled(columns[0].id, "Crash"))
            .await
            .unwrap();
        let bug = service.create_label(&alice, board.id, label("Bug")).await.unwrap();

        service.add_task_label(&alice, task.id, bug.id).await.unwrap();
        let labels = service.add_task_label(&alice, task.id, bug.id).await.unwrap();
        assert_eq!(labels.len(), 1);

        service.delete_label(&alice, bug.id).await.unwrap();
        let detail = service.get_task(&alice, task.id).await.unwrap();
        assert!(detail.labels.is_empty());

        let labels = service.remove_task_label(&alice, task.id, bug.id).await;
        assert!(matches!(labels, Err(KanbanError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_viewer_cannot_delete_label() {
        let service = service();
        let alice = Caller::from_identity(Some("alice")).unwrap();
        let bob = Caller::from_identity(Some("bob")).unwrap();
        let board = service
            .create_board(&alice, CreateBoard::named("Roadmap"))
            .await
            .unwrap();
        service
            .add_member(
                &alice,
                board.id,
                AddMember {
                    user_id: "bob".into(),
                    role: BoardRole::Viewer,
                },
            )
            .await
            .unwrap();
        let bug = service.create_label(&alice, board.id, label("Bug")).await.unwrap();

        let err = service.delete_label(&bob, bug.id).await.unwrap_err();
        assert!(matches!(err, KanbanError::Forbidden(_)));
    }
}
