use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    AccessGuard, BoardId, Caller, EventKind, FieldUpdate, Operation, ResourceRef, Sprint,
    SprintId, SprintStatus, SprintUpdate,
};
use serde::Deserialize;

use super::{fetch, live, KanbanService};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSprint {
    pub name: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl KanbanService {
    pub async fn list_sprints(&self, caller: &Caller, board_id: BoardId) -> KanbanResult<Vec<Sprint>> {
        let (tables, _) = self
            .view(caller, ResourceRef::Board(board_id), Operation::ViewBoard)
            .await?;
        let mut sprints: Vec<Sprint> = tables
            .sprints
            .find_all(|s| s.board_id == board_id)
            .cloned()
            .collect();
        sprints.sort_by_key(|s| s.audit.created_at);
        Ok(sprints)
    }

    pub async fn create_sprint(
        &self,
        caller: &Caller,
        board_id: BoardId,
        request: CreateSprint,
    ) -> KanbanResult<Sprint> {
        let committed = self
            .write(caller, |tables, batch| {
                AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Board(board_id),
                    Operation::CreateSprint,
                )?;
                let mut sprint =
                    Sprint::new(board_id, &request.name, request.start_date, request.end_date)?;
                sprint.update(SprintUpdate {
                    goal: request.goal.into(),
                    ..Default::default()
                })?;
                let sprint_id = sprint.id;
                batch
                    .add(sprint)
                    .emit(EventKind::SprintCreated, board_id, sprint_id);
                Ok(sprint_id)
            })
            .await?;
        fetch(&committed.tables.sprints, &committed.value)
    }

    pub async fn update_sprint(
        &self,
        caller: &Caller,
        sprint_id: SprintId,
        updates: SprintUpdate,
    ) -> KanbanResult<Sprint> {
        self.mutate_sprint(
            caller,
            sprint_id,
            Operation::UpdateSprint,
            EventKind::SprintUpdated,
            |sprint| sprint.update(updates),
        )
        .await
    }

    /// Planned to Active. A board runs at most one active sprint.
    pub async fn start_sprint(&self, caller: &Caller, sprint_id: SprintId) -> KanbanResult<Sprint> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Sprint(sprint_id),
                    Operation::StartSprint,
                )?;
                if let Some(active) = tables.sprints.find(|s| {
                    s.board_id == grant.board_id && s.status == SprintStatus::Active
                }) {
                    return Err(KanbanError::BadRequest(format!(
                        "sprint '{}' is already active on this board",
                        active.name
                    )));
                }
                let mut sprint = live(&tables.sprints, &sprint_id, "sprint")?;
                sprint.start()?;
                batch
                    .modify(sprint)
                    .emit(EventKind::SprintStarted, grant.board_id, sprint_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.sprints, &sprint_id)
    }

    /// Active to Completed. Completed sprints are read-only.
    pub async fn complete_sprint(&self, caller: &Caller, sprint_id: SprintId) -> KanbanResult<Sprint> {
        self.mutate_sprint(
            caller,
            sprint_id,
            Operation::CompleteSprint,
            EventKind::SprintCompleted,
            Sprint::complete,
        )
        .await
    }

    /// Soft delete. Tasks planned into the sprint fall back to the backlog.
    pub async fn delete_sprint(&self, caller: &Caller, sprint_id: SprintId) -> KanbanResult<()> {
        self.write(caller, |tables, batch| {
            let grant = AccessGuard::authorize(
                tables,
                caller,
                ResourceRef::Sprint(sprint_id),
                Operation::DeleteSprint,
            )?;
            let sprint = live(&tables.sprints, &sprint_id, "sprint")?;
            for task in tables.tasks.find_all(|t| t.sprint_id == Some(sprint_id)) {
                let mut task = task.clone();
                task.assign_sprint(None);
                batch.modify(task);
            }
            batch
                .remove(sprint)
                .emit(EventKind::SprintDeleted, grant.board_id, sprint_id);
            Ok(())
        })
        .await?;
        tracing::info!(%sprint_id, by = %caller, "sprint deleted");
        Ok(())
    }

    async fn mutate_sprint<F>(
        &self,
        caller: &Caller,
        sprint_id: SprintId,
        operation: Operation,
        kind: EventKind,
        change: F,
    ) -> KanbanResult<Sprint>
    where
        F: FnOnce(&mut Sprint) -> KanbanResult<()> + Send,
    {
        let committed = self
            .write(caller, |tables, batch| {
                let grant =
                    AccessGuard::authorize(tables, caller, ResourceRef::Sprint(sprint_id), operation)?;
                let mut sprint = live(&tables.sprints, &sprint_id, "sprint")?;
                change(&mut sprint)?;
                batch.modify(sprint).emit(kind, grant.board_id, sprint_id);
                Ok(())
            })
            .await?;
        fetch(&committed.tables.sprints, &sprint_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MockFileStorage;
    use crate::notifier::NoopNotifier;
    use crate::service::{CreateBoard, CreateTask};
    use kanban_core::AppConfig;
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

    fn sprint_named(name: &str) -> CreateSprint {
        CreateSprint {
            name: name.into(),
            goal: Some("Ship the beta".into()),
            start_date: None,
            end_date: None,
        }
    }

    #[tokio::test]
    async fn test_only_one_active_sprint_per_board() {
        let service = service();
        let alice = Caller::from_identity(Some("alice")).unwrap();
        let board = service
            .create_board(&alice, CreateBoard::named("Roadmap"))
            .await
            .unwrap();

        let first = service
            .create_sprint(&alice, board.id, sprint_named("Sprint 1"))
            .await
            .unwrap();
        let second = service
            .create_sprint(&alice, board.id, sprint_named("Sprint 2"))
            .await
            .unwrap();
        assert_eq!(first.goal.as_deref(), Some("Ship the beta"));

        service.start_sprint(&alice, first.id).await.unwrap();
        let err = service.start_sprint(&alice, second.id).await.unwrap_err();
        assert!(matches!(err, KanbanError::BadRequest(_)));

        service.complete_sprint(&alice, first.id).await.unwrap();
        let started = service.start_sprint(&alice, second.id).await.unwrap();
        assert_eq!(started.status, SprintStatus::Active);
    }

    #[tokio::test]
    async fn test_deleting_sprint_returns_tasks_to_backlog() {
        let service = service();
        let alice = Caller::from_identity(Some("alice")).unwrap();
        let board = service
            .create_board(&alice, CreateBoard::named("Roadmap"))
            .await
            .unwrap();
        let sprint = service
            .create_sprint(&alice, board.id, sprint_named("Sprint 1"))
            .await
            .unwrap();
        let columns = service.list_columns(&alice, board.id).await.unwrap();
        let mut request = CreateTask::titled(columns[0].id, "Plan");
        request.sprint_id = Some(sprint.id);
        let task = service.create_task(&alice, board.id, request).await.unwrap();
        assert_eq!(task.sprint_id, Some(sprint.id));

        service.delete_sprint(&alice, sprint.id).await.unwrap();

        let detail = service.get_task(&alice, task.id).await.unwrap();
        assert_eq!(detail.task.sprint_id, None);
        assert!(service.list_sprints(&alice, board.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_goal_can_be_cleared() {
        let service = service();
        let alice = Caller::from_identity(Some("alice")).unwrap();
        let board = service
            .create_board(&alice, CreateBoard::named("Roadmap"))
            .await
            .unwrap();
        let sprint = service
            .create_sprint(&alice, board.id, sprint_named("Sprint 1"))
            .await
            .unwrap();

        let updated = service
            .update_sprint(
                &alice,
                sprint.id,
                SprintUpdate {
                    goal: FieldUpdate::Clear,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.goal, None);
        assert_eq!(updated.name, "Sprint 1");
    }
}
