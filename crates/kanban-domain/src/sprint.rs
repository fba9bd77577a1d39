use chrono::{DateTime, Utc};
use kanban_core::{AuditInfo, KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;
use crate::field_update::FieldUpdate;
use crate::validation::{required_text, MAX_NAME_LENGTH, MAX_TEXT_LENGTH};

pub type SprintId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SprintStatus {
    Planned,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    pub board_id: BoardId,
    pub name: String,
    pub goal: Option<String>,
    pub status: SprintStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(Sprint, SprintId, soft_delete);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SprintUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub goal: FieldUpdate<String>,
    #[serde(default)]
    pub start_date: FieldUpdate<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: FieldUpdate<DateTime<Utc>>,
}

impl Sprint {
    pub fn new(
        board_id: BoardId,
        name: &str,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> KanbanResult<Self> {
        check_dates(start_date, end_date)?;
        Ok(Self {
            id: Uuid::new_v4(),
            board_id,
            name: required_text("sprint name", name, MAX_NAME_LENGTH)?,
            goal: None,
            status: SprintStatus::Planned,
            start_date,
            end_date,
            deleted_at: None,
            audit: AuditInfo::default(),
        })
    }

    /// Planned → Active. Defaults the start date to now when unset.
    pub fn start(&mut self) -> KanbanResult<()> {
        if self.status != SprintStatus::Planned {
            return Err(KanbanError::BadRequest(format!(
                "sprint '{}' is {:?}; only planned sprints can be started",
                self.name, self.status
            )));
        }
        self.status = SprintStatus::Active;
        if self.start_date.is_none() {
            self.start_date = Some(Utc::now());
        }
        Ok(())
    }

    /// Active → Completed, the only transition out of Active.
    pub fn complete(&mut self) -> KanbanResult<()> {
        if self.status != SprintStatus::Active {
            return Err(KanbanError::BadRequest(format!(
                "sprint '{}' is {:?}; only active sprints can be completed",
                self.name, self.status
            )));
        }
        self.status = SprintStatus::Completed;
        if self.end_date.is_none() {
            self.end_date = Some(Utc::now());
        }
        Ok(())
    }

    pub fn update(&mut self, updates: SprintUpdate) -> KanbanResult<()> {
        if self.status == SprintStatus::Completed {
            return Err(KanbanError::BadRequest(
                "completed sprints cannot be edited".to_string(),
            ));
        }
        let mut start_date = self.start_date;
        let mut end_date = self.end_date;
        updates.start_date.apply_to(&mut start_date);
        updates.end_date.apply_to(&mut end_date);
        check_dates(start_date, end_date)?;

        if let Some(name) = updates.name {
            self.name = required_text("sprint name", &name, MAX_NAME_LENGTH)?;
        }
        updates
            .goal
            .try_map(|g| required_text("sprint goal", &g, MAX_TEXT_LENGTH))?
            .apply_to(&mut self.goal);
        self.start_date = start_date;
        self.end_date = end_date;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.status != SprintStatus::Completed
    }
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> KanbanResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(KanbanError::BadRequest(
            "sprint end date must not precede its start date".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sprint() -> Sprint {
        Sprint::new(Uuid::new_v4(), "Sprint 1", None, None).unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let mut sprint = sprint();
        assert_eq!(sprint.status, SprintStatus::Planned);

        sprint.start().unwrap();
        assert_eq!(sprint.status, SprintStatus::Active);
        assert!(sprint.start_date.is_some());

        sprint.complete().unwrap();
        assert_eq!(sprint.status, SprintStatus::Completed);
        assert!(sprint.end_date.is_some());
    }

    #[test]
    fn test_complete_requires_active() {
        let mut planned = sprint();
        assert!(matches!(planned.complete(), Err(KanbanError::BadRequest(_))));
        assert_eq!(planned.status, SprintStatus::Planned);

        let mut completed = sprint();
        completed.start().unwrap();
        completed.complete().unwrap();
        assert!(matches!(completed.complete(), Err(KanbanError::BadRequest(_))));
    }

    #[test]
    fn test_start_requires_planned() {
        let mut sprint = sprint();
        sprint.start().unwrap();
        assert!(sprint.start().is_err());
    }

    #[test]
    fn test_dates_validated() {
        let now = Utc::now();
        assert!(Sprint::new(Uuid::new_v4(), "S", Some(now), Some(now - Duration::days(1))).is_err());

        let mut sprint = Sprint::new(Uuid::new_v4(), "S", Some(now), None).unwrap();
        let bad = SprintUpdate {
            end_date: FieldUpdate::Set(now - Duration::days(2)),
            ..SprintUpdate::default()
        };
        assert!(sprint.update(bad).is_err());
        assert_eq!(sprint.end_date, None);
    }

    #[test]
    fn test_completed_sprint_is_read_only() {
        let mut sprint = sprint();
        sprint.start().unwrap();
        sprint.complete().unwrap();
        let update = SprintUpdate {
            name: Some("Renamed".into()),
            ..SprintUpdate::default()
        };
        assert!(sprint.update(update).is_err());
        assert_eq!(sprint.name, "Sprint 1");
    }
}
