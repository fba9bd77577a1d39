use kanban_core::{AuditInfo, KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;
use crate::identity::UserId;
use crate::task::TaskId;

pub type AttachmentId = Uuid;

const MAX_FILE_NAME_LENGTH: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub task_id: TaskId,
    pub uploaded_by: UserId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// Key of the blob inside the file storage collaborator.
    pub storage_path: String,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

audited_record!(Attachment, AttachmentId);

impl Attachment {
    pub fn new(
        board_id: BoardId,
        task_id: TaskId,
        uploaded_by: UserId,
        file_name: &str,
        content_type: &str,
        size_bytes: u64,
    ) -> KanbanResult<Self> {
        let file_name = Self::sanitize_file_name(file_name)?;
        let id = Uuid::new_v4();
        let storage_path = format!("{}/{}/{}-{}", board_id, task_id, id, file_name);
        let content_type = match content_type.trim() {
            "" => "application/octet-stream".to_string(),
            ct => ct.to_string(),
        };
        Ok(Self {
            id,
            task_id,
            uploaded_by,
            file_name,
            content_type,
            size_bytes,
            storage_path,
            audit: AuditInfo::default(),
        })
    }

    /// Strip any directory components and characters unsafe in a storage key.
    pub fn sanitize_file_name(file_name: &str) -> KanbanResult<String> {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        let cleaned: String = base
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                    c
                } else {
                    '_'
                }
            })
            .take(MAX_FILE_NAME_LENGTH)
            .collect();
        let cleaned = cleaned.trim_start_matches('.').to_string();
        if cleaned.is_empty() {
            return Err(KanbanError::BadRequest("file name must not be empty".to_string()));
        }
        Ok(cleaned)
    }

    pub fn is_uploaded_by(&self, user_id: &str) -> bool {
        self.uploaded_by == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(Attachment::sanitize_file_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(
            Attachment::sanitize_file_name("../../etc/passwd").unwrap(),
            "passwd"
        );
        assert_eq!(
            Attachment::sanitize_file_name("C:\\Users\\me\\notes.txt").unwrap(),
            "notes.txt"
        );
        assert_eq!(Attachment::sanitize_file_name("a*b?.png").unwrap(), "a_b_.png");
        assert_eq!(Attachment::sanitize_file_name(".hidden").unwrap(), "hidden");
        assert!(Attachment::sanitize_file_name("dir/").is_err());
        assert!(Attachment::sanitize_file_name("   ").is_err());
    }

    #[test]
    fn test_storage_path_is_scoped_to_task() {
        let board_id = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let attachment =
            Attachment::new(board_id, task_id, "alice".into(), "spec.md", "", 12).unwrap();

        assert!(attachment
            .storage_path
            .starts_with(&format!("{}/{}/", board_id, task_id)));
        assert!(attachment.storage_path.ends_with("-spec.md"));
        assert_eq!(attachment.content_type, "application/octet-stream");
    }
}
