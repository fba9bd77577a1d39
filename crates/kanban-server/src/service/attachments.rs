use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    AccessGuard, Attachment, AttachmentId, Caller, EventKind, Operation, ResourceRef, TaskId,
};

use super::{fetch, live, KanbanService};
use crate::files::FileContent;

const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AttachmentDownload {
    pub file_name: String,
    pub content: FileContent,
}

impl KanbanService {
    pub async fn list_attachments(
        &self,
        caller: &Caller,
        task_id: TaskId,
    ) -> KanbanResult<Vec<Attachment>> {
        let (tables, _) = self
            .view(caller, ResourceRef::Task(task_id), Operation::ViewBoard)
            .await?;
        let mut attachments: Vec<Attachment> = tables
            .attachments
            .find_all(|a| a.task_id == task_id)
            .cloned()
            .collect();
        attachments.sort_by_key(|a| a.audit.created_at);
        Ok(attachments)
    }

    /// Store the bytes first, then record the attachment. A failed commit
    /// leaves no file behind. The size limit is checked after access.
    pub async fn upload_attachment(
        &self,
        caller: &Caller,
        task_id: TaskId,
        upload: AttachmentUpload,
    ) -> KanbanResult<Attachment> {
        let size_bytes = upload.bytes.len() as u64;
        let attachment = {
            let (_tables, grant) = self
                .view(caller, ResourceRef::Task(task_id), Operation::UploadAttachment)
                .await?;
            let limit = self.config.storage.max_attachment_bytes;
            if size_bytes > limit {
                return Err(KanbanError::BadRequest(format!(
                    "attachment is {} bytes, the limit is {}",
                    size_bytes, limit
                )));
            }
            Attachment::new(
                grant.board_id,
                task_id,
                caller.user_id().to_string(),
                &upload.file_name,
                &upload.content_type,
                size_bytes,
            )?
        };
        let storage_path = attachment.storage_path.clone();
        self.files
            .put_file(&storage_path, upload.bytes, &attachment.content_type)
            .await?;

        let result = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Task(task_id),
                    Operation::UploadAttachment,
                )?;
                let attachment_id = attachment.id;
                batch
                    .add(attachment)
                    .emit(EventKind::AttachmentAdded, grant.board_id, attachment_id);
                Ok(attachment_id)
            })
            .await;

        match result {
            Ok(committed) => fetch(&committed.tables.attachments, &committed.value),
            Err(err) => {
                if let Err(cleanup) = self.files.remove_file(&storage_path).await {
                    tracing::warn!(path = %storage_path, error = %cleanup, "orphaned attachment file");
                }
                Err(err)
            }
        }
    }

    pub async fn download_attachment(
        &self,
        caller: &Caller,
        attachment_id: AttachmentId,
    ) -> KanbanResult<AttachmentDownload> {
        let attachment = {
            let (tables, _) = self
                .view(caller, ResourceRef::Attachment(attachment_id), Operation::ViewBoard)
                .await?;
            live(&tables.attachments, &attachment_id, "attachment")?
        };

        let mut content = self.files.get_file(&attachment.storage_path).await?;
        if attachment.content_type != GENERIC_CONTENT_TYPE {
            content.content_type = attachment.content_type;
        }
        Ok(AttachmentDownload {
            file_name: attachment.file_name,
            content,
        })
    }

    /// The uploader or a board admin may delete. The stored file goes once
    /// the record is gone.
    pub async fn delete_attachment(
        &self,
        caller: &Caller,
        attachment_id: AttachmentId,
    ) -> KanbanResult<()> {
        let committed = self
            .write(caller, |tables, batch| {
                let grant = AccessGuard::authorize(
                    tables,
                    caller,
                    ResourceRef::Attachment(attachment_id),
                    Operation::DeleteAttachment,
                )?;
                let attachment = live(&tables.attachments, &attachment_id, "attachment")?;
                let storage_path = attachment.storage_path.clone();
                batch
                    .remove(attachment)
                    .emit(EventKind::AttachmentDeleted, grant.board_id, attachment_id);
                Ok(storage_path)
            })
            .await?;
        let storage_path = committed.value;
        drop(committed.tables);

        if let Err(err) = self.files.remove_file(&storage_path).await {
            tracing::warn!(path = %storage_path, error = %err, "failed to remove attachment file");
        }
        Ok(())
    }
}
