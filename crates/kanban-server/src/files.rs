use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use kanban_core::{KanbanError, KanbanResult};
use kanban_persistence::AtomicWriter;

/// Bytes of a stored file together with how to serve them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Blob storage for attachment contents, addressed by relative path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn put_file(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> KanbanResult<()>;

    async fn get_file(&self, path: &str) -> KanbanResult<FileContent>;

    async fn remove_file(&self, path: &str) -> KanbanResult<()>;
}

/// Stores files below a root directory on the local disk.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage path onto the root, refusing anything that could escape it.
    fn resolve(&self, path: &str) -> KanbanResult<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty() || relative.is_absolute() {
            return Err(KanbanError::bad_request(format!(
                "invalid storage path '{}'",
                path
            )));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(KanbanError::bad_request(format!(
                        "invalid storage path '{}'",
                        path
                    )))
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn put_file(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> KanbanResult<()> {
        let target = self.resolve(path)?;
        AtomicWriter::write_atomic(&target, &bytes).await?;
        tracing::debug!(path, bytes = bytes.len(), "stored file");
        Ok(())
    }

    async fn get_file(&self, path: &str) -> KanbanResult<FileContent> {
        let target = self.resolve(path)?;
        let bytes = match tokio::fs::read(&target).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KanbanError::not_found(format!("file {}", path)));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(FileContent {
            bytes,
            content_type: content_type_for(&target).to_string(),
        })
    }

    async fn remove_file(&self, path: &str) -> KanbanResult<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Best guess at a media type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("txt") | Some("log") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_remove() {
        let dir = tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        storage
            .put_file("board/task/notes.txt", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();
        let content = storage.get_file("board/task/notes.txt").await.unwrap();
        assert_eq!(content.bytes, b"hello");
        assert_eq!(content.content_type, "text/plain");

        storage.remove_file("board/task/notes.txt").await.unwrap();
        let err = storage.get_file("board/task/notes.txt").await.unwrap_err();
        assert!(matches!(err, KanbanError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_traversal_and_absolute_paths() {
        let dir = tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        for path in ["../escape.txt", "a/../../escape.txt", "/etc/passwd", ""] {
            let err = storage.get_file(path).await.unwrap_err();
            assert!(matches!(err, KanbanError::BadRequest(_)), "{path}");
        }
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let dir = tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        storage.remove_file("nothing/here.bin").await.unwrap();
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/b.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("a/b")), "application/octet-stream");
    }
}
