use kanban_core::KanbanResult;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Write-to-temp-then-rename file writer.
///
/// Readers never observe a partially written file: the temp file lives in the
/// target directory so the final rename stays on one filesystem.
pub struct AtomicWriter;

impl AtomicWriter {
    /// Write `data` to `path`, creating missing parent directories.
    pub async fn write_atomic(path: &Path, data: &[u8]) -> KanbanResult<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).await?;

        // The guard removes the temp file if anything below fails.
        let temp = tempfile::NamedTempFile::new_in(parent)?;
        let mut file = fs::File::create(temp.path()).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(temp.path(), path).await?;

        tracing::debug!(bytes = data.len(), path = %path.display(), "atomic write");
        Ok(())
    }

    pub async fn read_all(path: &Path) -> KanbanResult<Vec<u8>> {
        let data = fs::read(path).await?;
        tracing::debug!(bytes = data.len(), path = %path.display(), "read");
        Ok(data)
    }
}
