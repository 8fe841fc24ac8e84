use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Shared-filesystem object store: one directory per `request_id`, holding
/// client-uploaded chunks during upload and the assembled
/// `<stem>_full.wav` afterward (spec.md §6 "Persisted layout").
#[derive(Debug, Clone)]
pub struct ObjectStore {
    base: PathBuf,
}

impl ObjectStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn job_dir(&self, request_id: &str) -> PathBuf {
        self.base.join(request_id)
    }

    pub async fn ensure_job_dir(&self, request_id: &str) -> Result<PathBuf> {
        let dir = self.job_dir(request_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Writes one chunk under the job directory. `chunk_filename` is
    /// client-supplied and expected to end in `_<n>.<ext>` (spec.md §6); the
    /// numeric suffix is only interpreted by the Assembler, not here.
    pub async fn write_chunk(&self, request_id: &str, chunk_filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.ensure_job_dir(request_id).await?;
        let target = dir.join(chunk_filename);

        let temp = tempfile::NamedTempFile::new_in(&dir)?;
        tokio::fs::write(temp.path(), bytes).await?;
        temp.persist(&target)
            .map_err(|e| StoreError::Io(e.error))?;

        Ok(target)
    }

    /// Chunk files in the job directory, sorted by the numeric suffix in
    /// each filename (spec.md §4.2). Non-conforming filenames sort last, by
    /// name, rather than panicking — a malformed upload shouldn't wedge
    /// assembly.
    pub async fn list_chunks_sorted(&self, request_id: &str) -> Result<Vec<PathBuf>> {
        let dir = self.job_dir(request_id);
        let mut entries = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(r) => r,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                entries.push(entry.path());
            }
        }
        entries.sort_by_key(|p| chunk_sort_key(p));
        Ok(entries)
    }

    pub async fn delete_chunks(&self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    /// `<original_stem>_full.wav` in the job directory (spec.md §4.2).
    pub fn assembled_audio_path(&self, request_id: &str, original_filename: &str) -> PathBuf {
        let stem = Path::new(original_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        self.job_dir(request_id).join(format!("{stem}_full.wav"))
    }

    pub async fn assembled_audio_exists(&self, request_id: &str, original_filename: &str) -> bool {
        tokio::fs::try_exists(self.assembled_audio_path(request_id, original_filename))
            .await
            .unwrap_or(false)
    }

    /// Deletes the whole job directory (spec.md §4.1 `cancel`).
    pub async fn delete_job_dir(&self, request_id: &str) -> Result<()> {
        match tokio::fs::remove_dir_all(self.job_dir(request_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Extracts the trailing `_<n>` numeric suffix (before the extension) used
/// to order chunks chronologically, e.g. `m_12.wav` -> `12`.
fn chunk_sort_key(path: &Path) -> (u64, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    match stem.rsplit_once('_') {
        Some((_, suffix)) => match suffix.parse::<u64>() {
            Ok(n) => (n, name),
            Err(_) => (u64::MAX, name),
        },
        None => (u64::MAX, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn chunks_sort_by_numeric_suffix_not_lexically() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        store
            .write_chunk("job1", "m_2.wav", b"b")
            .await
            .unwrap();
        store
            .write_chunk("job1", "m_10.wav", b"c")
            .await
            .unwrap();
        store
            .write_chunk("job1", "m_1.wav", b"a")
            .await
            .unwrap();

        let chunks = store.list_chunks_sorted("job1").await.unwrap();
        let names: Vec<_> = chunks
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();

        assert_eq!(names, vec!["m_1.wav", "m_2.wav", "m_10.wav"]);
    }

    #[tokio::test]
    async fn missing_job_dir_has_no_chunks() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        assert!(store.list_chunks_sorted("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn assembled_audio_path_uses_original_stem() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        let path = store.assembled_audio_path("job1", "meeting.wav");
        assert!(path.ends_with("job1/meeting_full.wav"));
    }

    #[tokio::test]
    async fn delete_job_dir_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        store.ensure_job_dir("job1").await.unwrap();
        store.delete_job_dir("job1").await.unwrap();
        store.delete_job_dir("job1").await.unwrap();
    }

    #[tokio::test]
    async fn delete_chunks_removes_files_leaving_assembled_audio() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());
        store.write_chunk("job1", "m_0.wav", b"a").await.unwrap();
        store.write_chunk("job1", "m_1.wav", b"b").await.unwrap();
        let chunks = store.list_chunks_sorted("job1").await.unwrap();

        store.delete_chunks(&chunks).await.unwrap();
        tokio::fs::write(store.assembled_audio_path("job1", "m.wav"), b"wav")
            .await
            .unwrap();

        let mut remaining = tokio::fs::read_dir(store.job_dir("job1")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = remaining.next_entry().await.unwrap() {
            names.push(entry.file_name().to_str().unwrap().to_string());
        }
        assert_eq!(names, vec!["m_full.wav"]);
    }
}
