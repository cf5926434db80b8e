//! # Persistence sink
//!
//! Where finished learning documents go. `FileSink` writes Markdown files
//! into a docs directory; `MemorySink` keeps them in memory for tests and
//! dry runs.

use crate::document::LearningDocument;
use crate::error::{self, Error, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Stores a document and returns a locator for it
#[allow(async_fn_in_trait)]
pub trait DocumentSink: Send + Sync {
    async fn save(&self, document: &LearningDocument) -> Result<String>;
}

/// Storage name for a source file: a trailing `.md` is dropped and the
/// remaining dots become underscores.
pub fn clean_name(file_name: &str) -> String {
    let base = file_name.strip_suffix(".md").unwrap_or(file_name);
    base.replace('.', "_")
}

/// `<timestamp>_<clean name>` with an optional collision suffix
fn document_file_name(timestamp: &str, file_name: &str, attempt: usize) -> String {
    if attempt == 0 {
        format!("{}_{}.md", timestamp, clean_name(file_name))
    } else {
        format!("{}_{}_{}.md", timestamp, clean_name(file_name), attempt + 1)
    }
}

const MAX_NAME_ATTEMPTS: usize = 100;

static STAGING_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Staging file that is removed when dropped, including on cancellation
struct Staged(PathBuf);

impl Drop for Staged {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Writes `<dir>/<YYYYmmdd_HHMM>_<clean name>.md`
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn staging_path(&self, file_name: &str) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{}.partial",
            clean_name(file_name),
            std::process::id(),
            seq
        ))
    }

    /// Write the whole document to a staging file, then link it under the
    /// first free name. The final path only ever holds complete content.
    async fn write_new(&self, timestamp: &str, document: &LearningDocument) -> Result<PathBuf> {
        let staged = Staged(self.staging_path(&document.file_name));
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged.0)
            .await
            .map_err(|e| error::persistence_io("storage::save", &staged.0, e))?;
        file.write_all(document.to_markdown().as_bytes())
            .await
            .map_err(|e| error::persistence_io("storage::save", &staged.0, e))?;
        file.sync_all()
            .await
            .map_err(|e| error::persistence_io("storage::save", &staged.0, e))?;
        drop(file);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self
                .dir
                .join(document_file_name(timestamp, &document.file_name, attempt));
            match tokio::fs::hard_link(&staged.0, &path).await {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "document name taken");
                }
                Err(e) => return Err(error::persistence_io("storage::save", &path, e)),
            }
        }

        Err(Error::persistence_failed(format!(
            "no free document name for '{}' after {} attempts",
            document.file_name, MAX_NAME_ATTEMPTS
        ))
        .with_operation("storage::save"))
    }
}

impl DocumentSink for FileSink {
    async fn save(&self, document: &LearningDocument) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| error::persistence_io("storage::create_dir", &self.dir, e))?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M").to_string();
        let path = self.write_new(&timestamp, document).await?;

        info!(path = %path.display(), sections = document.sections().len(), "saved learning document");
        Ok(path.display().to_string())
    }
}

/// Keeps saved documents in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<Vec<LearningDocument>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of everything saved so far, in save order
    pub fn documents(&self) -> Vec<LearningDocument> {
        self.documents
            .lock()
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentSink for MemorySink {
    async fn save(&self, document: &LearningDocument) -> Result<String> {
        let mut docs = self
            .documents
            .lock()
            .map_err(|_| Error::persistence_failed("memory sink lock poisoned"))?;
        docs.push(document.clone());
        Ok(format!("memory://{}", docs.len()))
    }
}
