//! Filesystem storage for documents.
//!
//! ## Directory Structure
//!
//! ```text
//! $ROOT/
//! └── collections/
//!     ├── <collection>.lock
//!     └── <collection>/
//!         └── <id>.json
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use docledger_core::error::{Error, InvalidInputError, StoreError};
use docledger_core::traits::{BulkWriteResult, DocumentStore, WriteFailure, WriteResult};
use docledger_core::{Document, DocumentId, Result, Selector, Update};

/// Filesystem-backed document store.
///
/// Every document is one pretty-printed JSON file. Writers of a collection
/// are serialized by an exclusive lock on the collection's lock file, and
/// each document is replaced atomically (temp file + rename).
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

/// Exclusive lock on one collection, released on drop.
struct CollectionLock {
    file: File,
}

impl Drop for CollectionLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(error = %e, "Failed to release collection lock");
        }
    }
}

impl FileStore {
    /// Create a new file store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the collections directory.
    fn collections_dir(&self) -> PathBuf {
        self.root.join("collections")
    }

    /// Get the directory of a collection, validating its name.
    fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        Self::validate_collection(collection)?;
        Ok(self.collections_dir().join(collection))
    }

    /// Get the path for a specific document.
    fn document_path(&self, collection: &str, id: &DocumentId) -> Result<PathBuf> {
        Self::validate_id(id)?;
        Ok(self
            .collection_dir(collection)?
            .join(format!("{}.json", id.as_str())))
    }

    fn validate_collection(collection: &str) -> Result<()> {
        let valid = !collection.is_empty()
            && !collection.starts_with('.')
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');

        if !valid {
            return Err(InvalidInputError::Other {
                message: format!("invalid collection name '{}'", collection),
            }
            .into());
        }
        Ok(())
    }

    fn validate_id(id: &DocumentId) -> Result<()> {
        let valid = !id.as_str().is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if !valid {
            return Err(InvalidInputError::Other {
                message: format!("invalid document id '{}'", id),
            }
            .into());
        }
        Ok(())
    }

    /// Generate a new, roughly time-ordered document id.
    fn generate_id(&self) -> DocumentId {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros();
        let suffix = Uuid::new_v4().simple().to_string();
        DocumentId::new(format!("{:014x}{}", now, &suffix[..10]))
    }

    /// Take the exclusive writer lock of a collection.
    fn lock(&self, collection: &str) -> Result<CollectionLock> {
        Self::validate_collection(collection)?;
        let dir = self.collections_dir();
        fs::create_dir_all(&dir)?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(dir.join(format!("{}.lock", collection)))?;
        file.lock_exclusive()?;

        Ok(CollectionLock { file })
    }

    fn read_document(path: &Path) -> Result<Document> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content).map_err(StoreError::from)?;
        Document::new(value).map_err(|e| {
            Error::Store(StoreError::Corrupt {
                location: path.display().to_string(),
                reason: e.to_string(),
            })
        })
    }

    fn write_document(path: &Path, document: &Document) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(document).map_err(StoreError::from)?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// All documents of a collection, ordered by id.
    fn scan(&self, collection: &str) -> Result<Vec<Document>> {
        let dir = self.collection_dir(collection)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<_> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort_by_key(|e| e.file_name());

        entries
            .iter()
            .map(|entry| Self::read_document(&entry.path()))
            .collect()
    }

    /// Apply one update while the collection lock is held.
    fn write_locked(&self, collection: &str, id: &DocumentId, update: &Update) -> Result<WriteResult> {
        let path = self.document_path(collection, id)?;
        if !path.exists() {
            return Ok(WriteResult::default());
        }

        let mut document = Self::read_document(&path)?;
        let modified = update.apply_to(&mut document);
        if modified {
            Self::write_document(&path, &document)?;
        }

        Ok(WriteResult {
            matched: true,
            modified,
        })
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        let dir = self.collections_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let has_documents = fs::read_dir(entry.path())?
                .filter_map(|e| e.ok())
                .any(|e| e.path().extension().is_some_and(|ext| ext == "json"));
            if has_documents {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    #[instrument(skip(self), fields(%selector))]
    async fn find_one(&self, collection: &str, selector: &Selector) -> Result<Option<Document>> {
        if let Selector::Id(id) = selector {
            let path = self.document_path(collection, id)?;
            if !path.exists() {
                return Ok(None);
            }
            return Self::read_document(&path).map(Some);
        }

        Ok(self
            .scan(collection)?
            .into_iter()
            .find(|doc| selector.matches(doc.body())))
    }

    #[instrument(skip(self), fields(%selector))]
    async fn find_many(&self, collection: &str, selector: &Selector) -> Result<Vec<Document>> {
        let documents: Vec<Document> = self
            .scan(collection)?
            .into_iter()
            .filter(|doc| selector.matches(doc.body()))
            .collect();
        debug!(count = documents.len(), "Found documents");
        Ok(documents)
    }

    #[instrument(skip(self, body))]
    async fn insert_one(&self, collection: &str, body: Map<String, Value>) -> Result<DocumentId> {
        let _lock = self.lock(collection)?;

        let id = self.generate_id();
        let document = Document::with_id(&id, body);
        Self::write_document(&self.document_path(collection, &id)?, &document)?;

        debug!(%id, "Inserted document");
        Ok(id)
    }

    #[instrument(skip(self, bodies), fields(count = bodies.len()))]
    async fn insert_many(
        &self,
        collection: &str,
        bodies: Vec<Map<String, Value>>,
    ) -> Result<Vec<DocumentId>> {
        let _lock = self.lock(collection)?;

        let mut ids = Vec::with_capacity(bodies.len());
        for body in bodies {
            let id = self.generate_id();
            let document = Document::with_id(&id, body);
            Self::write_document(&self.document_path(collection, &id)?, &document)?;
            ids.push(id);
        }

        debug!(count = ids.len(), "Inserted documents");
        Ok(ids)
    }

    #[instrument(skip(self, update))]
    async fn write_one(
        &self,
        collection: &str,
        id: &DocumentId,
        update: &Update,
    ) -> Result<WriteResult> {
        let _lock = self.lock(collection)?;
        self.write_locked(collection, id, update)
    }

    #[instrument(skip(self, writes), fields(count = writes.len()))]
    async fn bulk_write(
        &self,
        collection: &str,
        writes: Vec<(DocumentId, Update)>,
    ) -> Result<BulkWriteResult> {
        let _lock = self.lock(collection)?;

        let mut result = BulkWriteResult::default();
        for (id, update) in writes {
            match self.write_locked(collection, &id, &update) {
                Ok(write) => result.record(id, write),
                Err(e) => {
                    warn!(%id, error = %e, "Write failed");
                    result.failures.push(WriteFailure {
                        id,
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(modified = result.modified, failed = result.failures.len(), "Bulk write done");
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn delete_one(&self, collection: &str, id: &DocumentId) -> Result<bool> {
        let _lock = self.lock(collection)?;

        let path = self.document_path(collection, id)?;
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)?;
        debug!(%id, "Deleted document");
        Ok(true)
    }
}
