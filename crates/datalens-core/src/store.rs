//! Document store holding the raw CSV text of each dataset
//!
//! The collection has two documents, `threads` and `non-threads`, each of
//! the form `{"content": "<raw csv>"}`.

use crate::error::{Error, PermissionContext, Result};
use crate::table::DatasetKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Collection name
pub const COLLECTION: &str = "csv_data";

/// A stored CSV document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvDocument {
    pub content: String,
}

/// Storage for the two dataset documents
pub trait DocumentStore {
    /// Raw CSV text for a dataset, if it has been stored
    fn get(&self, kind: DatasetKind) -> Result<Option<String>>;

    /// Replace a dataset's CSV text; `source_name` is only used in diagnostics
    fn put(&mut self, kind: DatasetKind, content: &str, source_name: &str) -> Result<()>;
}

/// Path of a document inside the collection
pub fn document_path(kind: DatasetKind) -> String {
    format!("{}/{}", COLLECTION, kind.doc_id())
}

/// Upload a CSV file into a store
pub fn upload_file<S: DocumentStore + ?Sized, P: AsRef<Path>>(
    store: &mut S,
    kind: DatasetKind,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    store.put(kind, &content, &name)
}

/// Store backed by one JSON file per document under `<root>/csv_data/`
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    read_only: bool,
}

impl DirectoryStore {
    /// Open a writable store rooted at a directory
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            read_only: false,
        }
    }

    /// Open a store that denies writes
    pub fn read_only<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            read_only: true,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// File holding a document
    pub fn file_for(&self, kind: DatasetKind) -> PathBuf {
        self.root
            .join(COLLECTION)
            .join(format!("{}.json", kind.doc_id()))
    }
}

impl DocumentStore for DirectoryStore {
    fn get(&self, kind: DatasetKind) -> Result<Option<String>> {
        let path = self.file_for(kind);
        if !path.is_file() {
            debug!(path = %path.display(), "document not found");
            return Ok(None);
        }

        let raw = fs::read_to_string(&path).map_err(|e| Error::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let doc: CsvDocument = serde_json::from_str(&raw)?;
        Ok(Some(doc.content))
    }

    fn put(&mut self, kind: DatasetKind, content: &str, source_name: &str) -> Result<()> {
        if content.is_empty() {
            return Err(Error::EmptyInput);
        }

        if self.read_only {
            let operation = if self.file_for(kind).is_file() {
                "update"
            } else {
                "create"
            };
            return Err(Error::PermissionDenied(PermissionContext {
                operation: operation.to_string(),
                path: document_path(kind),
                request_data: Some(format!("[CSV content of {}]", source_name)),
            }));
        }

        let path = self.file_for(kind);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let doc = CsvDocument {
            content: content.to_string(),
        };
        fs::write(&path, serde_json::to_string(&doc)?)
            .map_err(|e| Error::Store(format!("failed to write {}: {}", path.display(), e)))?;

        info!(document = %document_path(kind), bytes = content.len(), "stored dataset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());

        assert_eq!(store.get(DatasetKind::Threads).unwrap(), None);

        store
            .put(DatasetKind::Threads, "a,b\n1,2\n", "threads.csv")
            .unwrap();
        assert_eq!(
            store.get(DatasetKind::Threads).unwrap().as_deref(),
            Some("a,b\n1,2\n")
        );
        assert_eq!(store.get(DatasetKind::NonThreads).unwrap(), None);
        assert!(dir.path().join("csv_data").join("threads.json").is_file());
    }

    #[test]
    fn test_put_empty_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());

        let err = store.put(DatasetKind::Threads, "", "empty.csv").unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[test]
    fn test_read_only_denies_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::read_only(dir.path());

        let err = store
            .put(DatasetKind::NonThreads, "a\n1\n", "nonthreads.csv")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        match err {
            Error::PermissionDenied(ctx) => {
                assert_eq!(ctx.operation, "create");
                assert_eq!(ctx.path, "csv_data/non-threads");
                assert_eq!(
                    ctx.request_data.as_deref(),
                    Some("[CSV content of nonthreads.csv]")
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_upload_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("threads.csv");
        fs::write(&csv_path, "id\n1\n").unwrap();

        let mut store = DirectoryStore::new(dir.path().join("store"));
        upload_file(&mut store, DatasetKind::Threads, &csv_path).unwrap();
        assert_eq!(
            store.get(DatasetKind::Threads).unwrap().as_deref(),
            Some("id\n1\n")
        );
    }

    #[test]
    fn test_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let path = store.file_for(DatasetKind::Threads);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            store.get(DatasetKind::Threads),
            Err(Error::Json(_))
        ));
    }
}
