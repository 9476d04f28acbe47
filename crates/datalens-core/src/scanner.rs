//! Directory scanner for locating the threads / non-threads CSV files

use crate::error::Result;
use crate::table::DatasetKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// File names accepted for each dataset
const THREADS_NAMES: &[&str] = &["threads.csv"];
const NON_THREADS_NAMES: &[&str] = &["nonthreads.csv", "non-threads.csv", "non_threads.csv"];

/// Dataset files found under a data directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetPaths {
    /// Root directory that was scanned
    pub root: PathBuf,
    pub threads: Option<PathBuf>,
    pub non_threads: Option<PathBuf>,
}

impl DatasetPaths {
    /// Path for one dataset
    pub fn get(&self, kind: DatasetKind) -> Option<&PathBuf> {
        match kind {
            DatasetKind::Threads => self.threads.as_ref(),
            DatasetKind::NonThreads => self.non_threads.as_ref(),
        }
    }

    /// Whether neither dataset was found
    pub fn is_empty(&self) -> bool {
        self.threads.is_none() && self.non_threads.is_none()
    }
}

/// Classify a file name as one of the datasets
pub fn dataset_for_file(path: &Path) -> Option<DatasetKind> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if THREADS_NAMES.contains(&name.as_str()) {
        Some(DatasetKind::Threads)
    } else if NON_THREADS_NAMES.contains(&name.as_str()) {
        Some(DatasetKind::NonThreads)
    } else {
        None
    }
}

/// Walk a directory and pick the first file found for each dataset
pub fn discover_datasets<P: AsRef<Path>>(root: P) -> Result<DatasetPaths> {
    let root = root.as_ref();
    let mut found = DatasetPaths {
        root: root.to_path_buf(),
        ..DatasetPaths::default()
    };

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let slot = match dataset_for_file(path) {
            Some(DatasetKind::Threads) => &mut found.threads,
            Some(DatasetKind::NonThreads) => &mut found.non_threads,
            None => continue,
        };

        if slot.is_none() {
            debug!(path = %path.display(), "found dataset file");
            *slot = Some(path.to_path_buf());
        }
    }

    for kind in DatasetKind::ALL {
        if found.get(kind).is_none() {
            warn!(root = %root.display(), dataset = %kind, "could not find dataset file");
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_dataset_for_file() {
        assert_eq!(
            dataset_for_file(Path::new("data/threads.csv")),
            Some(DatasetKind::Threads)
        );
        assert_eq!(
            dataset_for_file(Path::new("NonThreads.CSV")),
            Some(DatasetKind::NonThreads)
        );
        assert_eq!(
            dataset_for_file(Path::new("non-threads.csv")),
            Some(DatasetKind::NonThreads)
        );
        assert_eq!(dataset_for_file(Path::new("other.csv")), None);
    }

    #[test]
    fn test_discover_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("threads.csv"), "a\n1\n").unwrap();
        fs::write(nested.join("nonthreads.csv"), "a\n2\n").unwrap();
        fs::write(nested.join("notes.txt"), "ignore").unwrap();

        let found = discover_datasets(dir.path()).unwrap();
        assert_eq!(found.threads, Some(nested.join("threads.csv")));
        assert_eq!(found.non_threads, Some(nested.join("nonthreads.csv")));
        assert!(!found.is_empty());
    }

    #[test]
    fn test_discover_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("threads.csv"), "a\n1\n").unwrap();

        let found = discover_datasets(dir.path()).unwrap();
        assert!(found.threads.is_some());
        assert!(found.non_threads.is_none());
    }

    #[test]
    fn test_discover_missing_root() {
        assert!(discover_datasets("/definitely/not/a/dir").is_err());
    }
}
