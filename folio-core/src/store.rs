//! Persistence of per-document view state and bookmarks.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::geometry::Rotation;
use crate::{document_id_for_path, DocumentId};

/// Snapshot of the view restored when a document is reopened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfo {
    pub current_page: usize,
    pub page_offset: i64,
    pub scale: f64,
    pub rotation: Rotation,
    pub pages_per_row: usize,
    pub first_page_column: usize,
    /// Viewport centre as a fraction of the canvas width.
    pub position_x: f64,
    pub position_y: f64,
}

impl Default for FileInfo {
    fn default() -> Self {
        Self {
            current_page: 0,
            page_offset: 0,
            scale: 1.0,
            rotation: Rotation::Deg0,
            pages_per_row: 1,
            first_page_column: 1,
            position_x: 0.0,
            position_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub page: usize,
    #[serde(default)]
    pub description: String,
}

impl Bookmark {
    pub fn new(id: impl Into<String>, page: usize) -> Self {
        Self {
            id: id.into(),
            page,
            description: String::new(),
        }
    }
}

pub trait StateStore: Send + Sync {
    fn file_info(&self, path: &Path) -> Result<Option<FileInfo>>;
    fn set_file_info(&self, path: &Path, info: &FileInfo) -> Result<()>;
    /// Bookmarks ordered by id.
    fn bookmarks(&self, path: &Path) -> Result<Vec<Bookmark>>;
    /// Adds or replaces the bookmark with the same id.
    fn add_bookmark(&self, path: &Path, bookmark: &Bookmark) -> Result<()>;
    /// Returns whether a bookmark was removed.
    fn remove_bookmark(&self, path: &Path, id: &str) -> Result<bool>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredDocument {
    #[serde(default)]
    path: PathBuf,
    #[serde(default)]
    file_info: Option<FileInfo>,
    #[serde(default)]
    bookmarks: BTreeMap<String, Bookmark>,
}

/// One JSON file per document, named after its [`DocumentId`].
pub struct FileStateStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create state directory at {:?}", root))?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    fn state_path(&self, document: &Path) -> PathBuf {
        self.root
            .join(format!("{}.json", document_id_for_path(document)))
    }

    fn read(&self, document: &Path) -> Result<StoredDocument> {
        let path = self.state_path(document);
        if !path.exists() {
            return Ok(StoredDocument {
                path: document.to_path_buf(),
                ..StoredDocument::default()
            });
        }
        let mut file =
            File::open(&path).with_context(|| format!("failed to open state file {:?}", path))?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        serde_json::from_str(&buf).with_context(|| format!("failed to decode state file {:?}", path))
    }

    fn write(&self, document: &Path, stored: &StoredDocument) -> Result<()> {
        let path = self.state_path(document);
        let tmp = path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(stored)?;
        let mut file = File::create(&tmp)
            .with_context(|| format!("failed to open temp state file {:?}", tmp))?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace state file {:?}", path))?;
        Ok(())
    }

    fn update<T>(
        &self,
        document: &Path,
        change: impl FnOnce(&mut StoredDocument) -> T,
    ) -> Result<T> {
        let _guard = self.lock.lock();
        let mut stored = self.read(document)?;
        stored.path = document.to_path_buf();
        let result = change(&mut stored);
        self.write(document, &stored)?;
        Ok(result)
    }
}

impl StateStore for FileStateStore {
    fn file_info(&self, path: &Path) -> Result<Option<FileInfo>> {
        let _guard = self.lock.lock();
        Ok(self.read(path)?.file_info)
    }

    fn set_file_info(&self, path: &Path, info: &FileInfo) -> Result<()> {
        self.update(path, |stored| stored.file_info = Some(info.clone()))
    }

    fn bookmarks(&self, path: &Path) -> Result<Vec<Bookmark>> {
        let _guard = self.lock.lock();
        Ok(self.read(path)?.bookmarks.into_values().collect())
    }

    fn add_bookmark(&self, path: &Path, bookmark: &Bookmark) -> Result<()> {
        self.update(path, |stored| {
            stored
                .bookmarks
                .insert(bookmark.id.clone(), bookmark.clone());
        })
    }

    fn remove_bookmark(&self, path: &Path, id: &str) -> Result<bool> {
        self.update(path, |stored| stored.bookmarks.remove(id).is_some())
    }
}

pub struct MemoryStateStore {
    inner: Mutex<HashMap<DocumentId, StoredDocument>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStateStore {
    fn file_info(&self, path: &Path) -> Result<Option<FileInfo>> {
        Ok(self
            .inner
            .lock()
            .get(&document_id_for_path(path))
            .and_then(|stored| stored.file_info.clone()))
    }

    fn set_file_info(&self, path: &Path, info: &FileInfo) -> Result<()> {
        self.inner
            .lock()
            .entry(document_id_for_path(path))
            .or_default()
            .file_info = Some(info.clone());
        Ok(())
    }

    fn bookmarks(&self, path: &Path) -> Result<Vec<Bookmark>> {
        Ok(self
            .inner
            .lock()
            .get(&document_id_for_path(path))
            .map(|stored| stored.bookmarks.values().cloned().collect())
            .unwrap_or_default())
    }

    fn add_bookmark(&self, path: &Path, bookmark: &Bookmark) -> Result<()> {
        self.inner
            .lock()
            .entry(document_id_for_path(path))
            .or_default()
            .bookmarks
            .insert(bookmark.id.clone(), bookmark.clone());
        Ok(())
    }

    fn remove_bookmark(&self, path: &Path, id: &str) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .get_mut(&document_id_for_path(path))
            .map(|stored| stored.bookmarks.remove(id).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trips_file_info() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("sample.pdf");
        fs::write(&doc, b"dummy").unwrap();
        let store = FileStateStore::new(dir.path().join("state")).unwrap();

        assert_eq!(store.file_info(&doc).unwrap(), None);

        let info = FileInfo {
            current_page: 7,
            page_offset: -2,
            scale: 1.25,
            rotation: Rotation::Deg270,
            pages_per_row: 2,
            first_page_column: 2,
            position_x: 0.5,
            position_y: 0.375,
        };
        store.set_file_info(&doc, &info).unwrap();

        let reopened = FileStateStore::new(dir.path().join("state")).unwrap();
        assert_eq!(reopened.file_info(&doc).unwrap(), Some(info));
        assert!(!store.state_path(&doc).with_extension("json.tmp").exists());
    }

    #[test]
    fn file_store_keeps_bookmarks_ordered_and_separate_from_info() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("book.pdf");
        fs::write(&doc, b"dummy").unwrap();
        let store = FileStateStore::new(dir.path().join("state")).unwrap();

        store.add_bookmark(&doc, &Bookmark::new("zeta", 9)).unwrap();
        store.add_bookmark(&doc, &Bookmark::new("alpha", 1)).unwrap();
        store.set_file_info(&doc, &FileInfo::default()).unwrap();
        store.add_bookmark(&doc, &Bookmark::new("alpha", 3)).unwrap();

        let ids: Vec<(String, usize)> = store
            .bookmarks(&doc)
            .unwrap()
            .into_iter()
            .map(|b| (b.id, b.page))
            .collect();
        assert_eq!(ids, vec![("alpha".into(), 3), ("zeta".into(), 9)]);
        assert!(store.file_info(&doc).unwrap().is_some());

        assert!(store.remove_bookmark(&doc, "zeta").unwrap());
        assert!(!store.remove_bookmark(&doc, "zeta").unwrap());
        assert_eq!(store.bookmarks(&doc).unwrap().len(), 1);
    }

    #[test]
    fn corrupt_state_file_is_an_error() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("broken.pdf");
        let store = FileStateStore::new(dir.path().join("state")).unwrap();
        fs::write(store.state_path(&doc), b"{ not json").unwrap();
        assert!(store.file_info(&doc).is_err());
    }

    #[test]
    fn memory_store_matches_file_store_behaviour() {
        let store = MemoryStateStore::new();
        let doc = Path::new("/tmp/memory.pdf");
        assert!(store.bookmarks(doc).unwrap().is_empty());
        assert!(!store.remove_bookmark(doc, "x").unwrap());
        store.add_bookmark(doc, &Bookmark::new("x", 4)).unwrap();
        assert!(store.remove_bookmark(doc, "x").unwrap());
        store.set_file_info(doc, &FileInfo::default()).unwrap();
        assert_eq!(store.file_info(doc).unwrap(), Some(FileInfo::default()));
    }
}
