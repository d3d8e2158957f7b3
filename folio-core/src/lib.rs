pub mod command;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod jumplist;
pub mod launch;
pub mod link;
pub mod outline;
pub mod render;
pub mod search;
pub mod session;
pub mod store;
pub mod viewport;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use command::{Command, Direction, PointerEvent};
pub use config::Settings;
pub use error::Error;
pub use geometry::{PageOffset, Rect, Rotation};
pub use link::{Destination, Link, LinkAction};
pub use outline::{IndexMove, Outline, OutlineEntry};
pub use render::{RenderQueue, RenderRequest, Renderer};
pub use session::{DocumentInstance, Mode, NotificationLevel, Session, SessionEvent};
pub use store::{Bookmark, FileInfo, FileStateStore, MemoryStateStore, StateStore};
pub use viewport::{AdjustMode, ScrollDirection, WindowGeometry, ZoomKind};

pub type DocumentId = Uuid;

static DOCUMENT_NAMESPACE: Lazy<Uuid> =
    Lazy::new(|| Uuid::new_v5(&Uuid::NAMESPACE_URL, b"https://folio.invalid/documents"));

/// Stable identifier for a document path, used to key persisted state.
pub fn document_id_for_path(path: &Path) -> DocumentId {
    let resolved = path
        .canonicalize()
        .or_else(|_| {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                std::env::current_dir().map(|cwd| cwd.join(path))
            }
        })
        .unwrap_or_else(|_| path.to_path_buf());
    let rendered = resolved.to_string_lossy();
    Uuid::new_v5(&DOCUMENT_NAMESPACE, rendered.as_bytes())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub path: PathBuf,
    pub page_count: usize,
    pub metadata: DocumentMetadata,
}

/// Decoded document as seen by the navigation engine: geometry, links and
/// text search. Sizes are in unscaled document units.
pub trait DocumentBackend: Send + Sync {
    fn info(&self) -> &DocumentInfo;
    fn page_size(&self, index: usize) -> Result<(f64, f64)>;
    fn page_links(&self, _index: usize) -> Result<Vec<Link>> {
        Ok(Vec::new())
    }
    fn search_page(&self, index: usize, query: &str) -> Result<Vec<Rect>>;
    fn resolve_named_destination(&self, _name: &str) -> Option<Destination> {
        None
    }
    /// Table of contents; empty when the document has none.
    fn outline(&self) -> Result<Vec<OutlineEntry>> {
        Ok(Vec::new())
    }
}

#[async_trait::async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Arc<dyn DocumentBackend>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn document_id_is_stable_for_same_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("sample.pdf");
        std::fs::write(&file_path, b"dummy").unwrap();

        let first = document_id_for_path(&file_path);
        let second = document_id_for_path(&file_path);

        assert_eq!(first, second);
        assert_ne!(first, document_id_for_path(&dir.path().join("other.pdf")));
    }

    #[test]
    fn relative_and_absolute_paths_agree() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            document_id_for_path(Path::new("missing-folio-doc.pdf")),
            document_id_for_path(&cwd.join("missing-folio-doc.pdf"))
        );
    }
}
