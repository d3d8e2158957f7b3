//! Documents described by a JSON page manifest: page sizes, links, text
//! runs for search, named destinations and an optional outline.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use folio_core::link::{LinkTarget, LinkType};
use folio_core::{
    document_id_for_path, Destination, DocumentBackend, DocumentInfo, DocumentMetadata,
    DocumentProvider, Link, OutlineEntry, Rect,
};
use serde::Deserialize;
use tracing::{instrument, warn};

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    pages: Vec<ManifestPage>,
    #[serde(default)]
    destinations: HashMap<String, Destination>,
    #[serde(default)]
    outline: Vec<OutlineEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestPage {
    width: f64,
    height: f64,
    #[serde(default)]
    text: Vec<TextRun>,
    #[serde(default)]
    links: Vec<ManifestLink>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
    rect: Rect,
}

#[derive(Debug, Deserialize)]
struct ManifestLink {
    #[serde(rename = "type")]
    link_type: LinkType,
    rect: Rect,
    #[serde(flatten)]
    target: LinkTarget,
}

#[derive(Debug, Default)]
pub struct ManifestProvider;

impl ManifestProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentProvider for ManifestProvider {
    #[instrument(skip(self))]
    async fn open(&self, path: &Path) -> Result<Arc<dyn DocumentBackend>> {
        let absolute = path
            .canonicalize()
            .with_context(|| format!("failed to resolve path for {:?}", path))?;
        let source = fs::read_to_string(&absolute)
            .with_context(|| format!("failed to read {:?}", absolute))?;
        let manifest: Manifest = serde_json::from_str(&source)
            .with_context(|| format!("failed to decode page manifest {:?}", absolute))?;
        Ok(Arc::new(ManifestDocument::new(&absolute, manifest)?))
    }
}

struct ManifestDocument {
    info: DocumentInfo,
    pages: Vec<ManifestPage>,
    destinations: HashMap<String, Destination>,
    outline: Vec<OutlineEntry>,
}

impl ManifestDocument {
    fn new(path: &Path, manifest: Manifest) -> Result<Self> {
        if manifest.pages.is_empty() {
            bail!("{:?} has no pages", path);
        }
        for (index, page) in manifest.pages.iter().enumerate() {
            if !(page.width > 0.0 && page.height > 0.0) {
                bail!(
                    "page {} of {:?} has invalid size {}x{}",
                    index,
                    path,
                    page.width,
                    page.height
                );
            }
        }
        let info = DocumentInfo {
            id: document_id_for_path(path),
            path: path.to_path_buf(),
            page_count: manifest.pages.len(),
            metadata: DocumentMetadata {
                title: manifest.title,
                author: manifest.author,
            },
        };
        Ok(Self {
            info,
            pages: manifest.pages,
            destinations: manifest.destinations,
            outline: manifest.outline,
        })
    }

    fn page(&self, index: usize) -> Result<&ManifestPage> {
        self.pages
            .get(index)
            .with_context(|| format!("page {} out of range", index))
    }
}

impl DocumentBackend for ManifestDocument {
    fn info(&self) -> &DocumentInfo {
        &self.info
    }

    fn page_size(&self, index: usize) -> Result<(f64, f64)> {
        let page = self.page(index)?;
        Ok((page.width, page.height))
    }

    fn page_links(&self, index: usize) -> Result<Vec<Link>> {
        let page = self.page(index)?;
        let mut links = Vec::with_capacity(page.links.len());
        for entry in &page.links {
            match Link::new(entry.link_type, entry.rect, entry.target.clone()) {
                Some(link) => links.push(link),
                None => warn!(page = index, link_type = ?entry.link_type, "skipping link without target"),
            }
        }
        Ok(links)
    }

    fn search_page(&self, index: usize, query: &str) -> Result<Vec<Rect>> {
        let page = self.page(index)?;
        let needle = query.to_lowercase();
        if needle.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut rects = Vec::new();
        for run in &page.text {
            let hits = run.text.to_lowercase().matches(needle.as_str()).count();
            rects.extend(std::iter::repeat(run.rect).take(hits));
        }
        Ok(rects)
    }

    fn resolve_named_destination(&self, name: &str) -> Option<Destination> {
        self.destinations
            .get(name)
            .copied()
            .filter(|destination| destination.page < self.pages.len())
    }

    fn outline(&self) -> Result<Vec<OutlineEntry>> {
        Ok(self.outline.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use folio_core::LinkAction;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "title": "Sample",
        "pages": [
            {
                "width": 600, "height": 800,
                "text": [
                    { "text": "Hello hello world", "rect": { "x1": 10, "y1": 10, "x2": 200, "y2": 30 } },
                    { "text": "Goodbye", "rect": { "x1": 10, "y1": 40, "x2": 100, "y2": 60 } }
                ],
                "links": [
                    { "type": "goto-destination", "rect": { "x1": 0, "y1": 0, "x2": 50, "y2": 20 },
                      "destination": { "kind": "xyz", "page": 1, "top": 100 } },
                    { "type": "uri", "rect": { "x1": 0, "y1": 30, "x2": 50, "y2": 50 }, "value": "https://example.org" },
                    { "type": "uri", "rect": { "x1": 0, "y1": 60, "x2": 50, "y2": 80 } }
                ]
            },
            { "width": 600, "height": 800 }
        ],
        "destinations": {
            "intro": { "kind": "fit", "page": 1 },
            "beyond": { "page": 9 }
        },
        "outline": [
            { "title": "Start", "destination": { "kind": "fit", "page": 0 } },
            { "title": "Body", "destination": { "kind": "xyz", "page": 1, "top": 40 },
              "children": [{ "title": "Detail", "destination": { "kind": "fit", "page": 1 } }] }
        ]
    }"#;

    async fn open_sample() -> Arc<dyn DocumentBackend> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.json");
        fs::write(&path, SAMPLE).unwrap();
        ManifestProvider::new().open(&path).await.unwrap()
    }

    #[tokio::test]
    async fn reads_pages_and_metadata() {
        let backend = open_sample().await;
        assert_eq!(backend.info().page_count, 2);
        assert_eq!(backend.info().metadata.title.as_deref(), Some("Sample"));
        assert_eq!(backend.page_size(1).unwrap(), (600.0, 800.0));
        assert!(backend.page_size(2).is_err());
    }

    #[tokio::test]
    async fn links_without_targets_are_skipped() {
        let backend = open_sample().await;
        let links = backend.page_links(0).unwrap();
        assert_eq!(links.len(), 2);
        match links[0].action() {
            LinkAction::GotoDestination(destination) => {
                assert_eq!(destination.page, 1);
                assert_eq!(destination.top, Some(100.0));
            }
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(backend.page_links(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_counts_repeats() {
        let backend = open_sample().await;
        assert_eq!(backend.search_page(0, "HELLO").unwrap().len(), 2);
        assert_eq!(backend.search_page(0, "bye").unwrap().len(), 1);
        assert!(backend.search_page(0, "  ").unwrap().is_empty());
        assert!(backend.search_page(1, "hello").unwrap().is_empty());
    }

    #[tokio::test]
    async fn named_destinations_must_exist() {
        let backend = open_sample().await;
        assert_eq!(backend.resolve_named_destination("intro").map(|d| d.page), Some(1));
        assert!(backend.resolve_named_destination("beyond").is_none());
        assert!(backend.resolve_named_destination("missing").is_none());
    }

    #[tokio::test]
    async fn outline_is_read_with_children() {
        let backend = open_sample().await;
        let outline = backend.outline().unwrap();
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[1].title, "Body");
        assert_eq!(outline[1].destination.top, Some(40.0));
        assert_eq!(outline[1].children[0].title, "Detail");
        assert!(outline[0].children.is_empty());
    }

    #[tokio::test]
    async fn empty_manifest_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, r#"{ "pages": [] }"#).unwrap();
        assert!(ManifestProvider::new().open(&path).await.is_err());

        fs::write(&path, r#"{ "pages": [{ "width": 0, "height": 10 }] }"#).unwrap();
        assert!(ManifestProvider::new().open(&path).await.is_err());
    }
}
