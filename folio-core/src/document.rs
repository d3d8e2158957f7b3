//! Page geometry and the grid layout pages are arranged in.

use anyhow::{Context, Result};
use tracing::warn;

use crate::geometry::{PageOffset, Rect, Rotation};
use crate::link::Link;
use crate::search::SearchMatches;
use crate::DocumentBackend;

#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    pub visible: bool,
    pub links: Vec<Link>,
    pub matches: SearchMatches,
}

impl Page {
    pub fn new(index: usize, width: f64, height: f64) -> Self {
        Self {
            index,
            width,
            height,
            visible: false,
            links: Vec::new(),
            matches: SearchMatches::default(),
        }
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }

    /// Displayed size at `scale`, with width and height swapped when turned
    /// sideways.
    pub fn scaled_size(&self, scale: f64, rotation: Rotation) -> (f64, f64) {
        let (width, height) = (self.width * scale, self.height * scale);
        if rotation.is_sideways() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// Pulls geometry and links for every page out of the backend.
    pub fn load(backend: &dyn DocumentBackend) -> Result<Self> {
        let count = backend.info().page_count;
        let mut pages = Vec::with_capacity(count);
        for index in 0..count {
            let (width, height) = backend
                .page_size(index)
                .with_context(|| format!("failed to read size of page {}", index))?;
            let links = match backend.page_links(index) {
                Ok(links) => links,
                Err(err) => {
                    warn!(?err, page = index, "failed to read page links");
                    Vec::new()
                }
            };
            pages.push(Page::new(index, width, height).with_links(links));
        }
        Ok(Self { pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    /// Size of one grid cell: the largest page on each axis.
    pub fn cell_size(&self, scale: f64, rotation: Rotation) -> (f64, f64) {
        self.pages
            .iter()
            .map(|page| page.scaled_size(scale, rotation))
            .fold((0.0_f64, 0.0_f64), |(w, h), (pw, ph)| (w.max(pw), h.max(ph)))
    }
}

/// Column count and leading empty cells of the page grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub columns: usize,
    pub first_column: usize,
}

impl GridShape {
    pub fn new(pages_per_row: usize, first_page_column: usize) -> Self {
        let columns = pages_per_row.max(1);
        let first_column = if first_page_column < 1 {
            1
        } else if first_page_column > columns {
            (first_page_column - 1) % columns + 1
        } else {
            first_page_column
        };
        Self {
            columns,
            first_column,
        }
    }

    pub fn rows(&self, page_count: usize) -> usize {
        (page_count + self.first_column - 1 + self.columns - 1) / self.columns
    }

    /// Row and column of page `index`.
    pub fn slot(&self, index: usize) -> (usize, usize) {
        let slot = index + self.first_column - 1;
        (slot / self.columns, slot % self.columns)
    }

    /// Width and height of the whole grid for the given cell size.
    pub fn document_size(
        &self,
        page_count: usize,
        cell_width: f64,
        cell_height: f64,
        padding: f64,
    ) -> (f64, f64) {
        let rows = self.rows(page_count);
        let columns = self.columns as f64;
        let width = columns * cell_width + (columns - 1.0) * padding;
        let height = if rows == 0 {
            0.0
        } else {
            rows as f64 * cell_height + (rows as f64 - 1.0) * padding
        };
        (width, height)
    }
}

/// Placement of every page on the scrollable canvas for one scale,
/// rotation and window size. Pages are centred in their grid cells and the
/// grid is centred on the canvas when smaller than the window.
#[derive(Debug, Clone)]
pub struct Layout {
    shape: GridShape,
    cell_width: f64,
    cell_height: f64,
    padding: f64,
    origin: PageOffset,
    canvas_width: f64,
    canvas_height: f64,
    page_sizes: Vec<(f64, f64)>,
}

impl Layout {
    pub fn compute(
        document: &Document,
        scale: f64,
        rotation: Rotation,
        shape: GridShape,
        padding: f64,
        window: (f64, f64),
    ) -> Self {
        let (cell_width, cell_height) = document.cell_size(scale, rotation);
        let (doc_width, doc_height) =
            shape.document_size(document.page_count(), cell_width, cell_height, padding);
        let canvas_width = doc_width.max(window.0);
        let canvas_height = doc_height.max(window.1);
        Self {
            shape,
            cell_width,
            cell_height,
            padding,
            origin: PageOffset {
                x: (canvas_width - doc_width) / 2.0,
                y: (canvas_height - doc_height) / 2.0,
            },
            canvas_width,
            canvas_height,
            page_sizes: document
                .pages()
                .iter()
                .map(|page| page.scaled_size(scale, rotation))
                .collect(),
        }
    }

    pub fn canvas_size(&self) -> (f64, f64) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn page_size(&self, index: usize) -> Option<(f64, f64)> {
        self.page_sizes.get(index).copied()
    }

    pub fn page_offset(&self, index: usize) -> Option<PageOffset> {
        let (width, height) = self.page_size(index)?;
        let (row, column) = self.shape.slot(index);
        Some(PageOffset {
            x: self.origin.x
                + column as f64 * (self.cell_width + self.padding)
                + (self.cell_width - width) / 2.0,
            y: self.origin.y
                + row as f64 * (self.cell_height + self.padding)
                + (self.cell_height - height) / 2.0,
        })
    }

    pub fn page_rect(&self, index: usize) -> Option<Rect> {
        let offset = self.page_offset(index)?;
        let (width, height) = self.page_size(index)?;
        Some(Rect::new(
            offset.x,
            offset.y,
            offset.x + width,
            offset.y + height,
        ))
    }

    /// Page under the canvas point, if any.
    pub fn page_at(&self, x: f64, y: f64) -> Option<usize> {
        (0..self.page_sizes.len()).find(|&index| {
            self.page_rect(index)
                .map(|rect| rect.contains(x, y))
                .unwrap_or(false)
        })
    }
}
