//! Document outline (table of contents) and the cursor used to walk it.
//!
//! Rows are addressed by their path of child indices from the top level, so
//! `[2, 0]` is the first child of the third heading.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::link::Destination;
use crate::viewport::ParseNameError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub title: String,
    pub destination: Destination,
    #[serde(default)]
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    pub fn new(title: impl Into<String>, destination: Destination) -> Self {
        Self {
            title: title.into(),
            destination,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<OutlineEntry>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMove {
    Up,
    Down,
    Expand,
    Collapse,
    ExpandAll,
    CollapseAll,
    Select,
}

impl FromStr for IndexMove {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let movement = match s {
            "up" => IndexMove::Up,
            "down" => IndexMove::Down,
            "expand" => IndexMove::Expand,
            "collapse" => IndexMove::Collapse,
            "expand-all" => IndexMove::ExpandAll,
            "collapse-all" => IndexMove::CollapseAll,
            "select" => IndexMove::Select,
            other => return Err(ParseNameError(other.to_owned())),
        };
        Ok(movement)
    }
}

/// Outline tree plus the selected row and the rows whose children are shown.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
    cursor: Vec<usize>,
    expanded: BTreeSet<Vec<usize>>,
}

impl Outline {
    /// `None` when the document has no headings.
    pub fn new(entries: Vec<OutlineEntry>) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        Some(Self {
            entries,
            cursor: vec![0],
            expanded: BTreeSet::new(),
        })
    }

    pub fn cursor(&self) -> &[usize] {
        &self.cursor
    }

    pub fn is_expanded(&self, path: &[usize]) -> bool {
        self.expanded.contains(path)
    }

    pub fn entry(&self, path: &[usize]) -> Option<&OutlineEntry> {
        let (first, rest) = path.split_first()?;
        let mut entry = self.entries.get(*first)?;
        for &index in rest {
            entry = entry.children.get(index)?;
        }
        Some(entry)
    }

    pub fn selected(&self) -> Option<&OutlineEntry> {
        self.entry(&self.cursor)
    }

    /// Rows shown with the current expansion, in display order.
    pub fn visible_rows(&self) -> Vec<(Vec<usize>, &OutlineEntry)> {
        let mut rows = Vec::new();
        let mut prefix = Vec::new();
        self.push_rows(&self.entries, &mut prefix, &mut rows);
        rows
    }

    fn push_rows<'a>(
        &'a self,
        entries: &'a [OutlineEntry],
        prefix: &mut Vec<usize>,
        rows: &mut Vec<(Vec<usize>, &'a OutlineEntry)>,
    ) {
        for (index, entry) in entries.iter().enumerate() {
            prefix.push(index);
            rows.push((prefix.clone(), entry));
            if self.expanded.contains(prefix.as_slice()) {
                self.push_rows(&entry.children, prefix, rows);
            }
            prefix.pop();
        }
    }

    fn child_count(&self, path: &[usize]) -> usize {
        self.entry(path).map_or(0, |entry| entry.children.len())
    }

    fn sibling_count(&self, path: &[usize]) -> usize {
        match path.split_last() {
            Some((_, [])) => self.entries.len(),
            Some((_, parent)) => self.child_count(parent),
            None => 0,
        }
    }

    fn is_open(&self, path: &[usize]) -> bool {
        self.expanded.contains(path) && self.child_count(path) > 0
    }

    /// Applies one cursor or expansion move. Returns whether anything
    /// changed. [`IndexMove::Select`] is resolved by the caller.
    pub fn apply(&mut self, movement: IndexMove) -> bool {
        match movement {
            IndexMove::Up => self.up(),
            IndexMove::Down => self.down(),
            IndexMove::Expand => self.expand(),
            IndexMove::Collapse => self.collapse(),
            IndexMove::ExpandAll => self.expand_all(),
            IndexMove::CollapseAll => {
                let changed = !self.expanded.is_empty() || self.cursor != [0];
                self.expanded.clear();
                self.cursor = vec![0];
                changed
            }
            IndexMove::Select => false,
        }
    }

    /// Previous row on screen: the deepest open descendant of the previous
    /// sibling, or the parent.
    fn up(&mut self) -> bool {
        let mut path = self.cursor.clone();
        match path.last().copied() {
            Some(last) if last > 0 => {
                path.pop();
                path.push(last - 1);
                while self.is_open(&path) {
                    let last_child = self.child_count(&path) - 1;
                    path.push(last_child);
                }
            }
            Some(_) if path.len() > 1 => {
                path.pop();
            }
            _ => return false,
        }
        self.cursor = path;
        true
    }

    /// Next row on screen: the first child when open, else the next sibling
    /// of the row or of its nearest ancestor that has one.
    fn down(&mut self) -> bool {
        if self.is_open(&self.cursor) {
            self.cursor.push(0);
            return true;
        }
        let mut path = self.cursor.clone();
        while let Some(last) = path.last().copied() {
            if last + 1 < self.sibling_count(&path) {
                path.pop();
                path.push(last + 1);
                self.cursor = path;
                return true;
            }
            if path.len() == 1 {
                break;
            }
            path.pop();
        }
        false
    }

    fn expand(&mut self) -> bool {
        if self.child_count(&self.cursor) == 0 {
            return false;
        }
        self.expanded.insert(self.cursor.clone());
        self.cursor.push(0);
        true
    }

    /// Closes the row, or its parent when the row itself is not open.
    fn collapse(&mut self) -> bool {
        let row = self.cursor.clone();
        if self.collapse_row(&row) {
            return true;
        }
        if row.len() > 1 {
            self.cursor.pop();
            let parent = self.cursor.clone();
            self.collapse_row(&parent);
            return true;
        }
        false
    }

    fn collapse_row(&mut self, path: &[usize]) -> bool {
        if !self.is_open(path) {
            return false;
        }
        self.expanded.retain(|open| !open.starts_with(path));
        true
    }

    fn expand_all(&mut self) -> bool {
        let before = self.expanded.len();
        let mut pending: Vec<Vec<usize>> = (0..self.entries.len()).map(|index| vec![index]).collect();
        while let Some(path) = pending.pop() {
            let children = self.child_count(&path);
            if children == 0 {
                continue;
            }
            for index in 0..children {
                let mut child = path.clone();
                child.push(index);
                pending.push(child);
            }
            self.expanded.insert(path);
        }
        self.expanded.len() != before
    }
}
