//! Hyperlinks attached to pages.
//!
//! A [`Link`] pairs the clickable rectangle with one [`LinkAction`]. Only
//! [`Link::new`] and the typed constructors create links, so a string-carrying
//! action can never hold an empty target.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::geometry::{PageOffset, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DestinationKind {
    #[default]
    Unknown,
    Xyz,
    Fit,
    FitH,
    FitV,
    FitR,
    FitB,
    FitBH,
    FitBV,
}

/// Target of an intra-document jump.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default)]
    pub kind: DestinationKind,
    pub page: usize,
    /// Horizontal position in page units; `None` keeps the page's own offset.
    #[serde(default)]
    pub left: Option<f64>,
    #[serde(default)]
    pub top: Option<f64>,
    /// Zoom requested by the link, `0.0` when unspecified.
    #[serde(default)]
    pub scale: f64,
}

impl Destination {
    pub fn page(page: usize) -> Self {
        Self {
            kind: DestinationKind::Xyz,
            page,
            left: None,
            top: None,
            scale: 0.0,
        }
    }

    /// Canvas offset to scroll to, given where the destination page sits.
    pub fn offset_on(&self, page_offset: PageOffset, scale: f64) -> PageOffset {
        let mut offset = page_offset;
        if self.kind == DestinationKind::Xyz {
            if let Some(left) = self.left {
                offset.x += left * scale;
            }
            if let Some(top) = self.top {
                offset.y += top * scale;
            }
        }
        offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    None,
    GotoDestination,
    GotoRemote,
    Uri,
    Launch,
    Named,
}

/// Untyped link payload as handed over by a document backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkTarget {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub destination: Destination,
}

impl LinkTarget {
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            destination: Destination::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkAction {
    None,
    GotoDestination(Destination),
    GotoRemote { file: String },
    Uri { uri: String },
    Launch { path: String },
    Named { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    position: Rect,
    action: LinkAction,
}

impl Link {
    /// Returns `None` when a string-carrying link type lacks its target.
    pub fn new(link_type: LinkType, position: Rect, target: LinkTarget) -> Option<Self> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        let action = match link_type {
            LinkType::None => LinkAction::None,
            LinkType::GotoDestination => LinkAction::GotoDestination(target.destination),
            LinkType::GotoRemote => LinkAction::GotoRemote {
                file: non_empty(target.value)?,
            },
            LinkType::Uri => LinkAction::Uri {
                uri: non_empty(target.value)?,
            },
            LinkType::Launch => LinkAction::Launch {
                path: non_empty(target.value)?,
            },
            LinkType::Named => LinkAction::Named {
                name: non_empty(target.value)?,
            },
        };
        Some(Self { position, action })
    }

    pub fn goto(position: Rect, destination: Destination) -> Self {
        Self {
            position,
            action: LinkAction::GotoDestination(destination),
        }
    }

    pub fn uri(position: Rect, uri: &str) -> Option<Self> {
        Self::new(LinkType::Uri, position, LinkTarget::value(uri))
    }

    pub fn position(&self) -> Rect {
        self.position
    }

    pub fn action(&self) -> &LinkAction {
        &self.action
    }

    pub fn link_type(&self) -> LinkType {
        match self.action {
            LinkAction::None => LinkType::None,
            LinkAction::GotoDestination(_) => LinkType::GotoDestination,
            LinkAction::GotoRemote { .. } => LinkType::GotoRemote,
            LinkAction::Uri { .. } => LinkType::Uri,
            LinkAction::Launch { .. } => LinkType::Launch,
            LinkAction::Named { .. } => LinkType::Named,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.action, LinkAction::None)
    }

    /// One-line description shown to the user.
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            LinkAction::GotoDestination(destination) => {
                write!(f, "Link: page {}", destination.page + 1)
            }
            LinkAction::GotoRemote { file: target }
            | LinkAction::Uri { uri: target }
            | LinkAction::Launch { path: target }
            | LinkAction::Named { name: target } => write!(f, "Link: {}", target),
            LinkAction::None => f.write_str("Link: Invalid"),
        }
    }
}

/// Resolves a link target against the directory of the open document.
/// Absolute targets are returned unchanged.
pub fn resolve_against_document(document: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match document.parent() {
        Some(dir) => dir.join(target),
        None => target.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Rect {
        Rect::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn string_links_require_a_target() {
        assert!(Link::new(LinkType::GotoRemote, rect(), LinkTarget::default()).is_none());
        assert!(Link::new(LinkType::Launch, rect(), LinkTarget::value("")).is_none());
        assert!(Link::new(LinkType::Named, rect(), LinkTarget::default()).is_none());
        assert!(Link::new(LinkType::GotoDestination, rect(), LinkTarget::default()).is_some());
        assert!(Link::new(LinkType::None, rect(), LinkTarget::default()).is_some());
    }

    #[test]
    fn uri_display_contains_target() {
        let link = Link::new(LinkType::Uri, rect(), LinkTarget::value("http://x")).unwrap();
        assert_eq!(link.link_type(), LinkType::Uri);
        assert!(link.display().contains("http://x"));
    }

    #[test]
    fn display_variants() {
        let goto = Link::goto(rect(), Destination::page(4));
        assert_eq!(goto.display(), "Link: page 5");

        let none = Link::new(LinkType::None, rect(), LinkTarget::default()).unwrap();
        assert!(!none.is_valid());
        assert_eq!(none.display(), "Link: Invalid");

        let named = Link::new(LinkType::Named, rect(), LinkTarget::value("chapter.2")).unwrap();
        assert_eq!(named.display(), "Link: chapter.2");
    }

    #[test]
    fn xyz_destination_adds_scaled_position() {
        let base = PageOffset { x: 5.0, y: 100.0 };
        let dest = Destination {
            kind: DestinationKind::Xyz,
            page: 1,
            left: Some(10.0),
            top: None,
            scale: 0.0,
        };
        assert_eq!(dest.offset_on(base, 2.0), PageOffset { x: 25.0, y: 100.0 });

        let fit = Destination {
            kind: DestinationKind::Fit,
            left: Some(10.0),
            top: Some(10.0),
            ..dest
        };
        assert_eq!(fit.offset_on(base, 2.0), base);
    }

    #[test]
    fn relative_targets_resolve_next_to_document() {
        let doc = Path::new("/books/manual.pdf");
        assert_eq!(
            resolve_against_document(doc, "appendix.pdf"),
            PathBuf::from("/books/appendix.pdf")
        );
        assert_eq!(
            resolve_against_document(doc, "/etc/motd"),
            PathBuf::from("/etc/motd")
        );
    }
}
