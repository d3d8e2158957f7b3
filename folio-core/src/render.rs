use std::sync::Arc;

use parking_lot::Mutex;

use crate::geometry::PageOffset;

/// Repaint signal sent to whatever draws the pages. Requests are
/// fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderRequest {
    All,
    Page(usize),
    /// Link numbering overlay: `first` is the number of the first link on
    /// `page`; `None` removes the overlay.
    LinkMarkers { page: usize, first: Option<usize> },
    /// Top-left corner of the visible area on the canvas.
    Position(PageOffset),
}

pub trait Renderer: Send + Sync {
    fn request_repaint_all(&self);
    fn request_repaint(&self, page: usize);
    fn set_page_offset_markers(&self, page: usize, first: Option<usize>);
    fn scroll_to(&self, _position: PageOffset) {}
}

/// Collects requests until the host drains them.
#[derive(Debug, Default, Clone)]
pub struct RenderQueue {
    pending: Arc<Mutex<Vec<RenderRequest>>>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<RenderRequest> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn push(&self, request: RenderRequest) {
        let mut pending = self.pending.lock();
        if request == RenderRequest::All {
            pending.retain(|queued| !matches!(queued, RenderRequest::Page(_)));
        } else if matches!(request, RenderRequest::Page(_))
            && pending.contains(&RenderRequest::All)
        {
            return;
        }
        if let RenderRequest::Position(_) = request {
            pending.retain(|queued| !matches!(queued, RenderRequest::Position(_)));
        }
        if !pending.contains(&request) {
            pending.push(request);
        }
    }
}

impl Renderer for RenderQueue {
    fn request_repaint_all(&self) {
        self.push(RenderRequest::All);
    }

    fn request_repaint(&self, page: usize) {
        self.push(RenderRequest::Page(page));
    }

    fn set_page_offset_markers(&self, page: usize, first: Option<usize>) {
        self.push(RenderRequest::LinkMarkers { page, first });
    }

    fn scroll_to(&self, position: PageOffset) {
        self.push(RenderRequest::Position(position));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_repaint_supersedes_page_repaints() {
        let queue = RenderQueue::new();
        queue.request_repaint(1);
        queue.request_repaint(2);
        queue.request_repaint_all();
        queue.request_repaint(3);
        queue.request_repaint_all();
        assert_eq!(queue.drain(), vec![RenderRequest::All]);
        assert!(queue.is_empty());
    }

    #[test]
    fn only_latest_position_is_kept() {
        let queue = RenderQueue::new();
        queue.scroll_to(PageOffset { x: 0.0, y: 10.0 });
        queue.set_page_offset_markers(0, Some(0));
        queue.scroll_to(PageOffset { x: 0.0, y: 20.0 });
        assert_eq!(
            queue.drain(),
            vec![
                RenderRequest::LinkMarkers {
                    page: 0,
                    first: Some(0)
                },
                RenderRequest::Position(PageOffset { x: 0.0, y: 20.0 }),
            ]
        );
    }
}
