//! Cross-page search result navigation.

use crate::command::Direction;
use crate::document::Page;
use crate::geometry::Rect;

/// Match rectangles of one page plus the highlighted one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchMatches {
    pub rects: Vec<Rect>,
    pub current: Option<usize>,
}

impl SearchMatches {
    pub fn new(rects: Vec<Rect>) -> Self {
        Self {
            rects,
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
        self.current = None;
    }
}

/// The active query and the direction it was issued in. Later
/// `search-next` requests are interpreted relative to that direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    pub query: Option<String>,
    pub direction: Direction,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: None,
            direction: Direction::Forward,
        }
    }
}

impl SearchState {
    /// Direction of travel for a `search-next` request.
    pub fn effective(&self, requested: Direction) -> Direction {
        match self.direction {
            Direction::Forward => requested,
            Direction::Backward => requested.inverted(),
        }
    }
}

/// A highlighted match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub page: usize,
    pub index: usize,
    pub rect: Rect,
}

fn wrap(page: usize, steps: usize, direction: Direction, count: usize) -> usize {
    let steps = steps % count;
    match direction {
        Direction::Forward => (page + steps) % count,
        Direction::Backward => (page + count - steps) % count,
    }
}

fn edge_match(matches: &SearchMatches, direction: Direction) -> usize {
    match direction {
        Direction::Forward => 0,
        Direction::Backward => matches.len() - 1,
    }
}

fn highlight(pages: &mut [Page], page: usize, index: usize) -> Option<SearchHit> {
    let matches = &mut pages.get_mut(page)?.matches;
    let rect = *matches.rects.get(index)?;
    matches.current = Some(index);
    Some(SearchHit { page, index, rect })
}

/// Highlights the first match at or after `start` in `direction`, wrapping
/// around the document.
pub fn first_match_from(pages: &mut [Page], start: usize, direction: Direction) -> Option<SearchHit> {
    let count = pages.len();
    if count == 0 {
        return None;
    }
    (0..count)
        .map(|step| wrap(start.min(count - 1), step, direction, count))
        .find(|&page| !pages[page].matches.is_empty())
        .and_then(|page| {
            let index = edge_match(&pages[page].matches, direction);
            highlight(pages, page, index)
        })
}

/// Moves the highlight one match in `direction`.
///
/// The page holding the live highlight nearest to `current_page` is the
/// starting point. The highlight advances within that page while it can;
/// otherwise it is cleared and the next page with matches receives its
/// first (or, going backward, last) match. Without any live highlight the
/// walk starts at `current_page`.
pub fn next_match(pages: &mut [Page], current_page: usize, direction: Direction) -> Option<SearchHit> {
    let count = pages.len();
    if count == 0 {
        return None;
    }
    let current_page = current_page.min(count - 1);

    let live = (0..count)
        .map(|step| wrap(current_page, step, direction, count))
        .find(|&page| {
            let matches = &pages[page].matches;
            !matches.is_empty() && matches.current.is_some()
        });

    let Some(start) = live else {
        return first_match_from(pages, current_page, direction);
    };

    let matches = &pages[start].matches;
    let current = matches.current.unwrap_or_default();
    match direction {
        Direction::Forward if current + 1 < matches.len() => {
            return highlight(pages, start, current + 1);
        }
        Direction::Backward if current > 0 => {
            return highlight(pages, start, current - 1);
        }
        _ => {}
    }

    pages[start].matches.current = None;
    (1..=count)
        .map(|step| wrap(start, step, direction, count))
        .find(|&page| !pages[page].matches.is_empty())
        .and_then(|page| {
            let index = edge_match(&pages[page].matches, direction);
            highlight(pages, page, index)
        })
}

/// Drops every page's matches and highlight.
pub fn clear_matches(pages: &mut [Page]) {
    for page in pages {
        page.matches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages_with_matches(count: usize, with: &[(usize, usize)]) -> Vec<Page> {
        let mut pages: Vec<Page> = (0..count).map(|i| Page::new(i, 100.0, 100.0)).collect();
        for &(page, hits) in with {
            pages[page].matches = SearchMatches::new(
                (0..hits)
                    .map(|i| Rect::new(0.0, i as f64 * 10.0, 10.0, i as f64 * 10.0 + 5.0))
                    .collect(),
            );
        }
        pages
    }

    #[test]
    fn effective_direction_inverts_after_backward_query() {
        let mut state = SearchState::default();
        assert_eq!(state.effective(Direction::Forward), Direction::Forward);
        state.direction = Direction::Backward;
        assert_eq!(state.effective(Direction::Forward), Direction::Backward);
        assert_eq!(state.effective(Direction::Backward), Direction::Forward);
    }

    #[test]
    fn single_page_with_matches_is_reached_from_anywhere() {
        for start in 0..6 {
            for direction in [Direction::Forward, Direction::Backward] {
                let mut pages = pages_with_matches(6, &[(3, 2)]);
                let hit = next_match(&mut pages, start, direction).unwrap();
                assert_eq!(hit.page, 3, "start {start} {direction:?}");
            }
        }
    }

    #[test]
    fn cycles_within_page_before_leaving() {
        let mut pages = pages_with_matches(5, &[(1, 3), (4, 1)]);
        let first = first_match_from(&mut pages, 0, Direction::Forward).unwrap();
        assert_eq!((first.page, first.index), (1, 0));

        let steps: Vec<(usize, usize)> = (0..4)
            .map(|_| next_match(&mut pages, 1, Direction::Forward).unwrap())
            .map(|hit| (hit.page, hit.index))
            .collect();
        assert_eq!(steps, vec![(1, 1), (1, 2), (4, 0), (1, 0)]);
        assert_eq!(pages[4].matches.current, None);
    }

    #[test]
    fn backward_picks_last_match_of_previous_page() {
        let mut pages = pages_with_matches(4, &[(0, 2), (2, 3)]);
        highlight(&mut pages, 2, 0);
        let hit = next_match(&mut pages, 2, Direction::Backward).unwrap();
        assert_eq!((hit.page, hit.index), (0, 1));
        assert_eq!(pages[2].matches.current, None);

        let hit = next_match(&mut pages, 0, Direction::Backward).unwrap();
        assert_eq!((hit.page, hit.index), (0, 0));
        let hit = next_match(&mut pages, 0, Direction::Backward).unwrap();
        assert_eq!((hit.page, hit.index), (2, 2));
    }

    #[test]
    fn single_match_wraps_onto_itself() {
        let mut pages = pages_with_matches(3, &[(1, 1)]);
        highlight(&mut pages, 1, 0);
        let hit = next_match(&mut pages, 1, Direction::Forward).unwrap();
        assert_eq!((hit.page, hit.index), (1, 0));
        assert_eq!(pages[1].matches.current, Some(0));
    }

    #[test]
    fn no_matches_yields_nothing() {
        let mut pages = pages_with_matches(3, &[]);
        assert!(next_match(&mut pages, 0, Direction::Forward).is_none());
        assert!(next_match(&mut [], 0, Direction::Forward).is_none());
    }
}
