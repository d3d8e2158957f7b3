//! Back/forward navigation history.

use serde::{Deserialize, Serialize};

use crate::command::Direction;

/// A recorded location. Offsets are stored divided by the scale that was
/// active when the jump was taken.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Jump {
    pub page: usize,
    pub x: f64,
    pub y: f64,
}

impl Jump {
    pub const fn new(page: usize, x: f64, y: f64) -> Self {
        Self { page, x, y }
    }
}

#[derive(Debug, Clone)]
pub struct Jumplist {
    jumps: Vec<Jump>,
    cursor: Option<usize>,
    capacity: usize,
}

impl Jumplist {
    pub fn new(capacity: usize) -> Self {
        Self {
            jumps: Vec::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.jumps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jumps.is_empty()
    }

    pub fn position(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<Jump> {
        self.cursor.and_then(|idx| self.jumps.get(idx).copied())
    }

    pub fn has_previous(&self) -> bool {
        matches!(self.cursor, Some(idx) if idx > 0)
    }

    pub fn has_next(&self) -> bool {
        matches!(self.cursor, Some(idx) if idx + 1 < self.jumps.len())
    }

    /// Overwrites the current entry with `jump`. Does nothing on an empty list.
    pub fn save(&mut self, jump: Jump) {
        if let Some(idx) = self.cursor {
            self.jumps[idx] = jump;
        }
    }

    /// Records `jump` after the cursor, dropping any forward history.
    pub fn add(&mut self, jump: Jump) {
        if self.current() == Some(jump) {
            return;
        }
        if let Some(idx) = self.cursor {
            self.jumps.truncate(idx + 1);
        }
        self.jumps.push(jump);
        if self.jumps.len() > self.capacity {
            let excess = self.jumps.len() - self.capacity;
            self.jumps.drain(..excess);
        }
        self.cursor = Some(self.jumps.len() - 1);
    }

    pub fn forward(&mut self) -> bool {
        match self.cursor {
            Some(idx) if idx + 1 < self.jumps.len() => {
                self.cursor = Some(idx + 1);
                true
            }
            _ => false,
        }
    }

    pub fn backward(&mut self) -> bool {
        match self.cursor {
            Some(idx) if idx > 0 => {
                self.cursor = Some(idx - 1);
                true
            }
            _ => false,
        }
    }

    /// Pages of the two entries before the cursor, read without moving it.
    pub fn previous_pages(&mut self) -> (Option<usize>, Option<usize>) {
        let mut prev = None;
        let mut prev2 = None;
        if self.has_previous() {
            self.backward();
            prev = self.current().map(|jump| jump.page);
            if self.has_previous() {
                self.backward();
                prev2 = self.current().map(|jump| jump.page);
                self.forward();
            }
            self.forward();
        }
        (prev, prev2)
    }
}

/// Outcome of one bisection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BisectStep {
    /// Already adjacent to the bound; nothing to record.
    Stay,
    /// Go to the page and record it as a new jump.
    Add(usize),
    /// Go to the page, re-using the previous entry as a marker for the
    /// current location and the current entry for the new page.
    Replace(usize),
}

impl BisectStep {
    pub fn page(self) -> Option<usize> {
        match self {
            BisectStep::Stay => None,
            BisectStep::Add(page) | BisectStep::Replace(page) => Some(page),
        }
    }
}

/// Picks the next page of a bisection between `current` and the nearest of
/// the two previously recorded pages on the requested side, or the document
/// boundary when neither qualifies.
pub fn plan_bisect(
    direction: Direction,
    current: usize,
    prev: Option<usize>,
    prev2: Option<usize>,
    page_count: usize,
) -> BisectStep {
    if page_count == 0 {
        return BisectStep::Stay;
    }
    let last = page_count - 1;
    let ahead = |page: usize| match direction {
        Direction::Forward => current <= page,
        Direction::Backward => page <= current,
    };

    let (bound, marker) = if let Some(page) = prev.filter(|&p| ahead(p)) {
        (page, false)
    } else if let Some(page) = prev2.filter(|&p| ahead(p)) {
        (page, true)
    } else {
        match direction {
            Direction::Forward => (last, false),
            Direction::Backward => (0, false),
        }
    };

    let target = (current.min(last) + bound.min(last)) / 2;
    if target == current {
        BisectStep::Stay
    } else if marker {
        BisectStep::Replace(target)
    } else {
        BisectStep::Add(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_backward_forward_round_trips() {
        let mut list = Jumplist::new(10);
        list.add(Jump::new(0, 0.0, 0.0));
        list.save(Jump::new(0, 1.0, 2.0));
        list.add(Jump::new(7, 3.5, 9.25));
        assert!(list.backward());
        assert_eq!(list.current(), Some(Jump::new(0, 1.0, 2.0)));
        assert!(list.forward());
        assert_eq!(list.current(), Some(Jump::new(7, 3.5, 9.25)));
    }

    #[test]
    fn empty_list_is_inert() {
        let mut list = Jumplist::new(10);
        list.save(Jump::new(3, 0.0, 0.0));
        assert!(list.is_empty());
        assert!(!list.backward());
        assert!(!list.forward());
        assert!(!list.has_previous());
        assert_eq!(list.current(), None);
        assert_eq!(list.position(), None);
    }

    #[test]
    fn add_truncates_forward_history() {
        let mut list = Jumplist::new(10);
        for page in 0..4 {
            list.add(Jump::new(page, 0.0, 0.0));
        }
        list.backward();
        list.backward();
        list.add(Jump::new(9, 0.0, 0.0));
        assert_eq!(list.len(), 3);
        assert!(!list.forward());
        assert_eq!(list.current().map(|j| j.page), Some(9));
    }

    #[test]
    fn ends_report_no_further_history() {
        let mut list = Jumplist::new(10);
        list.add(Jump::new(1, 0.0, 0.0));
        list.add(Jump::new(2, 0.0, 0.0));
        assert!(!list.forward());
        assert_eq!(list.position(), Some(1));
        assert!(list.backward());
        assert!(!list.backward());
        assert_eq!(list.position(), Some(0));
    }

    #[test]
    fn capacity_evicts_oldest_and_keeps_cursor_valid() {
        let mut list = Jumplist::new(3);
        for page in 0..5 {
            list.add(Jump::new(page, 0.0, 0.0));
        }
        assert_eq!(list.len(), 3);
        assert_eq!(list.position(), Some(2));
        assert_eq!(list.current().map(|j| j.page), Some(4));
        list.backward();
        list.backward();
        assert_eq!(list.current().map(|j| j.page), Some(2));
    }

    #[test]
    fn identical_jump_is_not_duplicated() {
        let mut list = Jumplist::new(5);
        list.add(Jump::new(2, 1.0, 1.0));
        list.add(Jump::new(2, 1.0, 1.0));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn previous_pages_restores_cursor() {
        let mut list = Jumplist::new(5);
        list.add(Jump::new(10, 0.0, 0.0));
        list.add(Jump::new(20, 0.0, 0.0));
        list.add(Jump::new(30, 0.0, 0.0));
        assert_eq!(list.previous_pages(), (Some(20), Some(10)));
        assert_eq!(list.position(), Some(2));
    }

    #[test]
    fn bisect_forward_uses_nearest_bound() {
        assert_eq!(
            plan_bisect(Direction::Forward, 10, Some(20), Some(40), 100),
            BisectStep::Add(15)
        );
        assert_eq!(
            plan_bisect(Direction::Forward, 10, Some(4), Some(30), 100),
            BisectStep::Replace(20)
        );
        assert_eq!(
            plan_bisect(Direction::Forward, 10, Some(4), None, 100),
            BisectStep::Add(54)
        );
    }

    #[test]
    fn bisect_backward_mirrors_forward() {
        assert_eq!(
            plan_bisect(Direction::Backward, 40, Some(20), Some(10), 100),
            BisectStep::Add(30)
        );
        assert_eq!(
            plan_bisect(Direction::Backward, 40, Some(60), Some(10), 100),
            BisectStep::Replace(25)
        );
        assert_eq!(
            plan_bisect(Direction::Backward, 40, None, None, 100),
            BisectStep::Add(20)
        );
        assert_eq!(
            plan_bisect(Direction::Backward, 0, None, None, 100),
            BisectStep::Stay
        );
    }

    #[test]
    fn bisect_stays_when_adjacent() {
        assert_eq!(
            plan_bisect(Direction::Forward, 98, None, None, 100),
            BisectStep::Stay
        );
        assert_eq!(
            plan_bisect(Direction::Forward, 7, Some(8), None, 100),
            BisectStep::Stay
        );
        assert_eq!(
            plan_bisect(Direction::Forward, 7, Some(7), None, 100),
            BisectStep::Stay
        );
    }
}
