use std::collections::VecDeque;

/// Bounded undo/redo stacks of whole-state snapshots.
#[derive(Clone, Debug)]
pub struct History<T> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    limit: usize,
}

impl<T> History<T> {
    pub fn new(limit: usize) -> Self {
        History { undo: VecDeque::new(), redo: Vec::new(), limit: limit.max(1) }
    }

    /// Record the state as it was before a successful command. Clears redo.
    pub fn record(&mut self, before: T) {
        self.redo.clear();
        self.undo.push_back(before);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Swap `current` with the last recorded state. `false` if there is none.
    pub fn undo(&mut self, current: &mut T) -> bool {
        let Some(prev) = self.undo.pop_back() else {
            return false;
        };
        let now = std::mem::replace(current, prev);
        self.redo.push(now);
        true
    }

    pub fn redo(&mut self, current: &mut T) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let now = std::mem::replace(current, next);
        self.undo.push_back(now);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_redo_cycle() {
        let mut h = History::new(10);
        let mut s = 1;
        h.record(s);
        s = 2;
        assert!(h.undo(&mut s));
        assert_eq!(s, 1);
        assert!(!h.undo(&mut s));
        assert!(h.redo(&mut s));
        assert_eq!(s, 2);
        assert!(!h.redo(&mut s));
    }

    #[test]
    fn oldest_evicted() {
        let mut h = History::new(3);
        for i in 0..5 {
            h.record(i);
        }
        assert_eq!(h.undo_len(), 3);
        let mut s = 5;
        while h.undo(&mut s) {}
        assert_eq!(s, 2);
    }

    #[test]
    fn record_clears_redo() {
        let mut h = History::new(3);
        let mut s = 0;
        h.record(s);
        s = 1;
        h.undo(&mut s);
        assert!(h.can_redo());
        h.record(s);
        assert!(!h.can_redo());
    }
}
