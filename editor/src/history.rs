//! Linear undo/redo over whole-document snapshots.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::consts::HISTORY_DEPTH;

/// Ordered snapshots plus a cursor. Always holds at least one snapshot and
/// `index < len`. Recording after an undo discards the redo tail.
#[derive(Debug, Clone)]
pub struct HistoryStack<T: Clone> {
    snapshots: Vec<T>,
    index: usize,
    depth: usize,
}

impl<T: Clone> HistoryStack<T> {
    /// Start a history whose only entry is `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::with_depth(initial, HISTORY_DEPTH)
    }

    /// Like [`HistoryStack::new`] but keeping at most `depth` snapshots
    /// (never fewer than one).
    #[must_use]
    pub fn with_depth(initial: T, depth: usize) -> Self {
        Self { snapshots: vec![initial], index: 0, depth: depth.max(1) }
    }

    /// Push a snapshot after the cursor and move onto it.
    pub fn record(&mut self, snapshot: T) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(snapshot);
        if self.snapshots.len() > self.depth {
            let excess = self.snapshots.len() - self.depth;
            self.snapshots.drain(..excess);
        }
        self.index = self.snapshots.len() - 1;
    }

    /// Step back one snapshot and return it, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.snapshots.get(self.index)
    }

    /// Step forward one snapshot and return it, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.snapshots.get(self.index)
    }

    #[must_use]
    pub fn current(&self) -> &T {
        &self.snapshots[self.index]
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Drop everything and start over from `snapshot`.
    pub fn reset(&mut self, snapshot: T) {
        self.snapshots.clear();
        self.snapshots.push(snapshot);
        self.index = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Never true; a history always holds its baseline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}
