//! Navigation history
//!
//! Bounded stack of previously played indices. Forward navigation under
//! shuffle pushes, backward navigation pops; the shuffle planner also reads it
//! to avoid replaying an entry before every other entry had its turn.

use std::collections::VecDeque;

/// History of played playlist indices (most recent = back)
///
/// Once `max_size` entries are held, pushing discards the oldest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    indices: VecDeque<usize>,
    max_size: usize,
}

impl History {
    /// Create an empty, unbounded history
    pub fn new() -> Self {
        Self {
            indices: VecDeque::new(),
            max_size: usize::MAX,
        }
    }

    /// Create an empty history holding at most `max_size` indices
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            indices: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Record an index as played
    pub fn push(&mut self, index: usize) {
        if self.max_size == 0 {
            return;
        }
        while self.indices.len() >= self.max_size {
            self.indices.pop_front();
        }
        self.indices.push_back(index);
    }

    /// Change the bound, dropping the oldest entries that no longer fit
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        while self.indices.len() > max_size {
            self.indices.pop_front();
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Renumber after an insertion at `index`
    pub fn shift_from(&mut self, index: usize) {
        for recorded in &mut self.indices {
            if *recorded >= index {
                *recorded += 1;
            }
        }
    }

    /// Most recent index (without removing)
    pub fn peek(&self) -> Option<usize> {
        self.indices.back().copied()
    }

    /// Pop the most recent index
    pub fn pop(&mut self) -> Option<usize> {
        self.indices.pop_back()
    }

    /// Drop entries on top that point outside `0..size`
    ///
    /// Returns the first valid top entry, if any. Entries below it are
    /// left alone even when invalid.
    pub fn drop_invalid_top(&mut self, size: usize) -> Option<usize> {
        while let Some(top) = self.peek() {
            if top < size {
                return Some(top);
            }
            self.indices.pop_back();
        }
        None
    }

    /// Whether `index` was played since the last clear
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Iterate from oldest to most recent
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
