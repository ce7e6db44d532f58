//! Cursor over the version history.
//!
//! The navigator is a small state machine over the indices of the version
//! store's current entry list:
//!
//! ```text
//! Empty --append--> At(0)
//! At(i) --append--> At(last)
//! At(i) --undo----> At(i-1)   (no-op at 0)
//! At(i) --redo----> At(i+1)   (no-op at last)
//! At(i) --jump(j)-> At(j)     (no-op if j is out of range)
//! ```
//!
//! It is `Copy` so callers can compute a transition on a copy, persist the
//! resulting head, and only then install the copy.

use serde::{Deserialize, Serialize};

/// Position of the head within the version store's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryNavigator {
    /// No entries yet.
    #[default]
    Empty,
    /// Head is the entry at this index.
    At(usize),
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::Empty
    }

    /// Derives the navigator for a freshly loaded history: newest entry, or
    /// `Empty` if there is none.
    pub fn at_newest(len: usize) -> Self {
        match len {
            0 => Self::Empty,
            n => Self::At(n - 1),
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        match self {
            Self::Empty => None,
            Self::At(i) => Some(*i),
        }
    }

    /// Moves to the newest entry after an append. `len` is the entry count
    /// after the append (and after any eviction).
    pub fn on_append(&mut self, len: usize) {
        *self = Self::at_newest(len);
    }

    /// Steps one entry back. Returns `false` (and stays put) at the oldest
    /// entry or when empty.
    pub fn undo(&mut self) -> bool {
        match *self {
            Self::At(i) if i > 0 => {
                *self = Self::At(i - 1);
                true
            }
            _ => false,
        }
    }

    /// Steps one entry forward. Returns `false` (and stays put) at the
    /// newest entry or when empty.
    pub fn redo(&mut self, len: usize) -> bool {
        match *self {
            Self::At(i) if i + 1 < len => {
                *self = Self::At(i + 1);
                true
            }
            _ => false,
        }
    }

    /// Jumps to `index`. Returns `false` (and stays put) if `index` is not a
    /// valid position for `len` entries or is already the cursor.
    pub fn jump_to(&mut self, index: usize, len: usize) -> bool {
        if index < len && self.cursor() != Some(index) {
            *self = Self::At(index);
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self, Self::At(i) if *i > 0)
    }

    pub fn can_redo(&self, len: usize) -> bool {
        matches!(self, Self::At(i) if i + 1 < len)
    }
}
