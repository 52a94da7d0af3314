//! Cursor and filter state for one directory listing.

use std::cmp::Ordering;

use crate::layer::FileRecord;
use crate::util::{is_match_all, prj_file_name_compare, prj_file_name_match};

/// Search expression state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterState {
    /// No round has fixed a filter yet.
    Pending,
    /// Fixed filter; `None` selects everything.
    Fixed(Option<String>),
}

/// A directory snapshot replayed to the engine over several rounds.
///
/// The snapshot is taken at start and sorted in collation order. `cursor`
/// always rests on an entry that passes the filter, or on `entries.len()`.
#[derive(Debug)]
pub struct EnumerationSession {
    entries: Vec<FileRecord>,
    cursor: usize,
    filter: FilterState,
}

impl EnumerationSession {
    /// Snapshot a layer listing.
    ///
    /// # Arguments
    /// * `entries` - Listing in layer order
    pub fn new(mut entries: Vec<FileRecord>) -> Self {
        entries.sort_by(|a, b| collate(&a.name, &b.name));
        Self {
            entries,
            cursor: 0,
            filter: FilterState::Pending,
        }
    }

    /// Entry the next round starts with, or None when drained.
    pub fn peek(&self) -> Option<&FileRecord> {
        self.entries.get(self.cursor)
    }

    /// Step past the entry returned by [`peek`](Self::peek).
    pub fn advance(&mut self) {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
            self.seek_match();
        }
    }

    /// Go back to the first entry and install `filter` unconditionally.
    pub fn rewind(&mut self, filter: Option<String>) {
        self.filter = FilterState::Fixed(filter);
        self.cursor = 0;
        self.seek_match();
    }

    /// Install `filter` if no round has fixed one yet.
    ///
    /// # Returns
    /// False when an earlier filter stays in effect.
    pub fn adopt_filter(&mut self, filter: Option<String>) -> bool {
        if self.filter != FilterState::Pending {
            return false;
        }
        self.filter = FilterState::Fixed(filter);
        self.seek_match();
        true
    }

    /// Filter in effect, if any.
    pub fn filter(&self) -> Option<&str> {
        match &self.filter {
            FilterState::Fixed(Some(pattern)) => Some(pattern),
            _ => None,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Snapshot size, ignoring the filter.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn seek_match(&mut self) {
        let pattern: Option<&str> = self.filter().filter(|p| !is_match_all(p));
        let Some(pattern) = pattern else {
            return;
        };
        let skipped: usize = self.entries[self.cursor..]
            .iter()
            .take_while(|entry| !prj_file_name_match(&entry.name, pattern))
            .count();
        self.cursor += skipped;
    }
}

/// Collation order, with an ordinal tie-break so equal-collating names
/// still sort deterministically.
fn collate(a: &str, b: &str) -> Ordering {
    prj_file_name_compare(a, b).then_with(|| a.cmp(b))
}
