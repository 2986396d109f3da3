//! # Circular table: insertion-ordered map with a rotating cursor.
//!
//! The process table behind round-robin selection. Entries are keyed by
//! monotonically assigned [`JobId`]s; a cursor names the current entry and
//! [`rotate`](CircularTable::rotate) advances it to the next-larger key,
//! wrapping to the smallest.
//!
//! ## Rules
//! - Job ids are **never reused**; assignment is strictly increasing
//! - Iteration order is ascending id
//! - [`remove`](CircularTable::remove) rotates **first**, then deletes, so
//!   the cursor never ends up on a just-removed key while entries remain
//! - An empty table (or a cursor left on a gap after the table drained)
//!   simply yields `None` from [`current`](CircularTable::current);
//!   the next rotation re-anchors the cursor

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

/// Key of a table entry, assigned at insertion and valid for one process
/// lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    /// Constructs a job id from its raw value.
    pub fn new(raw: u64) -> Self {
        JobId(raw)
    }

    /// The raw value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Insertion-ordered map with a rotating cursor for round-robin selection.
#[derive(Clone, Debug)]
pub struct CircularTable<V> {
    entries: BTreeMap<JobId, V>,
    cursor: JobId,
    next_id: u64,
}

impl<V> CircularTable<V> {
    /// Creates an empty table with the cursor at id 0.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            cursor: JobId(0),
            next_id: 0,
        }
    }

    /// Inserts `value` under the next id and returns that id.
    ///
    /// The cursor is unchanged.
    pub fn push(&mut self, value: V) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, value);
        id
    }

    /// Returns the entry with `id`, if present.
    pub fn at(&self, id: JobId) -> Option<&V> {
        self.entries.get(&id)
    }

    /// Returns the cursor entry, if the cursor names a present id.
    pub fn current(&self) -> Option<&V> {
        self.entries.get(&self.cursor)
    }

    /// Replaces the cursor entry with `f(entry)`; no-op when the cursor
    /// names no entry.
    pub fn update_current(&mut self, f: impl FnOnce(V) -> V) {
        if let Some(v) = self.entries.remove(&self.cursor) {
            self.entries.insert(self.cursor, f(v));
        }
    }

    /// Advances the cursor to the smallest id strictly greater than it,
    /// wrapping to the smallest id overall. Unchanged when empty.
    pub fn rotate(&mut self) {
        let next = self
            .entries
            .range((Bound::Excluded(self.cursor), Bound::Unbounded))
            .next()
            .map(|(id, _)| *id)
            .or_else(|| self.entries.keys().next().copied());
        if let Some(id) = next {
            self.cursor = id;
        }
    }

    /// Removes the entry with `id`, rotating first so the cursor never
    /// points at the deleted key while other entries remain.
    pub fn remove(&mut self, id: JobId) -> Option<V> {
        if !self.entries.contains_key(&id) {
            return None;
        }
        self.rotate();
        self.entries.remove(&id)
    }

    /// Folds `f` across entries in ascending id order.
    pub fn reduce<A>(&self, init: A, mut f: impl FnMut(A, JobId, &V) -> A) -> A {
        self.entries
            .iter()
            .fold(init, |acc, (id, v)| f(acc, *id, v))
    }

    /// The id the cursor currently names.
    pub fn cursor(&self) -> JobId {
        self.cursor
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for CircularTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
