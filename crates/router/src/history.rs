//! History integration.
//!
//! The router is the only listener: every location returned by `push` or `go` is fed to
//! the navigation pipeline by the caller that triggered it.

use std::fmt;

use url::Url;

/// Opaque identity minted by the history layer for each entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocationKey(pub u64);

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc-{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub url: Url,
    pub key: LocationKey,
}

pub trait History {
    fn location(&self) -> &Location;

    /// Appends `url` after the current entry, discarding any forward entries.
    fn push(&mut self, url: Url) -> Location;

    /// Moves `delta` entries through the stack. `None` when that leaves the stack.
    fn go(&mut self, delta: isize) -> Option<Location>;
}

/// In-process history stack. Traversal returns the stored entry, key included.
#[derive(Debug)]
pub struct MemoryHistory {
    entries: Vec<Location>,
    index: usize,
    next_key: u64,
}

impl MemoryHistory {
    pub fn new(initial: Url) -> Self {
        Self {
            entries: vec![Location {
                url: initial,
                key: LocationKey(0),
            }],
            index: 0,
            next_key: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl History for MemoryHistory {
    fn location(&self) -> &Location {
        &self.entries[self.index]
    }

    fn push(&mut self, url: Url) -> Location {
        // record to history (truncate forward branch)
        self.entries.truncate(self.index + 1);
        let location = Location {
            url,
            key: LocationKey(self.next_key),
        };
        self.next_key += 1;
        self.entries.push(location.clone());
        self.index = self.entries.len() - 1;
        location
    }

    fn go(&mut self, delta: isize) -> Option<Location> {
        let target = self.index.checked_add_signed(delta)?;
        if delta == 0 || target >= self.entries.len() {
            return None;
        }
        self.index = target;
        Some(self.entries[target].clone())
    }
}
