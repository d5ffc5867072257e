//! Undo log for tracking the changes of an open transaction.
//!
//! Writes are applied to the graph immediately (read-your-writes); the log
//! remembers how to reverse each one. Aborting replays it newest first, and
//! an empty log at commit means the transaction changed nothing.

use graft_core::{Uid, Value};

/// One reversible change.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoEntry {
    /// An object was added to the graph (created or merged in).
    Created(Uid),
    /// A live object was terminated.
    Terminated(Uid),
    /// An attribute value was replaced.
    Assigned { uid: Uid, previous: Option<Value> },
    /// A tag was pointed at a new object.
    Tagged { tag: String, previous: Option<Uid> },
}

/// Log of changes made by the open transaction.
#[derive(Debug, Clone, Default)]
pub struct UndoLog {
    entries: Vec<UndoEntry>,
}

impl UndoLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_created(&mut self, uid: Uid) {
        self.entries.push(UndoEntry::Created(uid));
    }

    pub fn track_terminated(&mut self, uid: Uid) {
        self.entries.push(UndoEntry::Terminated(uid));
    }

    pub fn track_assigned(&mut self, uid: Uid, previous: Option<Value>) {
        self.entries.push(UndoEntry::Assigned { uid, previous });
    }

    pub fn track_tagged(&mut self, tag: &str, previous: Option<Uid>) {
        self.entries.push(UndoEntry::Tagged {
            tag: tag.to_string(),
            previous,
        });
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Take all entries, newest first, leaving the log empty.
    pub fn drain_newest_first(&mut self) -> impl Iterator<Item = UndoEntry> {
        let mut entries = std::mem::take(&mut self.entries);
        entries.reverse();
        entries.into_iter()
    }

    /// Forget all entries (after commit).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
