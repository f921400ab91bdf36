#![forbid(unsafe_code)]

//! Stable per-process object identities.
//!
//! Every participant in link resolution — rendered models, views, plot
//! handles, and link declarations themselves — carries an [`ObjectId`].
//! Identities are allocated from a thread-local counter, are unique within a
//! thread, and are never reused for the lifetime of the process. Registry
//! keys and deduplication tags are derived from them.

use std::cell::Cell;

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Opaque, stable identity for models, views, plot handles, and links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocate a fresh identity.
    #[must_use]
    pub fn next() -> Self {
        NEXT_ID.with(|counter| {
            let id = counter.get();
            counter.set(id + 1);
            ObjectId(id)
        })
    }

    /// Raw numeric form, for logging and callback tags.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
