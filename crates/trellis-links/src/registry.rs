#![forbid(unsafe_code)]

//! Weak-keyed registry of declared callbacks.
//!
//! The registry maps source identity to the ordered list of callbacks
//! declared against that source. Insertion order is emission order during a
//! resolution pass. Sources are held weakly by the callbacks themselves;
//! entries whose source has died are pruned lazily on access and eagerly via
//! [`Registry::prune`], so the registry never extends a source's lifetime.
//!
//! The backing store is a per-thread instance reached through
//! [`Registry::with`]. The resolution pass only reads the registry; only
//! user code mutates it.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use trellis_model::ObjectId;

use crate::callbacks::AnyCallback;

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::new());
}

/// Source-identity keyed store of callback declarations.
pub struct Registry {
    entries: AHashMap<ObjectId, Vec<Rc<dyn AnyCallback>>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }

    /// Run `f` against this thread's registry instance.
    pub fn with<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
        REGISTRY.with(|registry| f(&mut registry.borrow_mut()))
    }

    /// Append `callback` under its source unless an equivalent entry already
    /// exists. Returns whether the callback was appended.
    pub fn register(&mut self, callback: Rc<dyn AnyCallback>) -> bool {
        let entries = self.entries.entry(callback.source_ref().id()).or_default();
        if entries
            .iter()
            .any(|existing| existing.equivalent(callback.as_ref()))
        {
            return false;
        }
        entries.push(callback);
        true
    }

    /// Remove exactly the instance identified by `link_id` from the source's
    /// list, preserving the order of the remaining entries. Returns whether
    /// an entry was removed; absent entries are a silent no-op.
    pub fn unregister(&mut self, source_id: ObjectId, link_id: ObjectId) -> bool {
        let Some(entries) = self.entries.get_mut(&source_id) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|callback| callback.link_id() != link_id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.entries.remove(&source_id);
        }
        removed
    }

    /// The live callbacks registered under `source_id`, in insertion order.
    /// Entries whose source has died are pruned as a side effect.
    pub fn callbacks_for(&mut self, source_id: ObjectId) -> Vec<Rc<dyn AnyCallback>> {
        let Some(entries) = self.entries.get_mut(&source_id) else {
            return Vec::new();
        };
        entries.retain(|callback| callback.source_ref().is_live());
        if entries.is_empty() {
            self.entries.remove(&source_id);
            return Vec::new();
        }
        entries.clone()
    }

    /// Drop every entry whose source has died.
    pub fn prune(&mut self) {
        self.entries.retain(|_, entries| {
            entries.retain(|callback| callback.source_ref().is_live());
            !entries.is_empty()
        });
    }

    /// Number of sources with at least one registered callback.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.entries.len()
    }

    /// Total registered callbacks across all sources.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Remove everything. Test isolation helper.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{Callback, Link};
    use trellis_model::View;

    #[test]
    fn insertion_order_is_preserved() {
        Registry::with(|r| r.clear());
        let source = View::new("slider");
        let target = View::new("plot");
        let ids: Vec<ObjectId> = ["a", "b", "c"]
            .iter()
            .map(|path| {
                Link::builder()
                    .source(&source)
                    .target(&target)
                    .property(path, "text")
                    .build()
                    .unwrap()
                    .link_id()
            })
            .collect();
        let registered: Vec<ObjectId> = Registry::with(|r| r.callbacks_for(source.id()))
            .iter()
            .map(|cb| cb.link_id())
            .collect();
        assert_eq!(registered, ids);
    }

    #[test]
    fn dead_sources_are_pruned_on_access() {
        Registry::with(|r| r.clear());
        let kept = View::new("kept");
        let kept_cb = Callback::builder().source(&kept).build().unwrap();
        let dead_id = {
            let dropped = View::new("dropped");
            Callback::builder().source(&dropped).build().unwrap();
            dropped.id()
        };

        assert!(Registry::with(|r| r.callbacks_for(dead_id)).is_empty());
        assert_eq!(Registry::with(|r| r.source_count()), 1);
        let survivors = Registry::with(|r| r.callbacks_for(kept.id()));
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].link_id(), kept_cb.link_id());
    }

    #[test]
    fn prune_sweeps_every_source() {
        Registry::with(|r| r.clear());
        let kept = View::new("kept");
        let _kept_cb = Callback::builder().source(&kept).build().unwrap();
        {
            let dropped = View::new("dropped");
            Callback::builder().source(&dropped).build().unwrap();
        }
        assert_eq!(Registry::with(|r| r.source_count()), 2);
        Registry::with(|r| r.prune());
        assert_eq!(Registry::with(|r| r.source_count()), 1);
        assert_eq!(Registry::with(|r| r.callback_count()), 1);
    }

    #[test]
    fn unregister_unknown_source_is_noop() {
        Registry::with(|r| r.clear());
        assert!(!Registry::with(|r| r.unregister(ObjectId::next(), ObjectId::next())));
    }
}
