#![forbid(unsafe_code)]

//! View tree: the user-facing widget objects links are declared against.
//!
//! A [`View`] owns its children (the tree is acyclic by construction) and a
//! table of rendered models keyed by root-model identity, one entry per
//! document the view is rendered into. The rename map translates view-level
//! property names to model-level ones; the link resolver applies it to
//! single-segment property paths when computing specs.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;

use crate::ids::ObjectId;
use crate::model::Model;

struct ViewInner {
    kind: String,
    id: ObjectId,
    children: Vec<View>,
    rename: AHashMap<String, String>,
    models: AHashMap<ObjectId, Model>,
}

/// A node in the view tree. Cloning shares the underlying view.
pub struct View {
    inner: Rc<RefCell<ViewInner>>,
}

impl Clone for View {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("View")
            .field("kind", &inner.kind)
            .field("id", &inner.id)
            .field("children", &inner.children.len())
            .finish()
    }
}

impl View {
    #[must_use]
    pub fn new(kind: &str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ViewInner {
                kind: kind.to_string(),
                id: ObjectId::next(),
                children: Vec::new(),
                rename: AHashMap::new(),
                models: AHashMap::new(),
            })),
        }
    }

    #[must_use]
    pub fn kind(&self) -> String {
        self.inner.borrow().kind.clone()
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.inner.borrow().id
    }

    pub fn add_child(&self, child: View) {
        self.inner.borrow_mut().children.push(child);
    }

    #[must_use]
    pub fn children(&self) -> Vec<View> {
        self.inner.borrow().children.clone()
    }

    /// Pre-order traversal of this view and its descendants, self included.
    #[must_use]
    pub fn select(&self, predicate: impl Fn(&View) -> bool) -> Vec<View> {
        let mut out = Vec::new();
        self.collect(&predicate, &mut out);
        out
    }

    fn collect(&self, predicate: &dyn Fn(&View) -> bool, out: &mut Vec<View>) {
        if predicate(self) {
            out.push(self.clone());
        }
        let children = self.children();
        for child in children {
            child.collect(predicate, out);
        }
    }

    /// Record the rendered model for this view under the given root identity.
    pub fn set_model(&self, root: ObjectId, model: Model) {
        self.inner.borrow_mut().models.insert(root, model);
    }

    /// The rendered model registered under the given root identity, if the
    /// view has been rendered into that document.
    #[must_use]
    pub fn model_for(&self, root: ObjectId) -> Option<Model> {
        self.inner.borrow().models.get(&root).cloned()
    }

    /// Map a view-level property name to a model-level one.
    pub fn set_rename(&self, view_name: &str, model_name: &str) {
        self.inner
            .borrow_mut()
            .rename
            .insert(view_name.to_string(), model_name.to_string());
    }

    /// The model-level name for `name`, or `name` itself when unmapped.
    #[must_use]
    pub fn rename_to(&self, name: &str) -> String {
        self.inner
            .borrow()
            .rename
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakView {
        WeakView {
            id: self.id(),
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Weak handle to a [`View`].
#[derive(Debug, Clone)]
pub struct WeakView {
    id: ObjectId,
    inner: Weak<RefCell<ViewInner>>,
}

impl WeakView {
    /// Identity of the referenced view, available even after it died.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn upgrade(&self) -> Option<View> {
        self.inner.upgrade().map(|inner| View { inner })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_is_preorder_self_included() {
        let root = View::new("column");
        let a = View::new("slider");
        let b = View::new("row");
        let c = View::new("text");
        b.add_child(c.clone());
        root.add_child(a.clone());
        root.add_child(b.clone());

        let all = root.select(|_| true);
        assert_eq!(all, vec![root.clone(), a, b, c]);

        let sliders = root.select(|v| v.kind() == "slider");
        assert_eq!(sliders.len(), 1);
    }

    #[test]
    fn model_table_is_per_root() {
        let view = View::new("slider");
        let root_a = Model::new("doc_a");
        let root_b = Model::new("doc_b");
        let rendered = Model::new("slider");
        view.set_model(root_a.ref_id(), rendered.clone());

        assert_eq!(view.model_for(root_a.ref_id()).unwrap(), rendered);
        assert!(view.model_for(root_b.ref_id()).is_none());
    }

    #[test]
    fn rename_defaults_to_identity() {
        let view = View::new("slider");
        view.set_rename("value", "value_throttled");
        assert_eq!(view.rename_to("value"), "value_throttled");
        assert_eq!(view.rename_to("start"), "start");
    }

    #[test]
    fn weak_view_upgrade() {
        let view = View::new("slider");
        let weak = view.downgrade();
        assert_eq!(weak.id(), view.id());
        assert!(weak.upgrade().is_some());
        drop(view);
        assert!(weak.upgrade().is_none());
    }
}
