#![forbid(unsafe_code)]

//! Optional plot-library integration.
//!
//! Some panes wrap a plotting library whose elements are abstract handles
//! until rendered. When a [`PlotBackend`] is installed, the resolution pass
//! expands links whose target or argument values are [`ElementHandle`]s into
//! concrete [`ElementPlot`]s, and merges plot handle tables into emitted
//! callback references. With no backend installed the pass behaves as if
//! this module did not exist.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;

use trellis_model::{Model, ObjectId, View};

/// Abstract visualization-element reference, as user code sees it before
/// any plot is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    id: ObjectId,
    label: String,
}

impl ElementHandle {
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            id: ObjectId::next(),
            label: label.to_string(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

struct PlotInner {
    id: ObjectId,
    state: Model,
    handles: RefCell<BTreeMap<String, Model>>,
}

/// A concrete rendered plot: its state model plus named handle models
/// (glyph renderers, ranges, axes).
pub struct ElementPlot {
    inner: Rc<PlotInner>,
}

impl Clone for ElementPlot {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for ElementPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementPlot")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state)
            .field("handles", &self.inner.handles.borrow().len())
            .finish()
    }
}

impl ElementPlot {
    #[must_use]
    pub fn new(state: Model) -> Self {
        Self {
            inner: Rc::new(PlotInner {
                id: ObjectId::next(),
                state,
                handles: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    /// The plot's top-level state model.
    #[must_use]
    pub fn state(&self) -> Model {
        self.inner.state.clone()
    }

    pub fn set_handle(&self, name: &str, model: Model) {
        self.inner
            .handles
            .borrow_mut()
            .insert(name.to_string(), model);
    }

    #[must_use]
    pub fn handle(&self, name: &str) -> Option<Model> {
        self.inner.handles.borrow().get(name).cloned()
    }

    /// Snapshot of the handle table, in name order.
    #[must_use]
    pub fn handles(&self) -> Vec<(String, Model)> {
        self.inner
            .handles
            .borrow()
            .iter()
            .map(|(name, model)| (name.clone(), model.clone()))
            .collect()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakPlot {
        WeakPlot {
            id: self.id(),
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Weak handle to an [`ElementPlot`].
#[derive(Clone)]
pub struct WeakPlot {
    id: ObjectId,
    inner: Weak<PlotInner>,
}

impl fmt::Debug for WeakPlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPlot").field("id", &self.id).finish()
    }
}

impl WeakPlot {
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn upgrade(&self) -> Option<ElementPlot> {
        self.inner.upgrade().map(|inner| ElementPlot { inner })
    }
}

/// Mapping and lookup surface a plot backend exposes to the resolver.
pub trait PlotBackend {
    /// Element-handle identity to the concrete plots rendered for it under
    /// the given root.
    fn element_map(&self, root_view: &View, root_model: &Model)
    -> AHashMap<ObjectId, Vec<ElementPlot>>;

    /// The plot backing a plot-pane view under the given root, if any.
    fn plot_for(&self, view: &View, root: ObjectId) -> Option<ElementPlot>;
}

thread_local! {
    static PLOT_BACKEND: RefCell<Option<Rc<dyn PlotBackend>>> = const { RefCell::new(None) };
}

/// Install a plot backend for subsequent resolution passes.
pub fn set_plot_backend(backend: Rc<dyn PlotBackend>) {
    PLOT_BACKEND.with(|slot| *slot.borrow_mut() = Some(backend));
}

/// Remove the installed plot backend, if any.
pub fn clear_plot_backend() {
    PLOT_BACKEND.with(|slot| *slot.borrow_mut() = None);
}

/// Run `f` against the installed backend; `None` when no backend is
/// installed.
pub fn with_plot_backend<R>(f: impl FnOnce(&dyn PlotBackend) -> R) -> Option<R> {
    PLOT_BACKEND.with(|slot| slot.borrow().as_ref().map(|backend| f(backend.as_ref())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
