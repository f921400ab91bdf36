#![forbid(unsafe_code)]

//! Resolvable references: the object kinds that can participate in linking.
//!
//! Link endpoints are heterogeneous: view-tree nodes, rendered models,
//! abstract plot elements, and concrete element plots. [`Endpoint`] is the
//! tagged union the resolver matches on; [`WeakEndpoint`] is the form link
//! declarations hold, so the registry never extends an endpoint's lifetime.

use trellis_model::{Model, ObjectId, Value, View, WeakModel, WeakView};

use crate::plugin::{ElementHandle, ElementPlot, WeakPlot};

/// A live object acting as a link source, target, or argument.
#[derive(Debug, Clone)]
pub enum Endpoint {
    View(View),
    Model(Model),
    Element(ElementHandle),
    Plot(ElementPlot),
}

impl Endpoint {
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            Endpoint::View(view) => view.id(),
            Endpoint::Model(model) => model.ref_id(),
            Endpoint::Element(element) => element.id(),
            Endpoint::Plot(plot) => plot.id(),
        }
    }

    /// Short kind name for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Endpoint::View(_) => "view",
            Endpoint::Model(_) => "model",
            Endpoint::Element(_) => "element",
            Endpoint::Plot(_) => "plot",
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakEndpoint {
        match self {
            Endpoint::View(view) => WeakEndpoint::View(view.downgrade()),
            Endpoint::Model(model) => WeakEndpoint::Model(model.downgrade()),
            Endpoint::Element(element) => WeakEndpoint::Element(element.clone()),
            Endpoint::Plot(plot) => WeakEndpoint::Plot(plot.downgrade()),
        }
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.id() == other.id()
    }
}

impl From<View> for Endpoint {
    fn from(view: View) -> Self {
        Endpoint::View(view)
    }
}

impl From<&View> for Endpoint {
    fn from(view: &View) -> Self {
        Endpoint::View(view.clone())
    }
}

impl From<Model> for Endpoint {
    fn from(model: Model) -> Self {
        Endpoint::Model(model)
    }
}

impl From<&Model> for Endpoint {
    fn from(model: &Model) -> Self {
        Endpoint::Model(model.clone())
    }
}

impl From<ElementHandle> for Endpoint {
    fn from(element: ElementHandle) -> Self {
        Endpoint::Element(element)
    }
}

impl From<&ElementHandle> for Endpoint {
    fn from(element: &ElementHandle) -> Self {
        Endpoint::Element(element.clone())
    }
}

impl From<ElementPlot> for Endpoint {
    fn from(plot: ElementPlot) -> Self {
        Endpoint::Plot(plot)
    }
}

/// Weak counterpart of [`Endpoint`].
///
/// `View`, `Model`, and `Plot` are held through weak handles: a dead upgrade
/// means the endpoint is gone. `Element` handles are plain values and always
/// upgrade.
#[derive(Debug, Clone)]
pub enum WeakEndpoint {
    View(WeakView),
    Model(WeakModel),
    Element(ElementHandle),
    Plot(WeakPlot),
}

impl WeakEndpoint {
    /// Identity of the referenced object, available even after it died.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            WeakEndpoint::View(view) => view.id(),
            WeakEndpoint::Model(model) => model.id(),
            WeakEndpoint::Element(element) => element.id(),
            WeakEndpoint::Plot(plot) => plot.id(),
        }
    }

    #[must_use]
    pub fn upgrade(&self) -> Option<Endpoint> {
        match self {
            WeakEndpoint::View(view) => view.upgrade().map(Endpoint::View),
            WeakEndpoint::Model(model) => model.upgrade().map(Endpoint::Model),
            WeakEndpoint::Element(element) => Some(Endpoint::Element(element.clone())),
            WeakEndpoint::Plot(plot) => plot.upgrade().map(Endpoint::Plot),
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.upgrade().is_some()
    }
}

/// Value of a callback's `args` map.
///
/// Objects resolve like source and target at emission time; literals pass
/// through into the emitted reference map unchanged.
#[derive(Debug, Clone)]
pub enum Arg {
    Object(Endpoint),
    Literal(Value),
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Arg::Object(a), Arg::Object(b)) => a == b,
            (Arg::Literal(a), Arg::Literal(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Endpoint> for Arg {
    fn from(endpoint: Endpoint) -> Self {
        Arg::Object(endpoint)
    }
}

impl From<View> for Arg {
    fn from(view: View) -> Self {
        Arg::Object(Endpoint::View(view))
    }
}

impl From<&View> for Arg {
    fn from(view: &View) -> Self {
        Arg::Object(Endpoint::View(view.clone()))
    }
}

impl From<Model> for Arg {
    fn from(model: Model) -> Self {
        Arg::Object(Endpoint::Model(model))
    }
}

impl From<&Model> for Arg {
    fn from(model: &Model) -> Self {
        Arg::Object(Endpoint::Model(model.clone()))
    }
}

impl From<ElementHandle> for Arg {
    fn from(element: ElementHandle) -> Self {
        Arg::Object(Endpoint::Element(element))
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Literal(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Literal(Value::Bool(value))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Literal(Value::Int(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Literal(Value::Float(value))
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Literal(Value::Str(value.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
