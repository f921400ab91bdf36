#![forbid(unsafe_code)]

//! Rendered models: the per-document objects links resolve to and fire on.
//!
//! # Design
//!
//! [`Model`] is a cheap handle over `Rc<RefCell<..>>` shared state; cloning a
//! handle shares the underlying model. A model carries declared properties
//! with current values, named sub-models for attribute drill-down (a plot's
//! `"x_range"`), and ordered callback lists keyed by property name and by
//! event name. [`WeakModel`] observes a model without extending its lifetime.
//!
//! # Invariants
//!
//! 1. `set` with a value equal to the current one is a no-op returning
//!    `Ok(false)`: no store, no callback firing. This is the loop guard that
//!    terminates bidirectional property bridges.
//! 2. Property-change and event callbacks fire in registration order.
//! 3. Callbacks fire after the interior borrow is released; a callback may
//!    re-enter `set` on the same model.
//! 4. `select` visits the sub-model graph pre-order and yields each model at
//!    most once.
//!
//! # Failure Modes
//!
//! - **Bridge validation failure**: a [`CallbackBody::Bridge`] whose target
//!   rejects the value logs a warning and skips the assignment. The failure
//!   never propagates to the caller that triggered the source change.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashSet;

use crate::error::ModelError;
use crate::ids::ObjectId;
use crate::value::{Property, PropertyType, Value};

struct PropertySlot {
    descriptor: Property,
    value: Value,
}

struct ModelInner {
    kind: String,
    ref_id: ObjectId,
    properties: BTreeMap<String, PropertySlot>,
    subs: BTreeMap<String, Model>,
    change_callbacks: BTreeMap<String, Vec<Rc<ModelCallback>>>,
    event_callbacks: BTreeMap<String, Vec<Rc<ModelCallback>>>,
}

/// A rendered model: the concrete per-document representation of a view.
///
/// Cloning a `Model` creates a new handle to the **same** shared state.
pub struct Model {
    inner: Rc<RefCell<ModelInner>>,
}

impl Clone for Model {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Model")
            .field("kind", &inner.kind)
            .field("ref_id", &inner.ref_id)
            .field("properties", &inner.properties.len())
            .field("subs", &inner.subs.len())
            .finish()
    }
}

impl Model {
    #[must_use]
    pub fn new(kind: &str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ModelInner {
                kind: kind.to_string(),
                ref_id: ObjectId::next(),
                properties: BTreeMap::new(),
                subs: BTreeMap::new(),
                change_callbacks: BTreeMap::new(),
                event_callbacks: BTreeMap::new(),
            })),
        }
    }

    /// Model type name.
    #[must_use]
    pub fn kind(&self) -> String {
        self.inner.borrow().kind.clone()
    }

    /// Stable per-document identity.
    #[must_use]
    pub fn ref_id(&self) -> ObjectId {
        self.inner.borrow().ref_id
    }

    /// Declare a property with the given type and default value.
    pub fn define(&self, name: &str, ty: PropertyType, default: impl Into<Value>) {
        let default = default.into();
        self.inner.borrow_mut().properties.insert(
            name.to_string(),
            PropertySlot {
                value: default.clone(),
                descriptor: Property::new(ty, default),
            },
        );
    }

    /// Declare a property with a custom validator consulted after the type
    /// check.
    pub fn define_with(
        &self,
        name: &str,
        ty: PropertyType,
        default: impl Into<Value>,
        validator: impl Fn(&Value) -> Result<(), String> + 'static,
    ) {
        let default = default.into();
        self.inner.borrow_mut().properties.insert(
            name.to_string(),
            PropertySlot {
                value: default.clone(),
                descriptor: Property::new(ty, default).with_validator(validator),
            },
        );
    }

    /// Current value of a property.
    pub fn get(&self, name: &str) -> Result<Value, ModelError> {
        let inner = self.inner.borrow();
        inner
            .properties
            .get(name)
            .map(|slot| slot.value.clone())
            .ok_or_else(|| ModelError::UnknownProperty {
                model: inner.kind.clone(),
                property: name.to_string(),
            })
    }

    /// Assign a property, firing its change callbacks on success.
    ///
    /// Returns `Ok(false)` without storing or firing when the new value
    /// equals the current one.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<bool, ModelError> {
        let value = value.into();
        let to_fire = {
            let mut inner = self.inner.borrow_mut();
            let model_kind = inner.kind.clone();
            let Some(slot) = inner.properties.get_mut(name) else {
                return Err(ModelError::UnknownProperty {
                    model: model_kind,
                    property: name.to_string(),
                });
            };
            if !slot.descriptor.ty().check(&value) {
                return Err(ModelError::TypeMismatch {
                    property: name.to_string(),
                    expected: slot.descriptor.ty(),
                    got: value.kind(),
                });
            }
            if let Some(validator) = slot.descriptor.validator() {
                validator(&value).map_err(|reason| ModelError::ValidationFailed {
                    property: name.to_string(),
                    reason,
                })?;
            }
            if slot.value == value {
                return Ok(false);
            }
            slot.value = value;
            inner.change_callbacks.get(name).cloned().unwrap_or_default()
        };
        for callback in &to_fire {
            callback.fire();
        }
        Ok(true)
    }

    /// Fire the named event's callbacks.
    pub fn trigger(&self, event: &str) {
        let to_fire = {
            let inner = self.inner.borrow();
            inner.event_callbacks.get(event).cloned().unwrap_or_default()
        };
        for callback in &to_fire {
            callback.fire();
        }
    }

    /// Subscribe a callback to changes of the named property.
    pub fn on_change(&self, property: &str, callback: Rc<ModelCallback>) {
        self.inner
            .borrow_mut()
            .change_callbacks
            .entry(property.to_string())
            .or_default()
            .push(callback);
    }

    /// Subscribe a callback to the named event.
    pub fn on_event(&self, event: &str, callback: Rc<ModelCallback>) {
        self.inner
            .borrow_mut()
            .event_callbacks
            .entry(event.to_string())
            .or_default()
            .push(callback);
    }

    /// Snapshot of the callbacks attached to the named property.
    #[must_use]
    pub fn change_callbacks(&self, property: &str) -> Vec<Rc<ModelCallback>> {
        self.inner
            .borrow()
            .change_callbacks
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn change_callback_count(&self, property: &str) -> usize {
        self.inner
            .borrow()
            .change_callbacks
            .get(property)
            .map_or(0, Vec::len)
    }

    #[must_use]
    pub fn event_callback_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .event_callbacks
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Whether any property-change callback on this model carries `tag`.
    ///
    /// Event callbacks are not consulted; the dedup guard in the link
    /// resolver probes change subscriptions only.
    #[must_use]
    pub fn has_callback_tag(&self, tag: ObjectId) -> bool {
        self.inner
            .borrow()
            .change_callbacks
            .values()
            .flatten()
            .any(|callback| callback.tags().contains(&tag))
    }

    /// Attach a named sub-model.
    pub fn set_sub(&self, name: &str, model: Model) {
        self.inner.borrow_mut().subs.insert(name.to_string(), model);
    }

    /// Look up a named sub-model.
    #[must_use]
    pub fn sub(&self, name: &str) -> Option<Model> {
        self.inner.borrow().subs.get(name).cloned()
    }

    /// Drill down through named sub-models segment by segment
    /// (`"axis.start"` resolves `subs["axis"].subs["start"]`).
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Option<Model> {
        let mut model = self.clone();
        for segment in path.split('.') {
            model = model.sub(segment)?;
        }
        Some(model)
    }

    /// Pre-order traversal of this model and its sub-model graph, yielding
    /// each model matching `predicate` at most once.
    #[must_use]
    pub fn select(&self, predicate: impl Fn(&Model) -> bool) -> Vec<Model> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        self.collect(&predicate, &mut seen, &mut out);
        out
    }

    fn collect(
        &self,
        predicate: &dyn Fn(&Model) -> bool,
        seen: &mut AHashSet<ObjectId>,
        out: &mut Vec<Model>,
    ) {
        if !seen.insert(self.ref_id()) {
            return;
        }
        if predicate(self) {
            out.push(self.clone());
        }
        let subs: Vec<Model> = self.inner.borrow().subs.values().cloned().collect();
        for sub in subs {
            sub.collect(predicate, seen, out);
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakModel {
        WeakModel {
            id: self.ref_id(),
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Weak handle to a [`Model`]; a dead upgrade means the model is gone.
#[derive(Debug, Clone)]
pub struct WeakModel {
    id: ObjectId,
    inner: Weak<RefCell<ModelInner>>,
}

impl WeakModel {
    /// Identity of the referenced model, available even after it died.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn upgrade(&self) -> Option<Model> {
        self.inner.upgrade().map(|inner| Model { inner })
    }
}

/// Value of a [`ModelCallback`]'s argument map.
#[derive(Debug, Clone)]
pub enum CallbackArg {
    Model(Model),
    Value(Value),
}

/// What an emitted callback does when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackBody {
    /// Native property bridge: read `args["source"][source_prop]` and
    /// validated-assign it onto `args["target"][target_prop]`. A rejected
    /// assignment logs a warning and is skipped.
    Bridge {
        source_prop: String,
        target_prop: String,
    },
    /// Opaque snippet owned by the front-end runtime; firing server-side
    /// only logs at debug level.
    Script(String),
}

/// A callback attached to a model's property-change or event lists.
///
/// Tags identify the link declaration that emitted the callback and drive
/// the resolver's idempotent re-resolution guard.
#[derive(Debug)]
pub struct ModelCallback {
    args: BTreeMap<String, CallbackArg>,
    body: CallbackBody,
    tags: Vec<ObjectId>,
}

impl ModelCallback {
    #[must_use]
    pub fn new(args: BTreeMap<String, CallbackArg>, body: CallbackBody) -> Self {
        Self {
            args,
            body,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: ObjectId) -> Self {
        self.tags.push(tag);
        self
    }

    #[must_use]
    pub fn tags(&self) -> &[ObjectId] {
        &self.tags
    }

    #[must_use]
    pub fn args(&self) -> &BTreeMap<String, CallbackArg> {
        &self.args
    }

    #[must_use]
    pub fn body(&self) -> &CallbackBody {
        &self.body
    }

    /// Execute the callback body.
    pub fn fire(&self) {
        match &self.body {
            CallbackBody::Bridge {
                source_prop,
                target_prop,
            } => {
                let (Some(CallbackArg::Model(source)), Some(CallbackArg::Model(target))) =
                    (self.args.get("source"), self.args.get("target"))
                else {
                    tracing::warn!(
                        tags = ?self.tags,
                        "property bridge fired without resolved source and target"
                    );
                    return;
                };
                let value = match source.get(source_prop) {
                    Ok(value) => value,
                    Err(err) => {
                        tracing::warn!(error = %err, "could not read bridge source property");
                        return;
                    }
                };
                if let Err(err) = target.set(target_prop, value) {
                    tracing::warn!(
                        error = %err,
                        property = %target_prop,
                        "could not set property on target, skipping assignment"
                    );
                }
            }
            CallbackBody::Script(code) => {
                tracing::debug!(code = %code, "script callback fired server-side");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
