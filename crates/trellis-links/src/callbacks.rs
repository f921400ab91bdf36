#![forbid(unsafe_code)]

//! Link and callback declarations.
//!
//! A [`Callback`] declares "when a property changes on the source, run this
//! code". A [`Link`] additionally names a target the effect applies to.
//! Declarations are built once by user code, register themselves in the
//! process-wide [`Registry`] on `build()`, and stay registered for the
//! lifetime of their source. They are re-resolved fresh on every render
//! pass; no per-render state survives on the declaration itself.
//!
//! # Invariants
//!
//! 1. A builder missing its source fails with
//!    [`LinkError::MissingSource`] before any registry mutation; a
//!    target-requiring builder missing its target fails with
//!    [`LinkError::MissingTarget`] the same way.
//! 2. Registration is idempotent: an equivalent declaration (same concrete
//!    type, same source, same target, equal parameters) is a no-op.
//! 3. `unlink` removes exactly this instance and preserves the order of the
//!    remaining entries; unlinking an absent instance is a silent no-op.

use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;

use trellis_model::ObjectId;

use crate::endpoint::{Arg, Endpoint, WeakEndpoint};
use crate::error::LinkError;
use crate::registry::Registry;

/// Object-safe surface shared by every link and callback declaration.
///
/// Implementations live in the [`Registry`] keyed by source identity and are
/// emitted by the generator registered for their concrete type via
/// [`register_callback`](crate::generator::register_callback).
pub trait AnyCallback: 'static {
    /// Concrete type access for generators and equivalence checks.
    fn as_any(&self) -> &dyn Any;

    /// Stable per-instance identity; doubles as the emitted-callback dedup
    /// tag.
    fn link_id(&self) -> ObjectId;

    /// Type name for diagnostics.
    fn kind(&self) -> &'static str;

    /// The weakly held source.
    fn source_ref(&self) -> &WeakEndpoint;

    /// The weakly held target, for instances that carry one.
    fn target_ref(&self) -> Option<&WeakEndpoint> {
        None
    }

    /// Whether this declaration type carries a target field at all.
    fn defines_target(&self) -> bool {
        false
    }

    /// Whether resolution must find a live target in the linkable set.
    fn requires_target(&self) -> bool {
        false
    }

    /// Upgraded source; absent once the source has been destroyed.
    fn source(&self) -> Option<Endpoint> {
        self.source_ref().upgrade()
    }

    /// Upgraded target.
    fn target(&self) -> Option<Endpoint> {
        self.target_ref().and_then(WeakEndpoint::upgrade)
    }

    /// Named objects and literals made available to the emitted code.
    fn args(&self) -> &BTreeMap<String, Arg>;

    /// Source-property-path to code-snippet entries.
    fn code(&self) -> &BTreeMap<String, String>;

    /// Equivalence for idempotent registration: same concrete type, same
    /// source, same target, equal non-identity parameters.
    fn equivalent(&self, other: &dyn AnyCallback) -> bool;
}

/// A declaration running an arbitrary code snippet when a source property
/// changes.
#[derive(Debug)]
pub struct Callback {
    id: ObjectId,
    source: WeakEndpoint,
    args: BTreeMap<String, Arg>,
    code: BTreeMap<String, String>,
}

impl Callback {
    #[must_use]
    pub fn builder() -> CallbackBuilder {
        CallbackBuilder::default()
    }

    /// Register this callback; a no-op when an equivalent one is already
    /// registered for the source.
    pub fn init(self: &Rc<Self>) {
        Registry::with(|registry| registry.register(Rc::clone(self) as Rc<dyn AnyCallback>));
    }

    /// Alias of [`Callback::init`].
    pub fn link(self: &Rc<Self>) {
        self.init();
    }

    /// Remove exactly this instance from the registry. Returns whether an
    /// entry was removed; removing an absent instance is a silent no-op.
    pub fn unlink(&self) -> bool {
        Registry::with(|registry| registry.unregister(self.source.id(), self.id))
    }
}

impl AnyCallback for Callback {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn link_id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "Callback"
    }

    fn source_ref(&self) -> &WeakEndpoint {
        &self.source
    }

    fn args(&self) -> &BTreeMap<String, Arg> {
        &self.args
    }

    fn code(&self) -> &BTreeMap<String, String> {
        &self.code
    }

    fn equivalent(&self, other: &dyn AnyCallback) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Callback>() else {
            return false;
        };
        self.source.id() == other.source.id()
            && self.args == other.args
            && self.code == other.code
    }
}

/// Builder for [`Callback`]. `build` registers the declaration.
#[derive(Default)]
pub struct CallbackBuilder {
    source: Option<Endpoint>,
    args: BTreeMap<String, Arg>,
    code: BTreeMap<String, String>,
}

impl CallbackBuilder {
    #[must_use]
    pub fn source(mut self, source: impl Into<Endpoint>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn arg(mut self, name: &str, value: impl Into<Arg>) -> Self {
        self.args.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn code(mut self, source_path: &str, snippet: &str) -> Self {
        self.code
            .insert(source_path.to_string(), snippet.to_string());
        self
    }

    /// Build and register. Fails before any registry mutation when no source
    /// was supplied.
    pub fn build(self) -> Result<Rc<Callback>, LinkError> {
        let Some(source) = self.source else {
            return Err(LinkError::MissingSource { kind: "Callback" });
        };
        let callback = Rc::new(Callback {
            id: ObjectId::next(),
            source: source.downgrade(),
            args: self.args,
            code: self.code,
        });
        callback.init();
        Ok(callback)
    }
}

/// A declaration connecting a source property to an effect on a target.
///
/// With `properties` set and no `code`, each source-path to target-path pair
/// becomes a property bridge. When `code` is also set it takes precedence
/// and `properties` is ignored for spec generation.
#[derive(Debug)]
pub struct Link {
    id: ObjectId,
    source: WeakEndpoint,
    target: WeakEndpoint,
    args: BTreeMap<String, Arg>,
    code: BTreeMap<String, String>,
    properties: BTreeMap<String, String>,
}

impl Link {
    #[must_use]
    pub fn builder() -> LinkBuilder {
        LinkBuilder::default()
    }

    /// Source-path to target-path pairs used when no explicit code is given.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Register this link; a no-op when an equivalent one is already
    /// registered for the source.
    pub fn init(self: &Rc<Self>) {
        Registry::with(|registry| registry.register(Rc::clone(self) as Rc<dyn AnyCallback>));
    }

    /// Alias of [`Link::init`].
    pub fn link(self: &Rc<Self>) {
        self.init();
    }

    /// Remove exactly this instance from the registry. Returns whether an
    /// entry was removed; removing an absent instance is a silent no-op.
    pub fn unlink(&self) -> bool {
        Registry::with(|registry| registry.unregister(self.source.id(), self.id))
    }
}

impl AnyCallback for Link {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn link_id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "Link"
    }

    fn source_ref(&self) -> &WeakEndpoint {
        &self.source
    }

    fn target_ref(&self) -> Option<&WeakEndpoint> {
        Some(&self.target)
    }

    fn defines_target(&self) -> bool {
        true
    }

    fn requires_target(&self) -> bool {
        true
    }

    fn args(&self) -> &BTreeMap<String, Arg> {
        &self.args
    }

    fn code(&self) -> &BTreeMap<String, String> {
        &self.code
    }

    fn equivalent(&self, other: &dyn AnyCallback) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Link>() else {
            return false;
        };
        self.source.id() == other.source.id()
            && self.target.id() == other.target.id()
            && self.args == other.args
            && self.code == other.code
            && self.properties == other.properties
    }
}

/// Builder for [`Link`]. `build` registers the declaration.
#[derive(Default)]
pub struct LinkBuilder {
    source: Option<Endpoint>,
    target: Option<Endpoint>,
    args: BTreeMap<String, Arg>,
    code: BTreeMap<String, String>,
    properties: BTreeMap<String, String>,
}

impl LinkBuilder {
    #[must_use]
    pub fn source(mut self, source: impl Into<Endpoint>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<Endpoint>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn arg(mut self, name: &str, value: impl Into<Arg>) -> Self {
        self.args.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn code(mut self, source_path: &str, snippet: &str) -> Self {
        self.code
            .insert(source_path.to_string(), snippet.to_string());
        self
    }

    #[must_use]
    pub fn property(mut self, source_path: &str, target_path: &str) -> Self {
        self.properties
            .insert(source_path.to_string(), target_path.to_string());
        self
    }

    /// Build and register. Fails before any registry mutation when the
    /// source or the target is missing.
    pub fn build(self) -> Result<Rc<Link>, LinkError> {
        let Some(source) = self.source else {
            return Err(LinkError::MissingSource { kind: "Link" });
        };
        let Some(target) = self.target else {
            return Err(LinkError::MissingTarget { kind: "Link" });
        };
        let link = Rc::new(Link {
            id: ObjectId::next(),
            source: source.downgrade(),
            target: target.downgrade(),
            args: self.args,
            code: self.code,
            properties: self.properties,
        });
        link.init();
        Ok(link)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
