#![forbid(unsafe_code)]

//! Resolution pass and callback emission.
//!
//! # Design
//!
//! Once per render pass, [`process_callbacks`] walks the registry against
//! the concrete object graph:
//!
//! 1. Compute the linkable set: every view reachable from the root view plus
//!    every model reachable from the root model, in stable pre-order.
//! 2. Collect `(callback, source, target)` triples for registered callbacks
//!    whose target requirement is satisfied within the linkable set.
//! 3. Expand through the installed plot backend, when one is present:
//!    element-handle targets become one triple per concrete plot, and
//!    element-handle argument values become per-link argument overrides.
//!    This step only adds triples.
//! 4. Look up the generator registered for each callback's concrete type and
//!    bind the triple, emitting tagged [`ModelCallback`]s onto the resolved
//!    source model.
//!
//! # Invariants
//!
//! 1. An absent root model is a no-op: the registry is never read.
//! 2. The pass never mutates the registry.
//! 3. Re-running the pass on an unchanged root attaches nothing new: a
//!    source model already carrying a callback tagged with the link's
//!    identity is skipped.
//! 4. A failing triple is recorded on its [`BoundCallback`] and does not
//!    disturb other triples; only a missing generator aborts the pass.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use trellis_model::{CallbackArg, CallbackBody, Document, Model, ModelCallback, ObjectId, View};

use crate::callbacks::{AnyCallback, Callback, Link};
use crate::endpoint::{Arg, Endpoint};
use crate::error::LinkError;
use crate::js::{PropertyLinkGenerator, ScriptGenerator};
use crate::plugin;
use crate::registry::Registry;

/// A property path split on its last segment: `"axis.start"` becomes prefix
/// `"axis"`, leaf `"start"`. The prefix addresses a nested sub-object; the
/// leaf names the property on it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropSpec {
    pub prefix: Option<String>,
    pub leaf: Option<String>,
}

impl PropSpec {
    #[must_use]
    pub fn parse(path: &str) -> Self {
        match path.rsplit_once('.') {
            Some((prefix, leaf)) => Self {
                prefix: Some(prefix.to_string()),
                leaf: Some(leaf.to_string()),
            },
            None => Self {
                prefix: None,
                leaf: Some(path.to_string()),
            },
        }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self {
            prefix: None,
            leaf: None,
        }
    }
}

/// One `(source spec, target spec, code)` triple a declaration expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleSpec {
    pub source: PropSpec,
    pub target: PropSpec,
    pub code: Option<String>,
}

/// Strategy emitting callbacks for one declaration type.
///
/// The driver calls the hooks in a fixed order per triple: resolve and
/// dedup-check the source model, build the reference map, merge plot
/// handles, `initialize_models`, `process_references`, derive the body, and
/// attach the emitted callback on every trigger.
pub trait CallbackGenerator {
    /// Subtype-specific precondition checks. Failures abort the pass.
    fn validate(&self, _link: &Rc<dyn AnyCallback>) -> Result<(), LinkError> {
        Ok(())
    }

    /// The triples this declaration expands to.
    fn specs(
        &self,
        link: &Rc<dyn AnyCallback>,
        source: &Endpoint,
        target: Option<&Endpoint>,
    ) -> Vec<TripleSpec>;

    /// Property-change names and event names that fire the emitted callback.
    fn triggers(
        &self,
        link: &Rc<dyn AnyCallback>,
        src_spec: &PropSpec,
    ) -> (Vec<String>, Vec<String>);

    /// One-time synchronization between the resolved source and target
    /// models. Failures abort this triple only.
    fn initialize_models(
        &self,
        _link: &Rc<dyn AnyCallback>,
        _src_model: &Model,
        _src_leaf: Option<&str>,
        _target: Option<&Endpoint>,
        _tgt_model: Option<&Model>,
        _tgt_leaf: Option<&str>,
    ) -> Result<(), LinkError> {
        Ok(())
    }

    /// In-place post-processing of the emitted reference map.
    fn process_references(&self, _references: &mut BTreeMap<String, CallbackArg>) {}

    /// Derived body for triples that carry no explicit code.
    fn body(&self, link: &Rc<dyn AnyCallback>, triple: &TripleSpec) -> CallbackBody;
}

thread_local! {
    static GENERATORS: RefCell<AHashMap<TypeId, Rc<dyn CallbackGenerator>>> =
        RefCell::new(shipped_generators());
}

fn shipped_generators() -> AHashMap<TypeId, Rc<dyn CallbackGenerator>> {
    let mut table: AHashMap<TypeId, Rc<dyn CallbackGenerator>> = AHashMap::new();
    table.insert(TypeId::of::<Callback>(), Rc::new(ScriptGenerator));
    table.insert(TypeId::of::<Link>(), Rc::new(PropertyLinkGenerator));
    table
}

/// Register the generator responsible for emitting callbacks of type `C`.
///
/// Must be called once per declaration type before the first resolution
/// pass that encounters it; the shipped [`Callback`] and [`Link`] types are
/// pre-registered.
pub fn register_callback<C: AnyCallback>(generator: Rc<dyn CallbackGenerator>) {
    GENERATORS.with(|table| {
        table.borrow_mut().insert(TypeId::of::<C>(), generator);
    });
}

fn generator_for(callback: &Rc<dyn AnyCallback>) -> Option<Rc<dyn CallbackGenerator>> {
    GENERATORS.with(|table| table.borrow().get(&callback.as_any().type_id()).cloned())
}

/// Outcome of binding one callback's triples against a root model.
#[derive(Debug)]
pub struct BoundCallback {
    link_id: ObjectId,
    kind: &'static str,
    emitted: usize,
    skipped: usize,
    failures: Vec<LinkError>,
}

impl BoundCallback {
    #[must_use]
    pub fn link_id(&self) -> ObjectId {
        self.link_id
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Callbacks attached to the model graph by this binding.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Triples skipped by the dedup guard.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Per-triple failures; the other triples were still bound.
    #[must_use]
    pub fn failures(&self) -> &[LinkError] {
        &self.failures
    }
}

/// Resolve a model given an endpoint and an optional dotted path.
///
/// Plots resolve to their state model, or through their named-handle table
/// when a path is given (first segment names the handle, the remainder
/// drills down). Views resolve to the rendered model registered under the
/// root's identity. Models resolve to themselves. Abstract element handles
/// never resolve. Any remaining path drills down through named sub-models.
#[must_use]
pub fn resolve_model(root: &Model, obj: &Endpoint, path: Option<&str>) -> Option<Model> {
    let (model, rest) = match obj {
        Endpoint::Plot(plot) => match path {
            None => return Some(plot.state()),
            Some(path) => match path.split_once('.') {
                Some((handle, rest)) => (plot.handle(handle)?, Some(rest)),
                None => (plot.handle(path)?, None),
            },
        },
        Endpoint::View(view) => (view.model_for(root.ref_id())?, path),
        Endpoint::Model(model) => (model.clone(), path),
        Endpoint::Element(_) => return None,
    };
    match rest {
        Some(rest) => model.resolve_path(rest),
        None => Some(model),
    }
}

enum TripleOutcome {
    Emitted,
    Skipped,
}

fn bind_triple(
    root_model: &Model,
    link: &Rc<dyn AnyCallback>,
    source: &Endpoint,
    target: Option<&Endpoint>,
    overrides: &BTreeMap<String, Endpoint>,
    generator: &Rc<dyn CallbackGenerator>,
    triple: &TripleSpec,
) -> Result<TripleOutcome, LinkError> {
    let Some(src_model) = resolve_model(root_model, source, triple.source.prefix.as_deref())
    else {
        return Err(LinkError::UnresolvedModel {
            kind: link.kind(),
            path: triple.source.prefix.clone().unwrap_or_default(),
        });
    };

    // Idempotent re-resolution: a model already carrying this link's tag was
    // bound by an earlier pass (or an earlier triple of this one).
    if src_model.has_callback_tag(link.link_id()) {
        return Ok(TripleOutcome::Skipped);
    }

    let mut references: BTreeMap<String, CallbackArg> = BTreeMap::new();
    references.insert("source".to_string(), CallbackArg::Model(src_model.clone()));
    references.insert("cb_obj".to_string(), CallbackArg::Model(src_model.clone()));

    let mut tgt_model = None;
    if link.requires_target() {
        if let Some(target) = target {
            tgt_model = resolve_model(root_model, target, triple.target.prefix.as_deref());
            if let Some(model) = &tgt_model {
                references.insert("target".to_string(), CallbackArg::Model(model.clone()));
            }
        }
    }

    // Arguments, overrides winning; object values resolve like source and
    // target and are dropped when unresolvable, literals pass through.
    let mut merged: BTreeMap<String, Arg> = link.args().clone();
    for (name, endpoint) in overrides {
        merged.insert(name.clone(), Arg::Object(endpoint.clone()));
    }
    for (name, arg) in merged {
        match arg {
            Arg::Object(endpoint) => {
                if let Some(model) = resolve_model(root_model, &endpoint, None) {
                    references.insert(name, CallbackArg::Model(model));
                }
            }
            Arg::Literal(value) => {
                references.insert(name, CallbackArg::Value(value));
            }
        }
    }

    // Plot handle tables, when a backend is installed. Existing reference
    // names are never overwritten.
    plugin::with_plot_backend(|backend| {
        let root_id = root_model.ref_id();
        let src_plot = match source {
            Endpoint::Plot(plot) => Some(plot.clone()),
            Endpoint::View(view) => backend.plot_for(view, root_id),
            _ => None,
        };
        if let Some(plot) = src_plot {
            let prefix = if link.defines_target() { "source_" } else { "" };
            for (name, handle) in plot.handles() {
                references
                    .entry(format!("{prefix}{name}"))
                    .or_insert(CallbackArg::Model(handle));
            }
        }
        let tgt_plot = match target {
            Some(Endpoint::Plot(plot)) => Some(plot.clone()),
            Some(Endpoint::View(view)) => backend.plot_for(view, root_id),
            _ => None,
        };
        if let Some(plot) = tgt_plot {
            for (name, handle) in plot.handles() {
                references
                    .entry(format!("target_{name}"))
                    .or_insert(CallbackArg::Model(handle));
            }
        }
    });

    generator.initialize_models(
        link,
        &src_model,
        triple.source.leaf.as_deref(),
        target,
        tgt_model.as_ref(),
        triple.target.leaf.as_deref(),
    )?;
    generator.process_references(&mut references);

    let body = match &triple.code {
        Some(code) => CallbackBody::Script(code.clone()),
        None => generator.body(link, triple),
    };
    let callback = Rc::new(ModelCallback::new(references, body).with_tag(link.link_id()));

    let (changes, events) = generator.triggers(link, &triple.source);
    for change in &changes {
        src_model.on_change(change, Rc::clone(&callback));
    }
    for event in &events {
        src_model.on_event(event, Rc::clone(&callback));
    }
    Ok(TripleOutcome::Emitted)
}

fn bind_callback(
    root_model: &Model,
    link: &Rc<dyn AnyCallback>,
    source: &Endpoint,
    target: Option<&Endpoint>,
    overrides: &BTreeMap<String, Endpoint>,
    generator: &Rc<dyn CallbackGenerator>,
) -> Result<BoundCallback, LinkError> {
    generator.validate(link)?;
    let mut bound = BoundCallback {
        link_id: link.link_id(),
        kind: link.kind(),
        emitted: 0,
        skipped: 0,
        failures: Vec::new(),
    };
    for triple in generator.specs(link, source, target) {
        match bind_triple(root_model, link, source, target, overrides, generator, &triple) {
            Ok(TripleOutcome::Emitted) => bound.emitted += 1,
            Ok(TripleOutcome::Skipped) => bound.skipped += 1,
            Err(err) => {
                tracing::warn!(
                    link = %link.link_id(),
                    kind = link.kind(),
                    error = %err,
                    "skipping link triple"
                );
                bound.failures.push(err);
            }
        }
    }
    Ok(bound)
}

/// Resolve every registered callback against a rendered object graph.
///
/// Returns `Ok(None)` when there is no root model (nothing rendered yet) or
/// no linkable object. Fails fast with [`LinkError::UnregisteredCallback`]
/// when a declaration type without a registered generator is encountered.
pub fn process_callbacks(
    root_view: &View,
    root_model: Option<&Model>,
) -> Result<Option<Vec<BoundCallback>>, LinkError> {
    let Some(root_model) = root_model else {
        return Ok(None);
    };

    let mut linkable: Vec<Endpoint> = root_view
        .select(|_| true)
        .into_iter()
        .map(Endpoint::View)
        .collect();
    linkable.extend(root_model.select(|_| true).into_iter().map(Endpoint::Model));
    if linkable.is_empty() {
        return Ok(None);
    }
    let linkable_ids: AHashSet<ObjectId> = linkable.iter().map(Endpoint::id).collect();

    let mut found: Vec<(Rc<dyn AnyCallback>, Endpoint, Option<Endpoint>)> = Vec::new();
    for src in &linkable {
        for callback in Registry::with(|registry| registry.callbacks_for(src.id())) {
            let target = callback.target();
            if !callback.requires_target()
                || target
                    .as_ref()
                    .is_some_and(|target| linkable_ids.contains(&target.id()))
            {
                found.push((callback, src.clone(), target));
            }
        }
    }

    // Plot-backend expansion: additive triples for element-handle targets,
    // plus per-link argument overrides for element-handle argument values.
    let mut arg_overrides: AHashMap<ObjectId, BTreeMap<String, Endpoint>> = AHashMap::new();
    plugin::with_plot_backend(|backend| {
        let element_map = backend.element_map(root_view, root_model);
        for src in &linkable {
            for callback in Registry::with(|registry| registry.callbacks_for(src.id())) {
                if callback.defines_target() {
                    if let Some(Endpoint::Element(element)) = callback.target() {
                        for plot in element_map.get(&element.id()).into_iter().flatten() {
                            found.push((
                                Rc::clone(&callback),
                                src.clone(),
                                Some(Endpoint::Plot(plot.clone())),
                            ));
                        }
                    }
                }
                for (name, arg) in callback.args() {
                    if let Arg::Object(Endpoint::Element(element)) = arg {
                        if let Some(plot) = element_map
                            .get(&element.id())
                            .and_then(|plots| plots.last())
                        {
                            arg_overrides
                                .entry(callback.link_id())
                                .or_default()
                                .insert(name.clone(), Endpoint::Plot(plot.clone()));
                        }
                    }
                }
            }
        }
    });

    let no_overrides = BTreeMap::new();
    let mut bound = Vec::with_capacity(found.len());
    for (callback, source, target) in found {
        let Some(generator) = generator_for(&callback) else {
            return Err(LinkError::UnregisteredCallback {
                kind: callback.kind(),
            });
        };
        if callback.requires_target() && target.is_none() {
            continue;
        }
        let overrides = arg_overrides
            .get(&callback.link_id())
            .unwrap_or(&no_overrides);
        bound.push(bind_callback(
            root_model,
            &callback,
            &source,
            target.as_ref(),
            overrides,
            &generator,
        )?);
    }
    Ok(Some(bound))
}

/// Install the resolution pass as a document pre-processing hook.
///
/// The hook contract is infallible; resolution errors are logged and
/// swallowed.
pub fn install(document: &mut Document) {
    document.add_hook(|root_view, root_model| {
        if let Err(err) = process_callbacks(root_view, Some(root_model)) {
            tracing::warn!(error = %err, "link resolution failed during document finalize");
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prop_spec_splits_on_last_segment() {
        assert_eq!(
            PropSpec::parse("value"),
            PropSpec {
                prefix: None,
                leaf: Some("value".to_string()),
            }
        );
        assert_eq!(
            PropSpec::parse("axis.start"),
            PropSpec {
                prefix: Some("axis".to_string()),
                leaf: Some("start".to_string()),
            }
        );
        assert_eq!(
            PropSpec::parse("x.axis.start"),
            PropSpec {
                prefix: Some("x.axis".to_string()),
                leaf: Some("start".to_string()),
            }
        );
        assert_eq!(PropSpec::empty(), PropSpec::default());
    }

    #[test]
    fn resolve_model_handles_each_endpoint_kind() {
        let root = Model::new("document");
        let model = Model::new("slider");
        let axis = Model::new("axis");
        model.set_sub("axis", axis.clone());

        // Models resolve to themselves, drilling down remaining segments.
        assert_eq!(
            resolve_model(&root, &Endpoint::Model(model.clone()), None).unwrap(),
            model
        );
        assert_eq!(
            resolve_model(&root, &Endpoint::Model(model.clone()), Some("axis")).unwrap(),
            axis
        );
        assert!(resolve_model(&root, &Endpoint::Model(model.clone()), Some("gone")).is_none());

        // Views resolve through their per-root model table.
        let view = View::new("slider");
        assert!(resolve_model(&root, &Endpoint::View(view.clone()), None).is_none());
        view.set_model(root.ref_id(), model.clone());
        assert_eq!(
            resolve_model(&root, &Endpoint::View(view.clone()), None).unwrap(),
            model
        );

        // Abstract elements never resolve.
        let element = crate::plugin::ElementHandle::new("curve");
        assert!(resolve_model(&root, &Endpoint::Element(element), None).is_none());
    }

    #[test]
    fn resolve_model_uses_plot_handle_table() {
        let root = Model::new("document");
        let state = Model::new("figure");
        let glyph = Model::new("glyph");
        let hover = Model::new("hover");
        glyph.set_sub("hover", hover.clone());

        let plot = crate::plugin::ElementPlot::new(state.clone());
        plot.set_handle("glyph", glyph.clone());

        let endpoint = Endpoint::Plot(plot);
        assert_eq!(resolve_model(&root, &endpoint, None).unwrap(), state);
        assert_eq!(resolve_model(&root, &endpoint, Some("glyph")).unwrap(), glyph);
        assert_eq!(
            resolve_model(&root, &endpoint, Some("glyph.hover")).unwrap(),
            hover
        );
        assert!(resolve_model(&root, &endpoint, Some("missing")).is_none());
    }
}
