#![forbid(unsafe_code)]

//! Shipped generators: script callbacks and property links.
//!
//! [`ScriptGenerator`] emits one script binding per `code` entry, triggered
//! by changes of the entry's leaf property. [`PropertyLinkGenerator`] adds
//! the declarative mode: each `properties` pair becomes a property bridge
//! that reads the source leaf, validates against the target property, and
//! assigns only on success. Explicit `code` takes precedence over
//! `properties`.
//!
//! Single-segment property paths pass through the owning view's rename map;
//! dotted paths address sub-models directly and are never renamed.

use std::collections::BTreeMap;
use std::rc::Rc;

use trellis_model::{CallbackArg, CallbackBody, Model};

use crate::callbacks::{AnyCallback, Link};
use crate::endpoint::Endpoint;
use crate::error::LinkError;
use crate::generator::{CallbackGenerator, PropSpec, TripleSpec};

fn endpoint_spec(path: &str, endpoint: Option<&Endpoint>) -> PropSpec {
    let spec = PropSpec::parse(path);
    if spec.prefix.is_none() {
        if let (Some(Endpoint::View(view)), Some(leaf)) = (endpoint, &spec.leaf) {
            return PropSpec {
                prefix: None,
                leaf: Some(view.rename_to(leaf)),
            };
        }
    }
    spec
}

/// Generator for [`Callback`](crate::Callback): arbitrary snippets keyed by
/// source property path.
pub struct ScriptGenerator;

impl CallbackGenerator for ScriptGenerator {
    fn specs(
        &self,
        link: &Rc<dyn AnyCallback>,
        source: &Endpoint,
        _target: Option<&Endpoint>,
    ) -> Vec<TripleSpec> {
        link.code()
            .iter()
            .map(|(path, snippet)| TripleSpec {
                source: endpoint_spec(path, Some(source)),
                target: PropSpec::empty(),
                code: Some(snippet.clone()),
            })
            .collect()
    }

    fn triggers(
        &self,
        _link: &Rc<dyn AnyCallback>,
        src_spec: &PropSpec,
    ) -> (Vec<String>, Vec<String>) {
        (src_spec.leaf.iter().cloned().collect(), Vec::new())
    }

    fn body(&self, _link: &Rc<dyn AnyCallback>, triple: &TripleSpec) -> CallbackBody {
        CallbackBody::Script(triple.code.clone().unwrap_or_default())
    }
}

/// Generator for [`Link`]: property bridges derived from the `properties`
/// map, falling back to script behavior when explicit code is present.
pub struct PropertyLinkGenerator;

impl CallbackGenerator for PropertyLinkGenerator {
    fn specs(
        &self,
        link: &Rc<dyn AnyCallback>,
        source: &Endpoint,
        target: Option<&Endpoint>,
    ) -> Vec<TripleSpec> {
        if !link.code().is_empty() {
            return ScriptGenerator.specs(link, source, target);
        }
        let Some(link) = link.as_any().downcast_ref::<Link>() else {
            return Vec::new();
        };
        link.properties()
            .iter()
            .map(|(src_path, tgt_path)| TripleSpec {
                source: endpoint_spec(src_path, Some(source)),
                target: endpoint_spec(tgt_path, target),
                code: None,
            })
            .collect()
    }

    fn triggers(
        &self,
        link: &Rc<dyn AnyCallback>,
        src_spec: &PropSpec,
    ) -> (Vec<String>, Vec<String>) {
        ScriptGenerator.triggers(link, src_spec)
    }

    fn initialize_models(
        &self,
        link: &Rc<dyn AnyCallback>,
        src_model: &Model,
        src_leaf: Option<&str>,
        target: Option<&Endpoint>,
        tgt_model: Option<&Model>,
        tgt_leaf: Option<&str>,
    ) -> Result<(), LinkError> {
        if let (Some(tgt_model), Some(src_leaf), Some(tgt_leaf)) = (tgt_model, src_leaf, tgt_leaf)
        {
            let value = src_model.get(src_leaf)?;
            tgt_model.set(tgt_leaf, value)?;
        }
        if tgt_model.is_none() && link.code().is_empty() {
            return Err(LinkError::UnresolvedTarget {
                kind: target.map_or("<absent>", Endpoint::kind),
            });
        }
        Ok(())
    }

    /// Strip the `target_` prefix from plot handle references whose
    /// unprefixed name is still free; on a collision the prefixed entry is
    /// retained alongside the unprefixed one.
    fn process_references(&self, references: &mut BTreeMap<String, CallbackArg>) {
        let stripped: Vec<String> = references
            .keys()
            .filter_map(|key| key.strip_prefix("target_").map(str::to_string))
            .filter(|name| !name.is_empty() && !references.contains_key(name))
            .collect();
        for name in stripped {
            if let Some(value) = references.remove(&format!("target_{name}")) {
                references.insert(name, value);
            }
        }
    }

    fn body(&self, _link: &Rc<dyn AnyCallback>, triple: &TripleSpec) -> CallbackBody {
        let (Some(source_prop), Some(target_prop)) = (&triple.source.leaf, &triple.target.leaf)
        else {
            return CallbackBody::Script(String::new());
        };
        CallbackBody::Bridge {
            source_prop: source_prop.clone(),
            target_prop: target_prop.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::Callback;
    use crate::registry::Registry;
    use trellis_model::View;

    fn as_any_callback(link: Rc<Link>) -> Rc<dyn AnyCallback> {
        link
    }

    #[test]
    fn property_specs_apply_view_renames_to_single_segments() {
        Registry::with(|r| r.clear());
        let source = View::new("slider");
        source.set_rename("value", "value_throttled");
        let target = View::new("plot");
        let link = Link::builder()
            .source(&source)
            .target(&target)
            .property("value", "line_width")
            .property("axis.value", "glyph.value")
            .build()
            .unwrap();
        let link = as_any_callback(link);

        let specs = PropertyLinkGenerator.specs(
            &link,
            &Endpoint::View(source.clone()),
            Some(&Endpoint::View(target.clone())),
        );
        assert_eq!(
            specs,
            vec![
                // Dotted paths are never renamed.
                TripleSpec {
                    source: PropSpec::parse("axis.value"),
                    target: PropSpec::parse("glyph.value"),
                    code: None,
                },
                TripleSpec {
                    source: PropSpec {
                        prefix: None,
                        leaf: Some("value_throttled".to_string()),
                    },
                    target: PropSpec::parse("line_width"),
                    code: None,
                },
            ]
        );
    }

    #[test]
    fn code_takes_precedence_over_properties() {
        Registry::with(|r| r.clear());
        let source = View::new("slider");
        let target = View::new("plot");
        let link = Link::builder()
            .source(&source)
            .target(&target)
            .property("value", "line_width")
            .code("value", "target.line_width = source.value * 2")
            .build()
            .unwrap();
        let link = as_any_callback(link);

        let specs = PropertyLinkGenerator.specs(
            &link,
            &Endpoint::View(source.clone()),
            Some(&Endpoint::View(target.clone())),
        );
        assert_eq!(specs.len(), 1);
        assert_eq!(
            specs[0].code.as_deref(),
            Some("target.line_width = source.value * 2")
        );
    }

    #[test]
    fn script_specs_one_per_code_entry() {
        Registry::with(|r| r.clear());
        let source = View::new("slider");
        let callback = Callback::builder()
            .source(&source)
            .code("value", "console.log(source.value)")
            .code("start", "console.log(source.start)")
            .build()
            .unwrap();
        let callback: Rc<dyn AnyCallback> = callback;

        let specs = ScriptGenerator.specs(&callback, &Endpoint::View(source.clone()), None);
        assert_eq!(specs.len(), 2);
        let (changes, events) = ScriptGenerator.triggers(&callback, &specs[0].source);
        assert_eq!(changes, vec!["start".to_string()]);
        assert!(events.is_empty());
    }

    #[test]
    fn missing_target_without_code_is_an_error() {
        Registry::with(|r| r.clear());
        let source = View::new("slider");
        let target = View::new("plot");
        let link = Link::builder()
            .source(&source)
            .target(&target)
            .property("value", "line_width")
            .build()
            .unwrap();
        let link = as_any_callback(link);

        let src_model = Model::new("slider");
        src_model.define("value", trellis_model::PropertyType::Int, 0);
        let err = PropertyLinkGenerator
            .initialize_models(
                &link,
                &src_model,
                Some("value"),
                Some(&Endpoint::View(target)),
                None,
                Some("line_width"),
            )
            .unwrap_err();
        assert!(matches!(err, LinkError::UnresolvedTarget { kind: "view" }));
    }

    #[test]
    fn reference_stripping_keeps_collisions_prefixed() {
        let model = || CallbackArg::Model(Model::new("m"));
        let mut references = BTreeMap::new();
        references.insert("target".to_string(), model());
        references.insert("target_glyph".to_string(), model());
        references.insert("target_range".to_string(), model());
        references.insert("range".to_string(), model());
        PropertyLinkGenerator.process_references(&mut references);

        let keys: Vec<&str> = references.keys().map(String::as_str).collect();
        // `glyph` was free and lost its prefix; `range` collided and the
        // prefixed entry survives; `target` itself is untouched.
        assert_eq!(keys, vec!["glyph", "range", "target", "target_range"]);
    }
}
