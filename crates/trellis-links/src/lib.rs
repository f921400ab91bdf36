#![forbid(unsafe_code)]

//! Declarative property links between views and rendered models.
//!
//! A [`Link`] declares "when property P changes on source S, affect target
//! T"; a [`Callback`] runs an arbitrary snippet instead. Declarations live
//! in a weak-keyed [`Registry`] for the lifetime of their source and are
//! re-resolved against the rendered-model graph on every render pass by
//! [`process_callbacks`], which an external renderer invokes (or installs as
//! a document hook via [`install`]).
//!
//! # Architecture
//!
//! - **Declarations** ([`callbacks`]): user-facing [`Callback`]/[`Link`]
//!   builders; registration is idempotent and weakly keyed by source.
//! - **Resolution** ([`generator`]): the per-render pass computing the
//!   linkable set, expanding declarations into `(source, target, code)`
//!   triples, and emitting dedup-tagged callbacks onto resolved models.
//! - **Generators** ([`js`]): per-declaration-type emission strategies;
//!   extension types plug in through [`register_callback`].
//! - **Plot plugin** ([`plugin`]): optional expansion of abstract plot
//!   elements into concrete rendered plots.
//!
//! # Example
//!
//! ```
//! use trellis_links::{Link, process_callbacks};
//! use trellis_model::{Model, PropertyType, Value, View};
//!
//! // A view tree with a slider and a plot pane...
//! let root_view = View::new("column");
//! let slider = View::new("slider");
//! let plot = View::new("plot");
//! root_view.add_child(slider.clone());
//! root_view.add_child(plot.clone());
//!
//! // ...rendered into a model graph under one root.
//! let root = Model::new("document");
//! let slider_model = Model::new("slider");
//! slider_model.define("value", PropertyType::Int, 4);
//! let plot_model = Model::new("line");
//! plot_model.define("line_width", PropertyType::Float, 1.0);
//! root.set_sub("slider", slider_model.clone());
//! root.set_sub("plot", plot_model.clone());
//! slider.set_model(root.ref_id(), slider_model.clone());
//! plot.set_model(root.ref_id(), plot_model.clone());
//!
//! let _link = Link::builder()
//!     .source(slider.clone())
//!     .target(plot.clone())
//!     .property("value", "line_width")
//!     .build()?;
//!
//! let bound = process_callbacks(&root_view, Some(&root))?.unwrap_or_default();
//! assert_eq!(bound.iter().map(|b| b.emitted()).sum::<usize>(), 1);
//!
//! // The bridge keeps the target in sync with the source.
//! slider_model.set("value", 7)?;
//! assert_eq!(plot_model.get("line_width")?, Value::Int(7));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod callbacks;
pub mod endpoint;
pub mod error;
pub mod generator;
pub mod js;
pub mod plugin;
pub mod registry;

pub use callbacks::{AnyCallback, Callback, CallbackBuilder, Link, LinkBuilder};
pub use endpoint::{Arg, Endpoint, WeakEndpoint};
pub use error::LinkError;
pub use generator::{
    BoundCallback, CallbackGenerator, PropSpec, TripleSpec, install, process_callbacks,
    register_callback, resolve_model,
};
pub use js::{PropertyLinkGenerator, ScriptGenerator};
pub use plugin::{
    ElementHandle, ElementPlot, PlotBackend, WeakPlot, clear_plot_backend, set_plot_backend,
};
pub use registry::Registry;
