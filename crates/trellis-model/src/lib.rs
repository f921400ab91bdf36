#![forbid(unsafe_code)]

//! Rendered-model graph, property system, and view tree for Trellis.
//!
//! This crate provides the document-side data model the link system resolves
//! against:
//!
//! - [`Value`] / [`PropertyType`] / [`Property`]: dynamically typed property
//!   values with declared types and optional validators.
//! - [`Model`]: the concrete per-document representation of a view, carrying
//!   properties, named sub-models, and ordered callback subscriptions.
//! - [`View`]: the user-facing widget tree, with per-root rendered-model
//!   lookup and property-rename maps.
//! - [`Document`]: root models plus the pre-processing hooks run before a
//!   document is handed to a renderer.
//!
//! # Architecture
//!
//! `Model` and `View` are cheap handles over `Rc<RefCell<..>>` shared state;
//! cloning a handle shares the object. Weak handles ([`WeakModel`],
//! [`WeakView`]) let registries observe objects without extending their
//! lifetime. Everything is single-threaded; callbacks fire synchronously
//! after the triggering mutation releases its interior borrow.

pub mod document;
pub mod error;
pub mod ids;
pub mod model;
pub mod value;
pub mod view;

pub use document::Document;
pub use error::ModelError;
pub use ids::ObjectId;
pub use model::{CallbackArg, CallbackBody, Model, ModelCallback, WeakModel};
pub use value::{Property, PropertyType, Validator, Value};
pub use view::{View, WeakView};
