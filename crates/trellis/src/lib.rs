#![forbid(unsafe_code)]

//! Trellis public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use trellis_links as links;
    pub use trellis_model as model;

    pub use trellis_links::{Callback, Link, install, process_callbacks, register_callback};
    pub use trellis_model::{Document, Model, PropertyType, Value, View};
}
