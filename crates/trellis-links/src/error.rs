#![forbid(unsafe_code)]

//! Failure taxonomy for link declaration and resolution.
//!
//! Construction-time configuration errors ([`LinkError::MissingSource`],
//! [`LinkError::MissingTarget`]) abort the build before any registry
//! mutation. Resolution-time failures abort a single triple's emission and
//! leave the rest of the pass untouched, except
//! [`LinkError::UnregisteredCallback`], which aborts the whole pass.

use thiserror::Error;

use trellis_model::ModelError;

/// Errors raised while declaring or resolving links.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The declaration carried no source.
    #[error("{kind} must define a source")]
    MissingSource { kind: &'static str },

    /// A target-requiring declaration carried no target.
    #[error("{kind} must define a target")]
    MissingTarget { kind: &'static str },

    /// No generator is registered for a callback type encountered during a
    /// resolution pass.
    #[error("no callback generator registered for {kind}")]
    UnregisteredCallback { kind: &'static str },

    /// A spec path could not be resolved against the rendered-model graph.
    #[error("could not resolve a model for {kind} along `{path}`")]
    UnresolvedModel { kind: &'static str, path: String },

    /// A target-requiring link produced no target model and supplied no
    /// fallback code.
    #[error("model could not be resolved on target {kind} and no custom code was specified")]
    UnresolvedTarget { kind: &'static str },

    /// A property validation failure surfaced while initializing models.
    #[error(transparent)]
    Model(#[from] ModelError),
}
