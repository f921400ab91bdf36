#![forbid(unsafe_code)]

//! Documents and pre-processing hooks.
//!
//! A [`Document`] holds the root models handed to a renderer plus an ordered
//! list of pre-processing hooks. `finalize` runs every hook against every
//! root; this is the integration point where the link resolver installs
//! itself. Hooks are infallible from the document's point of view.

use std::fmt;

use crate::model::Model;
use crate::view::View;

type PreprocessHook = Box<dyn Fn(&View, &Model)>;

/// Root models plus the hooks run before rendering.
#[derive(Default)]
pub struct Document {
    roots: Vec<Model>,
    hooks: Vec<PreprocessHook>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, model: Model) {
        self.roots.push(model);
    }

    #[must_use]
    pub fn roots(&self) -> &[Model] {
        &self.roots
    }

    pub fn add_hook(&mut self, hook: impl Fn(&View, &Model) + 'static) {
        self.hooks.push(Box::new(hook));
    }

    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Run every hook against every root model, in insertion order.
    pub fn finalize(&self, root_view: &View) {
        for hook in &self.hooks {
            for root in &self.roots {
                hook(root_view, root);
            }
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("roots", &self.roots.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
