//! Directive processing pipeline.
//!
//! Schema annotations become [`DirectiveDeclaration`]s. The processor orders
//! them by their static dependency graph and applies each stage to a
//! [`Dataset`] of frontmatter documents.
//!
//! ```text
//! declarations ──► resolver (Kahn + priority) ──► stage order
//!                                                   │
//! Dataset ──► frontmatter-part ──► flatten-arrays ──► filter ──► derived-from ──► derived-unique ──► Dataset
//!                                  (rayon)            (rayon)
//! ```
//!
//! Stages never mutate their input. A failing stage aborts the run and no
//! partial dataset is returned.

mod dataset;
mod error;
mod kind;
mod processor;
mod query;
mod resolver;

pub use dataset::Dataset;
pub(crate) use error::json_kind;
pub use kind::{Directive, DirectiveDeclaration, DirectiveKind};
pub use processor::DirectiveProcessor;
