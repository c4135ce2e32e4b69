//! Intermediate representation of the processed dataset.
//!
//! The IR is the read-only tree that templates resolve against. It is built
//! once per render from the assembled dataset and never mutated afterwards.
//!
//! ```text
//! Dataset::assemble() ──► serde_json::Value ──► IrBuilder::build() ──► IrNode
//!                                                                         │
//!                                                      TemplatePath ──► IrNode::get()
//! ```

mod builder;
mod error;
mod node;
mod path;

pub use builder::{DEFAULT_MAX_DEPTH, IrBuilder};
pub use node::IrNode;
pub use path::{PathError, Segment, TemplatePath};
