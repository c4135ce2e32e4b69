//! Directive pipeline errors.

use super::kind::DirectiveKind;
use super::query::QueryError;
use std::fmt;
use thiserror::Error;

/// The present directive kinds cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct DependencyCycleError {
    /// Cycle chain, first kind repeated at the end (`a -> b -> a`).
    pub cycle: Vec<DirectiveKind>,
    /// Every kind left unordered, including those downstream of the cycle.
    pub unresolved: Vec<DirectiveKind>,
}

impl fmt::Display for DependencyCycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("directive dependency cycle: ")?;
        for (i, kind) in self.cycle.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{kind}")?;
        }
        Ok(())
    }
}

/// Failure of a single directive stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error("invalid filter expression: {0}")]
    InvalidExpression(#[from] QueryError),

    #[error("invalid source `{source_expr}`: {reason}")]
    InvalidSource { source_expr: String, reason: String },

    #[error("expected {expected} at `{path}`, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{path}` is not a derived array")]
    NotDerived { path: String },

    #[error("hierarchy root `{path}` is not an array (found {found})")]
    HierarchyRootNotArray { path: String, found: String },

    #[error("`{path}` is outside the hierarchy root ({root})")]
    OutsideRoot { path: String, root: String },

    #[error("`{path}` conflicts with an existing non-object value")]
    PathConflict { path: String },
}

/// Any failure that aborts a pipeline run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Cycle(#[from] DependencyCycleError),

    #[error("directive `{stage}` failed at `{target}`")]
    Stage {
        stage: DirectiveKind,
        target: String,
        #[source]
        source: StageError,
    },
}

/// Short JSON type name, for `WrongType` diagnostics.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
