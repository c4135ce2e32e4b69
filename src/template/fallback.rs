//! What a render does with a placeholder that resolves nowhere.

use crate::ir::TemplatePath;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Handler for [`FallbackPolicy::Custom`]: `(path, scope chain searched) -> value`.
pub type FallbackHandler = Arc<dyn Fn(&TemplatePath, &[TemplatePath]) -> Value + Send + Sync>;

/// Missing-variable policy, fixed for the duration of a render.
#[derive(Clone, Default)]
pub enum FallbackPolicy {
    /// Substitute `""`.
    #[default]
    Empty,
    /// Leave the literal `{path}` text in place.
    Preserve,
    /// Substitute `null`.
    Null,
    /// Abort the render with `VariableNotFound`.
    Error,
    Custom(FallbackHandler),
}

impl FallbackPolicy {
    pub fn custom(handler: impl Fn(&TemplatePath, &[TemplatePath]) -> Value + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(handler))
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Preserve => "preserve",
            Self::Null => "null",
            Self::Error => "error",
            Self::Custom(_) => "custom",
        }
    }

    pub const fn is_strict(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(<handler>)"),
            other => f.write_str(other.name()),
        }
    }
}
