//! IR construction errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("nesting deeper than {limit} levels at `{path}`")]
    DepthExceeded { path: String, limit: usize },

    #[error("invalid value at `{path}`: {reason}")]
    InvalidValue { path: String, reason: String },
}
