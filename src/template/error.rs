//! Template context, resolution and render errors.

use crate::format::FormatError;
use crate::ir::TemplatePath;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Scope navigation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    #[error("no array at `{path}` (searched: {})", join_paths(.searched))]
    ArrayNotFound {
        path: TemplatePath,
        searched: Vec<TemplatePath>,
    },

    #[error("expected an array at `{path}`, found {found}")]
    TypeMismatch { path: TemplatePath, found: &'static str },

    #[error("property `{path}` not found")]
    PropertyNotFound { path: TemplatePath },
}

/// A placeholder that could not be resolved under a strict policy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("variable `{path}` not found: {detail}")]
    VariableNotFound {
        path: TemplatePath,
        searched: Vec<TemplatePath>,
        detail: String,
    },
}

impl ResolutionError {
    pub(crate) fn not_found(path: &TemplatePath, searched: Vec<TemplatePath>) -> Self {
        let detail = if searched.is_empty() {
            "not bound in any scope".to_owned()
        } else {
            format!("searched {}", join_paths(&searched))
        };
        Self::VariableNotFound {
            path: path.clone(),
            searched,
            detail,
        }
    }

    pub(crate) fn no_root(path: &TemplatePath) -> Self {
        Self::VariableNotFound {
            path: path.clone(),
            searched: Vec::new(),
            detail: "no array root declared".to_owned(),
        }
    }
}

/// `{@items}` expansion could not start.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemsError {
    /// No hierarchy root is declared.
    #[error(transparent)]
    Resolution(ResolutionError),

    /// The root is missing from the IR or is not an array.
    #[error(transparent)]
    Context(ContextError),
}

/// Where a render pass was when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    NotStarted,
    Scanning,
    Resolving,
    Substituting,
    Done,
    Failed,
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Scanning => "scanning",
            Self::Resolving => "resolving",
            Self::Substituting => "substituting",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Cause of a failed render.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderFailure {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("`{{@items}}` cannot appear inside the item template")]
    NestedItems,
}

impl From<ItemsError> for RenderFailure {
    fn from(err: ItemsError) -> Self {
        match err {
            ItemsError::Resolution(err) => Self::Resolution(err),
            ItemsError::Context(err) => Self::Context(err),
        }
    }
}

/// A render call that produced no output.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{source} (while {state})")]
pub struct RenderError {
    pub state: RenderState,
    #[source]
    pub source: RenderFailure,
}

/// Template file could not be loaded.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("IO error when reading template `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse template `{path}`")]
    Parse {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

fn join_paths(paths: &[TemplatePath]) -> String {
    if paths.is_empty() {
        return "nothing".to_owned();
    }
    paths
        .iter()
        .map(|path| format!("`{path}`"))
        .collect::<Vec<_>>()
        .join(", ")
}
