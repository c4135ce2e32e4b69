//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [input] Section Defaults
// ============================================================================

pub mod input {
    use std::path::PathBuf;

    pub fn dir() -> PathBuf {
        "docs".into()
    }

    pub fn extensions() -> Vec<String> {
        vec!["md".into(), "markdown".into()]
    }
}

// ============================================================================
// [schema] Section Defaults
// ============================================================================

pub mod schema {
    use std::path::PathBuf;

    pub fn path() -> PathBuf {
        "schema.json".into()
    }
}

// ============================================================================
// [render] Section Defaults
// ============================================================================

pub mod render {
    pub fn max_depth() -> usize {
        crate::ir::DEFAULT_MAX_DEPTH
    }
}
