//! `[input]` and `[schema]` sections: what gets read.

use super::defaults;
use clap::ValueEnum;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do with a document whose frontmatter cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Fail the whole run (default).
    #[default]
    Abort,
    /// Log a warning and leave the document out.
    Skip,
}

/// `[input]` section in fmweave.toml - document discovery.
///
/// # Example
/// ```toml
/// [input]
/// dir = "docs"
/// extensions = ["md", "markdown"]
/// on_error = "skip"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Directory scanned recursively for documents.
    #[serde(default = "defaults::input::dir")]
    #[educe(Default = defaults::input::dir())]
    pub dir: PathBuf,

    /// File extensions treated as documents, without the dot.
    #[serde(default = "defaults::input::extensions")]
    #[educe(Default = defaults::input::extensions())]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub on_error: OnError,
}

impl InputConfig {
    /// Whether `path` has one of the configured extensions (case-insensitive).
    pub fn accepts(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// `[schema]` section in fmweave.toml.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Schema file (`.json`, `.yaml`/`.yml` or `.toml`).
    #[serde(default = "defaults::schema::path")]
    #[educe(Default = defaults::schema::path())]
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::super::WeaveConfig;
    use super::*;
    use std::path::Path;

    #[test]
    fn test_input_config() {
        let config = r#"
            [input]
            dir = "notes"
            extensions = ["md", "mdx"]
            on_error = "skip"

            [schema]
            path = "schema.yaml"
        "#;
        let config: WeaveConfig = toml::from_str(config).unwrap();

        assert_eq!(config.input.dir, PathBuf::from("notes"));
        assert_eq!(config.input.extensions, ["md", "mdx"]);
        assert_eq!(config.input.on_error, OnError::Skip);
        assert_eq!(config.schema.path, PathBuf::from("schema.yaml"));
    }

    #[test]
    fn test_input_config_defaults() {
        let config: WeaveConfig = toml::from_str("").unwrap();

        assert_eq!(config.input.dir, PathBuf::from("docs"));
        assert_eq!(config.input.extensions, ["md", "markdown"]);
        assert_eq!(config.input.on_error, OnError::Abort);
        assert_eq!(config.schema.path, PathBuf::from("schema.json"));
    }

    #[test]
    fn test_accepts_extension() {
        let input = InputConfig::default();
        assert!(input.accepts(Path::new("docs/a.md")));
        assert!(input.accepts(Path::new("docs/B.MARKDOWN")));
        assert!(!input.accepts(Path::new("docs/c.txt")));
        assert!(!input.accepts(Path::new("docs/README")));
    }

    #[test]
    fn test_unknown_field_rejection() {
        let result: Result<WeaveConfig, _> = toml::from_str("[input]\nrecursive = false\n");
        assert!(result.is_err());

        let result: Result<WeaveConfig, _> = toml::from_str("[input]\non_error = \"retry\"\n");
        assert!(result.is_err());
    }
}
