//! `[output]` section configuration.

use crate::format::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[output]` section in fmweave.toml.
///
/// # Example
/// ```toml
/// [output]
/// path = "dist/tools.yaml"
/// format = "yaml"   # optional; inferred from the schema or the extension
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output file; stdout when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub format: Option<OutputFormat>,
}

impl OutputConfig {
    /// Effective format: explicit setting, then the schema's
    /// `x-template-format`, then the output extension, then JSON.
    pub fn resolve_format(&self, schema_format: Option<OutputFormat>) -> OutputFormat {
        self.format
            .or(schema_format)
            .or_else(|| self.path.as_deref().and_then(OutputFormat::from_path))
            .unwrap_or(OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::super::WeaveConfig;
    use super::*;

    #[test]
    fn test_output_config() {
        let config: WeaveConfig = toml::from_str("[output]\npath = \"out.toml\"\nformat = \"markdown\"\n").unwrap();
        assert_eq!(config.output.path, Some(PathBuf::from("out.toml")));
        assert_eq!(config.output.format, Some(OutputFormat::Markdown));
    }

    #[test]
    fn test_format_precedence() {
        let mut output = OutputConfig {
            path: Some("out.toml".into()),
            format: Some(OutputFormat::Yaml),
        };
        assert_eq!(output.resolve_format(Some(OutputFormat::Markdown)), OutputFormat::Yaml);

        output.format = None;
        assert_eq!(output.resolve_format(Some(OutputFormat::Markdown)), OutputFormat::Markdown);
        assert_eq!(output.resolve_format(None), OutputFormat::Toml);

        output.path = None;
        assert_eq!(output.resolve_format(None), OutputFormat::Json);
    }
}
