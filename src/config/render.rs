//! `[template]` and `[render]` sections.

use super::defaults;
use crate::template::FallbackPolicy;
use clap::ValueEnum;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configurable fallback policies (custom handlers are library-only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    #[default]
    Empty,
    Preserve,
    Null,
    Error,
}

impl From<FallbackMode> for FallbackPolicy {
    fn from(mode: FallbackMode) -> Self {
        match mode {
            FallbackMode::Empty => Self::Empty,
            FallbackMode::Preserve => Self::Preserve,
            FallbackMode::Null => Self::Null,
            FallbackMode::Error => Self::Error,
        }
    }
}

/// `[template]` section in fmweave.toml.
///
/// Both paths override the schema's `x-template` / `x-template-items`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// Container template.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Item template, rendered once per hierarchy root element.
    #[serde(default)]
    pub items: Option<PathBuf>,
}

/// `[render]` section in fmweave.toml.
///
/// # Example
/// ```toml
/// [render]
/// fallback = "preserve"
/// max_depth = 64
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// What a placeholder that resolves nowhere becomes.
    #[serde(default)]
    pub fallback: FallbackMode,

    /// Maximum nesting depth of the processed dataset.
    #[serde(default = "defaults::render::max_depth")]
    #[educe(Default = defaults::render::max_depth())]
    pub max_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::super::WeaveConfig;
    use super::*;

    #[test]
    fn test_render_config() {
        let config = r#"
            [template]
            path = "container.json"
            items = "item.yaml"

            [render]
            fallback = "error"
            max_depth = 8
        "#;
        let config: WeaveConfig = toml::from_str(config).unwrap();

        assert_eq!(config.template.path, Some(PathBuf::from("container.json")));
        assert_eq!(config.template.items, Some(PathBuf::from("item.yaml")));
        assert_eq!(config.render.fallback, FallbackMode::Error);
        assert_eq!(config.render.max_depth, 8);
    }

    #[test]
    fn test_render_config_defaults() {
        let config: WeaveConfig = toml::from_str("[render]\n").unwrap();

        assert!(config.template.path.is_none());
        assert_eq!(config.render.fallback, FallbackMode::Empty);
        assert_eq!(config.render.max_depth, 100);
    }

    #[test]
    fn test_fallback_mode_into_policy() {
        assert!(FallbackPolicy::from(FallbackMode::Error).is_strict());
        assert_eq!(FallbackPolicy::from(FallbackMode::Preserve).name(), "preserve");
    }
}
