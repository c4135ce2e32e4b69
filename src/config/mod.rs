//! Configuration management for `fmweave.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                         |
//! |--------------|-------------------------------------------------|
//! | `[input]`    | Document directory, extensions, error policy    |
//! | `[schema]`   | Schema file carrying the directives             |
//! | `[template]` | Container and item templates                    |
//! | `[render]`   | Fallback policy, depth limit                    |
//! | `[output]`   | Output file and format                          |
//!
//! # Example
//!
//! ```toml
//! [input]
//! dir = "docs"
//! on_error = "skip"
//!
//! [schema]
//! path = "schema.yaml"
//!
//! [template]
//! items = "templates/item.json"
//!
//! [render]
//! fallback = "preserve"
//!
//! [output]
//! path = "dist/tools.yaml"
//! ```
//!
//! Every section is optional. A missing config file means all defaults;
//! CLI flags override file values.

pub mod defaults;
mod error;
mod input;
mod output;
mod render;

pub use error::ConfigError;
pub use input::{InputConfig, OnError, SchemaConfig};
pub use output::OutputConfig;
pub use render::{FallbackMode, RenderConfig, TemplateConfig};

use crate::cli::{BuildArgs, Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing fmweave.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct WeaveConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root all relative paths resolve against
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub template: TemplateConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl WeaveConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load `cli.config` under the root, or defaults when it does not exist.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);
        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.config_path = config_path;
        config.update_with_cli(cli);
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli.root.clone().unwrap_or_else(|| self.root.clone());

        match &cli.command {
            Commands::Build { build_args } => self.apply_build_args(build_args),
            Commands::Plan { schema } => Self::update_option(&mut self.schema.path, schema.as_ref()),
        }

        self.update_path_with_root(&root);
    }

    fn apply_build_args(&mut self, args: &BuildArgs) {
        Self::update_option(&mut self.input.dir, args.input.as_ref());
        Self::update_option(&mut self.schema.path, args.schema.as_ref());
        Self::update_option(&mut self.input.on_error, args.on_error.as_ref());
        Self::update_option(&mut self.render.fallback, args.fallback.as_ref());

        if args.template.is_some() {
            self.template.path.clone_from(&args.template);
        }
        if args.items.is_some() {
            self.template.items.clone_from(&args.items);
        }
        if args.output.is_some() {
            self.output.path.clone_from(&args.output);
        }
        if args.format.is_some() {
            self.output.format = args.format;
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Make every path absolute, relative to `root`
    fn update_path_with_root(&mut self, root: &Path) {
        let root = Self::normalize_path(root);

        self.config_path = Self::normalize_path(&self.config_path);
        self.input.dir = Self::normalize_path(&root.join(&self.input.dir));
        self.schema.path = Self::normalize_path(&root.join(&self.schema.path));
        self.template.path = self.template.path.as_ref().map(|p| Self::normalize_path(&root.join(p)));
        self.template.items = self.template.items.as_ref().map(|p| Self::normalize_path(&root.join(p)));
        self.output.path = self.output.path.as_ref().map(|p| Self::normalize_path(&root.join(p)));
        self.root = root;
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration for the current command
    pub fn validate(&self, cli: &Cli) -> Result<()> {
        if !self.schema.path.is_file() {
            bail!(ConfigError::Validation(format!(
                "[schema.path] `{}` not found",
                self.schema.path.display()
            )));
        }

        if cli.is_plan() {
            return Ok(());
        }

        if self.render.max_depth == 0 {
            bail!(ConfigError::Validation("[render.max_depth] must be at least 1".into()));
        }

        if self.input.extensions.is_empty() {
            bail!(ConfigError::Validation(
                "[input.extensions] must have at least one element".into()
            ));
        }

        if !self.input.dir.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[input.dir] `{}` is not a directory",
                self.input.dir.display()
            )));
        }

        for (field, path) in [("[template.path]", &self.template.path), ("[template.items]", &self.template.items)] {
            if let Some(path) = path
                && !path.is_file()
            {
                bail!(ConfigError::Validation(format!("{field} `{}` not found", path.display())));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fmweave").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = WeaveConfig::from_str("").unwrap();
        assert_eq!(config.input.dir, PathBuf::from("docs"));
        assert_eq!(config.render.max_depth, 100);
        assert!(config.output.path.is_none());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(matches!(
            WeaveConfig::from_str("[serve]\nport = 1\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_cli_overrides_and_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("fmweave.toml"),
            "[input]\ndir = \"notes\"\n[render]\nfallback = \"null\"\n[output]\nformat = \"toml\"\n",
        )
        .unwrap();
        let root = dir.path().to_str().unwrap();

        let config = WeaveConfig::load(&cli(&["--root", root, "build", "--fallback", "error", "-o", "out.yaml"])).unwrap();
        let root = dir.path().canonicalize().unwrap();

        assert_eq!(config.root, root);
        assert_eq!(config.input.dir, root.join("notes"));
        assert_eq!(config.schema.path, root.join("schema.json"));
        assert_eq!(config.output.path, Some(root.join("out.yaml")));
        assert_eq!(config.render.fallback, FallbackMode::Error);
        // the config file's explicit format still wins over the extension
        assert_eq!(config.output.resolve_format(None), OutputFormat::Toml);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let config = WeaveConfig::load(&cli(&["--root", root, "plan", "--schema", "s.yaml"])).unwrap();
        assert_eq!(config.schema.path, dir.path().canonicalize().unwrap().join("s.yaml"));
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let build = cli(&["--root", root, "build"]);

        let config = WeaveConfig::load(&build).unwrap();
        let err = config.validate(&build).unwrap_err();
        assert!(err.to_string().contains("[schema.path]"));

        fs::write(dir.path().join("schema.json"), "{}").unwrap();
        let config = WeaveConfig::load(&build).unwrap();
        let err = config.validate(&build).unwrap_err();
        assert!(err.to_string().contains("[input.dir]"));

        fs::create_dir(dir.path().join("docs")).unwrap();
        let config = WeaveConfig::load(&build).unwrap();
        config.validate(&build).unwrap();

        let plan = cli(&["--root", root, "plan"]);
        WeaveConfig::load(&plan).unwrap().validate(&plan).unwrap();
    }
}
