//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::config::{FallbackMode, OnError};
use crate::format::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fmweave: weave Markdown frontmatter into one document
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root; relative paths in the config resolve against it
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: fmweave.toml)
    #[arg(short = 'C', long, default_value = "fmweave.toml")]
    pub config: PathBuf,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the matching config fields
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Document directory
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Schema file
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Container template
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Item template, rendered once per hierarchy root element
    #[arg(long)]
    pub items: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Missing-variable policy
    #[arg(long, value_enum)]
    pub fallback: Option<FallbackMode>,

    /// What to do with unreadable documents
    #[arg(long, value_enum)]
    pub on_error: Option<OnError>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Read documents, run the directives and render the output
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Print the directive order and the hierarchy root without rendering
    Plan {
        /// Schema file
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
}

impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }

    pub const fn is_plan(&self) -> bool {
        matches!(self.command, Commands::Plan { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from([
            "fmweave", "-C", "weave.toml", "--root", "site", "build", "--input", "notes", "--format", "yaml",
            "--fallback", "preserve", "--on-error", "skip",
        ])
        .unwrap();
        assert!(cli.is_build());
        assert_eq!(cli.config, PathBuf::from("weave.toml"));
        let Commands::Build { build_args } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(build_args.input, Some(PathBuf::from("notes")));
        assert_eq!(build_args.format, Some(OutputFormat::Yaml));
        assert_eq!(build_args.fallback, Some(FallbackMode::Preserve));
        assert_eq!(build_args.on_error, Some(OnError::Skip));
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from(["fmweave", "-q", "plan", "-s", "schema.yaml"]).unwrap();
        assert!(cli.is_plan());
        assert!(cli.quiet);
        assert_eq!(cli.config, PathBuf::from("fmweave.toml"));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["fmweave", "build", "--format", "html"]).is_err());
    }
}
