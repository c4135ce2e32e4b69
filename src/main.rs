//! fmweave - weave Markdown frontmatter into one document.

mod build;
mod cli;
mod config;
mod directive;
mod documents;
mod format;
mod frontmatter;
mod ir;
mod logger;
mod schema;
mod template;

use anyhow::Result;
use build::{build, plan};
use clap::Parser;
use cli::{Cli, Commands};
use config::WeaveConfig;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::set_quiet(cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log!("error"; "{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    match &cli.command {
        Commands::Build { .. } => {
            let report = build(&config)?;
            log!(
                "build"; "{} documents ({} skipped), {} elements, {}",
                report.documents,
                report.skipped,
                report.elements,
                report.format
            );
        }
        Commands::Plan { .. } => println!("{}", plan(&config)?),
    }
    Ok(())
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<WeaveConfig> {
    let config = WeaveConfig::load(cli)?;
    config.validate(cli)?;
    Ok(config)
}
