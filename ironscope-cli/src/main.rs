//! `ironscope` -- command-line front end for workspaces and report import

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use ironscope_core::config::GeneralConfig;

use crate::cli::{Cli, Commands};
use crate::commands::Context;
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        config,
        log_level,
        output,
        command,
    } = cli;
    let writer = OutputWriter::new(output);
    let config_path = config.as_deref();

    match command {
        Commands::Config(args) => {
            // config commands report on the file themselves, so logging starts from defaults
            let mut general = GeneralConfig::default();
            if let Some(level) = log_level {
                general.log_level = level;
            }
            logging::init_tracing(&general)?;
            commands::config::execute(args, config_path, &writer).await
        }
        Commands::Workspace(args) => {
            let ctx = Context::load(config_path, log_level).await?;
            commands::workspace::execute(args, &ctx, &writer)
        }
        Commands::Import(args) => {
            let ctx = Context::load(config_path, log_level).await?;
            commands::import::execute(args, &ctx, &writer).await
        }
        Commands::Hosts(args) => {
            let ctx = Context::load(config_path, log_level).await?;
            commands::hosts::execute(args, &ctx, &writer)
        }
    }
}
