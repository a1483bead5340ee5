mod agents;
mod cli;
mod config;
mod error;
mod git;
mod utils;
mod versioning;
mod workflow;

use agents::package_manager::DEFAULT_INSTALL_COMMAND;
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(verbosity: u8) {
    let default_level = if verbosity >= 3 { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Update {
            clean,
            keep_log,
            out_of_process,
            interactive,
            extensions_dir,
        } => workflow::execute_update(
            &cli.config,
            cli.verbose,
            workflow::UpdateOptions {
                clean,
                keep_log,
                out_of_process,
                interactive,
                extensions_dir,
            },
        ),
        Commands::Check { extensions_dir } => {
            workflow::execute_check(&cli.config, cli.verbose, extensions_dir.as_deref())
        }
        Commands::List { extensions_dir } => {
            workflow::execute_list(&cli.config, extensions_dir.as_deref())
        }
        Commands::Add {
            name,
            source,
            no_verify,
        } => workflow::execute_add(&cli.config, &name, &source, no_verify),
        Commands::UpdateExtension {
            name,
            path,
            source,
            clean,
            install_command,
        } => {
            let install_command = install_command.unwrap_or_else(|| {
                DEFAULT_INSTALL_COMMAND.iter().map(|s| s.to_string()).collect()
            });
            match workflow::execute_worker(
                &name,
                &path,
                &source,
                clean,
                install_command,
                cli.verbose,
            ) {
                Ok(outcome) => process::exit(outcome.status_code()),
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
