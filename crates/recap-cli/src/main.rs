//! Recap CLI: the `recap` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing(cli.verbose);
    let config = support::load_config_or_exit(&cli.config);

    match cli.command {
        Commands::Normalize { seed, json } => {
            commands::normalize::run(config.seed_path(seed), json)
        }

        Commands::Commands { seed, out } => {
            commands::command_log::run(config.seed_path(seed), out)
        }

        Commands::Register {
            seed,
            registry,
            wipe,
            json,
        } => commands::register::run(commands::register::Args {
            seed: config.seed_path(seed),
            registry_dir: config.registry_dir(registry),
            wipe,
            json,
        }),

        Commands::Replay {
            log,
            registry,
            json,
        } => commands::replay::run(log, config.registry_dir(registry), json),

        Commands::List {
            collection,
            capture_of,
            registry,
            json,
        } => commands::list::run(collection, capture_of, config.registry_dir(registry), json),

        Commands::Wipe { registry } => commands::wipe::run(config.registry_dir(registry)),
    }
}
