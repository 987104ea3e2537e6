//! Bandfade CLI
//!
//! Command-line interface for the Bandfade stimulus generator.

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use bandfade::cli::{commands, Cli, Commands};
use bandfade::Result;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Bandfade v{}", env!("CARGO_PKG_VERSION"));

    let outcome = match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Bandfade v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        error!("{} [{}]", e, e.error_code());
        for suggestion in e.recovery_suggestions() {
            eprintln!("  - {}", suggestion);
        }
        std::process::exit(1);
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Fade {
            input,
            out_dir,
            config,
            condition,
            normalize,
        } => commands::fade(&input, &out_dir, config.as_deref(), &condition, normalize),
        Commands::Measure { path } => commands::measure(&path),
        Commands::SetLevel {
            input,
            output,
            level_db,
            equalize,
        } => commands::set_level(&input, &output, level_db, equalize),
        Commands::InitConfig { path } => commands::init_config(&path),
    }
}
