mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use cli::{Cli, Commands};

fn init_logging(verbose: bool) {
    let default = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::ERROR
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse_from(wild::args_os());
    init_logging(cli.verbose);

    match cli.command {
        Commands::Inject(args) => commands::inject(args)?,
        Commands::List(args) => commands::list(args)?,
        Commands::Manifest(args) => commands::manifest(args)?,
    };

    Ok(())
}
