//! rowsync CLI entry point.

use clap::Parser;
use rowsync::cli::{Cli, Commands};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

async fn run(cli: &Cli) -> Result<(), rowsync::Error> {
    use rowsync::cli::commands;
    use rowsync::sync::Operation;

    match &cli.command {
        Commands::Insert(args) => {
            commands::run_operation(Operation::Insert, args, &cli.config).await
        }
        Commands::Update(args) => {
            commands::run_operation(Operation::Update, args, &cli.config).await
        }
        Commands::Delete(args) => {
            commands::run_operation(Operation::Delete, args, &cli.config).await
        }
        Commands::Publish(args) => {
            commands::run_operation(Operation::Publish, args, &cli.config).await
        }
        Commands::Draft(args) => {
            commands::run_operation(Operation::Draft, args, &cli.config).await
        }
        Commands::Map { mapping_file } => commands::generate_map(mapping_file, &cli.config).await,
    }
}
