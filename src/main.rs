//! ddragon-cache CLI application
//!
//! Command-line interface for keeping a local cache of Data Dragon assets.
//! Downloads only what is missing or corrupted and resumes interrupted runs.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use ddragon_cache::cli::{
    handle_clear, handle_config, handle_status, handle_sync, handle_verify, Cli, Commands,
};
use ddragon_cache::constants::logging;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(&cli)?;

    info!("ddragon-cache v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Sync(args) => {
            info!("Executing sync command");
            handle_sync(&cli.global, args).await?
        }
        Commands::Verify(args) => {
            info!("Executing verify command");
            handle_verify(&cli.global, args).await?
        }
        Commands::Status(args) => handle_status(&cli.global, args).await?,
        Commands::Clear(args) => handle_clear(&cli.global, args).await?,
        Commands::Config(args) => handle_config(&cli.global, args).await?,
    }
    Ok(())
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let log_level = cli.log_level();

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{}={}", logging::TARGET, log_level).parse()?);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
    Ok(())
}
