use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flashmirror::infrastructure::bootstrap::Runtime;
use flashmirror::infrastructure::config::{Config, LogFormat};
use tokio::signal;
use tracing::info;

/// Flash-move detection and paper execution for prediction markets
#[derive(Parser, Debug)]
#[command(name = "flashmirror")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to the exchange and run one flash service (foreground)
    Run(RunArgs),

    /// Validate the configuration file and exit
    Check,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Extra instrument to watch (repeatable)
    #[arg(long = "instrument")]
    instruments: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    match cli.command {
        Commands::Check => {
            println!(
                "{} is valid: {} instruments, dry_run = {}",
                cli.config.display(),
                config.instruments.len(),
                config.dry_run
            );
            Ok(())
        }
        Commands::Run(args) => {
            if args.json_logs {
                config.logging.format = LogFormat::Json;
            }
            config.instruments.extend(args.instruments);
            config.init_logging();
            info!("flashmirror starting");

            let mut runtime = Runtime::build(&config)?;
            runtime.start(&config)?;
            signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
            info!("Shutdown signal received");
            runtime.stop().await;

            info!("flashmirror stopped");
            Ok(())
        }
    }
}
