//! CSV refinery binary
//!
//! Run with: cargo run -p csv-refinery -- serve --config refinery.toml

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use csv_refinery::{
    config::AppConfig,
    server::{state::build_store, state::AppState, RefineryServer},
    storage::sweep_expired,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "csv-refinery", version, about = "Batch CSV cleaning through the Gemini API")]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Process one stored CSV object
    Process {
        /// Input object name
        input: String,
        /// Output object name; derived from the input when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Run one retention sweep and exit
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "csv_refinery=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - Model: {}", config.gemini.model);
    tracing::info!("  - Batch size: {}", config.processing.batch_size);
    tracing::info!("  - Storage: {:?}", config.storage.backend);

    match cli.command {
        Command::Serve => {
            let server = RefineryServer::new(config).await?;

            println!("\nServer starting...");
            println!("  API: http://{}", server.address());
            println!("  Health: http://{}/health", server.address());
            println!("  API Info: http://{}/api/info", server.address());
            println!("\nPress Ctrl+C to stop\n");

            server.start().await?;
        }
        Command::Process { input, output } => {
            let state = AppState::new(config).await?;
            let output = output.unwrap_or_else(|| state.naming().output_name(&input));
            anyhow::ensure!(output != input, "output must differ from input");

            let report = state.processor().process(&input, &output).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.is_complete() {
                anyhow::bail!(
                    "{} of {} batch(es) failed, {} row(s) missing from {}",
                    report.failed_batches().count(),
                    report.batches.len(),
                    report.rows_lost(),
                    report.output
                );
            }
        }
        Command::Sweep => {
            config.validate()?;
            let store = build_store(&config).await?;
            let naming = config.storage.result_naming();
            let retention = config.storage.retention();
            anyhow::ensure!(
                retention > Duration::ZERO,
                "storage.retention_hours is 0, nothing to sweep"
            );

            let deleted =
                sweep_expired(store.as_ref(), &naming, retention, chrono::Utc::now()).await?;
            for name in &deleted {
                println!("{}", name);
            }
            tracing::info!("Removed {} expired object(s)", deleted.len());
        }
    }

    Ok(())
}
