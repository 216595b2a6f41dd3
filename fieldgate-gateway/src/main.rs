use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use fieldgate_gateway::configs::Settings;
use fieldgate_gateway::run;

/// Edge gateway bridging constrained devices and the broker
#[derive(Debug, Parser)]
#[command(name = "fieldgate", version)]
struct Cli {
    /// Configuration file layered over the defaults
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = Arc::new(Settings::load(cli.config.as_deref()).expect("Failed to load settings."));

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            let level = settings.logger.level.as_str();

            format!("{app_name}={level},fieldgate_analyser={level}").into()
        }))
        .init();

    run(&settings).await;
}
