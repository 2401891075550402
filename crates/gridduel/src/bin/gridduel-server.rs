use std::path::PathBuf;

use clap::Parser;
use gridduel::prelude::*;

/// Referee server for networked two-player tic-tac-toe.
#[derive(Parser, Debug)]
#[command(name = "gridduel-server", version)]
struct Cli {
    /// Player records file, loaded at startup and saved at shutdown.
    records: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// JSON config file; flags given here override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_json_file(path).await?,
        None => ServerConfig::default(),
    };
    if let Some(records) = cli.records {
        config.records_path = records;
    }
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    config.verbose |= cli.debug;

    gridduel::init_logging(config.verbose);

    let server = GridduelServer::builder().config(config).build().await?;
    let summary = server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!(
        started = summary.started,
        completed = summary.completed,
        failed = summary.failed,
        "bye"
    );
    Ok(())
}
