mod app;
mod cli;
mod watch;

use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Logs go to a file; the terminal belongs to the status line
    let data_dir = ether_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = ether_proto::platform::log_path();

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,ether_proto=debug,ethermemo=debug")
            }),
        )
        .init();

    info!("Log file: {:?}", log_path);

    cli::run(cli).await
}
