use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod chat;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {}

pub async fn run() -> Result<()> {
    let _args = Cli::parse();

    // Logs go to stderr so they never interleave with the chat
    // transcript on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=warn", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    chat::run().await
}
