//! Lastmile CLI - driver routes, sorting station and fleet KPIs

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lastmile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    connect: lastmile::cli::ConnectArgs,

    #[command(subcommand)]
    command: lastmile::cli::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = if cli.verbose {
        tracing::level_filters::LevelFilter::DEBUG
    } else {
        tracing::level_filters::LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::builder()
            .with_default_directive(env_filter.into())
            .from_env_lossy())
        .init();

    lastmile::cli::handle_command(cli.command, cli.connect).await?;

    Ok(())
}
