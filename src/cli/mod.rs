//! CLI command handlers

pub mod fleet;
pub mod reorder;
pub mod route;
pub mod scan;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};

use crate::backend::{DispatchBackend, HttpBackend};
use crate::config::{load_config, RuntimeConfig, CONFIG_FILE};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a driver's stops and delivery progress
    Route(route::RouteArgs),

    /// Reorder a driver's upcoming stops and commit the new order
    Reorder(reorder::ReorderArgs),

    /// Run an interactive sorting station
    Scan(scan::ScanArgs),

    /// Aggregate route KPIs across the fleet
    Fleet(fleet::FleetArgs),
}

/// Connection options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// Dispatch API base URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token for the dispatch API
    #[arg(long, global = true, env = "LASTMILE_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Project directory containing .lastmile.toml
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,
}

pub async fn handle_command(cmd: Commands, connect: ConnectArgs) -> anyhow::Result<()> {
    let config = runtime_config(&connect)?;
    let backend: Arc<dyn DispatchBackend> = Arc::new(HttpBackend::new(
        &config.api_url,
        config.api_token.clone(),
        config.request_timeout,
    )?);
    tracing::debug!(api_url = %config.api_url, "Using dispatch API");

    match cmd {
        Commands::Route(args) => route::execute(args, backend).await,
        Commands::Reorder(args) => reorder::execute(args, backend).await,
        Commands::Scan(args) => scan::execute(args, backend, &config).await,
        Commands::Fleet(args) => fleet::execute(args, backend, &config).await,
    }
}

fn runtime_config(connect: &ConnectArgs) -> anyhow::Result<RuntimeConfig> {
    let project_dir = match &connect.project_dir {
        Some(dir) => dir.clone(),
        None => find_project_dir()?,
    };
    let config = load_config(&project_dir)?;
    Ok(RuntimeConfig::try_from(config)?
        .with_api_url(connect.api_url.clone())
        .with_api_token(connect.token.clone()))
}

fn find_project_dir() -> anyhow::Result<PathBuf> {
    let current = std::env::current_dir()?;

    for ancestor in current.ancestors() {
        if ancestor.join(CONFIG_FILE).exists() {
            return Ok(PathBuf::from(ancestor));
        }
    }

    // Default to current directory
    Ok(current)
}

/// Format an optional quantity, e.g. a missing ETA
fn or_na(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1} {}", v, unit),
        None => "n/a".to_string(),
    }
}
