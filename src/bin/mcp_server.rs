/// MCP server for cryptocurrency exchange SDK documentation
///
/// Speaks line-delimited JSON-RPC on stdin/stdout. Every enabled exchange
/// contributes a methods tool and a method detail tool backed by its offline
/// data file. Logs go to stderr.
///
/// Configuration: `EXCHANGE_DOCS_CONFIG` (config file) and
/// `EXCHANGE_DOCS_DATA_DIR` (data directory), or a config path as the only argument.
use anyhow::{Context, Result};
use exchange_docs::adapter::AdapterRegistry;
use exchange_docs::cli_common;
use exchange_docs::config::ServiceConfig;
use exchange_docs::exchange::ExchangeId;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    cli_common::init_server_logging()?;

    eprintln!(
        "Starting crypto-exchange-mcp v{} (stdio JSON-RPC)...",
        env!("CARGO_PKG_VERSION")
    );

    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ServiceConfig::resolve(explicit.as_deref())?;
    config.validate().context("Invalid configuration")?;

    let supported: Vec<&str> = ExchangeId::ALL.iter().map(|id| id.as_str()).collect();
    info!("Supported exchanges: {}", supported.join(", "));
    info!("Loading offline data from {}", config.server.data_dir.display());

    let registry = AdapterRegistry::from_config(&config).context("Failed to load offline data")?;
    if registry.is_empty() {
        tracing::warn!("No exchanges enabled, the tool list will be empty");
    }

    exchange_docs::mcp_server::run_stdio(registry).await?;
    Ok(())
}
