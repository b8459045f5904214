use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::database::{ConnectionManager, DatabaseState};
use crate::mcp::{McpServer, ToolRegistry};

const SERVER_INSTRUCTIONS: &str = "Read-only access to the game server database. \
Use fetchPlayerInfo and getRecentPlayers for player activity, \
listSupplies and getSupplyDetails for supply points.";

/// Run the MCP server on stdio until the client disconnects or Ctrl+C.
///
/// The database may be down at startup; tools answer with "not found" text
/// until the health check reconnects.
#[inline]
pub async fn serve_mcp(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    info!(
        "Starting MCP gateway for {}",
        config.database.redacted_url()
    );

    let manager = Arc::new(ConnectionManager::from_config(&config));
    manager.initialize().await;

    let server = Arc::new(
        McpServer::new(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        )
        .with_instructions(SERVER_INSTRUCTIONS),
    );

    ToolRegistry::gateway(&manager).install(&server).await;
    info!(
        "✅ MCP server initialized with tools: {}",
        server.tool_names().await.join(", ")
    );

    let result = tokio::select! {
        result = Arc::clone(&server).serve_stdio() => {
            if let Err(e) = &result {
                error!("MCP server error: {}", e);
            }
            result
        }
        signal = tokio::signal::ctrl_c() => {
            info!("📴 Received interrupt signal, shutting down...");
            signal.context("Failed to listen for interrupt signal")
        }
    };

    manager.shutdown().await;
    info!("✅ Shutdown complete");

    result
}

/// Connect once, report reachability and row counts, then release the pool.
#[inline]
pub async fn check_database(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📊 Database Check").bold().cyan());
    eprintln!("{}", "=".repeat(50));
    eprintln!("  URL: {}", style(config.database.redacted_url()).cyan());

    let manager = Arc::new(ConnectionManager::from_config(&config));
    manager.initialize().await;

    let state = manager.state().await;
    let outcome = match state {
        DatabaseState::Connected => {
            eprintln!("  Status: {}", style("✅ Connected").green());
            match manager.count_rows().await {
                Ok(counts) => {
                    eprintln!(
                        "  Players ({}): {}",
                        config.tables.players,
                        style(counts.players).cyan()
                    );
                    eprintln!(
                        "  Supplies ({}): {}",
                        config.tables.supplies,
                        style(counts.supplies).cyan()
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!("  Tables: {} {}", style("❌ Unreadable -").red(), e);
                    Err(e).context("Database reachable but tables could not be read")
                }
            }
        }
        DatabaseState::Disconnected => {
            eprintln!("  Status: {}", style("❌ Disconnected").red());
            Err(anyhow::anyhow!(
                "Could not connect to {}",
                config.database.redacted_url()
            ))
        }
    };

    manager.shutdown().await;
    outcome
}
