use clap::{Parser, Subcommand};
use mcp_gateway::Result;
use mcp_gateway::commands::{check_database, serve_mcp};
use mcp_gateway::config::{get_config_dir, init_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcp-gateway")]
#[command(about = "MCP server exposing game server player and supply data to agents")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.mcp-gateway)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio
    Serve,
    /// Check database connectivity and table access
    Check,
    /// Show or create the configuration file
    Config {
        /// Show current configuration
        #[arg(long, conflicts_with = "init")]
        show: bool,
        /// Write a default config.toml
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP stream
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command {
        Commands::Serve => {
            serve_mcp(&config_dir).await?;
        }
        Commands::Check => {
            check_database(&config_dir).await?;
        }
        Commands::Config { init, .. } => {
            if init {
                init_config(&config_dir)?;
            } else {
                show_config(&config_dir)?;
            }
        }
    }

    Ok(())
}
