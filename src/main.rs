use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use gitroute_core::endpoint::{GitEndpoint, ServiceConfig};
use gitroute_core::server::context::is_inline_uri;
use gitroute_core::server::handlers::exchange::{new_exchange, run_exchange};
use gitroute_core::server::{load_registry, ServerMessage};

/// Message-driven Git endpoints over WebSocket
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Config file (default: ~/.gitroute/gitroute.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the WebSocket server (default)
    Serve {
        /// Port to listen on, overrides config and GITROUTE_PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a single exchange locally and print the result as JSON
    Exec {
        /// Registered endpoint name or git:// URI
        #[arg(long)]
        endpoint: String,
        /// Exchange header, e.g. -H GitOperation=status
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Key=Value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty header name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(ServiceConfig::default_path);
    let mut config = ServiceConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    config.apply_env_overrides();

    gitroute_core::util::init_logging(&config.logging);

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            info!(
                "Starting gitroute-core {} on {}:{}",
                env!("CARGO_PKG_VERSION"),
                config.server.bind,
                config.server.port
            );
            gitroute_core::server::run_server(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Exec { endpoint, headers } => exec(&config, &endpoint, headers).await,
    }
}

async fn exec(
    config: &ServiceConfig,
    endpoint_ref: &str,
    headers: Vec<(String, String)>,
) -> anyhow::Result<ExitCode> {
    let endpoint = if is_inline_uri(endpoint_ref) {
        GitEndpoint::parse_uri(endpoint_ref)?
    } else {
        let (registry, _) = load_registry(config)?;
        registry
            .get(endpoint_ref.trim())
            .cloned()
            .ok_or_else(|| anyhow!("endpoint '{}' not found", endpoint_ref))?
    };

    let headers: HashMap<String, String> = headers.into_iter().collect();
    let reply = run_exchange(endpoint_ref, endpoint, new_exchange(None, headers)).await;
    println!("{}", serde_json::to_string_pretty(&reply)?);

    match reply {
        ServerMessage::ExchangeResult { ok: true, .. } => Ok(ExitCode::SUCCESS),
        _ => Ok(ExitCode::FAILURE),
    }
}
