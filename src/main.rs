//! standard-finder-mcp: MCP server for IETF and OpenID standards documents
//!
//! Serves RFC, Internet-Draft and OpenID specification lookups to AI
//! assistants over stdio or HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use standard_finder_mcp::config::{self, Config};
use standard_finder_mcp::docs::DocumentService;
use standard_finder_mcp::mcp::http::{self, HttpState};
use standard_finder_mcp::mcp::{Dispatcher, McpServer, ResponseGuard, ToolRegistry};
use standard_finder_mcp::tools;

/// MCP server for IETF RFCs, Internet-Drafts and OpenID specifications.
///
/// Speaks newline-delimited JSON-RPC on stdin/stdout by default, or serves
/// HTTP with --http.
#[derive(Parser, Debug)]
#[command(name = "standard-finder-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Serve over HTTP instead of stdio
    #[arg(long, conflicts_with = "stdio")]
    http: bool,

    /// Serve over stdin/stdout (default)
    #[arg(long)]
    stdio: bool,

    /// HTTP port (overrides the configuration file)
    #[arg(long, requires = "http")]
    port: Option<u16>,

    /// HTTP bind address (overrides the configuration file)
    #[arg(long, requires = "http")]
    host: Option<String>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Logs go to stderr; stdout carries the
/// protocol.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves the HTTP bind address from config and CLI overrides.
fn http_address(cfg: &Config, args: &Args) -> Result<SocketAddr, String> {
    let host = args.host.as_deref().unwrap_or(&cfg.http.host);
    let port = args.port.unwrap_or(cfg.http.port);
    format!("{host}:{port}")
        .parse()
        .map_err(|e| format!("invalid HTTP address {host}:{port}: {e}"))
}

/// Entry point for the standard-finder-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig was read from: {}", default_path.display());
                    eprintln!("See config/example-config.json for the accepted keys");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting standard-finder-mcp server"
    );

    let docs = match DocumentService::from_config(&cfg.backend) {
        Ok(docs) => Arc::new(docs),
        Err(e) => {
            error!(error = %e, "Failed to create HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let mut registry = ToolRegistry::new();
    tools::register_all(&mut registry, &docs);
    info!(tools = registry.len(), "Tools registered");

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), &cfg.server));
    let guard = ResponseGuard::new(&cfg.limits);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = if args.http {
        let addr = match http_address(&cfg, &args) {
            Ok(addr) => addr,
            Err(e) => {
                error!(error = %e, "Invalid HTTP address");
                return ExitCode::FAILURE;
            }
        };
        info!(address = %addr, "Serving MCP over HTTP");
        runtime.block_on(http::serve(addr, HttpState::new(dispatcher, guard)))
    } else {
        info!("MCP server ready, waiting for client connection...");
        let mut server = McpServer::new(dispatcher, guard);
        runtime.block_on(server.run())
    };

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
