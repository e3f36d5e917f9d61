//! Rasptank Console
//!
//! Operator console for a Rasptank robot. Connects to the robot's WebSocket
//! control port, logs in with a plaintext credential frame, sends short text
//! commands and shows the JSON status it answers with. Also ships a mock
//! device for trying the console without hardware.

mod client;
mod config;
mod console;
mod device;
#[allow(dead_code)]
mod protocol;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use client::{ConnectionManager, Credentials};
use config::ClientConfig;
use console::Console;
use device::{DeviceConfig, DeviceServer, DEFAULT_MOCK_PORT};

/// Rasptank Console
///
/// WebSocket control console for the Rasptank robot
#[derive(Parser, Debug)]
#[command(name = "rasptank-console")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to a device and open the interactive console
    Connect(ConnectArgs),
    /// Run a mock device that speaks the control protocol
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ConnectArgs {
    /// Configuration file with endpoint and credential defaults
    #[arg(short, long, default_value = config::CONFIG_FILE)]
    config: PathBuf,

    /// Device host (blank uses the fallback host)
    #[arg(long)]
    host: Option<String>,

    /// Device port (blank or non-numeric uses 8888)
    #[arg(short, long)]
    port: Option<String>,

    /// Username (blank uses the factory default)
    #[arg(short, long)]
    username: Option<String>,

    /// Password (blank uses the factory default)
    #[arg(long)]
    password: Option<String>,

    /// Host used when no device host is given
    #[arg(long)]
    fallback_host: Option<String>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_MOCK_PORT)]
    port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Username the device accepts
    #[arg(long, default_value = protocol::DEFAULT_USERNAME)]
    username: String,

    /// Password the device accepts
    #[arg(long, default_value = protocol::DEFAULT_PASSWORD)]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Command::Connect(args) => run_console(args).await,
        Command::Serve(args) => run_device(args).await,
    }
}

async fn run_console(args: ConnectArgs) -> anyhow::Result<()> {
    let mut config = ClientConfig::load(&args.config)?;
    if let Some(fallback_host) = args.fallback_host {
        config.fallback_host = fallback_host;
    }

    let mut options = config.connect_options();
    if let Some(host) = args.host {
        options.host = host;
    }
    if let Some(port) = args.port {
        options.port = port;
    }
    if let Some(username) = args.username {
        options.username = username;
    }
    if let Some(password) = args.password {
        options.password = password;
    }

    info!("Rasptank Console v{}", env!("CARGO_PKG_VERSION"));

    let manager = ConnectionManager::new(config.fallback_host);
    Console::new(manager, options).run().await
}

async fn run_device(args: ServeArgs) -> anyhow::Result<()> {
    info!("Rasptank mock device v{}", env!("CARGO_PKG_VERSION"));

    let config = DeviceConfig::new(args.bind, args.port)
        .with_credentials(Credentials::resolve(&args.username, &args.password));

    let server = Arc::new(DeviceServer::new(config));
    let server_handle = Arc::clone(&server);

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Initiating graceful shutdown...");
        server_handle.shutdown();
    });

    server.run().await?;

    info!("Mock device shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
