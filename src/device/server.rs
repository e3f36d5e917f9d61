//! Mock device server
//!
//! Speaks the Rasptank WebSocket protocol without any hardware attached, so
//! the console can be exercised locally: a credential handshake followed by
//! one JSON status response per command frame.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::respond;
use crate::client::Credentials;

/// Sent once the credential frame matches
pub const AUTH_ACCEPTED: &str =
    "congratulation, you have connect with server\r\nnow, you can do something else";

/// Sent for every credential frame that does not match
pub const AUTH_REJECTED: &str = "sorry, the username or password is wrong, please submit again";

/// Port the mock device listens on by default
pub const DEFAULT_MOCK_PORT: u16 = 8889;

/// Configuration for the mock device
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Address to bind to
    pub bind: String,
    /// Port to listen on
    pub port: u16,
    /// Credentials the device accepts
    pub credentials: Credentials,
}

impl DeviceConfig {
    /// Create a configuration accepting the factory credentials
    pub fn new(bind: String, port: u16) -> Self {
        Self {
            bind,
            port,
            credentials: Credentials::default(),
        }
    }

    /// Set the accepted credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// WebSocket server emulating a device
pub struct DeviceServer {
    config: DeviceConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl DeviceServer {
    /// Create a new mock device
    pub fn new(config: DeviceConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            shutdown_tx,
        }
    }

    /// Trigger server shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        info!("Mock device listening on ws://{}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let credentials = Arc::new(self.config.credentials.clone());

        loop {
            tokio::select! {
                // Accept new connections
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let shutdown_rx = self.shutdown_tx.subscribe();
                            let credentials = Arc::clone(&credentials);

                            tokio::spawn(async move {
                                let result =
                                    handle_connection(stream, peer_addr, credentials, shutdown_rx)
                                        .await;
                                if let Err(e) = result {
                                    error!("Connection error from {}: {}", peer_addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                // Handle shutdown signal
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping mock device");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Handle a single console connection
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    credentials: Arc<Credentials>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    info!("New connection from {}", peer_addr);

    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut authenticated = false;

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received frame from {}: {}", peer_addr, text);

                        let reply = if authenticated {
                            match respond(&text) {
                                Some(response) => response.to_json()?,
                                None => continue,
                            }
                        } else if check_permit(&text, &credentials) {
                            info!("Client {} authenticated", peer_addr);
                            authenticated = true;
                            AUTH_ACCEPTED.to_string()
                        } else {
                            warn!("Client {} sent wrong credentials", peer_addr);
                            AUTH_REJECTED.to_string()
                        };
                        ws_sender.send(Message::Text(reply)).await?;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!(
                            "Received binary message from {} ({} bytes), ignoring",
                            peer_addr,
                            data.len()
                        );
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_sender.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} requested close", peer_addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", peer_addr, e);
                        break;
                    }
                    None => {
                        info!("Connection closed by {}", peer_addr);
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, closing connection to {}", peer_addr);
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    info!("Connection from {} closed", peer_addr);
    Ok(())
}

/// Check a `username:password` frame against the accepted credentials
fn check_permit(frame: &str, credentials: &Credentials) -> bool {
    let (username, password) = frame.split_once(':').unwrap_or(("", ""));
    username == credentials.username && password == credentials.password
}
