//! Connection manager
//!
//! Owns the socket handle and the connection state machine:
//!
//! ```text
//! Disconnected --connect()--> Connecting --Open--> Connected
//!      ^                                               |
//!      +------------ Closed event / disconnect() ------+
//! ```
//!
//! Socket callbacks arrive as [`TaggedEvent`]s on a single channel and are
//! applied one at a time by [`ConnectionManager::handle_event`], so state is
//! only ever mutated from the task that drives the manager.

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use super::{
    ActivityLog, ClientError, ClientResult, CommandDispatcher, ConnectOptions, ConnectionState,
    Connector, Credentials, Endpoint, LogEntry, LogLevel, SocketEvent, SocketHandle, TaggedEvent,
    WsConnector,
};
use crate::protocol::{classify, InboundMessage};

/// Host used when the operator leaves the host field blank
pub const DEFAULT_FALLBACK_HOST: &str = "localhost";

/// Notifications published to UI subscribers
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The connection state changed
    StateChanged(ConnectionState),
    /// A record was appended to the activity log
    Logged(LogEntry),
    /// A new info snapshot replaced the previous one
    InfoUpdated(Value),
}

/// Manages the single connection to a device
pub struct ConnectionManager {
    /// Opens sockets; tokio-tungstenite in production
    connector: Box<dyn Connector>,
    /// Host substituted for a blank host field
    fallback_host: String,
    state: ConnectionState,
    /// Write half of the current socket, if any
    socket: Option<SocketHandle>,
    /// Incremented on every connect so late events from old sockets are ignored
    generation: u64,
    /// URL of the current or last connection attempt
    url: Option<String>,
    /// Credentials to send once the socket opens
    credentials: Credentials,
    log: ActivityLog,
    info_snapshot: Option<Value>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent>,
    notify_tx: broadcast::Sender<ClientEvent>,
}

impl ConnectionManager {
    /// Create a manager that connects over tokio-tungstenite
    pub fn new(fallback_host: impl Into<String>) -> Self {
        Self::with_connector(fallback_host, WsConnector)
    }

    /// Create a manager with a custom connector
    pub fn with_connector(
        fallback_host: impl Into<String>,
        connector: impl Connector + 'static,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notify_tx, _) = broadcast::channel(1024);
        Self {
            connector: Box::new(connector),
            fallback_host: fallback_host.into(),
            state: ConnectionState::Disconnected,
            socket: None,
            generation: 0,
            url: None,
            credentials: Credentials::default(),
            log: ActivityLog::new(),
            info_snapshot: None,
            events_tx,
            events_rx,
            notify_tx,
        }
    }

    /// Subscribe to state, log and info notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.notify_tx.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether commands can be sent right now
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.socket.is_some()
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// Most recent `get_info` status object
    pub fn info_snapshot(&self) -> Option<&Value> {
        self.info_snapshot.as_ref()
    }

    /// URL of the current or last connection attempt
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Borrow a dispatcher for sending commands
    pub fn dispatcher(&mut self) -> CommandDispatcher<'_> {
        CommandDispatcher::new(self)
    }

    /// Start connecting to the device.
    ///
    /// Never fails to the caller: construction problems are logged and the
    /// state stays `Disconnected`. On success the state is `Connecting` until
    /// the socket reports `Open`. Any existing socket is closed first.
    pub fn connect(&mut self, options: &ConnectOptions) {
        if self.socket.is_some() {
            self.disconnect();
        }

        let endpoint = match Endpoint::resolve(&options.host, &options.port, &self.fallback_host) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                self.record(LogLevel::Error, format!("Connect error: {}", e));
                return;
            }
        };
        let url = endpoint.url();
        self.record(LogLevel::Info, format!("Connecting to {} ...", url));

        self.generation += 1;
        self.credentials = Credentials::resolve(&options.username, &options.password);
        self.url = Some(url.clone());
        self.set_state(ConnectionState::Connecting);

        match self.connector.open(&url, self.generation, self.events_tx.clone()) {
            Ok(socket) => {
                debug!("Socket {} created for {}", socket.generation(), url);
                self.socket = Some(socket);
            }
            Err(e) => {
                self.record(LogLevel::Error, format!("Connect error: {}", e));
                self.set_state(ConnectionState::Disconnected);
            }
        }
    }

    /// Close the socket if there is one. Calling it again is a no-op.
    pub fn disconnect(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };
        self.record(LogLevel::Info, "Closing connection ...");
        socket.close();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Connect when not connected (a pending attempt is replaced), disconnect otherwise
    pub fn toggle(&mut self, options: &ConnectOptions) {
        if self.state != ConnectionState::Connected {
            self.connect(options);
        } else {
            self.disconnect();
        }
    }

    /// Wait for the next socket event
    pub async fn next_event(&mut self) -> Option<TaggedEvent> {
        self.events_rx.recv().await
    }

    /// Wait for the next socket event and apply it
    pub async fn pump(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply one socket event to the connection state
    pub fn handle_event(&mut self, tagged: TaggedEvent) {
        if tagged.generation != self.generation {
            debug!(
                "Ignoring {:?} from superseded socket {} (current {})",
                tagged.event, tagged.generation, self.generation
            );
            return;
        }

        match tagged.event {
            SocketEvent::Open => self.on_open(),
            SocketEvent::Message(text) => self.on_message(text),
            // Errors are reported but never change state; only Open and
            // Closed move the state machine.
            SocketEvent::Error(detail) => {
                self.record(LogLevel::Error, ClientError::Transport(detail).to_string());
            }
            SocketEvent::Closed => {
                self.socket = None;
                self.set_state(ConnectionState::Disconnected);
                self.record(LogLevel::Info, "Disconnected");
            }
        }
    }

    fn on_open(&mut self) {
        if self.socket.is_none() {
            debug!("Socket opened after disconnect was requested, ignoring");
            return;
        }
        self.set_state(ConnectionState::Connected);
        self.record(LogLevel::Info, "Connected. Sending credentials ...");

        // Credentials are always the first frame on a fresh socket
        let frame = self.credentials.frame();
        if let Err(e) = self.send_frame(frame) {
            self.record(LogLevel::Error, e.to_string());
        }
    }

    fn on_message(&mut self, text: String) {
        self.record(LogLevel::Info, format!("← {}", text));
        if let InboundMessage::InfoSnapshot(snapshot) = classify(&text) {
            self.info_snapshot = Some(snapshot.clone());
            let _ = self.notify_tx.send(ClientEvent::InfoUpdated(snapshot));
        }
    }

    /// Write a frame on the current socket
    pub(crate) fn send_frame(&self, frame: String) -> ClientResult<()> {
        match &self.socket {
            Some(socket) => socket.send_text(frame),
            None => Err(ClientError::NotConnected),
        }
    }

    /// Append a record to the activity log and publish it
    pub(crate) fn record(&mut self, level: LogLevel, text: impl Into<String>) {
        let entry = LogEntry::new(level, text);
        self.log.push(entry.clone());
        let _ = self.notify_tx.send(ClientEvent::Logged(entry));
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!("Connection state: {} -> {}", self.state, state);
        self.state = state;
        let _ = self.notify_tx.send(ClientEvent::StateChanged(state));
    }
}
