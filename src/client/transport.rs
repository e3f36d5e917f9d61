//! Socket transport
//!
//! Opens the WebSocket in a background task and turns its callbacks into a
//! stream of [`SocketEvent`]s. The task owns the stream; the connection manager
//! only keeps a [`SocketHandle`] for writing frames and requesting close.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, handshake::client::Request, Message},
};
use tracing::{debug, info, warn};

use super::{ClientError, ClientResult};

/// Lifecycle and data events raised by a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The handshake completed and frames may be written
    Open,
    /// A text frame arrived
    Message(String),
    /// The transport reported an error
    Error(String),
    /// The socket is gone, whichever side closed it
    Closed,
}

/// A socket event tagged with the connection attempt that raised it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: SocketEvent,
}

impl TaggedEvent {
    pub fn new(generation: u64, event: SocketEvent) -> Self {
        Self { generation, event }
    }
}

/// Requests from the manager to the socket task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Write half of an open (or opening) socket
#[derive(Debug)]
pub struct SocketHandle {
    generation: u64,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
}

impl SocketHandle {
    pub fn new(generation: u64, outbound_tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            generation,
            outbound_tx,
        }
    }

    /// Connection attempt this handle belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a text frame for writing
    pub fn send_text(&self, text: impl Into<String>) -> ClientResult<()> {
        self.outbound_tx
            .send(Outbound::Text(text.into()))
            .map_err(|_| ClientError::SendFailed("socket task has stopped".to_string()))
    }

    /// Ask the socket task to close the connection
    pub fn close(&self) {
        let _ = self.outbound_tx.send(Outbound::Close);
    }
}

/// Opens sockets on behalf of the connection manager
pub trait Connector: Send {
    /// Start opening a socket to `url`.
    ///
    /// Must not wait for the handshake: the outcome is reported later through
    /// `events` as `Open`, or `Error` followed by `Closed`. An `Err` here means
    /// the socket could not even be created.
    fn open(
        &self,
        url: &str,
        generation: u64,
        events: mpsc::UnboundedSender<TaggedEvent>,
    ) -> ClientResult<SocketHandle>;
}

/// Connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(
        &self,
        url: &str,
        generation: u64,
        events: mpsc::UnboundedSender<TaggedEvent>,
    ) -> ClientResult<SocketHandle> {
        let request = url
            .into_client_request()
            .map_err(|e| ClientError::InvalidRequest {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        runtime.spawn(run_socket(request, generation, outbound_rx, events));

        Ok(SocketHandle::new(generation, outbound_tx))
    }
}

/// Drive one socket until either side closes it
async fn run_socket(
    request: Request,
    generation: u64,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TaggedEvent>,
) {
    let emit = |event: SocketEvent| {
        let _ = events.send(TaggedEvent::new(generation, event));
    };

    let uri = request.uri().to_string();
    let ws_stream = match connect_async(request).await {
        Ok((stream, response)) => {
            debug!("Handshake with {} completed ({})", uri, response.status());
            stream
        }
        Err(e) => {
            emit(SocketEvent::Error(e.to_string()));
            emit(SocketEvent::Closed);
            return;
        }
    };
    info!("Socket to {} open", uri);
    emit(SocketEvent::Open);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            // Frames queued by the manager
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = ws_sender.send(Message::Text(text)).await {
                            emit(SocketEvent::Error(e.to_string()));
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        debug!("Closing socket to {}", uri);
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            // Frames from the device
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        emit(SocketEvent::Message(text));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!(
                            "Received binary frame from {} ({} bytes), ignoring",
                            uri,
                            data.len()
                        );
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                            emit(SocketEvent::Error(e.to_string()));
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!("Device {} requested close", uri);
                        break;
                    }
                    Some(Err(e)) => {
                        emit(SocketEvent::Error(e.to_string()));
                        break;
                    }
                    None => {
                        info!("Connection to {} closed by peer", uri);
                        break;
                    }
                }
            }
        }
    }

    emit(SocketEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_queues_frames_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SocketHandle::new(3, tx);
        assert_eq!(handle.generation(), 3);

        handle.send_text("admin:123456").unwrap();
        handle.send_text("get_info").unwrap();
        handle.close();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("admin:123456".to_string()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("get_info".to_string()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    }

    #[test]
    fn test_send_after_task_stopped_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = SocketHandle::new(1, tx);
        assert!(matches!(handle.send_text("forward"), Err(ClientError::SendFailed(_))));
    }

    #[test]
    fn test_invalid_url_is_rejected_synchronously() {
        let (events, _rx) = mpsc::unbounded_channel();
        let result = WsConnector.open("ws://bad host:8888", 1, events);
        assert!(matches!(result, Err(ClientError::InvalidRequest { .. })));
    }

    #[test]
    fn test_open_without_runtime_fails() {
        let (events, _rx) = mpsc::unbounded_channel();
        let result = WsConnector.open("ws://localhost:8888", 1, events);
        assert_eq!(result.unwrap_err(), ClientError::NoRuntime);
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_closed() {
        // Reserve a port, then free it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (events, mut rx) = mpsc::unbounded_channel();
        let _handle = WsConnector
            .open(&format!("ws://{}", addr), 7, events)
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.generation, 7);
        assert!(matches!(first.event, SocketEvent::Error(_)));
        assert_eq!(rx.recv().await.unwrap().event, SocketEvent::Closed);
    }
}
