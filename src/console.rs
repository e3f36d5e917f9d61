//! Interactive operator console
//!
//! Reads operator lines from stdin and renders activity-log records, state
//! changes and info snapshots as they happen. Socket events and operator input
//! are processed on the same task, one at a time.

use std::io::Write;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::warn;

use crate::client::{ClientEvent, ConnectOptions, ConnectionManager};
use crate::protocol::SET_SPEED_VERB;

const HELP: &str = "\
Commands:
  :connect        open the connection
  :disconnect     close the connection
  :toggle         connect when disconnected, otherwise disconnect
  :info           send get_info
  :speed N        send wsB N
  :state          show the connection state
  :log            replay the activity log
  :snapshot       show the last info snapshot
  :help           show this help
  :quit           disconnect and exit
Any other line is sent to the device verbatim (e.g. forward, DS, wsB 40).";

/// What the console loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Operator console bound to one connection manager
pub struct Console {
    manager: ConnectionManager,
    options: ConnectOptions,
}

impl Console {
    pub fn new(manager: ConnectionManager, options: ConnectOptions) -> Self {
        Self { manager, options }
    }

    /// Connect, then process input and socket events until `:quit` or EOF
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut notifications = self.manager.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("{}", HELP);
        self.manager.connect(&self.options);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line.context("Failed to read operator input")? {
                        Some(line) => {
                            if self.execute(&line) == Flow::Quit {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                event = self.manager.next_event() => {
                    match event {
                        Some(event) => self.manager.handle_event(event),
                        None => break,
                    }
                }
                notification = notifications.recv() => {
                    match notification {
                        Ok(notification) => render(&notification),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Console display lagged by {} records", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }

        self.manager.disconnect();
        // Show whatever the final commands produced
        while let Ok(notification) = notifications.try_recv() {
            render(&notification);
        }
        Ok(())
    }

    fn execute(&mut self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }

        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match word {
            ":quit" | ":q" => return Flow::Quit,
            ":help" => println!("{}", HELP),
            ":connect" => self.manager.connect(&self.options),
            ":disconnect" => self.manager.disconnect(),
            ":toggle" => self.manager.toggle(&self.options),
            ":info" => {
                self.manager.dispatcher().get_info();
            }
            ":speed" => {
                self.manager
                    .dispatcher()
                    .send_command_with_raw_argument(SET_SPEED_VERB, rest);
            }
            ":state" => println!("{}", self.manager.state()),
            ":log" => {
                for entry in self.manager.log().entries() {
                    println!("{}", entry);
                }
            }
            ":snapshot" => match self.manager.info_snapshot() {
                Some(snapshot) => print_snapshot(snapshot),
                None => println!("No info received yet"),
            },
            _ => {
                self.manager.dispatcher().send_command(line);
            }
        }
        Flow::Continue
    }
}

fn render(notification: &ClientEvent) {
    match notification {
        ClientEvent::Logged(entry) => println!("{}", entry),
        ClientEvent::StateChanged(state) => println!("-- {} --", state),
        ClientEvent::InfoUpdated(snapshot) => print_snapshot(snapshot),
    }
    let _ = std::io::stdout().flush();
}

fn print_snapshot(snapshot: &serde_json::Value) {
    let pretty = serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| snapshot.to_string());
    println!("Info:\n{}", pretty);
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::client::{
        ClientResult, ConnectionState, Connector, Outbound, SocketEvent, SocketHandle,
        TaggedEvent,
    };

    /// Connector whose single socket writes into a shared channel
    struct ChannelConnector {
        outbound_tx: mpsc::UnboundedSender<Outbound>,
    }

    impl Connector for ChannelConnector {
        fn open(
            &self,
            _url: &str,
            generation: u64,
            _events: mpsc::UnboundedSender<TaggedEvent>,
        ) -> ClientResult<SocketHandle> {
            Ok(SocketHandle::new(generation, self.outbound_tx.clone()))
        }
    }

    fn console() -> Console {
        Console::new(ConnectionManager::new("localhost"), ConnectOptions::new("", "1"))
    }

    #[test]
    fn test_quit() {
        let mut console = console();
        assert_eq!(console.execute(":quit"), Flow::Quit);
        assert_eq!(console.execute("  :q  "), Flow::Quit);
    }

    #[test]
    fn test_blank_line_ignored() {
        let mut console = console();
        assert_eq!(console.execute("   "), Flow::Continue);
        assert!(console.manager.log().is_empty());
    }

    #[test]
    fn test_commands_rejected_while_disconnected() {
        let mut console = console();
        console.execute("forward");
        console.execute(":info");
        console.execute(":speed 40");

        assert_eq!(console.manager.log().error_count(), 3);
        assert_eq!(console.manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_lines() {
        let mut console = console();
        console.execute(":connect");
        assert_eq!(console.manager.state(), ConnectionState::Connecting);
        assert_eq!(console.manager.url(), Some("ws://localhost:1"));

        console.execute(":disconnect");
        assert_eq!(console.manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_unknown_line_sent_verbatim() {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let manager =
            ConnectionManager::with_connector("localhost", ChannelConnector { outbound_tx });
        let mut console = Console::new(manager, ConnectOptions::default());

        console.execute(":connect");
        console.manager.handle_event(TaggedEvent::new(1, SocketEvent::Open));
        assert_eq!(console.manager.state(), ConnectionState::Connected);

        console.execute("wsB 42");
        console.execute("  forward now  ");

        let mut frames = Vec::new();
        while let Ok(Outbound::Text(text)) = outbound_rx.try_recv() {
            frames.push(text);
        }
        assert_eq!(frames, vec!["admin:123456", "wsB 42", "forward now"]);
    }
}
