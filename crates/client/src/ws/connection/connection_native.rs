//! Native push connection using tokio-tungstenite.

use std::sync::{Arc, Mutex};

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use repack_shared::{ClientCommand, PushError, ServerEvent};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{
    ConnectionState, EventHandlers, PushConnector, PushLink, ReconnectConfig, SharedRegistration,
};
use crate::lock;

/// Opens [`WsConnection`]s with a fixed reconnect policy.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    reconnect: ReconnectConfig,
}

impl WsConnector {
    pub fn new(reconnect: ReconnectConfig) -> Self {
        Self { reconnect }
    }
}

impl PushConnector for WsConnector {
    fn open(
        &self,
        endpoint: &str,
        registration: SharedRegistration,
        handlers: EventHandlers,
    ) -> Box<dyn PushLink> {
        Box::new(WsConnection::open(
            endpoint.to_string(),
            registration,
            handlers,
            self.reconnect.clone(),
        ))
    }
}

/// A managed WebSocket connection to the push server.
pub struct WsConnection {
    endpoint: String,
    state: Arc<Mutex<ConnectionState>>,
    /// Channel for sending commands
    sender: UnboundedSender<ClientCommand>,
    closed: watch::Sender<bool>,
}

impl WsConnection {
    /// Start connecting in a background task on the current tokio runtime.
    pub fn open(
        endpoint: String,
        registration: SharedRegistration,
        handlers: EventHandlers,
        reconnect: ReconnectConfig,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let (closed, closed_rx) = watch::channel(false);
        let state = Arc::new(Mutex::new(ConnectionState::Connecting));

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(run_connection(
                    endpoint.clone(),
                    state.clone(),
                    receiver,
                    registration,
                    handlers,
                    reconnect,
                    closed_rx,
                ));
            }
            Err(e) => {
                tracing::error!("Cannot open push connection to {}: {}", endpoint, e);
                *lock(&state) = ConnectionState::Failed {
                    reason: format!("no async runtime: {e}"),
                };
            }
        }

        Self {
            endpoint,
            state,
            sender,
            closed,
        }
    }
}

impl PushLink for WsConnection {
    fn state(&self) -> ConnectionState {
        lock(&self.state).clone()
    }

    fn send(&self, command: ClientCommand) -> Result<(), PushError> {
        if self.state().is_terminal() {
            return Err(PushError::Closed);
        }
        self.sender
            .unbounded_send(command)
            .map_err(|_| PushError::Closed)
    }

    fn close(&self) {
        if !*self.closed.borrow() {
            tracing::debug!("Closing push connection to {}", self.endpoint);
        }
        let _ = self.closed.send(true);
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.close();
    }
}

fn set_state(state: &Mutex<ConnectionState>, next: ConnectionState) {
    *lock(state) = next;
}

/// How an established session ended.
enum SessionEnd {
    /// `close()` was called or the handle was dropped.
    Closed,
    /// The server or the network dropped the socket.
    Lost,
}

/// Connection management loop: connect, register, pump frames, reconnect.
async fn run_connection(
    endpoint: String,
    state: Arc<Mutex<ConnectionState>>,
    mut commands: UnboundedReceiver<ClientCommand>,
    registration: SharedRegistration,
    handlers: EventHandlers,
    reconnect: ReconnectConfig,
    mut closed: watch::Receiver<bool>,
) {
    let mut attempt = 0u32;

    loop {
        if *closed.borrow() {
            break;
        }

        if attempt == 0 {
            set_state(&state, ConnectionState::Connecting);
        } else {
            set_state(&state, ConnectionState::Reconnecting { attempt });
        }

        let connected = tokio::select! {
            result = connect_async(endpoint.as_str()) => result,
            _ = closed.changed() => break,
        };

        match connected {
            Ok((ws_stream, _response)) => {
                attempt = 0;
                let (mut write, mut read) = ws_stream.split();

                // Register on every open, with whatever identity is current now.
                // The snapshot and the switch to Connected happen under the
                // registration lock: a concurrent `connect` either lands before
                // the snapshot or sees Connected and queues its own register.
                let register = {
                    let current = lock(&registration);
                    set_state(&state, ConnectionState::Connected);
                    ClientCommand::Register(current.clone())
                };
                match register.to_text() {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::text(text)).await {
                            tracing::error!("Register to {} failed: {}", endpoint, e);
                            continue_after_failure(&state, &reconnect, &mut attempt, &endpoint);
                            if !wait_before_retry(&state, &reconnect, &mut closed, attempt).await {
                                break;
                            }
                            continue;
                        }
                    }
                    Err(e) => tracing::error!("Serialize register failed: {}", e),
                }

                tracing::info!("Push connection to {} open", endpoint);

                let end = loop {
                    tokio::select! {
                        frame = read.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                tracing::debug!("Push received: {}", text.as_str());
                                match ServerEvent::from_text(text.as_str()) {
                                    Ok(Some(event)) => handlers.dispatch(&event),
                                    Ok(None) => tracing::debug!("Ignoring unknown push event"),
                                    Err(e) => tracing::error!("Failed to parse push frame: {}", e),
                                }
                            }
                            Some(Ok(Message::Close(_))) => {
                                tracing::info!("Push connection to {} received close frame", endpoint);
                                break SessionEnd::Lost;
                            }
                            Some(Ok(_)) => {
                                // Ping/pong are answered by tungstenite; binary is unused.
                            }
                            Some(Err(e)) => {
                                tracing::error!("Push read error: {}", e);
                                break SessionEnd::Lost;
                            }
                            None => break SessionEnd::Lost,
                        },
                        command = commands.next() => match command {
                            Some(cmd) => match cmd.to_text() {
                                Ok(json) => {
                                    tracing::debug!("Sending to {}: {}", endpoint, json);
                                    if let Err(e) = write.send(Message::text(json)).await {
                                        tracing::error!("Send failed: {}", e);
                                        break SessionEnd::Lost;
                                    }
                                }
                                Err(e) => tracing::error!("Serialize failed: {}", e),
                            },
                            // Sender dropped
                            None => break SessionEnd::Closed,
                        },
                        _ = closed.changed() => break SessionEnd::Closed,
                    }
                };

                match end {
                    SessionEnd::Closed => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    SessionEnd::Lost => {
                        tracing::warn!("Push connection to {} lost", endpoint);
                    }
                }
            }
            Err(e) => {
                tracing::error!("Push connection error for {}: {}", endpoint, e);
            }
        }

        continue_after_failure(&state, &reconnect, &mut attempt, &endpoint);
        if !wait_before_retry(&state, &reconnect, &mut closed, attempt).await {
            break;
        }
    }

    let mut current = lock(&state);
    if !matches!(*current, ConnectionState::Failed { .. }) {
        *current = ConnectionState::Disconnected;
    }
    drop(current);
    tracing::info!("Push connection to {} closed", endpoint);
}

/// Spend one attempt of the budget, or mark the link failed.
fn continue_after_failure(
    state: &Mutex<ConnectionState>,
    reconnect: &ReconnectConfig,
    attempt: &mut u32,
    endpoint: &str,
) {
    if reconnect.allows(*attempt) {
        *attempt += 1;
        set_state(state, ConnectionState::Reconnecting { attempt: *attempt });
    } else {
        tracing::error!(
            "Giving up on {} after {} reconnect attempts",
            endpoint,
            reconnect.max_attempts
        );
        set_state(
            state,
            ConnectionState::Failed {
                reason: format!(
                    "Max reconnect attempts ({}) exceeded",
                    reconnect.max_attempts
                ),
            },
        );
    }
}

/// Sleep out the reconnect delay. Returns false when the loop should stop.
async fn wait_before_retry(
    state: &Mutex<ConnectionState>,
    reconnect: &ReconnectConfig,
    closed: &mut watch::Receiver<bool>,
    attempt: u32,
) -> bool {
    if matches!(*lock(state), ConnectionState::Failed { .. }) {
        return false;
    }
    tracing::info!(
        "Reconnecting in {}ms (attempt {})",
        reconnect.delay_ms,
        attempt
    );
    let interrupted = tokio::select! {
        _ = tokio::time::sleep(reconnect.delay()) => false,
        _ = closed.changed() => true,
    };
    !interrupted && !*closed.borrow()
}
