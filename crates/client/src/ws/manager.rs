//! Push connection manager.
//!
//! [`WsClient`] owns at most one push link for its lifetime. `connect` is
//! idempotent: while a link is alive it only updates (and, when open,
//! re-sends) the registration instead of opening a second connection.

use std::sync::{Arc, Mutex};

use repack_shared::{ClientCommand, Registration, Role};

use super::connection::{
    ConnectionState, EventHandlers, NotificationCallback, PushConnector, PushLink,
    SharedRegistration, SubscriptionId, WsConnector,
};
use crate::config::ClientConfig;
use crate::lock;

struct ActiveLink {
    link: Box<dyn PushLink>,
    registration: SharedRegistration,
    handlers: EventHandlers,
}

/// Client for the notification push server.
pub struct WsClient {
    endpoint: String,
    connector: Arc<dyn PushConnector>,
    active: Mutex<Option<ActiveLink>>,
}

impl WsClient {
    pub fn new(endpoint: impl Into<String>, connector: Arc<dyn PushConnector>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connector,
            active: Mutex::new(None),
        }
    }

    /// Client using the tokio-tungstenite transport and the configured endpoint.
    pub fn from_config(config: &ClientConfig) -> Self {
        let endpoint = config.push_endpoint().unwrap_or_else(|e| {
            tracing::warn!(
                "Invalid push URL '{}' ({}), falling back to default",
                config.socket_url,
                e
            );
            ClientConfig::default()
                .push_endpoint()
                .unwrap_or_else(|_| "ws://localhost:5000/ws".to_string())
        });
        Self::new(endpoint, Arc::new(WsConnector::new(config.reconnect.clone())))
    }

    /// Connect as `user_id` acting in `role`.
    ///
    /// A missing user id is logged and ignored. With a live link the
    /// registration is updated and re-emitted; otherwise a fresh link is
    /// opened, which registers once it is open.
    pub fn connect(&self, user_id: &str, role: &Role) {
        if user_id.trim().is_empty() || role.as_str().is_empty() {
            tracing::warn!("Push connect skipped: missing user id or role");
            return;
        }
        let registration = Registration {
            user_id: user_id.to_string(),
            mode: role.clone(),
        };

        let mut active = lock(&self.active);
        if let Some(current) = active.as_ref() {
            let state = current.link.state();
            if !state.is_terminal() {
                *lock(&current.registration) = registration.clone();
                if state.is_connected() {
                    match current.link.send(ClientCommand::Register(registration)) {
                        Ok(()) => tracing::debug!("Re-registered {} as {}", user_id, role),
                        Err(e) => tracing::warn!("Re-register failed: {}", e),
                    }
                }
                return;
            }
            tracing::info!("Previous push link is {:?}, opening a new one", state);
        }

        let shared = Arc::new(Mutex::new(registration));
        let handlers = EventHandlers::default();
        let link = self
            .connector
            .open(&self.endpoint, shared.clone(), handlers.clone());
        tracing::info!("Opening push connection to {}", self.endpoint);
        *active = Some(ActiveLink {
            link,
            registration: shared,
            handlers,
        });
    }

    /// Subscribe to `notification:new`. `None` when no link exists yet.
    pub fn on_notification(&self, callback: NotificationCallback) -> Option<SubscriptionId> {
        match lock(&self.active).as_ref() {
            Some(current) => Some(current.handlers.on_notification(callback)),
            None => {
                tracing::warn!("on_notification called before connect; ignored");
                None
            }
        }
    }

    /// Remove a subscription made with [`WsClient::on_notification`].
    pub fn off_notification(&self, id: SubscriptionId) {
        match lock(&self.active).as_ref() {
            Some(current) => {
                current.handlers.remove(id);
            }
            None => tracing::warn!("off_notification called without a connection; ignored"),
        }
    }

    /// Close the link and forget it; the next `connect` starts fresh.
    pub fn disconnect(&self) {
        if let Some(current) = lock(&self.active).take() {
            current.handlers.clear();
            current.link.close();
            tracing::info!("Push connection to {} disconnected", self.endpoint);
        }
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.active)
            .as_ref()
            .map(|current| current.link.state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::testing::FakeConnector;
    use repack_shared::{PushNotification, ServerEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client() -> (WsClient, FakeConnector) {
        let connector = FakeConnector::default();
        let client = WsClient::new("ws://push.test/ws", Arc::new(connector.clone()));
        (client, connector)
    }

    #[test]
    fn second_connect_reregisters_instead_of_reopening() {
        let (client, connector) = client();
        client.connect("u1", &Role::Business);
        client.connect("u1", &Role::Business);

        assert_eq!(connector.opened(), 1);
        assert_eq!(
            connector.sent(),
            vec![ClientCommand::Register(Registration {
                user_id: "u1".into(),
                mode: Role::Business,
            })]
        );
    }

    #[test]
    fn connect_while_connecting_updates_registration_only() {
        let connector = FakeConnector::with_initial_state(ConnectionState::Connecting);
        let client = WsClient::new("ws://push.test/ws", Arc::new(connector.clone()));
        client.connect("u1", &Role::Customer);
        client.connect("u2", &Role::Admin);

        assert_eq!(connector.opened(), 1);
        assert!(connector.sent().is_empty());
        assert_eq!(
            connector.registration(),
            Some(Registration {
                user_id: "u2".into(),
                mode: Role::Admin,
            })
        );
    }

    #[test]
    fn missing_user_is_a_noop() {
        let (client, connector) = client();
        client.connect("", &Role::Customer);
        client.connect("   ", &Role::Customer);
        assert_eq!(connector.opened(), 0);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn failed_link_is_replaced() {
        let (client, connector) = client();
        client.connect("u1", &Role::Customer);
        connector.set_state(ConnectionState::Failed {
            reason: "gone".into(),
        });
        client.connect("u1", &Role::Customer);
        assert_eq!(connector.opened(), 2);
    }

    #[test]
    fn subscribe_requires_connection() {
        let (client, _connector) = client();
        assert!(client.on_notification(Arc::new(|_: &PushNotification| {})).is_none());
    }

    #[test]
    fn handlers_receive_until_unsubscribed() {
        let (client, connector) = client();
        client.connect("u1", &Role::Customer);

        let hits = Arc::new(AtomicUsize::new(0));
        let counted = hits.clone();
        let id = client
            .on_notification(Arc::new(move |_: &PushNotification| {
                counted.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("subscribed");

        connector.emit(ServerEvent::NotificationNew(PushNotification::default()));
        client.off_notification(id);
        connector.emit(ServerEvent::NotificationNew(PushNotification::default()));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disconnect_closes_and_allows_fresh_connect() {
        let (client, connector) = client();
        client.connect("u1", &Role::Customer);
        client.on_notification(Arc::new(|_: &PushNotification| {}));
        client.disconnect();

        assert!(connector.closed());
        assert_eq!(connector.handler_count(), 0);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.connect("u1", &Role::Customer);
        assert_eq!(connector.opened(), 2);
    }
}
