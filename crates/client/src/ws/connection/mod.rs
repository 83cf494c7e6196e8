//! Push connection state, reconnect policy and the transport seam.
//!
//! [`PushConnector`] opens a [`PushLink`]; the production implementation is
//! the tokio-tungstenite [`WsConnector`], tests swap in an in-memory fake.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use repack_shared::{ClientCommand, PushError, PushNotification, Registration, ServerEvent};

use crate::lock;

/// Connection state for a push connection
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// Closed by the client, or never opened.
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// The link will not come back on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Failed { .. }
        )
    }
}

/// Configuration for auto-reconnect behavior: bounded attempts, fixed delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (0 = infinite)
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 1000,
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Whether another attempt is allowed after `attempt` failed ones.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt < self.max_attempts
    }
}

/// Callback for `notification:new` events.
pub type NotificationCallback = Arc<dyn Fn(&PushNotification) + Send + Sync>;

/// Token returned by a subscription, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct HandlerTable {
    next_id: u64,
    notification: HashMap<SubscriptionId, NotificationCallback>,
}

/// Event callbacks attached to one connection.
#[derive(Clone, Default)]
pub struct EventHandlers {
    table: Arc<Mutex<HandlerTable>>,
}

impl EventHandlers {
    pub fn on_notification(&self, callback: NotificationCallback) -> SubscriptionId {
        let mut table = lock(&self.table);
        let id = SubscriptionId(table.next_id);
        table.next_id += 1;
        table.notification.insert(id, callback);
        id
    }

    pub fn remove(&self, id: SubscriptionId) -> bool {
        lock(&self.table).notification.remove(&id).is_some()
    }

    pub fn clear(&self) {
        lock(&self.table).notification.clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.table).notification.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an inbound event. Callbacks run outside the table lock so they
    /// may subscribe or unsubscribe.
    pub fn dispatch(&self, event: &ServerEvent) {
        match event {
            ServerEvent::NotificationNew(notification) => {
                let callbacks: Vec<NotificationCallback> =
                    lock(&self.table).notification.values().cloned().collect();
                for callback in callbacks {
                    callback(notification);
                }
            }
        }
    }
}

/// Identity sent in `register` on every (re)open of a link.
pub type SharedRegistration = Arc<Mutex<Registration>>;

/// An open (or opening) push connection.
pub trait PushLink: Send + Sync {
    fn state(&self) -> ConnectionState;

    /// Queue a command; fails once the link is terminal.
    fn send(&self, command: ClientCommand) -> Result<(), PushError>;

    /// Close the link. It does not reconnect afterwards.
    fn close(&self);
}

/// Opens push links.
pub trait PushConnector: Send + Sync {
    /// Start connecting to `endpoint`. The link sends `register` with the
    /// current `registration` each time it opens, and feeds inbound events to
    /// `handlers`.
    fn open(
        &self,
        endpoint: &str,
        registration: SharedRegistration,
        handlers: EventHandlers,
    ) -> Box<dyn PushLink>;
}

mod connection_native;
pub use connection_native::{WsConnection, WsConnector};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn reconnect_budget() {
        let config = ReconnectConfig {
            max_attempts: 2,
            delay_ms: 10,
        };
        assert!(config.allows(0));
        assert!(config.allows(1));
        assert!(!config.allows(2));
        assert_eq!(config.delay(), Duration::from_millis(10));

        let unbounded = ReconnectConfig {
            max_attempts: 0,
            ..config
        };
        assert!(unbounded.allows(1_000));
    }

    #[test]
    fn terminal_states() {
        assert!(ConnectionState::Disconnected.is_terminal());
        assert!(ConnectionState::Failed { reason: "x".into() }.is_terminal());
        assert!(!ConnectionState::Reconnecting { attempt: 1 }.is_terminal());
        assert!(!ConnectionState::Connected.is_terminal());
    }

    #[test]
    fn handlers_dispatch_until_removed() {
        let handlers = EventHandlers::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = hits.clone();
        let id = handlers.on_notification(Arc::new(move |_: &PushNotification| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));

        let event = ServerEvent::NotificationNew(PushNotification::default());
        handlers.dispatch(&event);
        assert!(handlers.remove(id));
        assert!(!handlers.remove(id));
        handlers.dispatch(&event);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(handlers.is_empty());
    }
}
