//! Push channel client.
//!
//! This module provides:
//! - A single managed connection per [`WsClient`] with bounded auto-reconnect
//! - Re-registration of the session identity on every (re)open
//! - Callback subscriptions for `notification:new` events
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │           WsClient           │  connect / on_notification / disconnect
//! └──────────────────────────────┘
//!                │ PushConnector::open
//!                ▼
//! ┌──────────────────────────────┐
//! │  PushLink (WsConnection)     │  register on open, reconnect loop
//! └──────────────────────────────┘
//!                │ EventHandlers::dispatch
//!                ▼
//! ┌──────────────────────────────┐
//! │  NotificationSync handler    │  role filter → UnreadCounter
//! └──────────────────────────────┘
//! ```

mod connection;
mod manager;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{
    ConnectionState, EventHandlers, NotificationCallback, PushConnector, PushLink,
    ReconnectConfig, SharedRegistration, SubscriptionId, WsConnection, WsConnector,
};
pub use manager::WsClient;
