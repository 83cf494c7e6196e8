//! Repack Client - live notification layer
//!
//! Push transport, unread counter and the controller that keeps the two in
//! sync with the backend, plus the Dioxus provider that mounts them in a UI
//! tree.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod api_client;
pub mod auth_session;
pub mod config;
pub mod logging;
pub mod notification_provider;
pub mod storage;
pub mod stores;
pub mod sync;
pub mod telemetry;
pub mod ws;

pub mod components;
pub mod views;

pub use api_client::{ApiClient, NotificationApi};
pub use auth_session::{AuthContext, AuthProvider, AuthSession};
pub use config::ClientConfig;
pub use notification_provider::{use_unread_count, NotificationContext, NotificationProvider};
pub use stores::UnreadCounter;
pub use sync::{BaselineRacePolicy, NotificationSync, SyncOptions, SyncState};
pub use telemetry::{LogTelemetry, RecordingTelemetry, SyncEvent, Telemetry};
pub use ws::{ConnectionState, WsClient};

/// Lock a mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
