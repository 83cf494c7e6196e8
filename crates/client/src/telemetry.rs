//! Diagnostic events emitted by the notification sync controller.
//!
//! The controller never logs directly; it reports [`SyncEvent`]s to an
//! injected [`Telemetry`] sink. Production wiring forwards them to `tracing`,
//! tests record them and assert on the sequence.

use std::sync::{Arc, Mutex};

use repack_shared::Role;

use crate::lock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Auth state has no resolvable user; nothing was connected.
    IdentityMissing,
    SessionStarted { user_id: String, role: Role },
    /// The push handler could not be attached (no transport handle yet).
    SubscriptionUnavailable { user_id: String },
    /// Counter set from the server baseline plus `replayed` buffered pushes.
    BaselineApplied { unread: u32, replayed: u32 },
    BaselineFailed { user_id: String, error: String },
    /// A baseline arrived after its session ended.
    BaselineDiscarded { user_id: String },
    PushAccepted { unread: u32 },
    PushBuffered { pending: u32 },
    PushDiscarded { receiver_type: String },
    SessionEnded { user_id: String },
    MarkReadFailed { notification_id: String, error: String },
}

/// Sink for [`SyncEvent`]s.
pub trait Telemetry: Send + Sync {
    fn record(&self, event: SyncEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn record(&self, event: SyncEvent) {
        match event {
            SyncEvent::IdentityMissing => {
                tracing::debug!("notification sync idle: no authenticated user")
            }
            SyncEvent::SessionStarted { user_id, role } => {
                tracing::info!(%user_id, %role, "notification session started")
            }
            SyncEvent::SubscriptionUnavailable { user_id } => {
                tracing::warn!(%user_id, "push subscription unavailable, socket not created")
            }
            SyncEvent::BaselineApplied { unread, replayed } => {
                tracing::info!(unread, replayed, "unread baseline applied")
            }
            SyncEvent::BaselineFailed { user_id, error } => {
                tracing::error!(%user_id, %error, "failed to fetch notifications")
            }
            SyncEvent::BaselineDiscarded { user_id } => {
                tracing::debug!(%user_id, "stale notification baseline dropped")
            }
            SyncEvent::PushAccepted { unread } => {
                tracing::debug!(unread, "push notification counted")
            }
            SyncEvent::PushBuffered { pending } => {
                tracing::debug!(pending, "push notification buffered until baseline")
            }
            SyncEvent::PushDiscarded { receiver_type } => {
                tracing::debug!(%receiver_type, "push notification for another role ignored")
            }
            SyncEvent::SessionEnded { user_id } => {
                tracing::info!(%user_id, "notification session ended")
            }
            SyncEvent::MarkReadFailed {
                notification_id,
                error,
            } => tracing::error!(%notification_id, %error, "failed to mark notification read"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        lock(&self.events).clone()
    }

    pub fn contains(&self, event: &SyncEvent) -> bool {
        lock(&self.events).contains(event)
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, event: SyncEvent) {
        lock(&self.events).push(event);
    }
}
