//! Notification synchronization controller.
//!
//! Keeps the unread counter in line with the server for the signed-in
//! identity: it opens the push connection, loads the authoritative unread
//! baseline over REST and counts live `notification:new` events addressed to
//! the active role.
//!
//! ```text
//! Idle ──apply_identity(Some)──▶ Connecting ──baseline ok──▶ Synced
//!  ▲                                 │ baseline failed: stay    │
//!  └──────────── teardown / apply_identity(None) ◀──────────────┘
//! ```
//!
//! The REST baseline and push events race. What happens to pushes that land
//! before the baseline is chosen by [`BaselineRacePolicy`].

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};

use repack_shared::{ApiError, Notification, PushNotification, Role, SessionIdentity};

use crate::api_client::NotificationApi;
use crate::lock;
use crate::stores::UnreadCounter;
use crate::telemetry::{LogTelemetry, SyncEvent, Telemetry};
use crate::ws::{SubscriptionId, WsClient};

/// Lifecycle of the notification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// Connected (or connecting) without a confirmed baseline.
    Connecting,
    Synced,
}

/// Treatment of push events that arrive while the baseline request is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselineRacePolicy {
    /// Buffer them and add them on top of the baseline, skipping any whose
    /// id the baseline already contains.
    #[default]
    Replay,
    /// Count them immediately; the baseline overwrites them when it lands.
    Drop,
}

impl FromStr for BaselineRacePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replay" => Ok(Self::Replay),
            "drop" => Ok(Self::Drop),
            other => Err(format!("unknown race policy: {other}")),
        }
    }
}

/// Number of entries in `notifications` that are unread for `role`.
pub fn count_unread(notifications: &[Notification], role: &Role) -> u32 {
    let count = notifications
        .iter()
        .filter(|n| n.counts_as_unread(role))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Optional collaborators of [`NotificationSync`].
#[derive(Clone)]
pub struct SyncOptions {
    pub policy: BaselineRacePolicy,
    pub telemetry: Arc<dyn Telemetry>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            policy: BaselineRacePolicy::default(),
            telemetry: Arc::new(LogTelemetry),
        }
    }
}

struct ActiveSession {
    identity: SessionIdentity,
    epoch: u64,
    subscription: Option<SubscriptionId>,
    /// Ids (if any) of pushes held back until the baseline lands.
    pending: Option<Vec<Option<String>>>,
}

#[derive(Default)]
struct SessionSlot {
    state: SyncState,
    active: Option<ActiveSession>,
    next_epoch: u64,
}

struct SyncShared {
    api: Arc<dyn NotificationApi>,
    transport: WsClient,
    counter: UnreadCounter,
    telemetry: Arc<dyn Telemetry>,
    policy: BaselineRacePolicy,
    slot: Mutex<SessionSlot>,
}

/// Cloneable handle to the controller; clones drive the same session.
#[derive(Clone)]
pub struct NotificationSync {
    shared: Arc<SyncShared>,
}

impl NotificationSync {
    pub fn new(api: Arc<dyn NotificationApi>, transport: WsClient, counter: UnreadCounter) -> Self {
        Self::with_options(api, transport, counter, SyncOptions::default())
    }

    pub fn with_options(
        api: Arc<dyn NotificationApi>,
        transport: WsClient,
        counter: UnreadCounter,
        options: SyncOptions,
    ) -> Self {
        Self {
            shared: Arc::new(SyncShared {
                api,
                transport,
                counter,
                telemetry: options.telemetry,
                policy: options.policy,
                slot: Mutex::new(SessionSlot::default()),
            }),
        }
    }

    pub fn state(&self) -> SyncState {
        lock(&self.shared.slot).state
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        lock(&self.shared.slot)
            .active
            .as_ref()
            .map(|active| active.identity.clone())
    }

    pub fn counter(&self) -> &UnreadCounter {
        &self.shared.counter
    }

    pub fn transport(&self) -> &WsClient {
        &self.shared.transport
    }

    /// React to the current auth identity.
    ///
    /// `None` ends any active session. A new identity replaces the active
    /// session, connects, subscribes to pushes and then awaits the unread
    /// baseline. Re-applying the active identity does nothing.
    pub async fn apply_identity(&self, identity: Option<SessionIdentity>) {
        let Some(identity) = identity else {
            if !self.teardown() {
                self.shared.telemetry.record(SyncEvent::IdentityMissing);
            }
            return;
        };

        let Some(epoch) = self.begin_session(&identity) else {
            return;
        };
        self.load_baseline(&identity, epoch).await;
    }

    /// End the active session: unsubscribe, disconnect, reset the counter.
    ///
    /// Returns false when there was no session to end.
    pub fn teardown(&self) -> bool {
        let ended = {
            let mut slot = lock(&self.shared.slot);
            slot.state = SyncState::Idle;
            slot.active.take()
        };
        let Some(ended) = ended else {
            return false;
        };

        if let Some(id) = ended.subscription {
            self.shared.transport.off_notification(id);
        }
        self.shared.transport.disconnect();
        self.shared.counter.set(0);
        self.shared.telemetry.record(SyncEvent::SessionEnded {
            user_id: ended.identity.user_id,
        });
        true
    }

    /// Mark a notification read on the server, then decrement locally.
    ///
    /// On failure the counter is left alone.
    pub async fn mark_read(&self, notification_id: &str) -> Result<u32, ApiError> {
        match self.shared.api.mark_read(notification_id).await {
            Ok(()) => Ok(self.mark_read_locally()),
            Err(e) => {
                self.shared.telemetry.record(SyncEvent::MarkReadFailed {
                    notification_id: notification_id.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Decrement for an item the UI has already marked read.
    pub fn mark_read_locally(&self) -> u32 {
        self.shared.counter.decrement()
    }

    fn begin_session(&self, identity: &SessionIdentity) -> Option<u64> {
        let same = lock(&self.shared.slot)
            .active
            .as_ref()
            .is_some_and(|active| &active.identity == identity);
        if same {
            return None;
        }
        self.teardown();

        let shared = &self.shared;
        shared.transport.connect(&identity.user_id, &identity.role);

        let epoch = {
            let mut slot = lock(&shared.slot);
            let epoch = slot.next_epoch;
            slot.next_epoch += 1;
            slot.state = SyncState::Connecting;
            slot.active = Some(ActiveSession {
                identity: identity.clone(),
                epoch,
                subscription: None,
                pending: match shared.policy {
                    BaselineRacePolicy::Replay => Some(Vec::new()),
                    BaselineRacePolicy::Drop => None,
                },
            });
            epoch
        };
        shared.telemetry.record(SyncEvent::SessionStarted {
            user_id: identity.user_id.clone(),
            role: identity.role.clone(),
        });

        let weak: Weak<SyncShared> = Arc::downgrade(shared);
        let role = identity.role.clone();
        let subscription = shared
            .transport
            .on_notification(Arc::new(move |event: &PushNotification| {
                if let Some(shared) = weak.upgrade() {
                    handle_push(&shared, epoch, &role, event);
                }
            }));

        match subscription {
            Some(id) => {
                let attached = {
                    let mut slot = lock(&shared.slot);
                    match slot.active.as_mut().filter(|active| active.epoch == epoch) {
                        Some(active) => {
                            active.subscription = Some(id);
                            true
                        }
                        None => false,
                    }
                };
                if !attached {
                    shared.transport.off_notification(id);
                }
            }
            None => shared.telemetry.record(SyncEvent::SubscriptionUnavailable {
                user_id: identity.user_id.clone(),
            }),
        }

        Some(epoch)
    }

    async fn load_baseline(&self, identity: &SessionIdentity, epoch: u64) {
        let shared = &self.shared;
        let result = shared.api.fetch_notifications(&identity.user_id).await;

        // The slot stays locked from taking the buffer to setting the counter,
        // so no push can slip between the two.
        let event = {
            let mut slot = lock(&shared.slot);
            let pending = slot
                .active
                .as_mut()
                .filter(|active| active.epoch == epoch)
                .map(|active| active.pending.take().unwrap_or_default());

            match (pending, result) {
                (None, _) => SyncEvent::BaselineDiscarded {
                    user_id: identity.user_id.clone(),
                },
                (Some(pending), Ok(notifications)) => {
                    let baseline = count_unread(&notifications, &identity.role);
                    let known: HashSet<&str> =
                        notifications.iter().filter_map(|n| n.id.as_deref()).collect();
                    let replayed = pending
                        .iter()
                        .filter(|id| id.as_deref().map_or(true, |id| !known.contains(id)))
                        .count();
                    let replayed = u32::try_from(replayed).unwrap_or(u32::MAX);
                    let unread = baseline.saturating_add(replayed);
                    shared.counter.set(unread);
                    slot.state = SyncState::Synced;
                    SyncEvent::BaselineApplied { unread, replayed }
                }
                (Some(pending), Err(e)) => {
                    // Stale baseline; buffered pushes still count.
                    for _ in &pending {
                        shared.counter.increment();
                    }
                    SyncEvent::BaselineFailed {
                        user_id: identity.user_id.clone(),
                        error: e.to_string(),
                    }
                }
            }
        };
        shared.telemetry.record(event);
    }
}

fn handle_push(shared: &SyncShared, epoch: u64, role: &Role, event: &PushNotification) {
    if !role.matches_receiver(event.receiver_type.as_deref()) {
        shared.telemetry.record(SyncEvent::PushDiscarded {
            receiver_type: event.receiver_type.clone().unwrap_or_default(),
        });
        return;
    }

    let outcome = {
        let mut slot = lock(&shared.slot);
        let Some(active) = slot.active.as_mut().filter(|active| active.epoch == epoch) else {
            return;
        };
        match active.pending.as_mut() {
            Some(pending) => {
                pending.push(event.id.clone());
                SyncEvent::PushBuffered {
                    pending: u32::try_from(pending.len()).unwrap_or(u32::MAX),
                }
            }
            None => SyncEvent::PushAccepted {
                unread: shared.counter.increment(),
            },
        }
    };
    shared.telemetry.record(outcome);
}
