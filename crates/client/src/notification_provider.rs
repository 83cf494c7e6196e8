//! Mounts the notification session into the component tree.
//!
//! `NotificationProvider` owns one [`NotificationSync`] and its counter for
//! the lifetime of the subtree. It follows the auth session and mirrors the
//! counter into a signal that components read through [`use_unread_count`].

use std::sync::Arc;

use dioxus::prelude::*;
use futures_util::StreamExt;

use crate::auth_session::AuthContext;
use crate::stores::UnreadCounter;
use crate::sync::{NotificationSync, SyncOptions};
use crate::telemetry::LogTelemetry;
use crate::ws::WsClient;

/// Notification state shared with descendants.
#[derive(Clone)]
pub struct NotificationContext {
    pub unread: Signal<u32>,
    pub controller: NotificationSync,
}

impl NotificationContext {
    /// Mark a notification read on the server and decrement the badge.
    pub fn mark_read(&self, notification_id: String) {
        let controller = self.controller.clone();
        spawn(async move {
            // Failures are reported through telemetry.
            let _ = controller.mark_read(&notification_id).await;
        });
    }
}

/// Provider component that runs the notification session for the signed-in user
#[component]
pub fn NotificationProvider(children: Element) -> Element {
    let auth = use_context::<AuthContext>();

    let (api, controller) = use_hook(move || {
        let config = auth.config.read().clone();
        let api = auth.client();
        let controller = NotificationSync::with_options(
            Arc::new(api.clone()),
            WsClient::from_config(&config),
            UnreadCounter::new(),
            SyncOptions {
                policy: config.race_policy,
                telemetry: Arc::new(LogTelemetry),
            },
        );
        (api, controller)
    });

    let mut unread = use_signal(|| controller.counter().get());

    // Mirror the counter into the signal
    let counter = controller.counter().clone();
    use_future(move || {
        let mut updates = counter.subscribe();
        async move {
            while let Some(value) = updates.next().await {
                unread.set(value);
            }
        }
    });

    // Follow the auth session
    let sync = controller.clone();
    use_effect(move || {
        let session = auth.session.read().clone();
        api.set_token(session.as_ref().and_then(|s| s.token.clone()));
        let identity = session.as_ref().and_then(|s| s.identity());
        let sync = sync.clone();
        spawn(async move {
            sync.apply_identity(identity).await;
        });
    });

    let on_drop = controller.clone();
    use_drop(move || {
        on_drop.teardown();
    });

    use_context_provider(|| NotificationContext { unread, controller });

    children
}

/// Current unread count. Must be called under a `NotificationProvider`.
pub fn use_unread_count() -> Signal<u32> {
    use_context::<NotificationContext>().unread
}
