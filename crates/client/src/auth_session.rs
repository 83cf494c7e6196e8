//! Authentication session management with on-disk persistence.

use dioxus::prelude::*;
use repack_shared::{AuthUser, SessionIdentity};
use serde::{Deserialize, Serialize};

use crate::api_client::ApiClient;
use crate::config::ClientConfig;
use crate::storage::Storage;

const STORAGE_KEY: &str = "repack_session";

/// Authentication context provided to the app
#[derive(Clone, Copy)]
pub struct AuthContext {
    pub session: Signal<Option<AuthSession>>,
    pub config: Signal<ClientConfig>,
}

/// Stored session data
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub user: AuthUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AuthSession {
    /// Identity notifications are synced for; `None` without a user id.
    pub fn identity(&self) -> Option<SessionIdentity> {
        SessionIdentity::resolve(&self.user)
    }
}

/// Provider component that sets up auth context
#[component]
pub fn AuthProvider(config: ClientConfig, children: Element) -> Element {
    let session = use_signal(|| Storage::platform().and_then(|s| s.load::<AuthSession>(STORAGE_KEY)));
    let config = use_signal(move || config);

    // Sync session to disk
    use_effect(move || {
        let current = session.cloned();
        let Some(storage) = Storage::platform() else {
            return;
        };
        match current.as_ref() {
            Some(sess) => {
                if !storage.save(STORAGE_KEY, sess) {
                    tracing::warn!("Failed to persist session");
                }
            }
            None => storage.remove(STORAGE_KEY),
        }
    });

    use_context_provider(|| AuthContext { session, config });

    children
}

impl AuthContext {
    pub fn login(&mut self, user: AuthUser, token: Option<String>) {
        self.session.set(Some(AuthSession { user, token }));
    }

    /// Logout and clear session. The notification provider tears its
    /// session down when it sees this.
    pub fn logout(&mut self) {
        self.session.set(None);
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_some()
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.session.read().as_ref().and_then(AuthSession::identity)
    }

    /// API client for the configured backend, carrying the session token.
    pub fn client(&self) -> ApiClient {
        let client = ApiClient::new().with_base_url(self.config.read().api_base_url.clone());
        client.set_token(self.session.read().as_ref().and_then(|s| s.token.clone()));
        client
    }
}
