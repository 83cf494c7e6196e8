//! HTTP API client for the repack backend.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use repack_shared::{ApiError, Notification, NotificationList};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// HTTP client for REST calls.
///
/// Clones share the bearer token, so updating it after login reaches every
/// holder of the client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: String::new(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the base URL for API requests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the bearer token used on every request.
    pub fn set_token(&self, token: Option<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.base_url.is_empty() {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            }
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }

    fn authorized(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    async fn execute<TRes: DeserializeOwned>(&self, rb: RequestBuilder) -> Result<TRes, ApiError> {
        let resp = self
            .authorized(rb)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if !is_success {
            return Err(ApiError::Http { status, body: text });
        }

        if text.is_empty() {
            serde_json::from_str("null").map_err(|e| ApiError::Deserialize(e.to_string()))
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
        }
    }

    /// Make a GET request
    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        self.execute(self.client.get(self.url(path))).await
    }

    /// Make a PATCH request with JSON body
    pub async fn patch_json<TReq: Serialize, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        self.execute(self.client.patch(self.url(path)).json(body)).await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Path listing the notifications stored for a receiver.
pub fn receiver_notifications_path(user_id: &str) -> String {
    format!("/notifications/receiver/{}", urlencoding::encode(user_id))
}

/// Path marking one notification read.
pub fn mark_read_path(notification_id: &str) -> String {
    format!("/notifications/{}/read", urlencoding::encode(notification_id))
}

/// Notification endpoints the sync controller depends on.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// All stored notifications of `user_id`, read and unread.
    async fn fetch_notifications(&self, user_id: &str) -> Result<Vec<Notification>, ApiError>;

    async fn mark_read(&self, notification_id: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl NotificationApi for ApiClient {
    async fn fetch_notifications(&self, user_id: &str) -> Result<Vec<Notification>, ApiError> {
        let list: NotificationList = self.get_json(&receiver_notifications_path(user_id)).await?;
        Ok(list.into_vec())
    }

    async fn mark_read(&self, notification_id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .patch_json(
                &mark_read_path(notification_id),
                &serde_json::json!({ "isRead": true }),
            )
            .await?;
        Ok(())
    }
}
