//! Client configuration from environment variables.

use repack_shared::{is_local_address, PUSH_PATH};
use url::Url;

use crate::sync::BaselineRacePolicy;
use crate::ws::ReconnectConfig;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SOCKET_URL: &str = "http://localhost:5000";

/// Runtime configuration of the notification client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    pub api_base_url: String,
    /// Base URL of the push server. The push endpoint is derived from it.
    pub socket_url: String,
    pub reconnect: ReconnectConfig,
    pub race_policy: BaselineRacePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            reconnect: ReconnectConfig::default(),
            race_policy: BaselineRacePolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Read configuration from the process environment.
    ///
    /// Environment variables:
    /// - `REPACK_API_URL`: REST base URL (default: "http://localhost:5000/api")
    /// - `REPACK_SOCKET_URL`: push server base URL (default: "http://localhost:5000")
    /// - `REPACK_RECONNECT_ATTEMPTS`: reconnect budget (default: 5)
    /// - `REPACK_RECONNECT_DELAY_MS`: delay between attempts (default: 1000)
    /// - `REPACK_RACE_POLICY`: "replay" | "drop" (default: "replay")
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let reconnect = ReconnectConfig {
            max_attempts: non_empty("REPACK_RECONNECT_ATTEMPTS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.reconnect.max_attempts),
            delay_ms: non_empty("REPACK_RECONNECT_DELAY_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.reconnect.delay_ms),
        };

        let race_policy = match non_empty("REPACK_RACE_POLICY") {
            Some(v) => v.parse().unwrap_or_else(|_| {
                tracing::warn!("Unknown REPACK_RACE_POLICY '{}', using default", v);
                defaults.race_policy
            }),
            None => defaults.race_policy,
        };

        Self {
            api_base_url: non_empty("REPACK_API_URL")
                .map(|v| with_scheme(&v))
                .unwrap_or(defaults.api_base_url),
            socket_url: non_empty("REPACK_SOCKET_URL").unwrap_or(defaults.socket_url),
            reconnect,
            race_policy,
        }
    }

    /// WebSocket URL of the push endpoint, e.g. `ws://localhost:5000/ws`.
    pub fn push_endpoint(&self) -> Result<String, url::ParseError> {
        let mut url = Url::parse(&with_scheme(&self.socket_url))?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        // Only fails for non-special schemes, which keep their own scheme.
        let _ = url.set_scheme(scheme);
        let path = format!("{}{}", url.path().trim_end_matches('/'), PUSH_PATH);
        url.set_path(&path);
        Ok(url.to_string())
    }
}

/// Prefix a bare host with `http://` for local addresses and `https://` otherwise.
pub fn with_scheme(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        return host.to_string();
    }
    if is_local_address(host) {
        format!("http://{}", host)
    } else {
        format!("https://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.push_endpoint().unwrap(), "ws://localhost:5000/ws");
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("REPACK_API_URL", "api.repack.app"),
            ("REPACK_SOCKET_URL", "https://push.repack.app/realtime/"),
            ("REPACK_RECONNECT_ATTEMPTS", "2"),
            ("REPACK_RECONNECT_DELAY_MS", "250"),
            ("REPACK_RACE_POLICY", "drop"),
        ]));
        assert_eq!(config.api_base_url, "https://api.repack.app");
        assert_eq!(config.reconnect.max_attempts, 2);
        assert_eq!(config.reconnect.delay_ms, 250);
        assert_eq!(config.race_policy, BaselineRacePolicy::Drop);
        assert_eq!(
            config.push_endpoint().unwrap(),
            "wss://push.repack.app/realtime/ws"
        );
    }

    #[test]
    fn bad_numbers_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("REPACK_RECONNECT_ATTEMPTS", "many"),
            ("REPACK_RACE_POLICY", "sometimes"),
        ]));
        assert_eq!(config.reconnect, ReconnectConfig::default());
        assert_eq!(config.race_policy, BaselineRacePolicy::Replay);
    }

    #[test]
    fn bare_local_host_gets_http() {
        let config = ClientConfig::from_lookup(lookup(&[("REPACK_SOCKET_URL", "127.0.0.1:4000")]));
        assert_eq!(config.push_endpoint().unwrap(), "ws://127.0.0.1:4000/ws");
    }
}
