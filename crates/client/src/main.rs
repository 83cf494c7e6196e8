//! Repack Client - desktop entry point

#![allow(non_snake_case)]

use dioxus::prelude::*;
use repack_client::{
    auth_session::AuthProvider, config::ClientConfig, logging::init_tracing,
    notification_provider::NotificationProvider, views::Dashboard,
};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Fail fast on a malformed socket URL instead of retrying it forever.
    let config = ClientConfig::from_env();
    let endpoint = config.push_endpoint()?;
    tracing::info!("API at {}, push at {}", config.api_base_url, endpoint);

    dioxus::launch(App);
    Ok(())
}

#[component]
fn App() -> Element {
    let config = use_hook(ClientConfig::from_env);

    rsx! {
        AuthProvider {
            config,
            NotificationProvider {
                Dashboard {}
            }
        }
    }
}
