//! Dashboard shell: sign-in form, then the header with the unread badge.

use dioxus::prelude::*;
use repack_shared::{AuthUser, Role};
use serde_json::Value;

use crate::auth_session::AuthContext;
use crate::components::NotificationBadge;
use crate::notification_provider::NotificationContext;

const ROLES: [Role; 3] = [Role::Customer, Role::Business, Role::Admin];

#[component]
pub fn Dashboard() -> Element {
    let auth = use_context::<AuthContext>();

    if auth.is_authenticated() {
        rsx! { SignedIn {} }
    } else {
        rsx! { SignIn {} }
    }
}

#[component]
fn SignIn() -> Element {
    let mut auth = use_context::<AuthContext>();
    let mut user_id = use_signal(String::new);
    let mut token = use_signal(String::new);
    let mut role = use_signal(|| Role::Customer.as_str().to_string());

    let on_submit = move |evt: FormEvent| {
        evt.prevent_default();
        let id = user_id.read().trim().to_string();
        if id.is_empty() {
            return;
        }
        let token = token.read().trim().to_string();
        let user = AuthUser {
            id: Some(id),
            role: Some(Value::String(role.read().clone())),
            email: None,
        };
        auth.login(user, (!token.is_empty()).then_some(token));
    };

    rsx! {
        form {
            class: "flex flex-col gap-3 p-6 max-w-sm",
            onsubmit: on_submit,
            input {
                placeholder: "User id",
                value: "{user_id}",
                oninput: move |evt| user_id.set(evt.value()),
            }
            input {
                placeholder: "Access token (optional)",
                value: "{token}",
                oninput: move |evt| token.set(evt.value()),
            }
            select {
                value: "{role}",
                onchange: move |evt| role.set(evt.value()),
                for r in ROLES {
                    option { value: r.as_str(), "{r}" }
                }
            }
            button { r#type: "submit", "Sign in" }
        }
    }
}

#[component]
fn SignedIn() -> Element {
    let mut auth = use_context::<AuthContext>();
    let notifications = use_context::<NotificationContext>();
    let mut notification_id = use_signal(String::new);

    let identity = auth.identity();
    let who = identity
        .as_ref()
        .map(|i| format!("{} ({})", i.user_id, i.role))
        .unwrap_or_default();

    let mark_read = move |_| {
        let id = notification_id.read().trim().to_string();
        if id.is_empty() {
            notifications.controller.mark_read_locally();
        } else {
            notifications.mark_read(id);
        }
        notification_id.set(String::new());
    };

    rsx! {
        header {
            class: "flex items-center justify-between p-4",
            span { "{who}" }
            div {
                class: "flex items-center gap-4",
                NotificationBadge {}
                button { onclick: move |_| auth.logout(), "Sign out" }
            }
        }
        main {
            class: "flex gap-2 p-4",
            input {
                placeholder: "Notification id",
                value: "{notification_id}",
                oninput: move |evt| notification_id.set(evt.value()),
            }
            button { onclick: mark_read, "Mark read" }
        }
    }
}
