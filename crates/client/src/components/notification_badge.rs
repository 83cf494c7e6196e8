//! Unread badge - bell with the live unread count.

use dioxus::prelude::*;

use crate::notification_provider::use_unread_count;

/// Text shown in the badge; counts above 99 are capped.
pub fn badge_label(count: u32) -> Option<String> {
    match count {
        0 => None,
        1..=99 => Some(count.to_string()),
        _ => Some("99+".to_string()),
    }
}

#[derive(Props, Clone, PartialEq)]
pub struct NotificationBadgeProps {
    #[props(optional)]
    pub class: Option<String>,
}

#[component]
pub fn NotificationBadge(props: NotificationBadgeProps) -> Element {
    let unread = use_unread_count();
    let count = unread();
    let class = props.class.unwrap_or_default();

    rsx! {
        span {
            class: "relative inline-flex items-center {class}",
            title: "{count} unread notifications",
            span { "🔔" }
            if let Some(label) = badge_label(count) {
                span {
                    class: "absolute -top-2 -right-3 rounded-full bg-red-500 px-1.5 text-xs font-bold text-white",
                    "{label}"
                }
            }
        }
    }
}
