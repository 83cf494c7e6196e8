//! Data models shared between the REST API, the push channel and the client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// --- Identity ---

/// Role a session acts under. Notifications are scoped to one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Customer,
    Business,
    Admin,
    /// Any other role claim, kept lowercased.
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Customer => "customer",
            Role::Business => "business",
            Role::Admin => "admin",
            Role::Other(s) => s,
        }
    }

    /// Parse a single role name, case-insensitively.
    ///
    /// Returns `None` for an empty or all-whitespace name.
    pub fn parse(name: &str) -> Option<Self> {
        if name.trim().is_empty() {
            return None;
        }
        let lower = name.to_lowercase();
        Some(match lower.as_str() {
            "customer" => Role::Customer,
            "business" => Role::Business,
            "admin" => Role::Admin,
            _ => Role::Other(lower),
        })
    }

    /// Normalize a role claim as found in authentication state.
    ///
    /// The claim may be a scalar string or an ordered list of strings, where
    /// the first element wins. Anything absent or unusable falls back to
    /// [`Role::Customer`].
    pub fn from_claim(claim: Option<&Value>) -> Self {
        let name = match claim {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Array(items)) => items.first().and_then(Value::as_str),
            _ => None,
        };
        name.and_then(Role::parse).unwrap_or_default()
    }

    /// Whether a notification addressed to `receiver_type` belongs to this role.
    ///
    /// Notifications without a receiver type, or with an empty one, are
    /// addressed to everyone.
    pub fn matches_receiver(&self, receiver_type: Option<&str>) -> bool {
        match receiver_type {
            None => true,
            Some(rt) if rt.is_empty() => true,
            Some(rt) => rt.to_lowercase() == self.as_str(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Role::from_claim(Some(&value)))
    }
}

/// Authenticated user as stored in the auth state.
///
/// The backend is not consistent about the id field name, so all three
/// spellings are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(default, alias = "_id", alias = "userId", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The identity a notification session is opened for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub user_id: String,
    pub role: Role,
}

impl SessionIdentity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Resolve the active identity from auth state. `None` without a user id.
    pub fn resolve(user: &AuthUser) -> Option<Self> {
        let user_id = user.id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
        Some(Self::new(user_id, Role::from_claim(user.role.as_ref())))
    }
}

// --- Notifications ---

/// Read flag with loose truthiness: null, `false`, `0` and `""` are unread.
fn falsy_bool<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// A stored notification as returned by `GET /notifications/receiver/{userId}`.
///
/// Only the read flag and the receiver type matter to the client; every other
/// field is carried through untouched for the rendering layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "falsy_bool")]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_type: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Notification {
    /// Whether this entry counts toward the unread badge of `role`.
    pub fn counts_as_unread(&self, role: &Role) -> bool {
        !self.is_read && role.matches_receiver(self.receiver_type.as_deref())
    }
}

/// Response body of the notification listing; both shapes are served.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NotificationList {
    Wrapped { data: Vec<Notification> },
    Bare(Vec<Notification>),
}

impl NotificationList {
    pub fn into_vec(self) -> Vec<Notification> {
        match self {
            NotificationList::Wrapped { data } => data,
            NotificationList::Bare(items) => items,
        }
    }
}

/// Payload of a `notification:new` push event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushNotification {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_type: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl PushNotification {
    pub fn for_receiver(receiver_type: impl Into<String>) -> Self {
        Self {
            receiver_type: Some(receiver_type.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_from_list_takes_first_element_lowercased() {
        let claim = json!(["Business", "admin"]);
        assert_eq!(Role::from_claim(Some(&claim)), Role::Business);

        let claim = json!(["Warehouse"]);
        assert_eq!(Role::from_claim(Some(&claim)).as_str(), "warehouse");
    }

    #[test]
    fn role_from_string_is_lowercased() {
        assert_eq!(Role::from_claim(Some(&json!("ADMIN"))), Role::Admin);
        assert_eq!(Role::from_claim(Some(&json!("Staff"))), Role::Other("staff".into()));
    }

    #[test]
    fn role_defaults_to_customer() {
        assert_eq!(Role::from_claim(None), Role::Customer);
        assert_eq!(Role::from_claim(Some(&Value::Null)), Role::Customer);
        assert_eq!(Role::from_claim(Some(&json!([]))), Role::Customer);
        assert_eq!(Role::from_claim(Some(&json!(42))), Role::Customer);
        assert_eq!(Role::from_claim(Some(&json!([7, "admin"]))), Role::Customer);
        assert_eq!(Role::from_claim(Some(&json!("  "))), Role::Customer);
        assert_eq!(Role::from_claim(Some(&json!({ "name": "admin" }))), Role::Customer);
    }

    #[test]
    fn receiver_match_is_case_insensitive() {
        assert!(Role::Business.matches_receiver(None));
        assert!(Role::Business.matches_receiver(Some("BUSINESS")));
        assert!(!Role::Business.matches_receiver(Some("customer")));
    }

    #[test]
    fn empty_receiver_type_is_addressed_to_everyone() {
        assert!(Role::Admin.matches_receiver(Some("")));

        let n: Notification =
            serde_json::from_value(json!({ "isRead": false, "receiverType": "" })).unwrap();
        assert!(n.counts_as_unread(&Role::Customer));
        assert!(n.counts_as_unread(&Role::Business));
    }

    #[test]
    fn read_flag_uses_loose_truthiness() {
        let list: Vec<Notification> = serde_json::from_value(json!([
            { "isRead": 0 },
            { "isRead": 1 },
            { "isRead": "" },
            { "isRead": null },
            { "isRead": true }
        ]))
        .unwrap();
        let flags: Vec<bool> = list.iter().map(|n| n.is_read).collect();
        assert_eq!(flags, vec![false, true, false, false, true]);
    }

    #[test]
    fn identity_requires_user_id() {
        let user: AuthUser = serde_json::from_value(json!({ "role": "admin" })).unwrap();
        assert!(SessionIdentity::resolve(&user).is_none());

        let user: AuthUser = serde_json::from_value(json!({ "_id": "  " })).unwrap();
        assert!(SessionIdentity::resolve(&user).is_none());

        let user: AuthUser =
            serde_json::from_value(json!({ "_id": "u1", "role": ["Business"] })).unwrap();
        assert_eq!(
            SessionIdentity::resolve(&user),
            Some(SessionIdentity::new("u1", Role::Business))
        );
    }

    #[test]
    fn notification_list_accepts_both_shapes() {
        let wrapped: NotificationList =
            serde_json::from_value(json!({ "data": [{ "isRead": false }] })).unwrap();
        assert_eq!(wrapped.into_vec().len(), 1);

        let bare: NotificationList =
            serde_json::from_value(json!([{ "isRead": true }, { "isRead": null }])).unwrap();
        let items = bare.into_vec();
        assert!(items[0].is_read);
        assert!(!items[1].is_read);
    }

    #[test]
    fn notification_keeps_opaque_fields() {
        let n: Notification = serde_json::from_value(json!({
            "_id": "n1",
            "title": "Voucher redeemed",
            "receiverType": "business"
        }))
        .unwrap();
        assert_eq!(n.id.as_deref(), Some("n1"));
        assert!(!n.is_read);
        assert_eq!(n.payload.get("title"), Some(&json!("Voucher redeemed")));
        assert!(n.counts_as_unread(&Role::Business));
        assert!(!n.counts_as_unread(&Role::Customer));
    }
}
