//! Push and notification data types

use lila_sw_common::{SwError, SwResult};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Host identifier for a displayed notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub u64);

/// JSON message delivered by a push event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub tag: String,
    /// Attached to the notification as its data
    pub payload: Value,
}

impl PushMessage {
    /// Decode a push body. Missing fields default; non-JSON bodies fail.
    pub fn from_slice(data: &[u8]) -> SwResult<Self> {
        serde_json::from_slice(data)
            .map_err(|e| SwError::payload_with_source("push body is not a JSON message", e))
    }
}

/// Options a notification is displayed with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub badge: String,
    pub icon: String,
    pub body: String,
    pub tag: String,
    pub data: Value,
    pub require_interaction: bool,
}

/// A notification shown by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub options: NotificationOptions,
}

/// Routing fields carried in a notification's `userData`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub full_id: Option<String>,
    pub thread_id: Option<String>,
    pub challenge_id: Option<String>,
}

impl UserData {
    /// Extract routing fields from notification data (`{ userData: {..} }`).
    ///
    /// Never fails. Fields follow JS truthiness: missing, `null`, `false`,
    /// empty strings and zero are absent; anything else is rendered as JS
    /// would render it in a string.
    pub fn from_notification_data(data: &Value) -> Self {
        let user_data = data.get("userData");
        let field = |name: &str| user_data.and_then(|u| u.get(name)).and_then(routing_value);
        Self {
            full_id: field("fullId"),
            thread_id: field("threadId"),
            challenge_id: field("challengeId"),
        }
    }
}

/// A present field renders like JS `String(value)`; falsy values are absent.
fn routing_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        _ => Some(js_string(value)),
    }
}

fn js_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => js_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(js_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn js_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        // Integral floats print without a fraction below 1e21.
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
