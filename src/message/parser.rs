//! Typed view of app-server notifications

use serde_json::{Map, Value};

/// Notification methods the client understands
#[derive(Debug, Clone, PartialEq)]
pub enum ServerNotification {
    /// `turn/started`
    TurnStarted,
    /// `item/agentMessage/delta`: a chunk of streamed assistant text
    AgentMessageDelta {
        /// Text to append
        delta: String,
    },
    /// `turn/completed` (or the legacy `codex/event/task_complete`)
    TurnCompleted,
    /// `item/completed`
    ItemCompleted {
        /// `item.type`, e.g. `commandExecution`, `fileChange`, `reasoning`
        item_type: String,
        /// The full item object
        item: Map<String, Value>,
    },
    /// Anything else, kept verbatim
    Other {
        /// Method name
        method: String,
        /// Params object, if present
        params: Option<Map<String, Value>>,
    },
}

/// Interpret a notification's method and params
///
/// Known methods with missing or ill-typed fields fall back to
/// [`ServerNotification::Other`] rather than failing.
#[must_use]
pub fn parse_notification(method: &str, params: Option<&Map<String, Value>>) -> ServerNotification {
    let other = || ServerNotification::Other {
        method: method.to_string(),
        params: params.cloned(),
    };

    match method {
        "turn/started" => ServerNotification::TurnStarted,
        "turn/completed" | "codex/event/task_complete" => ServerNotification::TurnCompleted,
        "item/agentMessage/delta" => params
            .and_then(|p| p.get("delta"))
            .and_then(Value::as_str)
            .map_or_else(other, |delta| ServerNotification::AgentMessageDelta {
                delta: delta.to_string(),
            }),
        "item/completed" => {
            let item = params.and_then(|p| p.get("item")).and_then(Value::as_object);
            let item_type = item.and_then(|i| i.get("type")).and_then(Value::as_str);
            match (item, item_type) {
                (Some(item), Some(item_type)) => ServerNotification::ItemCompleted {
                    item_type: item_type.to_string(),
                    item: item.clone(),
                },
                _ => other(),
            }
        }
        _ => other(),
    }
}
