//! Events delivered to the embedding application

use serde_json::{Map, Value};

use crate::message::{ServerNotification, parse_notification};

/// Event emitted by [`AppServerClient`](crate::AppServerClient)
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Server notification, forwarded verbatim
    Notification {
        /// Method name, e.g. `item/agentMessage/delta`
        method: String,
        /// Params object, if the server sent one
        params: Option<Map<String, Value>>,
    },
    /// Connection status changed
    ConnectionChanged(bool),
    /// The connection failed; the message describes why
    Error(String),
}

impl ClientEvent {
    /// Typed view of a notification event
    ///
    /// Returns `None` for connection and error events.
    #[must_use]
    pub fn as_notification(&self) -> Option<ServerNotification> {
        match self {
            Self::Notification { method, params } => Some(parse_notification(method, params.as_ref())),
            _ => None,
        }
    }
}
