//! Routing of inbound messages

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::types::events::ClientEvent;

use super::handler::ProtocolHandler;
use super::messages::{IncomingMessage, OutgoingMessage, ResponseOutcome};

/// Result sent back for a server initiated request
///
/// Approval requests (`item/commandExecution/requestApproval`,
/// `item/fileChange/requestApproval`, ...) are always accepted; any other
/// request gets an empty result.
#[must_use]
pub fn server_request_result(method: &str) -> Value {
    if method.ends_with("requestApproval") {
        json!({ "decision": "accept" })
    } else {
        json!({})
    }
}

/// Routes classified messages to waiters, the event channel, or a reply
pub struct ProtocolDispatcher {
    protocol: Arc<ProtocolHandler>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl ProtocolDispatcher {
    /// Create a dispatcher feeding `protocol` and `events`
    #[must_use]
    pub const fn new(
        protocol: Arc<ProtocolHandler>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        Self { protocol, events }
    }

    /// Handle one text payload
    ///
    /// Returns the reply to send, if the payload was a server request.
    /// Malformed payloads, unrecognized shapes and responses to unknown ids
    /// are dropped.
    pub fn dispatch(&self, raw: &str) -> Option<OutgoingMessage> {
        let Some(message) = IncomingMessage::parse(raw) else {
            log::warn!("Dropping malformed message ({} bytes)", raw.len());
            return None;
        };

        match message {
            IncomingMessage::Response { id, outcome } => {
                match outcome {
                    ResponseOutcome::Success(result) => self.protocol.resolve(&id, result),
                    ResponseOutcome::Failure(message) => self.protocol.reject(&id, message),
                };
                None
            }
            IncomingMessage::Notification { method, params } => {
                log::debug!("Notification {method}");
                let _ = self.events.send(ClientEvent::Notification { method, params });
                None
            }
            IncomingMessage::ServerRequest { id, method, .. } => {
                log::debug!("Server request {method}, auto-replying");
                Some(OutgoingMessage::Result {
                    id,
                    result: server_request_result(&method),
                })
            }
            IncomingMessage::Unrecognized => {
                log::debug!("Dropping unrecognized message");
                None
            }
        }
    }
}
