//! Wire envelopes for the app-server protocol
//!
//! Inbound text is validated once into [`IncomingMessage`]; outbound traffic is
//! built from [`OutgoingMessage`]. Nothing downstream inspects raw field
//! presence again.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::identifiers::RequestId;

/// Message used when an error object carries no `message`
pub const UNKNOWN_SERVER_ERROR: &str = "Unknown server error";

/// Outcome carried by a response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// `result` value (an empty object when the server omitted it)
    Success(Value),
    /// `error.message`
    Failure(String),
}

/// A classified inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    /// Reply to one of our requests
    Response {
        /// Id of the request being answered
        id: RequestId,
        /// Result or error
        outcome: ResponseOutcome,
    },
    /// Server event that needs no reply
    Notification {
        /// Method name
        method: String,
        /// Params object, if present
        params: Option<Map<String, Value>>,
    },
    /// Server request that must be answered with a result
    ServerRequest {
        /// Id exactly as the server sent it, echoed back in the reply
        id: Value,
        /// Method name
        method: String,
        /// Params, if present
        params: Option<Value>,
    },
    /// JSON object matching none of the shapes above
    Unrecognized,
}

impl IncomingMessage {
    /// Parse and classify one text payload
    ///
    /// Returns `None` if the payload is not a JSON object.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(obj)) => Some(Self::classify(obj)),
            _ => None,
        }
    }

    /// Classify a JSON object by which of `id`, `method`, `result`, `error` it carries
    ///
    /// Only key presence decides the shape: `"error": null` still makes a
    /// response, which then succeeds because the error carries nothing.
    #[must_use]
    pub fn classify(mut obj: Map<String, Value>) -> Self {
        let has_id = obj.contains_key("id");
        let has_result = obj.contains_key("result");
        let has_error = obj.contains_key("error");
        let method = obj.get("method").and_then(Value::as_str).map(str::to_string);

        match (has_id, method) {
            (true, Some(method)) if !has_result && !has_error => Self::ServerRequest {
                id: obj.remove("id").unwrap_or(Value::Null),
                method,
                params: obj.remove("params"),
            },
            (true, _) if has_result || has_error => {
                let Some(id) = obj.get("id").and_then(RequestId::from_json) else {
                    return Self::Unrecognized;
                };
                let failure = obj.get("error").filter(|e| !e.is_null()).map(|error| {
                    error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or(UNKNOWN_SERVER_ERROR)
                        .to_string()
                });
                let outcome = match failure {
                    Some(message) => ResponseOutcome::Failure(message),
                    None => ResponseOutcome::Success(
                        obj.remove("result")
                            .unwrap_or_else(|| Value::Object(Map::new())),
                    ),
                };
                Self::Response { id, outcome }
            }
            (false, Some(method)) => Self::Notification {
                method,
                params: match obj.remove("params") {
                    Some(Value::Object(params)) => Some(params),
                    _ => None,
                },
            },
            _ => Self::Unrecognized,
        }
    }
}

/// An outbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// Request expecting a response
    Request {
        /// Correlation id
        id: RequestId,
        /// Method name
        method: String,
        /// Params, omitted when absent
        #[serde(skip_serializing_if = "Option::is_none")]
        params: Option<Value>,
    },
    /// Fire-and-forget notification
    Notification {
        /// Method name
        method: String,
        /// Params, omitted when absent
        #[serde(skip_serializing_if = "Option::is_none")]
        params: Option<Value>,
    },
    /// Reply to a server request
    Result {
        /// Id copied from the server request
        id: Value,
        /// Result payload
        result: Value,
    },
}

impl OutgoingMessage {
    /// Serialize to the JSON text sent in a single text frame
    ///
    /// # Errors
    /// Returns error if JSON serialization fails
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
