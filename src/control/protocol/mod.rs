//! JSON-RPC style protocol spoken with the app server
//!
//! This module provides request correlation, message classification and
//! routing for the request/response/notification protocol multiplexed over a
//! single WebSocket connection.
//!
//! # Overview
//!
//! - Requests carry a string `id` and a `method`; the matching response
//!   carries the same `id` plus `result` or `error`
//! - Notifications carry a `method` and no `id`
//! - Server requests carry both and must be answered with a result
//!
//! # Example: Correlating a Response
//!
//! ```rust
//! use codex_app_client::control::ProtocolHandler;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = ProtocolHandler::new();
//!
//! let pending = handler
//!     .register_and_send("thread/list", None, |text| async move {
//!         assert_eq!(text, r#"{"id":"1","method":"thread/list"}"#);
//!         true
//!     })
//!     .await?;
//!
//! handler.resolve(pending.id(), serde_json::json!({ "data": [] }));
//! let result = pending.wait().await?;
//! assert_eq!(result["data"], serde_json::json!([]));
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Classifying Inbound Text
//!
//! ```rust
//! use codex_app_client::control::IncomingMessage;
//!
//! let msg = IncomingMessage::parse(r#"{"method":"turn/started","params":{}}"#);
//! assert!(matches!(msg, Some(IncomingMessage::Notification { .. })));
//! ```

mod dispatch;
mod handler;
mod messages;

// Re-export public types
pub use dispatch::{ProtocolDispatcher, server_request_result};
pub use handler::{DISCONNECTED, PendingCall, ProtocolHandler};
pub use messages::{IncomingMessage, OutgoingMessage, ResponseOutcome, UNKNOWN_SERVER_ERROR};
