//! # Codex App Server Client for Rust
//!
//! An async client for the Codex app server. The server speaks a JSON-RPC style
//! protocol over a plain WebSocket; this crate implements both layers directly
//! on top of tokio's TCP streams.
//!
//! ## Quick Start
//!
//! ```no_run
//! use codex_app_client::{AppServerClient, ClientOptions, ServerNotification};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = AppServerClient::new(ClientOptions::default());
//!     let mut events = client.take_event_receiver().ok_or("receiver already taken")?;
//!
//!     client.connect("192.168.1.20", 8390).await?;
//!     client.initialize("codex_app_client", codex_app_client::VERSION).await?;
//!
//!     for thread in client.list_threads(None).await? {
//!         log::info!("{} {}", thread.id, thread.preview);
//!     }
//!
//!     let thread = client.start_thread("/home/me/project", None).await?;
//!     client.start_turn(&thread, "Summarize this repository", None, None).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event.as_notification() {
//!             Some(ServerNotification::AgentMessageDelta { delta }) => print!("{delta}"),
//!             Some(ServerNotification::TurnCompleted) => break,
//!             _ => {}
//!         }
//!     }
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`transport`]: Host normalization, RFC 6455 framing, the Upgrade handshake
//!   and the connection's single reader and single writer
//! - [`control`]: Request correlation and routing of inbound messages
//! - [`client`]: [`AppServerClient`], the facade tying both together
//! - [`message`]: Typed view of server notifications
//! - [`types`]: Identifiers, options and request parameters
//! - [`error`]: Error types and handling

pub mod client;
pub mod control;
pub mod error;
pub mod message;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use client::{AppServerClient, ConnectionState};
pub use control::{ProtocolDispatcher, ProtocolHandler};
pub use error::{ClientError, Result};
pub use message::{ServerNotification, parse_notification};
pub use transport::websocket::{CandidateHost, resolve_candidates};
pub use transport::{Transport, WebSocketTransport};
pub use types::{
    ClientEvent, ClientInfo, ClientOptions, ClientOptionsBuilder, RequestId, ThreadId,
    ThreadSummary,
};

/// Version of this crate, reported in `initialize` by default
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
