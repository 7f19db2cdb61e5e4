//! `AppServerClient` for talking to a Codex app server
//!
//! This module provides the main client, composing the WebSocket transport,
//! request correlation and message routing behind one connection lifecycle:
//! - Connect with candidate host fallback
//! - Concurrent request/response calls over one socket
//! - Notifications and connection changes delivered as events
//! - Automatic replies to server approval requests
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     AppServerClient                       │
//! │                                                           │
//! │  call() ──► ProtocolHandler ──► WebSocketTransport        │
//! │   ▲          (pending map)        │  write lock (1 writer)│
//! │   │                               │  read loop  (1 reader)│
//! │   │                               ▼                       │
//! │   └──── resolve ◄── ProtocolDispatcher ◄── reader task    │
//! │                          │                                │
//! │                          └──► ClientEvent channel         │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! **Key Design Points:**
//! - Each caller waits only on its own oneshot; nothing blocks the read loop
//! - Every frame, including pongs and approval replies, passes one write lock
//! - A lost connection fails every pending call and emits exactly one
//!   `ConnectionChanged(false)` plus one `Error`
//!
//! # Example: Basic Usage
//!
//! ```no_run
//! use codex_app_client::{AppServerClient, ClientEvent, ClientOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = AppServerClient::new(ClientOptions::default());
//! let mut events = client.take_event_receiver().ok_or("receiver already taken")?;
//!
//! client.connect("192.168.1.20", 8390).await?;
//! client.initialize("codex_app_client", codex_app_client::VERSION).await?;
//!
//! let thread = client.start_thread("/home/me/project", None).await?;
//! client.start_turn(&thread, "Run the tests", None, None).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let ClientEvent::Notification { method, .. } = &event {
//!         log::info!("{method}");
//!     }
//! }
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod client_impl;
mod tasks;

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

use crate::control::ProtocolHandler;
use crate::transport::WebSocketTransport;
use crate::types::events::ClientEvent;
use crate::types::options::ClientOptions;

/// Lifecycle of the client's single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection
    Disconnected,
    /// Trying candidate hosts
    Connecting,
    /// Connected; `connection` identifies the live socket
    Connected {
        /// Transport connection id
        connection: u64,
    },
    /// Deliberate disconnect in progress
    Closing,
}

/// Client for a Codex app server
///
/// At most one connection is live at a time; `connect` tears down any previous
/// one first. Calls may be issued concurrently from many tasks through a
/// shared reference.
pub struct AppServerClient {
    /// Configuration
    options: ClientOptions,
    /// Transport layer
    transport: Arc<WebSocketTransport>,
    /// Request correlation
    protocol: Arc<ProtocolHandler>,
    /// Connection state machine
    state: Arc<parking_lot::Mutex<ConnectionState>>,
    /// Event sender shared with reader tasks
    event_tx: mpsc::UnboundedSender<ClientEvent>,
    /// Event receiver until taken by the application
    event_rx: Option<mpsc::UnboundedReceiver<ClientEvent>>,
    /// Serializes connect and disconnect
    lifecycle: Mutex<()>,
}
