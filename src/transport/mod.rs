//! Transport layer for communicating with the app server
//!
//! This module provides the transport abstraction and the WebSocket
//! implementation used to reach an app server over plain TCP.

pub mod websocket;

use tokio::sync::mpsc;

use crate::error::Result;
use websocket::CandidateHost;

/// Something the read loop observed on a live connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A complete text message
    Text(String),
    /// The connection ended without a deliberate disconnect
    Closed(String),
}

/// Receiving side of one established connection
#[derive(Debug)]
pub struct Inbound {
    /// Identifier of the connection these events belong to
    pub connection: u64,
    /// Events from the connection's read loop
    pub events: mpsc::UnboundedReceiver<InboundEvent>,
}

/// Transport trait for communicating with an app server
///
/// This trait defines the interface for establishing a connection and
/// exchanging text messages. Implementations own the socket exclusively.
pub trait Transport: Send + Sync {
    /// Connect to the first reachable candidate
    ///
    /// Any existing connection is torn down first. `raw` is the caller's
    /// unmodified input, kept for error reporting.
    ///
    /// # Errors
    /// Returns an aggregated connect error if every candidate fails
    fn connect(
        &self,
        raw: &str,
        candidates: &[CandidateHost],
        port: u16,
    ) -> impl std::future::Future<Output = Result<Inbound>> + Send;

    /// Send one text message
    ///
    /// Returns `false` if there is no live connection or the write failed.
    fn send_text(&self, text: &str) -> impl std::future::Future<Output = bool> + Send;

    /// Check if transport is ready for communication
    fn is_ready(&self) -> bool;

    /// Close the connection, if any; never fails and may be repeated
    fn disconnect(&self) -> impl std::future::Future<Output = ()> + Send;
}

pub use websocket::WebSocketTransport;
