//! WebSocket transport implementation
//!
//! This module provides a client side WebSocket implementation written
//! directly against TCP: address normalization, the HTTP Upgrade handshake,
//! frame encoding and decoding, a per-connection read loop and a single
//! serialized write path.

mod config;
mod frame;
mod handshake;
mod host;
mod lifecycle;
mod reader;
mod transport;

// Re-export public types
pub use config::TransportConfig;
pub use frame::{Frame, FrameCodec, OpCode, apply_mask};
pub use handshake::{WS_MAGIC_GUID, accept_key, generate_key, read_http_headers, upgrade_request};
pub use host::{CandidateHost, resolve_candidates};
pub use transport::WebSocketTransport;

/// Perform the client opening handshake over a connected stream
pub use handshake::perform as perform_handshake;
