//! Error types for the Codex app-server client

use thiserror::Error;

/// Main error type for the Codex app-server client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Host input produced no usable candidate; retrying will not help
    #[error("Invalid URL. raw='{0}' normalized=")]
    InvalidHost(String),

    /// Every candidate host failed to connect
    #[error("Connect failed. raw='{raw}' normalized={}: {source}", .candidates.join("|"))]
    Connect {
        /// Host string exactly as supplied by the caller
        raw: String,
        /// All normalized candidates that were tried, in order
        candidates: Vec<String>,
        /// Error from the last candidate attempted
        #[source]
        source: Box<ClientError>,
    },

    /// WebSocket opening handshake was rejected or malformed
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Malformed or oversized WebSocket frame
    #[error("Frame error: {0}")]
    Frame(String),

    /// Established connection was lost, or pending calls were failed in bulk
    #[error("{0}")]
    Transport(String),

    /// Write attempted with no live socket, or the write itself failed
    #[error("Failed to send request: socket not connected")]
    NotConnected,

    /// Server answered a request with an `error` object
    #[error("{message}")]
    Rpc {
        /// Server supplied error message
        message: String,
    },

    /// Well-formed response that lacks a field the caller needs
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON encode/decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Create an invalid host error
    pub fn invalid_host(raw: impl Into<String>) -> Self {
        Self::InvalidHost(raw.into())
    }

    /// Create an aggregated connect error
    pub fn connect(raw: impl Into<String>, candidates: Vec<String>, last: ClientError) -> Self {
        Self::Connect {
            raw: raw.into(),
            candidates,
            source: Box::new(last),
        }
    }

    /// Create a handshake error
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// Create a frame error
    pub fn frame(msg: impl Into<String>) -> Self {
        Self::Frame(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an RPC error from the server's `error.message`
    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc {
            message: msg.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether retrying the same operation could succeed
    ///
    /// Host parsing and configuration errors are permanent; everything else
    /// depends on the network or the server.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidHost(_) | Self::InvalidConfig(_))
    }
}
