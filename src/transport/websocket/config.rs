//! Configuration for the WebSocket transport

use std::time::Duration;

use crate::types::options::{ClientOptions, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT};

/// How long a deliberate disconnect waits to flush the Close frame
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport level settings derived from [`ClientOptions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// TCP connect timeout per candidate
    pub connect_timeout: Duration,
    /// Bound on the Upgrade exchange
    pub handshake_timeout: Option<Duration>,
    /// Largest inbound payload accepted
    pub max_frame_size: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            max_frame_size: None,
        }
    }
}

impl From<&ClientOptions> for TransportConfig {
    fn from(options: &ClientOptions) -> Self {
        Self {
            connect_timeout: options.connect_timeout,
            handshake_timeout: options.handshake_timeout,
            max_frame_size: options.max_frame_size,
        }
    }
}
