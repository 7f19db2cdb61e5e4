//! WebSocket transport for the app server

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::SinkExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;

use crate::Transport;
use crate::error::Result;
use crate::transport::Inbound;

use super::config::TransportConfig;
use super::frame::{Frame, FrameCodec};
use super::host::CandidateHost;

/// Write half of a connection behind the single write lock
pub(super) type SharedSink = Arc<Mutex<Option<FramedWrite<OwnedWriteHalf, FrameCodec>>>>;

/// State owned for one established connection
pub(super) struct Connection {
    pub(super) id: u64,
    pub(super) closing: Arc<AtomicBool>,
    pub(super) writer: SharedSink,
    pub(super) reader_task: JoinHandle<()>,
}

/// WebSocket transport speaking raw RFC 6455 framing over TCP
pub struct WebSocketTransport {
    pub(super) config: TransportConfig,
    pub(super) connection: parking_lot::Mutex<Option<Connection>>,
    pub(super) next_connection_id: AtomicU64,
    pub(super) ready: Arc<AtomicBool>,
}

impl WebSocketTransport {
    /// Create a new, unconnected transport
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            connection: parking_lot::Mutex::new(None),
            next_connection_id: AtomicU64::new(1),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Identifier of the live connection, if any
    #[must_use]
    pub fn connection_id(&self) -> Option<u64> {
        self.connection.lock().as_ref().map(|c| c.id)
    }

    /// Tear down connection `id` if it is still the live one
    ///
    /// Used after a transport failure so that a stale read loop can never
    /// close a newer connection.
    pub async fn release(&self, id: u64) {
        let conn = self.connection.lock().take_if(|c| c.id == id);
        if let Some(conn) = conn {
            self.ready.store(false, Ordering::SeqCst);
            Self::shutdown(conn).await;
        }
    }

    /// Send one text message on connection `id` only
    ///
    /// Returns `false` if `id` is no longer the live connection, so traffic
    /// meant for a torn-down socket never reaches its replacement.
    pub async fn send_text_on(&self, id: u64, text: &str) -> bool {
        let writer = self
            .connection
            .lock()
            .as_ref()
            .filter(|c| c.id == id)
            .map(|c| c.writer.clone());
        let Some(writer) = writer else {
            log::debug!("Dropping message for stale connection {id}");
            return false;
        };
        log::trace!("-> [{id}] {text}");
        send_frame(&writer, Frame::text(text)).await
    }

    fn current_writer(&self) -> Option<SharedSink> {
        self.connection.lock().as_ref().map(|c| c.writer.clone())
    }
}

/// Write one frame under the connection's write lock
///
/// Returns `false` if the sink is gone or the write fails.
pub(super) async fn send_frame(writer: &SharedSink, frame: Frame) -> bool {
    let mut guard = writer.lock().await;
    let Some(sink) = guard.as_mut() else {
        return false;
    };
    match sink.send(frame).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("WebSocket write failed: {e}");
            false
        }
    }
}

impl Transport for WebSocketTransport {
    async fn connect(&self, raw: &str, candidates: &[CandidateHost], port: u16) -> Result<Inbound> {
        self.connect_impl(raw, candidates, port).await
    }

    async fn send_text(&self, text: &str) -> bool {
        let Some(writer) = self.current_writer() else {
            return false;
        };
        log::trace!("-> {text}");
        send_frame(&writer, Frame::text(text)).await
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.disconnect_impl().await;
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.abort();
    }
}
