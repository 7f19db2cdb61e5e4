//! Lifecycle management for the WebSocket transport (connect, disconnect)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::SinkExt;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::error::{ClientError, Result};
use crate::transport::Inbound;

use super::config::CLOSE_TIMEOUT;
use super::frame::{Frame, FrameCodec};
use super::handshake;
use super::host::CandidateHost;
use super::reader::read_loop;
use super::transport::{Connection, WebSocketTransport};

impl WebSocketTransport {
    /// Try each candidate in order and commit the first that completes the handshake
    ///
    /// # Errors
    /// Returns `ClientError::InvalidHost` for an empty candidate list, otherwise
    /// `ClientError::Connect` carrying the last candidate's error.
    pub(super) async fn connect_impl(
        &self,
        raw: &str,
        candidates: &[CandidateHost],
        port: u16,
    ) -> Result<Inbound> {
        self.disconnect_impl().await;

        let mut last_error = None;
        for candidate in candidates {
            match self.connect_one(candidate.as_str(), port).await {
                Ok((reader, writer)) => {
                    log::info!("Connected to app server at {candidate}:{port}");
                    return Ok(self.commit(reader, writer));
                }
                Err(e) => {
                    log::debug!("Candidate {candidate}:{port} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        let names = candidates.iter().map(|c| c.as_str().to_string()).collect();
        Err(match last_error {
            Some(e) => ClientError::connect(raw, names, e),
            None => ClientError::invalid_host(raw),
        })
    }

    /// TCP connect plus Upgrade for a single host
    async fn connect_one(
        &self,
        host: &str,
        port: u16,
    ) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf)> {
        let timeout = self.config.connect_timeout;
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| {
                ClientError::timeout(format!("connect to {host}:{port} after {timeout:?}"))
            })??;
        stream.set_nodelay(true)?;

        let (read, mut write) = stream.into_split();
        let mut read = BufReader::new(read);

        let upgrade = handshake::perform(host, port, &mut read, &mut write);
        match self.config.handshake_timeout {
            Some(limit) => tokio::time::timeout(limit, upgrade).await.map_err(|_| {
                ClientError::timeout(format!("handshake with {host}:{port} after {limit:?}"))
            })??,
            None => upgrade.await?,
        }

        Ok((read, write))
    }

    /// Store the connection and start its read loop
    fn commit(&self, reader: BufReader<OwnedReadHalf>, writer: OwnedWriteHalf) -> Inbound {
        let id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        let closing = Arc::new(AtomicBool::new(false));
        let writer = Arc::new(Mutex::new(Some(FramedWrite::new(writer, FrameCodec::new()))));

        let mut codec = FrameCodec::new();
        if let Some(max) = self.config.max_frame_size {
            codec = codec.with_max_frame_size(max);
        }
        let frames = FramedRead::new(reader, codec);

        let (tx, rx) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(read_loop(frames, writer.clone(), closing.clone(), tx));

        *self.connection.lock() = Some(Connection {
            id,
            closing,
            writer,
            reader_task,
        });
        self.ready.store(true, Ordering::SeqCst);

        Inbound {
            connection: id,
            events: rx,
        }
    }

    /// Close the live connection, if any
    pub(super) async fn disconnect_impl(&self) {
        self.ready.store(false, Ordering::SeqCst);
        let conn = self.connection.lock().take();
        if let Some(conn) = conn {
            Self::shutdown(conn).await;
        }
    }

    /// Best-effort Close frame, flush, socket shutdown and reader stop
    pub(super) async fn shutdown(conn: Connection) {
        conn.closing.store(true, Ordering::SeqCst);

        let sink = conn.writer.lock().await.take();
        if let Some(mut sink) = sink {
            let close = async {
                if let Err(e) = sink.send(Frame::close()).await {
                    log::debug!("Close frame not sent: {e}");
                }
                let _ = sink.close().await;
            };
            if tokio::time::timeout(CLOSE_TIMEOUT, close).await.is_err() {
                log::debug!("Timed out flushing close frame");
            }
        }

        conn.reader_task.abort();
        log::info!("Connection {} closed", conn.id);
    }

    /// Stop the live connection without a Close handshake
    ///
    /// Dropping the write half closes the socket; the read loop is aborted
    /// without reporting a failure.
    pub fn abort(&self) {
        self.ready.store(false, Ordering::SeqCst);
        if let Some(conn) = self.connection.lock().take() {
            conn.closing.store(true, Ordering::SeqCst);
            conn.reader_task.abort();
        }
    }
}
