//! Frame reading loop for the WebSocket transport

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use tokio::io::BufReader;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;

use crate::transport::InboundEvent;

use super::frame::{Frame, FrameCodec, OpCode};
use super::transport::{SharedSink, send_frame};

/// Read frames until the connection ends
///
/// Text payloads are forwarded as they arrive, pings are answered through the
/// shared write lock, and a close frame, EOF or decode error ends the loop.
/// The end is reported as [`InboundEvent::Closed`] unless `closing` was set by
/// a deliberate disconnect.
pub(super) async fn read_loop(
    mut frames: FramedRead<BufReader<OwnedReadHalf>, FrameCodec>,
    writer: SharedSink,
    closing: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<InboundEvent>,
) {
    let reason = loop {
        let frame = match frames.next().await {
            None => break "Connection closed".to_string(),
            Some(Err(e)) => break e.to_string(),
            Some(Ok(frame)) => frame,
        };

        match frame.opcode {
            OpCode::Text if frame.fin => {
                let text = String::from_utf8_lossy(&frame.payload).into_owned();
                log::trace!("<- {text}");
                if tx.send(InboundEvent::Text(text)).is_err() {
                    // Nobody is listening anymore
                    return;
                }
            }
            OpCode::Text | OpCode::Continuation => {
                log::warn!("Dropping fragmented frame ({} bytes)", frame.payload.len());
            }
            OpCode::Close => break "Connection closed".to_string(),
            OpCode::Ping => {
                if !send_frame(&writer, Frame::pong(frame.payload)).await {
                    log::debug!("Pong reply not sent");
                }
            }
            other => log::trace!("Ignoring {other:?} frame"),
        }
    };

    if closing.load(Ordering::SeqCst) {
        log::debug!("Read loop ended during disconnect: {reason}");
    } else {
        log::warn!("Read loop ended: {reason}");
        let _ = tx.send(InboundEvent::Closed(reason));
    }
}
