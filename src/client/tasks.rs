//! Background tasks for `AppServerClient`
//!
//! This module contains the task that consumes a connection's inbound events,
//! routes them through the dispatcher and handles transport failure.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::control::{ProtocolDispatcher, ProtocolHandler};
use crate::transport::{Inbound, InboundEvent, Transport, WebSocketTransport};
use crate::types::events::ClientEvent;

use super::ConnectionState;

/// Shared handles a reader task needs
pub(super) struct ReaderContext {
    pub(super) transport: Arc<WebSocketTransport>,
    pub(super) protocol: Arc<ProtocolHandler>,
    pub(super) state: Arc<parking_lot::Mutex<ConnectionState>>,
    pub(super) events: mpsc::UnboundedSender<ClientEvent>,
}

impl super::AppServerClient {
    /// Message reader task - dispatches inbound text for one connection
    pub(super) async fn message_reader_task(inbound: Inbound, context: ReaderContext) {
        let Inbound {
            connection,
            events: mut inbound_rx,
        } = inbound;
        let dispatcher = ProtocolDispatcher::new(context.protocol.clone(), context.events.clone());

        while let Some(event) = inbound_rx.recv().await {
            match event {
                InboundEvent::Text(text) => {
                    // Dispatch under the state lock so nothing from this
                    // connection is emitted once it stops being current
                    let reply = {
                        let state = context.state.lock();
                        if *state != (ConnectionState::Connected { connection }) {
                            log::debug!("Connection {connection} superseded, dropping queued input");
                            break;
                        }
                        dispatcher.dispatch(&text)
                    };
                    let Some(reply) = reply else {
                        continue;
                    };
                    match reply.to_json() {
                        Ok(json) => {
                            if !context.transport.send_text_on(connection, &json).await {
                                log::warn!("Failed to send reply to server request");
                            }
                        }
                        Err(e) => log::error!("Failed to encode reply: {e}"),
                    }
                }
                InboundEvent::Closed(reason) => {
                    Self::handle_transport_failure(connection, reason, &context).await;
                    break;
                }
            }
        }
    }

    /// Tear down after the read loop of `connection` ended on its own
    ///
    /// Does nothing if that connection is no longer the current one, so a
    /// concurrent disconnect or reconnect never sees duplicate events.
    async fn handle_transport_failure(connection: u64, reason: String, context: &ReaderContext) {
        let current = {
            let mut state = context.state.lock();
            if *state == (ConnectionState::Connected { connection }) {
                *state = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        };
        if !current {
            return;
        }

        log::warn!("Connection {connection} lost: {reason}");
        let _ = context.events.send(ClientEvent::ConnectionChanged(false));
        let _ = context.events.send(ClientEvent::Error(reason.clone()));
        // Detach the socket first; a call racing this sees no writer and
        // fails fast instead of registering on the dead connection
        context.transport.release(connection).await;
        context.protocol.fail_all(&reason);
    }
}
