//! `AppServerClient` implementation
//!
//! This module contains the constructor and public API methods for `AppServerClient`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};

use crate::control::ProtocolHandler;
use crate::control::protocol::{DISCONNECTED, OutgoingMessage};
use crate::error::{ClientError, Result};
use crate::transport::websocket::{TransportConfig, resolve_candidates};
use crate::transport::{Transport, WebSocketTransport};
use crate::types::events::ClientEvent;
use crate::types::identifiers::ThreadId;
use crate::types::options::ClientOptions;
use crate::types::params::{
    ClientInfo, InitializeParams, ThreadListParams, ThreadResumeParams, ThreadStartParams,
    TurnInterruptParams, TurnStartParams, UserInput,
};
use crate::types::thread::ThreadSummary;

use super::ConnectionState;
use super::tasks::ReaderContext;

impl super::AppServerClient {
    /// Create a new, disconnected client
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let transport = WebSocketTransport::new(TransportConfig::from(&options));

        Self {
            options,
            transport: Arc::new(transport),
            protocol: Arc::new(ProtocolHandler::new()),
            state: Arc::new(parking_lot::Mutex::new(ConnectionState::Disconnected)),
            event_tx,
            event_rx: Some(event_rx),
            lifecycle: Mutex::new(()),
        }
    }

    /// Options this client was built with
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Take the event receiver
    ///
    /// Notifications, connection changes and errors are delivered here. Events
    /// sent before the receiver is taken are buffered.
    pub const fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<ClientEvent>> {
        self.event_rx.take()
    }

    /// Current connection state
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Whether a connection is established
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.state.lock(), ConnectionState::Connected { .. })
    }

    /// Number of calls still waiting for a response
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.protocol.pending_count()
    }

    /// Connect to an app server
    ///
    /// `host` is normalized into candidate hostnames which are tried in order.
    /// Any existing connection is closed first. A single attempt is made per
    /// call; retrying is up to the caller.
    ///
    /// # Errors
    /// Returns `ClientError::InvalidHost` if `host` is unusable, or
    /// `ClientError::Connect` if no candidate could be reached
    pub async fn connect(&self, host: &str, port: u16) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.disconnect_locked().await;

        let candidates = resolve_candidates(host);
        if candidates.is_empty() {
            return Err(ClientError::invalid_host(host));
        }

        *self.state.lock() = ConnectionState::Connecting;
        let inbound = match self.transport.connect(host, &candidates, port).await {
            Ok(inbound) => inbound,
            Err(e) => {
                *self.state.lock() = ConnectionState::Disconnected;
                log::warn!("{e}");
                return Err(e);
            }
        };

        *self.state.lock() = ConnectionState::Connected {
            connection: inbound.connection,
        };
        let _ = self.event_tx.send(ClientEvent::ConnectionChanged(true));

        let context = ReaderContext {
            transport: self.transport.clone(),
            protocol: self.protocol.clone(),
            state: self.state.clone(),
            events: self.event_tx.clone(),
        };
        tokio::spawn(Self::message_reader_task(inbound, context));

        Ok(())
    }

    /// Send `initialize` followed by the `initialized` notification
    ///
    /// The title reported alongside `client_name` and `version` comes from
    /// [`ClientOptions::client_info`].
    ///
    /// # Errors
    /// Returns error if the request fails or the server rejects it
    pub async fn initialize(
        &self,
        client_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Value> {
        let params = InitializeParams {
            client_info: ClientInfo {
                name: client_name.into(),
                version: version.into(),
                title: self.options.client_info.title.clone(),
            },
        };
        let result = self.request("initialize", &params).await?;
        self.notify_server("initialized", Some(Value::Object(serde_json::Map::new())))
            .await?;
        Ok(result)
    }

    /// Call `method` and wait for its result
    ///
    /// # Errors
    /// Returns `ClientError::NotConnected` if the request could not be written,
    /// `ClientError::Rpc` if the server answered with an error, or
    /// `ClientError::Transport` if the connection ended first
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let transport = &self.transport;
        let pending = self
            .protocol
            .register_and_send(method, params, |text| async move {
                transport.send_text(&text).await
            })
            .await?;
        pending.wait().await
    }

    /// Send a notification; no response is expected
    ///
    /// # Errors
    /// Returns `ClientError::NotConnected` if the message could not be written
    pub async fn notify_server(&self, method: &str, params: Option<Value>) -> Result<()> {
        let text = OutgoingMessage::Notification {
            method: method.to_string(),
            params,
        }
        .to_json()?;
        if self.transport.send_text(&text).await {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// Close the connection and fail every pending call with "Disconnected"
    ///
    /// Safe to call in any state and any number of times.
    pub async fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.disconnect_locked().await;
    }

    async fn disconnect_locked(&self) {
        let was_connected = {
            let mut state = self.state.lock();
            let was = matches!(*state, ConnectionState::Connected { .. });
            *state = ConnectionState::Closing;
            was
        };

        self.transport.disconnect().await;
        self.protocol.fail_all(DISCONNECTED);
        *self.state.lock() = ConnectionState::Disconnected;

        if was_connected {
            let _ = self.event_tx.send(ClientEvent::ConnectionChanged(false));
        }
    }

    // ------------------------------------------------------------------------
    // Session operations
    // ------------------------------------------------------------------------

    /// List threads, optionally restricted to a working directory
    ///
    /// # Errors
    /// Returns error if the `thread/list` call fails
    pub async fn list_threads(&self, cwd: Option<&str>) -> Result<Vec<ThreadSummary>> {
        let params = ThreadListParams {
            cursor: None,
            limit: self.options.thread_list_limit,
            sort_key: self.options.thread_list_sort_key.clone(),
            cwd: cwd.map(str::to_string),
        };
        let result = self.request("thread/list", &params).await?;
        Ok(ThreadSummary::list_from_result(&result))
    }

    /// Start a new thread and return its id
    ///
    /// # Errors
    /// Returns error if the call fails or the result has no `thread.id`
    pub async fn start_thread(&self, cwd: &str, model: Option<&str>) -> Result<ThreadId> {
        let params = ThreadStartParams {
            model: model.map(str::to_string),
            cwd: cwd.to_string(),
            approval_policy: self.options.approval_policy.clone(),
            sandbox: self.options.sandbox.clone(),
        };
        let result = self.request("thread/start", &params).await?;
        result
            .get("thread")
            .and_then(|t| t.get("id"))
            .and_then(Value::as_str)
            .map(ThreadId::new)
            .ok_or_else(|| ClientError::protocol("Missing thread id"))
    }

    /// Resume an existing thread; returns the raw result including its history
    ///
    /// # Errors
    /// Returns error if the `thread/resume` call fails
    pub async fn resume_thread(&self, thread_id: &ThreadId, cwd: &str) -> Result<Value> {
        let params = ThreadResumeParams {
            thread_id: thread_id.clone(),
            cwd: cwd.to_string(),
            approval_policy: self.options.approval_policy.clone(),
            sandbox: self.options.sandbox.clone(),
        };
        self.request("thread/resume", &params).await
    }

    /// Start a turn with a text prompt
    ///
    /// Progress arrives as `turn/started`, `item/agentMessage/delta` and
    /// `turn/completed` notifications.
    ///
    /// # Errors
    /// Returns error if the `turn/start` call fails
    pub async fn start_turn(
        &self,
        thread_id: &ThreadId,
        text: &str,
        model: Option<&str>,
        effort: Option<&str>,
    ) -> Result<Value> {
        let params = TurnStartParams {
            thread_id: thread_id.clone(),
            input: vec![UserInput::Text {
                text: text.to_string(),
            }],
            model: model.map(str::to_string),
            effort: effort.map(str::to_string),
        };
        self.request("turn/start", &params).await
    }

    /// Interrupt the running turn of a thread
    ///
    /// # Errors
    /// Returns error if the `turn/interrupt` call fails
    pub async fn interrupt_turn(&self, thread_id: &ThreadId) -> Result<Value> {
        let params = TurnInterruptParams {
            thread_id: thread_id.clone(),
        };
        self.request("turn/interrupt", &params).await
    }

    async fn request<P: Serialize>(&self, method: &str, params: &P) -> Result<Value> {
        let params = serde_json::to_value(params)?;
        self.call(method, Some(params)).await
    }
}

impl Drop for super::AppServerClient {
    fn drop(&mut self) {
        // Stops the read loop, which in turn ends the reader task
        self.transport.abort();
    }
}
