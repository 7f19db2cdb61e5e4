//! Request id allocation and pending call bookkeeping

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{ClientError, Result};
use crate::types::identifiers::RequestId;

use super::messages::OutgoingMessage;

/// Reason given to calls failed by a deliberate disconnect
pub const DISCONNECTED: &str = "Disconnected";

/// Waiter for one in-flight request
type Waiter = oneshot::Sender<Result<Value>>;

/// A request that has been sent and awaits its response
#[derive(Debug)]
pub struct PendingCall {
    id: RequestId,
    rx: oneshot::Receiver<Result<Value>>,
}

impl PendingCall {
    /// Id the request was sent with
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        &self.id
    }

    /// Wait for the response
    ///
    /// # Errors
    /// Returns the server's error, or a transport error if the connection was
    /// lost or closed before the response arrived
    pub async fn wait(self) -> Result<Value> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(ClientError::transport(DISCONNECTED)))
    }
}

/// Protocol handler correlating responses with outstanding requests
///
/// Ids are decimal strings counting up from "1" and are never reused for the
/// lifetime of the handler.
pub struct ProtocolHandler {
    /// Request ID counter
    next_request_id: AtomicU64,
    /// Pending requests awaiting responses
    pending: parking_lot::Mutex<HashMap<RequestId, Waiter>>,
}

impl ProtocolHandler {
    /// Create a new protocol handler
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_request_id: AtomicU64::new(1),
            pending: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Generate next request ID
    #[must_use]
    pub fn next_id(&self) -> RequestId {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        RequestId::new(id.to_string())
    }

    /// Number of requests still waiting for a response
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Register a request and hand its JSON text to `send`
    ///
    /// The waiter is registered before `send` runs so a fast response cannot
    /// be missed. If `send` reports failure the registration is removed.
    ///
    /// # Errors
    /// Returns `ClientError::NotConnected` if `send` returns `false`
    pub async fn register_and_send<F, Fut>(
        &self,
        method: &str,
        params: Option<Value>,
        send: F,
    ) -> Result<PendingCall>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = bool>,
    {
        let id = self.next_id();
        let payload = OutgoingMessage::Request {
            id: id.clone(),
            method: method.to_string(),
            params,
        }
        .to_json()?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        if !send(payload).await {
            self.pending.lock().remove(&id);
            return Err(ClientError::NotConnected);
        }

        log::debug!("Request {id} ({method}) sent");
        Ok(PendingCall { id, rx })
    }

    /// Complete the call `id` with a result
    ///
    /// Returns `false` if no such call is pending.
    pub fn resolve(&self, id: &RequestId, result: Value) -> bool {
        self.complete(id, Ok(result))
    }

    /// Fail the call `id` with a server error message
    ///
    /// Returns `false` if no such call is pending.
    pub fn reject(&self, id: &RequestId, message: impl Into<String>) -> bool {
        self.complete(id, Err(ClientError::rpc(message)))
    }

    /// Fail every pending call with `reason` and clear the map
    ///
    /// Returns how many calls were failed.
    pub fn fail_all(&self, reason: &str) -> usize {
        let drained: Vec<Waiter> = self.pending.lock().drain().map(|(_, w)| w).collect();
        let count = drained.len();
        for waiter in drained {
            let _ = waiter.send(Err(ClientError::transport(reason)));
        }
        if count > 0 {
            log::debug!("Failed {count} pending request(s): {reason}");
        }
        count
    }

    fn complete(&self, id: &RequestId, outcome: Result<Value>) -> bool {
        let waiter = self.pending.lock().remove(id);
        match waiter {
            Some(waiter) => {
                // Receiver may have been dropped by a cancelled caller
                let _ = waiter.send(outcome);
                true
            }
            None => {
                log::debug!("Ignoring response for unknown request {id}");
                false
            }
        }
    }
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new()
    }
}
