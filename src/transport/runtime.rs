//! Point-to-point request port into a privileged context.
//!
//! Mirrors the platform's runtime messaging: the caller sends a JSON
//! payload and awaits a single completion. There is no delivery
//! guarantee; if the serving context is gone the call fails with the
//! platform's own low-level wording, and if it dies mid-flight the reply
//! simply never comes back. Callers own their liveness via timeouts.

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Failure of the transport step itself, as distinct from an
/// application-level `{ok:false}` reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortError {
    /// The serving context no longer exists (reloaded or torn down).
    #[error("Extension context invalidated.")]
    ContextInvalidated,

    /// The serving context dropped the request without replying.
    #[error("The message port closed before a response was received.")]
    PortClosed,
}

/// One in-flight request held by the serving side.
#[derive(Debug)]
pub struct RuntimeRequest {
    payload: Value,
    reply: oneshot::Sender<Value>,
}

impl RuntimeRequest {
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_parts(self) -> (Value, oneshot::Sender<Value>) {
        (self.payload, self.reply)
    }

    /// Complete the request. The requester may have timed out and gone
    /// away; that is not the responder's problem.
    pub fn respond(self, value: Value) {
        let _ = self.reply.send(value);
    }
}

/// Requesting half. Cheap to clone; every holder reaches the same
/// serving context.
#[derive(Clone)]
pub struct RuntimePort {
    tx: mpsc::Sender<RuntimeRequest>,
}

impl RuntimePort {
    /// Send a payload and await the single completion for it.
    pub async fn request(&self, payload: Value) -> Result<Value, PortError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RuntimeRequest {
                payload,
                reply: reply_tx,
            })
            .await
            .map_err(|_| PortError::ContextInvalidated)?;
        reply_rx.await.map_err(|_| PortError::PortClosed)
    }
}

/// Serving half: a queue of requests, each carrying its own completion.
pub struct RuntimeService {
    rx: mpsc::Receiver<RuntimeRequest>,
}

impl RuntimeService {
    pub async fn recv(&mut self) -> Option<RuntimeRequest> {
        self.rx.recv().await
    }
}

/// Create a connected port/service pair.
pub fn runtime_channel(capacity: usize) -> (RuntimePort, RuntimeService) {
    let (tx, rx) = mpsc::channel(capacity);
    (RuntimePort { tx }, RuntimeService { rx })
}
