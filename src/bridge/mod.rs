//! Page bridge: the host application's entry point into the extension.
//!
//! Runs inside the untrusted page. Each call posts a correlated REQUEST
//! to the page's own origin and races the reply against a deadline; the
//! per-call listener is a guard value, so it is deregistered on every
//! exit path — success, application error, or timeout. The bridge is the
//! single place where relay failures become typed errors for host code,
//! including the rewrite of the platform's "context invalidated" wording
//! into an actionable hint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::protocol::{Command, Envelope, RequestEnvelope, ResponseEnvelope, CHANNEL};
use crate::transport::PageBus;

/// What a page caller sees when the extension was reloaded underneath it.
pub const CONTEXT_INVALIDATED_HINT: &str =
    "The extension was reloaded or updated. Refresh the page to reconnect.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// No response arrived before the deadline: the extension is absent
    /// or unresponsive.
    #[error("No response from the extension within {0:?}")]
    Timeout(Duration),

    /// The relay step itself rejected; the privileged side is gone.
    #[error("{0}")]
    Unreachable(String),

    /// The privileged side answered `{ok:false}` with an explicit message.
    #[error("{0}")]
    Application(String),
}

/// Issues correlated requests from the page.
pub struct PageBridge {
    bus: Arc<PageBus>,
    default_timeout: Duration,
    ping_deadline: Duration,
}

impl PageBridge {
    pub fn new(bus: Arc<PageBus>, config: &Config) -> Self {
        Self {
            bus,
            default_timeout: config.request_timeout,
            ping_deadline: config.ping_deadline,
        }
    }

    /// Issue `command` and await its matching response within `timeout`.
    ///
    /// Exactly one RESPONSE is consumed per call; replies for other
    /// request ids are left for their own callers.
    pub async fn issue(&self, command: Command, timeout: Duration) -> Result<Value, BridgeError> {
        let request = RequestEnvelope::new(command);
        let request_id = request.request_id.clone();

        // Register before posting so the reply cannot slip past us.
        let mut listener = self.bus.subscribe();

        let posted = serde_json::to_value(Envelope::Request(request))
            .map_err(|err| BridgeError::Application(err.to_string()))?;
        self.bus.post(posted, self.bus.origin());

        let matched = tokio::time::timeout(timeout, async {
            while let Some(message) = listener.recv().await {
                if !message.same_window || message.origin != self.bus.origin() {
                    continue;
                }
                let Ok(Envelope::Response(response)) =
                    serde_json::from_value::<Envelope>(message.data)
                else {
                    continue;
                };
                if response.channel == CHANNEL && response.request_id == request_id {
                    return Some(response);
                }
            }
            None
        })
        .await;

        match matched {
            Err(_) | Ok(None) => Err(BridgeError::Timeout(timeout)),
            Ok(Some(response)) => resolve(response),
        }
    }

    /// `issue` with the configured default timeout.
    pub async fn call(&self, command: Command) -> Result<Value, BridgeError> {
        self.issue(command, self.default_timeout).await
    }

    /// Whether the extension is installed and answering. Never errors:
    /// any failure inside the probe deadline reads as "not installed",
    /// so feature-gating UI can call this unconditionally.
    pub async fn detect_extension_installed(&self) -> bool {
        match self.issue(Command::Ping {}, self.ping_deadline).await {
            Ok(response) => response
                .get("installed")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

fn resolve(response: ResponseEnvelope) -> Result<Value, BridgeError> {
    if response.ok {
        return Ok(response.response.unwrap_or(Value::Null));
    }
    let message = response
        .error
        .unwrap_or_else(|| "Unknown extension error".to_string());
    if message.to_ascii_lowercase().contains("context invalidated") {
        return Err(BridgeError::Unreachable(
            CONTEXT_INVALIDATED_HINT.to_string(),
        ));
    }
    if message.contains("message port closed") {
        return Err(BridgeError::Unreachable(message));
    }
    Err(BridgeError::Application(message))
}
