//! Content relay: the isolated forwarder injected into every page.
//!
//! Pure forwarder with no state of its own. Page requests that pass the
//! origin, channel, and type checks are forwarded into the privileged
//! runtime verbatim; everything else is dropped silently. Privileged push
//! events on the shared channel are re-posted to the page. Both
//! directions speak exclusively to the page's own origin.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use crate::protocol::{Envelope, ResponseEnvelope, CHANNEL};
use crate::transport::{PageBus, RuntimePort};

const PUSH_TYPES: [&str; 2] = ["EVIDENCE_CAPTURED", "VIDEO_CAPTURED"];

/// Run a relay for one page: forward its requests over `port` and
/// re-post push events arriving on `pushes`.
pub fn spawn_content_relay(
    bus: Arc<PageBus>,
    port: RuntimePort,
    mut pushes: mpsc::UnboundedReceiver<Value>,
) -> tokio::task::JoinHandle<()> {
    // Register on the bus before the task runs, so a request posted
    // immediately after spawning cannot slip past the relay.
    let mut inbound = bus.subscribe();
    tokio::spawn(async move {
        let mut pushes_open = true;
        loop {
            tokio::select! {
                message = inbound.recv() => {
                    let Some(message) = message else { break };
                    if !message.same_window || message.origin != bus.origin() {
                        tracing::trace!(origin = %message.origin, "dropping cross-origin page message");
                        continue;
                    }
                    let Some(request) = screen_request(&message.data) else {
                        continue;
                    };
                    let bus = Arc::clone(&bus);
                    let port = port.clone();
                    tokio::spawn(async move {
                        let response = forward(&port, request.forward).await;
                        let envelope = Envelope::Response(ResponseEnvelope {
                            channel: CHANNEL.to_string(),
                            request_id: request.request_id,
                            ok: response.ok,
                            response: response.response,
                            error: response.error,
                        });
                        match serde_json::to_value(&envelope) {
                            // Replies go to the page's own origin, never anywhere else.
                            Ok(value) => bus.post(value, bus.origin()),
                            Err(err) => tracing::error!(error = %err, "failed to serialize relay response"),
                        }
                    });
                }
                push = pushes.recv(), if pushes_open => {
                    match push {
                        Some(value) => {
                            if is_capture_push(&value) {
                                bus.post(value, bus.origin());
                            } else {
                                tracing::trace!("dropping push event off the shared channel");
                            }
                        }
                        None => pushes_open = false,
                    }
                }
            }
        }
        tracing::debug!("content relay torn down");
    })
}

struct ScreenedRequest {
    request_id: String,
    forward: Value,
}

/// Shallow envelope checks. The relay never interprets the command; a
/// request that passes here is forwarded as-is and the router decides
/// whether it means anything.
fn screen_request(data: &Value) -> Option<ScreenedRequest> {
    let obj: &Map<String, Value> = data.as_object()?;
    if obj.get("channel").and_then(Value::as_str) != Some(CHANNEL) {
        return None;
    }
    if obj.get("type").and_then(Value::as_str) != Some("REQUEST") {
        return None;
    }
    let request_id = obj.get("requestId").and_then(Value::as_str)?.to_string();
    let forward = json!({
        "command": obj.get("command").cloned().unwrap_or(Value::Null),
        "payload": obj.get("payload").cloned().unwrap_or_else(|| json!({})),
    });
    Some(ScreenedRequest {
        request_id,
        forward,
    })
}

struct RelayedResponse {
    ok: bool,
    response: Option<Value>,
    error: Option<String>,
}

/// Send the screened request through the privileged runtime and shape
/// its completion into response-envelope fields: the transport step
/// itself can reject, or the reply can carry an application-level
/// `{ok:false}`.
async fn forward(port: &RuntimePort, payload: Value) -> RelayedResponse {
    match port.request(payload).await {
        Ok(reply) => {
            let ok = reply.get("ok") != Some(&Value::Bool(false));
            let error = reply
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string);
            let response = reply.get("data").cloned().unwrap_or(reply);
            RelayedResponse {
                ok,
                response: Some(response),
                error,
            }
        }
        Err(err) => RelayedResponse {
            ok: false,
            response: None,
            error: Some(err.to_string()),
        },
    }
}

fn is_capture_push(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.get("channel").and_then(Value::as_str) == Some(CHANNEL)
        && obj
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| PUSH_TYPES.contains(&kind))
}
