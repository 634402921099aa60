//! Envelope types exchanged between contexts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::capture::CaptureResult;
use crate::protocol::command::Command;

/// Fixed channel name carried by every envelope. Messages on any other
/// channel are dropped unread.
pub const CHANNEL: &str = "stepshot-evidence";

/// Any message that travels between contexts.
///
/// The `type` tag discriminates correlated request/response traffic from
/// one-way capture push events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    #[serde(rename = "REQUEST")]
    Request(RequestEnvelope),

    #[serde(rename = "RESPONSE")]
    Response(ResponseEnvelope),

    /// A screenshot finished and its artifact is attached.
    #[serde(rename = "EVIDENCE_CAPTURED")]
    EvidenceCaptured(PushEnvelope),

    /// A recording finalized and its artifact is attached.
    #[serde(rename = "VIDEO_CAPTURED")]
    VideoCaptured(PushEnvelope),
}

impl Envelope {
    pub fn channel(&self) -> &str {
        match self {
            Envelope::Request(req) => &req.channel,
            Envelope::Response(resp) => &resp.channel,
            Envelope::EvidenceCaptured(push) | Envelope::VideoCaptured(push) => &push.channel,
        }
    }

    /// Whether this envelope belongs to the shared capture channel.
    pub fn on_channel(&self) -> bool {
        self.channel() == CHANNEL
    }

    /// Wrap a finished capture in the push variant matching its kind.
    pub fn push(result: CaptureResult) -> Self {
        let push = PushEnvelope {
            channel: CHANNEL.to_string(),
            result,
        };
        match push.result.kind {
            crate::capture::CaptureKind::Screenshot => Envelope::EvidenceCaptured(push),
            crate::capture::CaptureKind::Video => Envelope::VideoCaptured(push),
        }
    }
}

/// Correlated request issued by the Page Bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub channel: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(flatten)]
    pub command: Command,
}

impl RequestEnvelope {
    /// Build a request with a fresh correlation id.
    pub fn new(command: Command) -> Self {
        Self {
            channel: CHANNEL.to_string(),
            request_id: Uuid::new_v4().to_string(),
            command,
        }
    }
}

/// Reply to a single request, matched by `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub channel: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok(request_id: impl Into<String>, response: Value) -> Self {
        Self {
            channel: CHANNEL.to_string(),
            request_id: request_id.into(),
            ok: true,
            response: Some(response),
            error: None,
        }
    }

    pub fn err(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            channel: CHANNEL.to_string(),
            request_id: request_id.into(),
            ok: false,
            response: None,
            error: Some(error.into()),
        }
    }
}

/// One-way capture announcement; the artifact payload is flattened into
/// the envelope body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub channel: String,
    #[serde(flatten)]
    pub result: CaptureResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let req = RequestEnvelope::new(Command::ArmTabContext {
            execution_id: "E1".into(),
            test_case_id: "T1".into(),
            step_number: 3,
        });
        let value = serde_json::to_value(Envelope::Request(req.clone())).unwrap();

        assert_eq!(value["channel"], CHANNEL);
        assert_eq!(value["type"], "REQUEST");
        assert_eq!(value["requestId"], req.request_id);
        assert_eq!(value["command"], "ARM_TAB_CONTEXT");
        assert_eq!(value["payload"]["executionId"], "E1");
        assert_eq!(value["payload"]["testCaseId"], "T1");
        assert_eq!(value["payload"]["stepNumber"], 3);
    }

    #[test]
    fn fresh_request_ids_per_call() {
        let a = RequestEnvelope::new(Command::Ping {});
        let b = RequestEnvelope::new(Command::Ping {});
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn response_roundtrip() {
        let raw = json!({
            "channel": CHANNEL,
            "type": "RESPONSE",
            "requestId": "req-1",
            "ok": false,
            "error": "Not recording this tab",
        });
        let parsed: Envelope = serde_json::from_value(raw).unwrap();
        match parsed {
            Envelope::Response(resp) => {
                assert_eq!(resp.request_id, "req-1");
                assert!(!resp.ok);
                assert_eq!(resp.error.as_deref(), Some("Not recording this tab"));
                assert!(resp.response.is_none());
            }
            other => panic!("expected response envelope, got {other:?}"),
        }
    }

    #[test]
    fn foreign_channel_is_detectable() {
        let raw = json!({
            "channel": "someone-elses-channel",
            "type": "RESPONSE",
            "requestId": "req-2",
            "ok": true,
        });
        let parsed: Envelope = serde_json::from_value(raw).unwrap();
        assert!(!parsed.on_channel());
    }
}
