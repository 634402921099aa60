//! Capture artifacts emitted to the host application.

use base64::engine::general_purpose;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::TabId;
use crate::router::context::TabContext;

/// What kind of evidence a capture produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Screenshot,
    Video,
}

impl CaptureKind {
    pub fn default_mime_type(&self) -> &'static str {
        match self {
            CaptureKind::Screenshot => "image/png",
            CaptureKind::Video => "video/webm",
        }
    }

    fn file_prefix(&self) -> &'static str {
        match self {
            CaptureKind::Screenshot => "screenshot",
            CaptureKind::Video => "recording",
        }
    }

    fn file_extension(&self) -> &'static str {
        match self {
            CaptureKind::Screenshot => "png",
            CaptureKind::Video => "webm",
        }
    }
}

/// A finished capture, tagged with the tab's armed context when one
/// exists. The host uploads the artifact and associates it with the
/// execution identifiers; this crate never persists anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub kind: CaptureKind,
    pub tab_id: TabId,
    /// Base64-encoded payload, inline.
    pub artifact: String,
    pub mime_type: String,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<TabContext>,
}

/// Encode raw capture bytes for transport across context boundaries.
pub fn encode_artifact(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Timestamp-based artifact filename, e.g. `recording-20260806-141502.webm`.
pub fn capture_file_name(kind: CaptureKind, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}.{}",
        kind.file_prefix(),
        at.format("%Y%m%d-%H%M%S"),
        kind.file_extension()
    )
}
