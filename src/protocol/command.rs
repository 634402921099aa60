//! Command vocabulary dispatched by the Command Router.
//!
//! Commands are a closed enumeration: dispatch is an exhaustive match, so
//! an unrecognized name fails at parse time instead of falling through a
//! stringly-typed default branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::TabId;

/// Page-facing command vocabulary.
///
/// The wire shape is `{ "command": NAME, "payload": { .. } }`; every
/// variant is a struct variant so the payload object is always present,
/// empty or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload")]
pub enum Command {
    /// Liveness probe used by installation detection.
    #[serde(rename = "PING")]
    Ping {},

    /// Host-driven arm: associate the active tab with a test execution step.
    #[serde(rename = "ARM_TAB_CONTEXT", rename_all = "camelCase")]
    ArmTabContext {
        execution_id: String,
        test_case_id: String,
        step_number: u32,
    },

    /// Clear the active tab's armed context. Arming has no expiry; the
    /// host clears a stale arm explicitly.
    #[serde(rename = "DISARM_TAB_CONTEXT")]
    DisarmTabContext {},

    #[serde(rename = "GET_ACTIVE_TAB_CONTEXT")]
    GetActiveTabContext {},

    /// Recording status for a specific tab, or for the active tab when no
    /// id is given.
    #[serde(rename = "GET_RECORDING_STATUS", rename_all = "camelCase")]
    GetRecordingStatus {
        #[serde(default)]
        tab_id: Option<TabId>,
    },

    #[serde(rename = "CAPTURE_SCREENSHOT_ACTIVE_TAB")]
    CaptureScreenshotActiveTab {},

    #[serde(rename = "START_RECORDING_ACTIVE_TAB")]
    StartRecordingActiveTab {},

    #[serde(rename = "STOP_RECORDING_CURRENT")]
    StopRecordingCurrent {},
}

impl Command {
    /// Wire name, as it appears in the envelope's `command` field.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping {} => "PING",
            Command::ArmTabContext { .. } => "ARM_TAB_CONTEXT",
            Command::DisarmTabContext {} => "DISARM_TAB_CONTEXT",
            Command::GetActiveTabContext {} => "GET_ACTIVE_TAB_CONTEXT",
            Command::GetRecordingStatus { .. } => "GET_RECORDING_STATUS",
            Command::CaptureScreenshotActiveTab {} => "CAPTURE_SCREENSHOT_ACTIVE_TAB",
            Command::StartRecordingActiveTab {} => "START_RECORDING_ACTIVE_TAB",
            Command::StopRecordingCurrent {} => "STOP_RECORDING_CURRENT",
        }
    }
}

/// Privileged-to-offscreen vocabulary. Never visible to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload")]
pub enum OffscreenCommand {
    #[serde(rename = "OFFSCREEN_START_RECORDING", rename_all = "camelCase")]
    StartRecording { tab_id: TabId, stream_id: String },

    #[serde(rename = "OFFSCREEN_STOP_RECORDING", rename_all = "camelCase")]
    StopRecording { tab_id: TabId },

    /// Status probe behind GET_RECORDING_STATUS.
    #[serde(rename = "OFFSCREEN_GET_STATUS", rename_all = "camelCase")]
    GetStatus {
        #[serde(default)]
        tab_id: Option<TabId>,
    },

    /// Forced teardown for a tab that went away mid-recording: stop the
    /// recorder, release tracks, discard chunks, emit no completion.
    #[serde(rename = "OFFSCREEN_ABORT_RECORDING", rename_all = "camelCase")]
    AbortRecording { tab_id: TabId },
}

/// Completion report sent upward from the offscreen context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload")]
pub enum OffscreenEvent {
    #[serde(rename = "OFFSCREEN_RECORDING_DONE")]
    RecordingDone(RecordingDone),
}

/// Payload of a finalized recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDone {
    pub tab_id: TabId,
    /// Base64-encoded media payload.
    pub artifact: String,
    pub mime_type: String,
    pub file_name: String,
    pub recorded_at: DateTime<Utc>,
}

/// Everything the Command Router accepts on its service port: page
/// commands forwarded by the relay, plus offscreen completion reports.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RouterInbound {
    Command(Command),
    Offscreen(OffscreenEvent),
}
