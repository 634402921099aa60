//! Privileged command router.
//!
//! Long-lived coordinator of the privileged context: serves the command
//! vocabulary arriving from content relays, performs platform actions
//! directly (screenshots), delegates recording to the offscreen context,
//! and turns finished captures into push events tagged with the tab's
//! armed context. Every handler holds its completion open until the
//! underlying platform call has resolved; failures are recovered locally
//! into `{ok:false, error}` replies and never cross the isolation
//! boundary as panics.

pub mod context;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::capture::{capture_file_name, encode_artifact, CaptureKind, CaptureResult};
use crate::platform::{Platform, PlatformError};
use crate::protocol::{
    Command, Envelope, OffscreenCommand, OffscreenEvent, RecordingDone, RouterInbound, TabId,
};
use crate::transport::{PortError, RuntimePort, RuntimeService};

pub use context::{TabContext, TabContextRegistry};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No active tab")]
    NoActiveTab,

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("{0}")]
    Platform(String),

    /// The offscreen context could not be reached.
    #[error("{0}")]
    Recorder(String),
}

impl From<PlatformError> for CommandError {
    fn from(err: PlatformError) -> Self {
        CommandError::Platform(err.to_string())
    }
}

impl From<PortError> for CommandError {
    fn from(err: PortError) -> Self {
        CommandError::Recorder(err.to_string())
    }
}

/// The privileged coordinator. Shared by reference with the task serving
/// its request port.
pub struct CommandRouter {
    contexts: TabContextRegistry,
    platform: Arc<dyn Platform>,
    recorder: RuntimePort,
    tab_links: Mutex<HashMap<TabId, mpsc::UnboundedSender<Value>>>,
    captures: broadcast::Sender<CaptureResult>,
}

impl CommandRouter {
    pub fn new(platform: Arc<dyn Platform>, recorder: RuntimePort) -> Arc<Self> {
        let (captures, _) = broadcast::channel(32);
        Arc::new(Self {
            contexts: TabContextRegistry::new(),
            platform,
            recorder,
            tab_links: Mutex::new(HashMap::new()),
            captures,
        })
    }

    /// In-process feed of finished captures, for embedders that want them
    /// without going through a page.
    pub fn subscribe_captures(&self) -> broadcast::Receiver<CaptureResult> {
        self.captures.subscribe()
    }

    /// Attach a tab's push feed. The relay serving that tab consumes the
    /// receiver; push events for other tabs never reach it.
    pub fn connect_tab(&self, tab_id: TabId) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tab_links.lock().insert(tab_id, tx);
        rx
    }

    /// The tab is gone: force recorder teardown, clear its armed context,
    /// and drop its push feed. The embedder wires this to the platform's
    /// tab-removal signal.
    pub async fn handle_tab_removed(&self, tab_id: TabId) {
        let abort = OffscreenCommand::AbortRecording { tab_id };
        match serde_json::to_value(&abort) {
            Ok(payload) => {
                if let Err(err) = self.recorder.request(payload).await {
                    tracing::warn!(tab_id, error = %err, "abort did not reach the recorder");
                }
            }
            Err(err) => tracing::error!(tab_id, error = %err, "failed to serialize abort"),
        }
        self.contexts.disarm(tab_id);
        self.tab_links.lock().remove(&tab_id);
    }

    /// Handle one inbound payload and produce the full reply object.
    pub async fn dispatch(&self, payload: &Value) -> Value {
        let inbound: RouterInbound = match serde_json::from_value(payload.clone()) {
            Ok(inbound) => inbound,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting malformed command payload");
                return json!({"ok": false, "error": format!("Malformed command: {err}")});
            }
        };

        let result = match inbound {
            RouterInbound::Command(command) => self.handle_command(command).await,
            RouterInbound::Offscreen(OffscreenEvent::RecordingDone(done)) => {
                self.handle_recording_done(done).await
            }
        };

        result.unwrap_or_else(|err| json!({"ok": false, "error": err.to_string()}))
    }

    async fn handle_command(&self, command: Command) -> Result<Value, CommandError> {
        match command {
            Command::Ping {} => Ok(json!({"ok": true, "data": {"installed": true}})),

            Command::ArmTabContext {
                execution_id,
                test_case_id,
                step_number,
            } => {
                if execution_id.is_empty() {
                    return Err(CommandError::MissingParameter("executionId"));
                }
                if test_case_id.is_empty() {
                    return Err(CommandError::MissingParameter("testCaseId"));
                }
                let tab_id = self.active_tab().await?;
                let context = self
                    .contexts
                    .arm(tab_id, execution_id, test_case_id, step_number);
                Ok(json!({"ok": true, "data": context}))
            }

            Command::DisarmTabContext {} => {
                let tab_id = self.active_tab().await?;
                let cleared = self.contexts.disarm(tab_id).is_some();
                Ok(json!({"ok": true, "data": {"cleared": cleared}}))
            }

            Command::GetActiveTabContext {} => {
                let context = match self.platform.active_tab().await {
                    Some(tab_id) => self.contexts.get(tab_id),
                    None => None,
                };
                Ok(json!({"ok": true, "data": context}))
            }

            Command::GetRecordingStatus { tab_id } => {
                let target = match tab_id {
                    Some(tab_id) => Some(tab_id),
                    None => self.platform.active_tab().await,
                };
                let status = OffscreenCommand::GetStatus { tab_id: target };
                self.forward_to_recorder(&status).await
            }

            Command::CaptureScreenshotActiveTab {} => {
                let tab_id = self.active_tab().await?;
                let shot = self.platform.capture_screenshot(tab_id).await?;
                let timestamp = Utc::now();
                let result = CaptureResult {
                    kind: CaptureKind::Screenshot,
                    tab_id,
                    artifact: encode_artifact(&shot.bytes),
                    mime_type: shot.mime_type,
                    file_name: capture_file_name(CaptureKind::Screenshot, timestamp),
                    timestamp,
                    context: self.contexts.get(tab_id),
                };
                self.emit_capture(result);
                Ok(json!({"ok": true}))
            }

            Command::StartRecordingActiveTab {} => {
                let tab_id = self.active_tab().await?;
                let handle = self.platform.media_stream_handle(tab_id).await?;
                let start = OffscreenCommand::StartRecording {
                    tab_id,
                    stream_id: handle.0,
                };
                self.forward_to_recorder(&start).await
            }

            Command::StopRecordingCurrent {} => {
                let tab_id = self.active_tab().await?;
                let stop = OffscreenCommand::StopRecording { tab_id };
                self.forward_to_recorder(&stop).await
            }
        }
    }

    /// A recording finalized in the offscreen context: tag it with the
    /// tab's armed context and publish it.
    async fn handle_recording_done(&self, done: RecordingDone) -> Result<Value, CommandError> {
        let result = CaptureResult {
            kind: CaptureKind::Video,
            tab_id: done.tab_id,
            artifact: done.artifact,
            mime_type: done.mime_type,
            file_name: done.file_name,
            timestamp: done.recorded_at,
            context: self.contexts.get(done.tab_id),
        };
        self.emit_capture(result);
        Ok(json!({"ok": true}))
    }

    async fn active_tab(&self) -> Result<TabId, CommandError> {
        self.platform
            .active_tab()
            .await
            .ok_or(CommandError::NoActiveTab)
    }

    /// Forward a command to the offscreen context and pass its reply
    /// through verbatim, so recorder error wording reaches the page
    /// unchanged.
    async fn forward_to_recorder(
        &self,
        command: &OffscreenCommand,
    ) -> Result<Value, CommandError> {
        let payload = serde_json::to_value(command)
            .map_err(|err| CommandError::Recorder(err.to_string()))?;
        Ok(self.recorder.request(payload).await?)
    }

    fn emit_capture(&self, result: CaptureResult) {
        let envelope = Envelope::push(result.clone());
        match serde_json::to_value(&envelope) {
            Ok(value) => {
                let mut links = self.tab_links.lock();
                let mut stale = false;
                if let Some(link) = links.get(&result.tab_id) {
                    // Relay torn down (navigation): the push is lost, as
                    // it would be on the real transport.
                    stale = link.send(value).is_err();
                }
                if stale {
                    links.remove(&result.tab_id);
                }
            }
            Err(err) => tracing::error!(error = %err, "failed to serialize capture push"),
        }
        tracing::info!(
            tab_id = result.tab_id,
            kind = ?result.kind,
            file = %result.file_name,
            "capture completed"
        );
        let _ = self.captures.send(result);
    }
}

/// Serve the router's request port until every requester is gone.
pub fn spawn_router(
    router: Arc<CommandRouter>,
    mut service: RuntimeService,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = service.recv().await {
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                let reply = router.dispatch(request.payload()).await;
                request.respond(reply);
            });
        }
        tracing::debug!("command router torn down");
    })
}
