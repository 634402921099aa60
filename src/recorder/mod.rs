//! Offscreen recorder manager: per-tab recording sessions.
//!
//! Owns an arena keyed by tab id. At most one session may exist per tab;
//! uniqueness is enforced by a try-insert into the arena before any side
//! effect. A session moves absent → Recording → Finalizing → absent; the
//! finalize path assembles the ordered chunks into one artifact, releases
//! the stream's tracks, removes the session, and reports completion
//! upward.

pub mod backend;
pub mod mock;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::capture::{capture_file_name, encode_artifact, CaptureKind};
use crate::protocol::{OffscreenCommand, OffscreenEvent, RecordingDone, TabId};
use crate::transport::{RuntimePort, RuntimeService};

pub use backend::{CaptureSource, CaptureStream, RecorderEvent, RecorderHandle, RecorderSignal};
pub use mock::{ScriptedCaptureSource, ScriptedMedia};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecorderError {
    #[error("Already recording this tab")]
    AlreadyRecording,

    #[error("Not recording this tab")]
    NotRecording,

    #[error("Failed to acquire capture stream: {0}")]
    StreamAcquisition(String),
}

/// Lifecycle of one per-tab session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Recording,
    Finalizing,
}

enum SessionControl {
    Stop,
    Abort,
}

struct SessionEntry {
    state: SessionState,
    control: mpsc::Sender<SessionControl>,
}

type SessionArena = Arc<Mutex<HashMap<TabId, SessionEntry>>>;

/// Registry of active recording sessions, keyed by tab id.
#[derive(Clone)]
pub struct RecorderManager {
    sessions: SessionArena,
    source: Arc<dyn CaptureSource>,
    done_tx: mpsc::UnboundedSender<RecordingDone>,
    flush_interval: Duration,
}

impl RecorderManager {
    /// Create a manager along with the receiver of its completion
    /// reports.
    pub fn new(
        source: Arc<dyn CaptureSource>,
        flush_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<RecordingDone>) {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        (
            Self {
                sessions: Arc::new(Mutex::new(HashMap::new())),
                source,
                done_tx,
                flush_interval,
            },
            done_rx,
        )
    }

    /// Start a recording session for `tab_id`.
    ///
    /// The arena slot is claimed before any side effect, so a concurrent
    /// second start observes `AlreadyRecording` and the first session is
    /// untouched. If stream acquisition then fails, the slot is released.
    pub async fn start_recording(
        &self,
        tab_id: TabId,
        handle: crate::platform::StreamHandle,
    ) -> Result<(), RecorderError> {
        let (control_tx, control_rx) = mpsc::channel(4);
        match self.sessions.lock().entry(tab_id) {
            Entry::Occupied(_) => return Err(RecorderError::AlreadyRecording),
            Entry::Vacant(slot) => {
                slot.insert(SessionEntry {
                    state: SessionState::Recording,
                    control: control_tx,
                });
            }
        }

        let stream = match self.source.acquire(&handle).await {
            Ok(stream) => stream,
            Err(err) => {
                self.sessions.lock().remove(&tab_id);
                return Err(err);
            }
        };

        let recorder = stream.start_recorder(self.flush_interval);
        tracing::info!(tab_id, "recording started");

        tokio::spawn(drive_session(
            tab_id,
            stream,
            recorder,
            control_rx,
            Arc::clone(&self.sessions),
            self.done_tx.clone(),
        ));

        Ok(())
    }

    /// Signal the recorder for `tab_id` to stop; finalization is
    /// asynchronous and ends with a completion report.
    pub async fn stop_recording(&self, tab_id: TabId) -> Result<(), RecorderError> {
        let control = match self.sessions.lock().get(&tab_id) {
            None => return Err(RecorderError::NotRecording),
            Some(entry) => entry.control.clone(),
        };
        let _ = control.send(SessionControl::Stop).await;
        Ok(())
    }

    /// Forced teardown for a tab that went away: stop the recorder,
    /// release tracks, discard chunks, report nothing. Quiet no-op when
    /// the tab has no session.
    pub async fn abort(&self, tab_id: TabId) {
        let control = match self.sessions.lock().get(&tab_id) {
            None => return,
            Some(entry) => entry.control.clone(),
        };
        tracing::info!(tab_id, "aborting recording session");
        let _ = control.send(SessionControl::Abort).await;
    }

    /// Whether a session exists for `tab_id`, or for any tab when `None`.
    pub fn is_recording(&self, tab_id: Option<TabId>) -> bool {
        let sessions = self.sessions.lock();
        match tab_id {
            Some(tab_id) => sessions.contains_key(&tab_id),
            None => !sessions.is_empty(),
        }
    }

    /// Current lifecycle state of a tab's session, for diagnosis.
    pub fn session_state(&self, tab_id: TabId) -> Option<SessionState> {
        self.sessions.lock().get(&tab_id).map(|entry| entry.state)
    }
}

fn set_state(sessions: &SessionArena, tab_id: TabId, state: SessionState) {
    if let Some(entry) = sessions.lock().get_mut(&tab_id) {
        entry.state = state;
    }
}

/// Per-session driver: buffers ordered chunks, reacts to stop/abort
/// signals, and runs the finalize path when the recorder stops.
async fn drive_session(
    tab_id: TabId,
    stream: Box<dyn CaptureStream>,
    mut recorder: RecorderHandle,
    mut control: mpsc::Receiver<SessionControl>,
    sessions: SessionArena,
    done_tx: mpsc::UnboundedSender<RecordingDone>,
) {
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut aborted = false;
    let mut control_open = true;

    loop {
        tokio::select! {
            cmd = control.recv(), if control_open => match cmd {
                Some(SessionControl::Stop) => {
                    set_state(&sessions, tab_id, SessionState::Finalizing);
                    let _ = recorder.signals.send(RecorderSignal::Stop).await;
                }
                Some(SessionControl::Abort) => {
                    aborted = true;
                    set_state(&sessions, tab_id, SessionState::Finalizing);
                    let _ = recorder.signals.send(RecorderSignal::Stop).await;
                }
                None => control_open = false,
            },
            event = recorder.events.recv() => match event {
                Some(RecorderEvent::DataAvailable(chunk)) => chunks.push(chunk),
                Some(RecorderEvent::Error(message)) => {
                    // Session stays in the arena for diagnosis.
                    tracing::error!(tab_id, error = %message, "recorder error");
                }
                Some(RecorderEvent::Stopped) | None => break,
            },
        }
    }

    stream.stop_tracks();
    sessions.lock().remove(&tab_id);

    if aborted {
        tracing::info!(tab_id, discarded_chunks = chunks.len(), "recording aborted");
        return;
    }

    let recorded_at = Utc::now();
    let media = chunks.concat();
    tracing::info!(tab_id, bytes = media.len(), "recording finalized");

    let done = RecordingDone {
        tab_id,
        artifact: encode_artifact(&media),
        mime_type: stream.mime_type(),
        file_name: capture_file_name(CaptureKind::Video, recorded_at),
        recorded_at,
    };
    if done_tx.send(done).is_err() {
        tracing::warn!(tab_id, "no consumer for finished recording");
    }
}

/// Run the offscreen context: serve start/stop/status/abort requests from
/// the router and forward completion reports back up through the router's
/// port.
pub fn spawn_offscreen(
    manager: RecorderManager,
    mut service: RuntimeService,
    router: RuntimePort,
    mut done_rx: mpsc::UnboundedReceiver<RecordingDone>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                request = service.recv() => {
                    let Some(request) = request else { break };
                    let manager = manager.clone();
                    tokio::spawn(async move {
                        let reply = handle_offscreen_request(&manager, request.payload()).await;
                        request.respond(reply);
                    });
                }
                done = done_rx.recv() => {
                    let Some(done) = done else { break };
                    let router = router.clone();
                    tokio::spawn(async move {
                        let payload = match serde_json::to_value(OffscreenEvent::RecordingDone(done)) {
                            Ok(payload) => payload,
                            Err(err) => {
                                tracing::error!(error = %err, "failed to serialize completion report");
                                return;
                            }
                        };
                        if let Err(err) = router.request(payload).await {
                            tracing::warn!(error = %err, "completion report did not reach the router");
                        }
                    });
                }
            }
        }
        tracing::debug!("offscreen context torn down");
    })
}

async fn handle_offscreen_request(
    manager: &RecorderManager,
    payload: &serde_json::Value,
) -> serde_json::Value {
    let command: OffscreenCommand = match serde_json::from_value(payload.clone()) {
        Ok(command) => command,
        Err(err) => {
            tracing::debug!(error = %err, "dropping malformed offscreen command");
            return json!({"ok": false, "error": format!("Malformed offscreen command: {err}")});
        }
    };

    match command {
        OffscreenCommand::StartRecording { tab_id, stream_id } => {
            match manager
                .start_recording(tab_id, crate::platform::StreamHandle(stream_id))
                .await
            {
                Ok(()) => json!({"ok": true}),
                Err(err) => json!({"ok": false, "error": err.to_string()}),
            }
        }
        OffscreenCommand::StopRecording { tab_id } => match manager.stop_recording(tab_id).await {
            Ok(()) => json!({"ok": true}),
            Err(err) => json!({"ok": false, "error": err.to_string()}),
        },
        OffscreenCommand::GetStatus { tab_id } => {
            json!({"ok": true, "data": {"isRecording": manager.is_recording(tab_id)}})
        }
        OffscreenCommand::AbortRecording { tab_id } => {
            manager.abort(tab_id).await;
            json!({"ok": true})
        }
    }
}
