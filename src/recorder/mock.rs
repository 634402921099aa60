//! Scripted capture source for deterministic testing and the demo binary.
//!
//! Streams emit a fixed chunk on every flush until stopped, then flush a
//! final chunk and report `Stopped`, matching the cadence of a real
//! recorder. Knobs cover acquisition failure, a one-shot recorder error,
//! and a delayed stop for observing the finalizing state.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::platform::StreamHandle;
use crate::recorder::backend::{CaptureSource, CaptureStream, RecorderEvent, RecorderHandle};
use crate::recorder::RecorderError;

/// Behavior of scripted streams.
#[derive(Clone)]
pub struct ScriptedMedia {
    /// Bytes emitted per data-available flush.
    pub chunk: Vec<u8>,
    /// If set, `acquire` fails with this message.
    pub fail_acquire: Option<String>,
    /// If set, the recorder emits one error event after its first chunk.
    pub error_once: Option<String>,
    /// Delay between the stop signal and the final flush.
    pub stop_delay: Duration,
}

impl Default for ScriptedMedia {
    fn default() -> Self {
        Self {
            chunk: b"webmchunk".to_vec(),
            fail_acquire: None,
            error_once: None,
            stop_delay: Duration::ZERO,
        }
    }
}

impl ScriptedMedia {
    pub fn with_chunk(mut self, chunk: Vec<u8>) -> Self {
        self.chunk = chunk;
        self
    }

    pub fn failing_acquire(mut self, message: impl Into<String>) -> Self {
        self.fail_acquire = Some(message.into());
        self
    }

    pub fn erroring_once(mut self, message: impl Into<String>) -> Self {
        self.error_once = Some(message.into());
        self
    }

    pub fn holding_stop(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }
}

/// In-memory capture source with observable track release.
#[derive(Clone)]
pub struct ScriptedCaptureSource {
    media: ScriptedMedia,
    released: Arc<Mutex<HashSet<String>>>,
}

impl ScriptedCaptureSource {
    pub fn new(media: ScriptedMedia) -> Self {
        Self {
            media,
            released: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether the stream acquired from `handle_id` had its tracks
    /// released.
    pub fn tracks_released(&self, handle_id: &str) -> bool {
        self.released.lock().contains(handle_id)
    }
}

#[async_trait]
impl CaptureSource for ScriptedCaptureSource {
    async fn acquire(&self, handle: &StreamHandle) -> Result<Box<dyn CaptureStream>, RecorderError> {
        if let Some(message) = &self.media.fail_acquire {
            return Err(RecorderError::StreamAcquisition(message.clone()));
        }
        Ok(Box::new(ScriptedStream {
            handle_id: handle.0.clone(),
            media: self.media.clone(),
            released: Arc::clone(&self.released),
        }))
    }
}

struct ScriptedStream {
    handle_id: String,
    media: ScriptedMedia,
    released: Arc<Mutex<HashSet<String>>>,
}

impl CaptureStream for ScriptedStream {
    fn mime_type(&self) -> String {
        "video/webm".to_string()
    }

    fn start_recorder(&self, flush_interval: Duration) -> RecorderHandle {
        let (event_tx, event_rx) = mpsc::channel(32);
        let (signal_tx, mut signal_rx) = mpsc::channel(4);
        let chunk = self.media.chunk.clone();
        let mut error_pending = self.media.error_once.clone();
        let stop_delay = self.media.stop_delay;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(flush_interval) => {
                        if event_tx.send(RecorderEvent::DataAvailable(chunk.clone())).await.is_err() {
                            break;
                        }
                        if let Some(message) = error_pending.take() {
                            if event_tx.send(RecorderEvent::Error(message)).await.is_err() {
                                break;
                            }
                        }
                    }
                    _signal = signal_rx.recv() => {
                        // Stop, or the session driver went away entirely.
                        if !stop_delay.is_zero() {
                            tokio::time::sleep(stop_delay).await;
                        }
                        let _ = event_tx.send(RecorderEvent::DataAvailable(chunk.clone())).await;
                        let _ = event_tx.send(RecorderEvent::Stopped).await;
                        break;
                    }
                }
            }
        });

        RecorderHandle {
            events: event_rx,
            signals: signal_tx,
        }
    }

    fn stop_tracks(&self) {
        self.released.lock().insert(self.handle_id.clone());
    }
}
