//! Seam over the capture-capable context's media machinery.
//!
//! A `CaptureSource` redeems an opaque stream handle for a live stream; a
//! `CaptureStream` can spin up one recorder bound to it. The recorder
//! reports through an event channel: ordered data chunks while running,
//! errors in place, and a final `Stopped` once its buffers are flushed.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::platform::StreamHandle;
use crate::recorder::RecorderError;

/// Events emitted by a running recorder, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// One flushed media chunk.
    DataAvailable(Vec<u8>),
    /// Recorder-level failure. The recorder keeps running; the session
    /// stays addressable for diagnosis.
    Error(String),
    /// The recorder stopped and flushed its final chunk.
    Stopped,
}

/// Signals accepted by a running recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderSignal {
    Stop,
}

/// Live recorder bound to one capture stream.
pub struct RecorderHandle {
    pub events: mpsc::Receiver<RecorderEvent>,
    pub signals: mpsc::Sender<RecorderSignal>,
}

/// Redeems stream handles inside the capture-capable context.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn acquire(&self, handle: &StreamHandle) -> Result<Box<dyn CaptureStream>, RecorderError>;
}

/// An acquired media stream.
pub trait CaptureStream: Send + Sync {
    /// Container mime type the recorder will produce.
    fn mime_type(&self) -> String;

    /// Create and start a recorder bound to this stream, flushing a data
    /// chunk every `flush_interval`.
    fn start_recorder(&self, flush_interval: Duration) -> RecorderHandle;

    /// Release the stream's underlying tracks. Idempotent.
    fn stop_tracks(&self);
}
