//! Wire protocol shared by every capture context.
//!
//! All cross-context traffic is a serialized envelope on a single fixed
//! channel: correlated REQUEST/RESPONSE pairs issued by the page, and
//! one-way push events announcing finished captures.

pub mod command;
pub mod envelope;

pub use command::{Command, OffscreenCommand, OffscreenEvent, RecordingDone, RouterInbound};
pub use envelope::{Envelope, PushEnvelope, RequestEnvelope, ResponseEnvelope, CHANNEL};

/// Platform tab identifier.
pub type TabId = u64;
