pub mod bridge;
pub mod capture;
pub mod config;
pub mod core;
pub mod platform;
pub mod protocol;
pub mod recorder;
pub mod relay;
pub mod router;
pub mod transport;
pub mod util;

pub use bridge::{BridgeError, PageBridge};
pub use capture::{CaptureKind, CaptureResult};
pub use config::Config;
pub use crate::core::CaptureCore;
pub use platform::{Platform, PlatformError, Screenshot, StreamHandle};
pub use protocol::{Command, Envelope, RecordingDone, TabId, CHANNEL};
pub use recorder::{CaptureSource, CaptureStream, RecorderError, RecorderManager};
pub use router::{CommandRouter, TabContext, TabContextRegistry};
pub use transport::{PageBus, RuntimePort};
