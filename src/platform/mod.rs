//! Seam over the privileged browser platform.
//!
//! The subsystem treats the platform as an external collaborator: it can
//! name the active tab, take a screenshot of it, and mint an opaque
//! capture-stream handle for it. Everything behind those three calls is
//! out of scope.

pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::TabId;

pub use mock::ScriptedPlatform;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),
}

/// Raw screenshot bytes straight from the platform.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Opaque reference used to obtain a tab's media feed. Only the
/// capture-capable context can redeem it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle(pub String);

/// Privileged platform operations the Command Router depends on.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Currently focused tab, if any.
    async fn active_tab(&self) -> Option<TabId>;

    /// Take a still screenshot of the given tab.
    async fn capture_screenshot(&self, tab_id: TabId) -> Result<Screenshot, PlatformError>;

    /// Mint a capture-stream handle for the given tab.
    async fn media_stream_handle(&self, tab_id: TabId) -> Result<StreamHandle, PlatformError>;
}
