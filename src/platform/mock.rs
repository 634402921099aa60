//! Scripted platform for deterministic testing and the demo binary.
//!
//! Implements the Platform trait against in-memory state instead of a
//! real browser, with knobs to change the active tab and to force
//! permission failures.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::platform::{Platform, PlatformError, Screenshot, StreamHandle};
use crate::protocol::TabId;

struct ScriptedState {
    active_tab: Option<TabId>,
    screenshot_bytes: Vec<u8>,
    deny_capture: bool,
    screenshots_taken: u32,
    handles_minted: u32,
}

/// In-memory platform with adjustable behavior.
#[derive(Clone)]
pub struct ScriptedPlatform {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedPlatform {
    /// Platform with the given tab focused and a tiny placeholder PNG.
    pub fn with_active_tab(tab_id: TabId) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                active_tab: Some(tab_id),
                screenshot_bytes: b"\x89PNG\r\n\x1a\nstub".to_vec(),
                deny_capture: false,
                screenshots_taken: 0,
                handles_minted: 0,
            })),
        }
    }

    /// Platform with no focused tab at all.
    pub fn without_active_tab() -> Self {
        let platform = Self::with_active_tab(0);
        platform.state.lock().active_tab = None;
        platform
    }

    pub fn set_active_tab(&self, tab_id: Option<TabId>) {
        self.state.lock().active_tab = tab_id;
    }

    pub fn set_screenshot_bytes(&self, bytes: Vec<u8>) {
        self.state.lock().screenshot_bytes = bytes;
    }

    /// Make subsequent capture calls fail with a permission error.
    pub fn deny_capture(&self) {
        self.state.lock().deny_capture = true;
    }

    pub fn screenshots_taken(&self) -> u32 {
        self.state.lock().screenshots_taken
    }

    pub fn handles_minted(&self) -> u32 {
        self.state.lock().handles_minted
    }
}

#[async_trait]
impl Platform for ScriptedPlatform {
    async fn active_tab(&self) -> Option<TabId> {
        self.state.lock().active_tab
    }

    async fn capture_screenshot(&self, tab_id: TabId) -> Result<Screenshot, PlatformError> {
        let mut state = self.state.lock();
        if state.deny_capture {
            return Err(PlatformError::PermissionDenied(format!(
                "activeTab permission not granted for tab {tab_id}"
            )));
        }
        state.screenshots_taken += 1;
        Ok(Screenshot {
            bytes: state.screenshot_bytes.clone(),
            mime_type: "image/png".to_string(),
        })
    }

    async fn media_stream_handle(&self, tab_id: TabId) -> Result<StreamHandle, PlatformError> {
        let mut state = self.state.lock();
        if state.deny_capture {
            return Err(PlatformError::PermissionDenied(format!(
                "tab capture not granted for tab {tab_id}"
            )));
        }
        state.handles_minted += 1;
        Ok(StreamHandle(format!(
            "stream-{tab_id}-{}",
            state.handles_minted
        )))
    }
}
