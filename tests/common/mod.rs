//! Shared fixtures for the integration suite: a fully wired capture
//! stack over the scripted platform and capture source.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use stepshot::platform::ScriptedPlatform;
use stepshot::recorder::{ScriptedCaptureSource, ScriptedMedia};
use stepshot::transport::PageSubscription;
use stepshot::{CaptureCore, Config, PageBridge, PageBus};

pub const ORIGIN: &str = "https://app.example.test";

/// Everything a test needs to drive the stack from the page side while
/// observing the simulated platform underneath.
pub struct Rig {
    pub core: CaptureCore,
    pub platform: ScriptedPlatform,
    pub source: ScriptedCaptureSource,
    pub bus: Arc<PageBus>,
    pub bridge: PageBridge,
}

/// Tight deadlines and a fast recorder flush so tests settle quickly.
pub fn fast_config() -> Config {
    Config {
        request_timeout: Duration::from_millis(400),
        ping_deadline: Duration::from_millis(80),
        flush_interval: Duration::from_millis(5),
        channel_capacity: 16,
    }
}

pub fn launch_rig(tab: u64) -> Rig {
    launch_rig_with(tab, ScriptedMedia::default())
}

pub fn launch_rig_with(tab: u64, media: ScriptedMedia) -> Rig {
    let platform = ScriptedPlatform::with_active_tab(tab);
    let source = ScriptedCaptureSource::new(media);
    let mut core = CaptureCore::launch(
        Arc::new(platform.clone()),
        Arc::new(source.clone()),
        fast_config(),
    );
    let (bus, bridge) = core.attach_tab(tab, ORIGIN);
    Rig {
        core,
        platform,
        source,
        bus,
        bridge,
    }
}

/// Next bus message of the given envelope type, or None within the
/// deadline.
pub async fn next_of_type(
    sub: &mut PageSubscription,
    envelope_type: &str,
    deadline: Duration,
) -> Option<Value> {
    let wait = async {
        loop {
            let message = sub.recv().await?;
            if message.data.get("type").and_then(Value::as_str) == Some(envelope_type) {
                return Some(message.data);
            }
        }
    };
    tokio::time::timeout(deadline, wait).await.ok().flatten()
}
