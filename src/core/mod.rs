//! Core infrastructure: assembles the four capture contexts.
//!
//! Owns the channel fabric and the spawned actors for one extension
//! instance: a command router and an offscreen recorder on the
//! privileged side, plus one page bus / relay / bridge per attached tab.
//! Embedders (the demo binary, integration tests, a real host) construct
//! it with whatever platform and capture source they have.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::bridge::PageBridge;
use crate::config::Config;
use crate::platform::Platform;
use crate::protocol::TabId;
use crate::recorder::{spawn_offscreen, CaptureSource, RecorderManager};
use crate::relay::spawn_content_relay;
use crate::router::{spawn_router, CommandRouter};
use crate::transport::{runtime_channel, PageBus, RuntimePort};

/// One assembled extension instance.
pub struct CaptureCore {
    config: Config,
    router: Arc<CommandRouter>,
    runtime_port: RuntimePort,
    tasks: Vec<JoinHandle<()>>,
}

impl CaptureCore {
    /// Spawn the privileged contexts. No tab is attached yet.
    pub fn launch(
        platform: Arc<dyn Platform>,
        source: Arc<dyn CaptureSource>,
        config: Config,
    ) -> Self {
        let (runtime_port, router_service) = runtime_channel(config.channel_capacity);
        let (recorder_port, recorder_service) = runtime_channel(config.channel_capacity);

        let router = CommandRouter::new(platform, recorder_port);
        let (manager, done_rx) = RecorderManager::new(source, config.flush_interval);

        let tasks = vec![
            spawn_offscreen(manager, recorder_service, runtime_port.clone(), done_rx),
            spawn_router(Arc::clone(&router), router_service),
        ];

        Self {
            config,
            router,
            runtime_port,
            tasks,
        }
    }

    /// Attach a page: a bus for its window, a relay serving it, and a
    /// bridge the host application issues calls through.
    pub fn attach_tab(&mut self, tab_id: TabId, origin: &str) -> (Arc<PageBus>, PageBridge) {
        let bus = PageBus::new(origin);
        let pushes = self.router.connect_tab(tab_id);
        self.tasks.push(spawn_content_relay(
            Arc::clone(&bus),
            self.runtime_port.clone(),
            pushes,
        ));
        let bridge = PageBridge::new(Arc::clone(&bus), &self.config);
        (bus, bridge)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The privileged coordinator, for capture subscriptions and
    /// tab-lifecycle notifications.
    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    /// Tear every spawned context down. In-flight bridge calls resolve
    /// through their own timeouts, exactly as when a real extension is
    /// unloaded mid-request.
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
