//! In-window message bus with browser `postMessage` semantics.
//!
//! A bus models one window: it has a single origin, deliveries are
//! fan-out to every registered listener, and each delivery is tagged with
//! the sender's origin plus whether it came from this window at all.
//! Listener registration is a guard value; dropping it deregisters, so a
//! caller cannot leak a listener on any exit path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

/// One delivered message, as a page listener would observe it.
#[derive(Debug, Clone)]
pub struct PageMessage {
    /// Origin of the sender.
    pub origin: String,
    /// Whether the sender is this same window.
    pub same_window: bool,
    pub data: Value,
}

/// A single window's message bus.
pub struct PageBus {
    origin: String,
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, mpsc::UnboundedSender<PageMessage>>>,
}

impl PageBus {
    pub fn new(origin: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.into(),
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
        })
    }

    /// The window's own origin.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Post from within this window, addressed to `target_origin`. A
    /// target that matches neither this window's origin nor `"*"` means
    /// the message is not for this window and is dropped undelivered.
    pub fn post(&self, data: Value, target_origin: &str) {
        if target_origin != "*" && target_origin != self.origin {
            tracing::trace!(target = target_origin, "dropping message for foreign target");
            return;
        }
        self.deliver(PageMessage {
            origin: self.origin.clone(),
            same_window: true,
            data,
        });
    }

    /// Deliver a message originating from another window (e.g. a hostile
    /// iframe). Listeners see the foreign origin and `same_window: false`.
    pub fn post_foreign(&self, origin: impl Into<String>, data: Value) {
        self.deliver(PageMessage {
            origin: origin.into(),
            same_window: false,
            data,
        });
    }

    fn deliver(&self, message: PageMessage) {
        let listeners = self.listeners.lock();
        for tx in listeners.values() {
            // A listener whose task is gone just misses the message.
            let _ = tx.send(message.clone());
        }
    }

    /// Register a listener. Dropping the returned subscription
    /// deregisters it.
    pub fn subscribe(self: &Arc<Self>) -> PageSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, tx);
        PageSubscription {
            id,
            bus: Arc::clone(self),
            rx,
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

/// Guard for one registered listener.
pub struct PageSubscription {
    id: u64,
    bus: Arc<PageBus>,
    rx: mpsc::UnboundedReceiver<PageMessage>,
}

impl PageSubscription {
    pub async fn recv(&mut self) -> Option<PageMessage> {
        self.rx.recv().await
    }
}

impl Drop for PageSubscription {
    fn drop(&mut self) {
        self.bus.listeners.lock().remove(&self.id);
    }
}
