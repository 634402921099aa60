//! Per-tab armed test-execution context.
//!
//! Arming associates a tab with the execution identifiers that subsequent
//! captures are tagged with. The table is single-owner per tab and
//! last-write-wins; entries never expire on their own — a stale arm is
//! overwritten by the next arm or cleared by an explicit disarm.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::protocol::TabId;

/// The identifiers a tab is currently armed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabContext {
    pub tab_id: TabId,
    pub execution_id: String,
    pub test_case_id: String,
    pub step_number: u32,
    pub armed_at: DateTime<Utc>,
}

/// In-memory table mapping a tab to its armed context.
#[derive(Default)]
pub struct TabContextRegistry {
    contexts: Mutex<HashMap<TabId, TabContext>>,
}

impl TabContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `tab_id`, overwriting any previous context for it.
    pub fn arm(
        &self,
        tab_id: TabId,
        execution_id: impl Into<String>,
        test_case_id: impl Into<String>,
        step_number: u32,
    ) -> TabContext {
        let context = TabContext {
            tab_id,
            execution_id: execution_id.into(),
            test_case_id: test_case_id.into(),
            step_number,
            armed_at: Utc::now(),
        };
        self.contexts.lock().insert(tab_id, context.clone());
        tracing::debug!(
            tab_id,
            execution_id = %context.execution_id,
            step_number,
            "tab armed"
        );
        context
    }

    pub fn get(&self, tab_id: TabId) -> Option<TabContext> {
        self.contexts.lock().get(&tab_id).cloned()
    }

    /// Clear a tab's context, returning what was armed.
    pub fn disarm(&self, tab_id: TabId) -> Option<TabContext> {
        self.contexts.lock().remove(&tab_id)
    }
}
