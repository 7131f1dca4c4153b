//! Per-user conversation slots.
//!
//! Each user holds at most one slot; whichever flow runs owns it
//! exclusively. Slots live purely in memory and die with the process.

use crate::flows::FlowState;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

struct SessionEntry {
    state: FlowState,
    touched_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SessionManager {
    slots: HashMap<i64, SessionEntry>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the user's slot, cancelling any flow already in it
    pub fn start(&mut self, telegram_id: i64, state: FlowState) {
        if let Some(previous) = self.slots.get(&telegram_id) {
            tracing::debug!(
                user_id = telegram_id,
                from = previous.state.name(),
                to = state.name(),
                "replacing active flow"
            );
        }
        self.slots.insert(
            telegram_id,
            SessionEntry {
                state,
                touched_at: Utc::now(),
            },
        );
    }

    /// Advance the current conversation, refreshing its idle clock
    pub fn update(&mut self, telegram_id: i64, state: FlowState) {
        self.slots.insert(
            telegram_id,
            SessionEntry {
                state,
                touched_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, telegram_id: i64) -> Option<&FlowState> {
        self.slots.get(&telegram_id).map(|entry| &entry.state)
    }

    pub fn clear(&mut self, telegram_id: i64) {
        self.slots.remove(&telegram_id);
    }

    /// True when the slot holds a state waiting for free text. Selection
    /// states wait for a button, so they report inactive here.
    pub fn is_active(&self, telegram_id: i64) -> bool {
        self.slots
            .get(&telegram_id)
            .is_some_and(|entry| entry.state.awaits_text())
    }

    /// Drop slots idle longer than `max_idle`. Abandoned conversations
    /// would otherwise pin memory for the life of the process.
    pub fn evict_idle(&mut self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let before = self.slots.len();
        self.slots.retain(|_, entry| entry.touched_at >= cutoff);
        let evicted = before - self.slots.len();
        if evicted > 0 {
            tracing::debug!(count = evicted, "evicted idle sessions");
        }
        evicted
    }
}
