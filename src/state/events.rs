//! Lookup events
//!
//! Every state transition the coordinator performs is recorded here so the
//! front end (and tests) can see what happened to a response after the fact.

use crate::state::mode::LookupMode;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupEvent {
    ModeSwitched { from: LookupMode, to: LookupMode },
    InputChanged { mode: LookupMode, valid: bool },
    LimitChanged { mode: LookupMode, valid: bool },
    CollectionSelected { mode: LookupMode, collection: Option<String> },
    RunBlocked { mode: LookupMode, reason: String },
    RequestIssued { mode: LookupMode, token: u64 },
    OutcomeAccepted { mode: LookupMode, token: u64, status: String },
    OutcomeDiscarded { mode: LookupMode, token: u64, current: u64 },
    ConnectionChanged { connection_id: Option<String> },
    CollectionsApplied { connection_id: String, loaded: bool },
    CollectionsDiscarded { connection_id: String },
    ClipboardIgnored { reason: String },
}

/// Bounded history of lookup events
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<LookupEvent>,
    max_events: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events: max_events.max(1),
        }
    }

    pub fn record(&mut self, event: LookupEvent) {
        debug!(target: "state", "{:?}", event);
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn events(&self) -> impl Iterator<Item = &LookupEvent> {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&LookupEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
