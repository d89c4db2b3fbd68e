//! Bounded in-memory alert buffer
//!
//! Holds the most recent normalized alerts for the read API. Oldest alerts are
//! evicted once capacity is reached. Alert ids are unique within the buffer, so
//! a retried batch is not counted twice.

use std::collections::{HashSet, VecDeque};
use parking_lot::RwLock;

use crate::models::UnifiedAlert;

/// Result of appending one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendOutcome {
    pub accepted: usize,
    pub duplicates: usize,
    pub evicted: usize,
}

#[derive(Default)]
struct BufferState {
    alerts: VecDeque<UnifiedAlert>,
    ids: HashSet<String>,
}

pub struct AlertBuffer {
    capacity: usize,
    state: RwLock<BufferState>,
}

impl AlertBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: RwLock::new(BufferState {
                alerts: VecDeque::with_capacity(capacity.min(1024)),
                ids: HashSet::new(),
            }),
        }
    }

    /// Append a batch under one lock, skipping ids already buffered
    pub fn extend(&self, batch: Vec<UnifiedAlert>) -> ExtendOutcome {
        let mut state = self.state.write();
        let mut outcome = ExtendOutcome::default();

        for alert in batch {
            if state.ids.contains(alert.id()) {
                outcome.duplicates += 1;
                continue;
            }

            if state.alerts.len() == self.capacity {
                if let Some(oldest) = state.alerts.pop_front() {
                    state.ids.remove(oldest.id());
                    outcome.evicted += 1;
                }
            }

            state.ids.insert(alert.id().to_string());
            state.alerts.push_back(alert);
            outcome.accepted += 1;
        }

        outcome
    }

    /// Copy of the buffered alerts, oldest first
    pub fn snapshot(&self) -> Vec<UnifiedAlert> {
        self.state.read().alerts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().alerts.is_empty()
    }
}
