// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::record::{RequestId, RequestRecord, RequestState};

/// In-memory authoritative copy of every request, keyed by id.
///
/// No eviction: records live for the lifetime of the process.
#[derive(Debug, Default)]
pub struct RequestStore {
    records: RwLock<HashMap<RequestId, RequestRecord>>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites; last writer wins on the same id.
    pub fn put(&self, record: RequestRecord) {
        self.records.write().insert(record.id(), record);
    }

    pub fn get(&self, id: &RequestId) -> Option<RequestRecord> {
        self.records.read().get(id).cloned()
    }

    pub fn count_in_state(&self, state: RequestState) -> usize {
        self.records
            .read()
            .values()
            .filter(|record| record.state() == state)
            .count()
    }

    /// Per-state totals taken from a single snapshot of the store.
    pub fn state_counts(&self) -> [(RequestState, usize); 3] {
        let mut counts = [
            (RequestState::Pending, 0),
            (RequestState::Processed, 0),
            (RequestState::NeedsReview, 0),
        ];
        for record in self.records.read().values() {
            if let Some(slot) = counts.iter_mut().find(|(state, _)| *state == record.state()) {
                slot.1 += 1;
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
