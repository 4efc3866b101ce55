// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use certreq_core::{RequestState, RequestStore};
use parking_lot::Mutex;

use crate::public_error::PublicErrorCode;

const LATENCY_BUCKETS_MS: [u64; 10] = [10, 50, 100, 250, 500, 1_000, 2_000, 3_000, 5_000, 10_000];

#[derive(Debug, Default)]
struct TelemetryState {
    submissions_total: HashMap<&'static str, u64>,
    rejections_total: HashMap<(&'static str, &'static str), u64>,
    lookups_total: HashMap<&'static str, u64>,
    submit_latency_ms_bucket: BTreeMap<u64, u64>,
}

#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    state: Arc<Mutex<TelemetryState>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submission(&self, state: RequestState) {
        let mut guard = self.state.lock();
        let entry = guard.submissions_total.entry(state.as_str()).or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_rejection(&self, operation: &'static str, code: PublicErrorCode) {
        let mut guard = self.state.lock();
        let entry = guard
            .rejections_total
            .entry((operation, code.as_str()))
            .or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_lookup(&self, found: bool) {
        let outcome = if found { "found" } else { "not_found" };
        let mut guard = self.state.lock();
        let entry = guard.lookups_total.entry(outcome).or_insert(0);
        *entry = entry.saturating_add(1);
    }

    pub fn record_submit_latency_ms(&self, latency_ms: u64) {
        let mut guard = self.state.lock();
        let bucket = LATENCY_BUCKETS_MS
            .into_iter()
            .find(|bound| latency_ms <= *bound)
            .unwrap_or(u64::MAX);
        let entry = guard.submit_latency_ms_bucket.entry(bucket).or_insert(0);
        *entry = entry.saturating_add(1);
    }

    /// Prometheus text exposition; request gauges are read from `store`.
    pub fn render(&self, store: &RequestStore) -> String {
        let request_counts = store.state_counts();
        let guard = self.state.lock();
        let mut out = String::new();
        out.push_str("# TYPE certreq_submissions_total counter\n");
        for (state, value) in &guard.submissions_total {
            let _ = writeln!(out, "certreq_submissions_total{{state=\"{state}\"}} {value}");
        }
        out.push_str("# TYPE certreq_rejections_total counter\n");
        for ((operation, code), value) in &guard.rejections_total {
            let _ = writeln!(
                out,
                "certreq_rejections_total{{operation=\"{operation}\",code=\"{code}\"}} {value}"
            );
        }
        out.push_str("# TYPE certreq_lookups_total counter\n");
        for (outcome, value) in &guard.lookups_total {
            let _ = writeln!(out, "certreq_lookups_total{{outcome=\"{outcome}\"}} {value}");
        }
        out.push_str("# TYPE certreq_submit_latency_ms_bucket counter\n");
        for (bucket, value) in &guard.submit_latency_ms_bucket {
            let label = if *bucket == u64::MAX {
                "+Inf".to_string()
            } else {
                bucket.to_string()
            };
            let _ = writeln!(
                out,
                "certreq_submit_latency_ms_bucket{{le=\"{label}\"}} {value}"
            );
        }
        out.push_str("# TYPE certreq_requests gauge\n");
        for (state, count) in request_counts {
            let _ = writeln!(out, "certreq_requests{{state=\"{state}\"}} {count}");
        }
        out
    }
}
