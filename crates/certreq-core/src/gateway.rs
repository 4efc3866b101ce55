// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

use crate::error::DownstreamError;
use crate::record::CertificationRequest;

/// Downstream certification operation.
///
/// Implementations must tolerate concurrent calls from independent
/// submissions and may take seconds to answer.
#[async_trait]
pub trait CertificationGateway: Send + Sync {
    async fn certify(
        &self,
        request: &CertificationRequest,
        correlation_id: Option<&str>,
    ) -> Result<String, DownstreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub failure_percent: u8,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            min_latency_ms: 1_000,
            max_latency_ms: 3_000,
            failure_percent: 20,
        }
    }
}

/// Local stand-in for the real certification service: random latency and
/// an independent random failure per call.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    cfg: SimulatorConfig,
}

impl SimulatedGateway {
    pub fn new(cfg: SimulatorConfig) -> Self {
        Self { cfg }
    }

    fn roll(&self) -> (Duration, bool) {
        let mut rng = rand::thread_rng();
        let lo = self.cfg.min_latency_ms.min(self.cfg.max_latency_ms);
        let hi = self.cfg.min_latency_ms.max(self.cfg.max_latency_ms);
        let latency = Duration::from_millis(rng.gen_range(lo..=hi));
        let fails = rng.gen_range(0..100u8) < self.cfg.failure_percent;
        (latency, fails)
    }
}

#[async_trait]
impl CertificationGateway for SimulatedGateway {
    async fn certify(
        &self,
        request: &CertificationRequest,
        correlation_id: Option<&str>,
    ) -> Result<String, DownstreamError> {
        tracing::info!(
            correlation_id = correlation_id.unwrap_or_default(),
            request_type = %request.request_type,
            "registering certification"
        );
        let (latency, fails) = self.roll();
        tokio::time::sleep(latency).await;
        if fails {
            return Err(DownstreamError::Unavailable(
                "simulated certification failure".to_string(),
            ));
        }
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let reference = format!("CERT_{millis}");
        tracing::info!(
            correlation_id = correlation_id.unwrap_or_default(),
            reference = %reference,
            "certification registered"
        );
        Ok(reference)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StaticOutcome {
    Succeed(String),
    Fail(DownstreamError),
}

/// Deterministic gateway whose outcome can be switched while in use.
#[derive(Debug)]
pub struct StaticGateway {
    outcome: Mutex<StaticOutcome>,
    delay: Duration,
    calls: AtomicU64,
}

impl StaticGateway {
    pub fn succeeding(reference: impl Into<String>) -> Self {
        Self::with_outcome(StaticOutcome::Succeed(reference.into()))
    }

    pub fn failing(err: DownstreamError) -> Self {
        Self::with_outcome(StaticOutcome::Fail(err))
    }

    fn with_outcome(outcome: StaticOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            delay: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn succeed_with(&self, reference: impl Into<String>) {
        *self.outcome.lock() = StaticOutcome::Succeed(reference.into());
    }

    pub fn fail_with(&self, err: DownstreamError) {
        *self.outcome.lock() = StaticOutcome::Fail(err);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CertificationGateway for StaticGateway {
    async fn certify(
        &self,
        _request: &CertificationRequest,
        _correlation_id: Option<&str>,
    ) -> Result<String, DownstreamError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let outcome = self.outcome.lock().clone();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match outcome {
            StaticOutcome::Succeed(reference) => Ok(reference),
            StaticOutcome::Fail(err) => Err(err),
        }
    }
}
