// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::auth::TokenValidator;
use crate::error::{DownstreamError, ProcessError, ProcessResult};
use crate::gateway::CertificationGateway;
use crate::record::{CertificationRequest, RequestId, RequestRecord, RequestState};
use crate::store::RequestStore;

/// Drives one submission through gate, pending checkpoint, downstream call
/// and terminal write-back; serves lookups behind the same gate.
pub struct RequestProcessor {
    validator: TokenValidator,
    gateway: Arc<dyn CertificationGateway>,
    store: Arc<RequestStore>,
    gateway_timeout: Option<Duration>,
}

impl RequestProcessor {
    pub fn new(
        validator: TokenValidator,
        gateway: Arc<dyn CertificationGateway>,
        store: Arc<RequestStore>,
    ) -> Self {
        Self {
            validator,
            gateway,
            store,
            gateway_timeout: None,
        }
    }

    /// Bounds the downstream call. An elapsed timeout ends the request in
    /// `NEEDS_REVIEW` like any other downstream failure.
    pub fn with_gateway_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.gateway_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn store(&self) -> &Arc<RequestStore> {
        &self.store
    }

    pub fn authorize(&self, credential: Option<&str>) -> ProcessResult<()> {
        if self.validator.validate(credential) {
            Ok(())
        } else {
            Err(ProcessError::Unauthorized)
        }
    }

    /// Runs the full workflow. Once the pending record is stored this never
    /// fails: downstream errors are recorded as `NEEDS_REVIEW`.
    pub async fn submit(
        &self,
        request: CertificationRequest,
        credential: Option<&str>,
        correlation_id: Option<String>,
    ) -> ProcessResult<RequestRecord> {
        self.authorize(credential)?;
        request.validate()?;

        let mut record = RequestRecord::pending(
            RequestId::generate(),
            &request,
            correlation_id,
            Utc::now(),
        );
        self.store.put(record.clone());
        tracing::info!(
            target: "certreq.lifecycle",
            request_id = %record.id(),
            correlation_id = record.correlation_id().unwrap_or_default(),
            request_type = %record.request_type(),
            to = RequestState::Pending.as_str(),
            "request created"
        );

        // The resolution runs detached so a dropped caller cannot leave the
        // checkpoint behind in PENDING.
        let resolution = tokio::spawn(resolve(
            self.gateway.clone(),
            self.store.clone(),
            self.gateway_timeout,
            request,
            record.clone(),
        ));
        match resolution.await {
            Ok(resolved) => Ok(resolved),
            Err(err) => {
                tracing::error!(
                    request_id = %record.id(),
                    error = %err,
                    "certification task aborted; request needs review"
                );
                if let Err(err) = record.mark_needs_review() {
                    tracing::error!(error = %err, "unexpected lifecycle transition");
                }
                self.store.put(record.clone());
                Ok(record)
            }
        }
    }

    pub fn get(&self, id: &str, credential: Option<&str>) -> ProcessResult<RequestRecord> {
        self.authorize(credential)?;
        RequestId::parse(id)
            .and_then(|id| self.store.get(&id))
            .ok_or_else(|| ProcessError::NotFound(id.to_string()))
    }
}

async fn resolve(
    gateway: Arc<dyn CertificationGateway>,
    store: Arc<RequestStore>,
    timeout: Option<Duration>,
    request: CertificationRequest,
    mut record: RequestRecord,
) -> RequestRecord {
    let outcome = certify(gateway.as_ref(), timeout, &request, record.correlation_id()).await;
    let transition = match outcome {
        Ok(reference) => record.mark_processed(reference),
        Err(err) => {
            tracing::warn!(
                request_id = %record.id(),
                correlation_id = record.correlation_id().unwrap_or_default(),
                error = %err,
                "certification failed; request needs review"
            );
            record.mark_needs_review()
        }
    };
    if let Err(err) = transition {
        tracing::error!(error = %err, "unexpected lifecycle transition");
    }

    store.put(record.clone());
    tracing::info!(
        target: "certreq.lifecycle",
        request_id = %record.id(),
        correlation_id = record.correlation_id().unwrap_or_default(),
        from = RequestState::Pending.as_str(),
        to = record.state().as_str(),
        "request resolved"
    );
    record
}

// Sole suspension point of a submission.
async fn certify(
    gateway: &dyn CertificationGateway,
    timeout: Option<Duration>,
    request: &CertificationRequest,
    correlation_id: Option<&str>,
) -> Result<String, DownstreamError> {
    let call = gateway.certify(request, correlation_id);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(DownstreamError::Timeout(limit))),
        None => call.await,
    }
}
