// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use certreq_core::{
    CertificationGateway, CertificationRequest, RequestProcessor, RequestRecord, RequestStore,
    SimulatedGateway, TokenValidator,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::public_error::{HttpErr, PublicErrorCode};
use crate::telemetry::Telemetry;

pub const CORRELATION_HEADER: &str = "x-correlation-id";
pub const SERVICE_NAME: &str = "certreq-daemon";

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<RequestProcessor>,
    pub telemetry: Arc<Telemetry>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub version: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/requests", post(create_request))
        .route("/v1/requests/:id", get(get_request))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(RequestBodyLimitLayer::new(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let outcome = create_request_impl(&state, &headers, &body).await;
    state
        .telemetry
        .record_submit_latency_ms(started.elapsed().as_millis() as u64);
    match outcome {
        Ok(record) => {
            state.telemetry.record_submission(record.state());
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(err) => {
            state.telemetry.record_rejection("submit", err.code);
            err.into_response()
        }
    }
}

async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match get_request_impl(&state, &headers, &id) {
        Ok(record) => {
            state.telemetry.record_lookup(true);
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(err) => {
            if err.code == PublicErrorCode::NotFound {
                state.telemetry.record_lookup(false);
            }
            state.telemetry.record_rejection("get", err.code);
            err.into_response()
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        timestamp: Utc::now(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.telemetry.render(state.processor.store());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

pub async fn create_request_impl(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<RequestRecord, HttpErr> {
    let credential = header_str(headers, AUTHORIZATION.as_str());
    let correlation_id = correlation_id(headers);
    tracing::info!(
        correlation_id = correlation_id.as_deref().unwrap_or_default(),
        "processing certification request"
    );

    let request: CertificationRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(err) => {
            // Unauthenticated callers learn nothing about body validity.
            state.processor.authorize(credential)?;
            tracing::info!(
                correlation_id = correlation_id.as_deref().unwrap_or_default(),
                error = %err,
                "rejected malformed request body"
            );
            return Err(HttpErr::invalid_input());
        }
    };

    state
        .processor
        .submit(request, credential, correlation_id)
        .await
        .map_err(HttpErr::from)
}

pub fn get_request_impl(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
) -> Result<RequestRecord, HttpErr> {
    let credential = header_str(headers, AUTHORIZATION.as_str());
    tracing::info!(
        request_id = %id,
        correlation_id = correlation_id(headers).unwrap_or_default(),
        "looking up certification request"
    );
    Ok(state.processor.get(id, credential)?)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Non-ASCII bytes are kept, decoded lossily, rather than dropping the id.
fn correlation_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CORRELATION_HEADER)?;
    match value.to_str() {
        Ok(text) => Some(text.to_string()),
        Err(_) => {
            let lossy = String::from_utf8_lossy(value.as_bytes()).into_owned();
            tracing::warn!(
                correlation_id = %lossy,
                "correlation id is not visible ASCII; stored lossily"
            );
            Some(lossy)
        }
    }
}

pub fn build_state(cfg: &ServiceConfig, telemetry: Arc<Telemetry>) -> AppState {
    let gateway = Arc::new(SimulatedGateway::new(cfg.simulator));
    build_state_with_gateway(cfg, telemetry, gateway)
}

pub fn build_state_with_gateway(
    cfg: &ServiceConfig,
    telemetry: Arc<Telemetry>,
    gateway: Arc<dyn CertificationGateway>,
) -> AppState {
    let mut validator = TokenValidator::new(&cfg.jwt_secret);
    if let Some(issuer) = cfg.jwt_issuer.as_deref() {
        validator = validator.with_issuer(issuer);
    }
    let processor = RequestProcessor::new(validator, gateway, Arc::new(RequestStore::new()))
        .with_gateway_timeout(cfg.gateway_timeout);
    AppState {
        processor: Arc::new(processor),
        telemetry,
        max_body_bytes: cfg.max_body_bytes,
    }
}

pub async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener, std::io::Error> {
    let socket: SocketAddr = match addr.parse() {
        Ok(v) => v,
        Err(_) => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "invalid listen address",
            ))
        }
    };
    tokio::net::TcpListener::bind(socket).await
}
