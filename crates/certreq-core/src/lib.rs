// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Certification request workflow.
//!
//! A submission passes the bearer-token gate, is stored as `PENDING`, drives
//! one call to the downstream [`gateway::CertificationGateway`], and is written
//! back in a terminal state (`PROCESSED` or `NEEDS_REVIEW`). Downstream
//! failures never surface as errors to the submitter; they are recorded on
//! the request itself.

pub mod auth;
pub mod error;
pub mod gateway;
pub mod processor;
pub mod record;
pub mod store;

pub use auth::TokenValidator;
pub use error::{DownstreamError, ProcessError, ProcessResult};
pub use gateway::{CertificationGateway, SimulatedGateway, SimulatorConfig, StaticGateway};
pub use processor::RequestProcessor;
pub use record::{CertificationRequest, RequestId, RequestRecord, RequestState};
pub use store::RequestStore;
