// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::{ProcessError, ProcessResult};

pub const REVIEW_ANNOTATION: &str = "certification failed, requires manual review";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Lenient parse used on lookups; anything that is not a UUID simply
    /// cannot name a stored request.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Pending,
    Processed,
    NeedsReview,
}

impl RequestState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processed => "PROCESSED",
            Self::NeedsReview => "NEEDS_REVIEW",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::NeedsReview)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied input of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationRequest {
    #[serde(rename = "type", default)]
    pub request_type: String,
    #[serde(default)]
    pub student_subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CertificationRequest {
    pub fn new(request_type: impl Into<String>, student_subject_id: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            student_subject_id: student_subject_id.into(),
            document: None,
            notes: None,
        }
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Both required fields must contain something other than whitespace.
    pub fn validate(&self) -> ProcessResult<()> {
        if self.request_type.trim().is_empty() {
            return Err(ProcessError::InvalidRequest("type is required".to_string()));
        }
        if self.student_subject_id.trim().is_empty() {
            return Err(ProcessError::InvalidRequest(
                "studentSubjectId is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request {id} is already {state}")]
pub struct TerminalStateError {
    pub id: RequestId,
    pub state: RequestState,
}

/// One certification request and its outcome.
///
/// Identity fields are fixed at construction. The state moves from `PENDING`
/// to exactly one terminal state and `certification_result` is present only
/// in `PROCESSED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    id: RequestId,
    #[serde(rename = "type")]
    request_type: String,
    student_subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    state: RequestState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    certification_result: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl RequestRecord {
    pub fn pending(
        id: RequestId,
        request: &CertificationRequest,
        correlation_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            request_type: request.request_type.clone(),
            student_subject_id: request.student_subject_id.clone(),
            document: request.document.clone(),
            notes: request.notes.clone(),
            state: RequestState::Pending,
            certification_result: None,
            created_at,
            correlation_id,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    pub fn student_subject_id(&self) -> &str {
        &self.student_subject_id
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn certification_result(&self) -> Option<&str> {
        self.certification_result.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn mark_processed(&mut self, reference: String) -> Result<(), TerminalStateError> {
        self.ensure_pending()?;
        self.state = RequestState::Processed;
        self.certification_result = Some(reference);
        Ok(())
    }

    /// Caller notes are kept; the review annotation is appended after them.
    pub fn mark_needs_review(&mut self) -> Result<(), TerminalStateError> {
        self.ensure_pending()?;
        self.state = RequestState::NeedsReview;
        self.certification_result = None;
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{existing}; {REVIEW_ANNOTATION}")
            }
            _ => REVIEW_ANNOTATION.to_string(),
        });
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), TerminalStateError> {
        if self.state.is_terminal() {
            return Err(TerminalStateError {
                id: self.id,
                state: self.state,
            });
        }
        Ok(())
    }
}
