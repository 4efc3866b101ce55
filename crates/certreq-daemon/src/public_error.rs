// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use certreq_core::ProcessError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicErrorCode {
    InvalidInput,
    Unauthorized,
    NotFound,
}

impl PublicErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    const fn message(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid request",
            Self::Unauthorized => "authentication failed",
            Self::NotFound => "resource not found",
        }
    }
}

/// Body of every error response. Carries no internal detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpErr {
    pub code: PublicErrorCode,
}

impl HttpErr {
    pub fn invalid_input() -> Self {
        Self {
            code: PublicErrorCode::InvalidInput,
        }
    }

    pub fn body(&self) -> PublicErrorBody {
        PublicErrorBody {
            code: self.code.as_str().to_string(),
            message: self.code.message().to_string(),
        }
    }
}

impl From<ProcessError> for HttpErr {
    fn from(err: ProcessError) -> Self {
        let code = match err {
            ProcessError::Unauthorized => PublicErrorCode::Unauthorized,
            ProcessError::InvalidRequest(_) => PublicErrorCode::InvalidInput,
            ProcessError::NotFound(_) => PublicErrorCode::NotFound,
        };
        Self { code }
    }
}

impl IntoResponse for HttpErr {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self.body())).into_response()
    }
}
