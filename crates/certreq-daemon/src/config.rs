// Copyright (c) 2026 Joseph Verdicchio and certreq Contributors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::time::Duration;

use certreq_core::SimulatorConfig;
use thiserror::Error;

pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CERTREQ_JWT_SECRET is not set")]
    MissingSecret,

    #[error("CERTREQ_JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes, got {0}")]
    SecretTooShort(usize),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Clone)]
pub struct ServiceConfig {
    pub jwt_secret: Vec<u8>,
    pub jwt_issuer: Option<String>,
    pub max_body_bytes: usize,
    pub gateway_timeout: Option<Duration>,
    pub simulator: SimulatorConfig,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("gateway_timeout", &self.gateway_timeout)
            .field("simulator", &self.simulator)
            .finish()
    }
}

impl ServiceConfig {
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_issuer: None,
            max_body_bytes: 16_384,
            gateway_timeout: None,
            simulator: SimulatorConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("CERTREQ_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::SecretTooShort(secret.len()));
        }

        let mut cfg = Self::new(secret);
        cfg.jwt_issuer = lookup("CERTREQ_JWT_ISSUER").filter(|s| !s.is_empty());
        cfg.max_body_bytes = read_u64(&lookup, "CERTREQ_MAX_BODY_BYTES", 16_384)? as usize;
        cfg.gateway_timeout = match read_u64(&lookup, "CERTREQ_GATEWAY_TIMEOUT_MS", 0)? {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        cfg.simulator.min_latency_ms = read_u64(
            &lookup,
            "CERTREQ_SIM_MIN_LATENCY_MS",
            cfg.simulator.min_latency_ms,
        )?;
        cfg.simulator.max_latency_ms = read_u64(
            &lookup,
            "CERTREQ_SIM_MAX_LATENCY_MS",
            cfg.simulator.max_latency_ms,
        )?;
        let failure_percent = read_u64(
            &lookup,
            "CERTREQ_SIM_FAILURE_PERCENT",
            u64::from(cfg.simulator.failure_percent),
        )?;
        cfg.simulator.failure_percent = u8::try_from(failure_percent)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or(ConfigError::InvalidValue {
                key: "CERTREQ_SIM_FAILURE_PERCENT",
                value: failure_percent.to_string(),
            })?;
        if cfg.simulator.min_latency_ms > cfg.simulator.max_latency_ms {
            return Err(ConfigError::InvalidValue {
                key: "CERTREQ_SIM_MIN_LATENCY_MS",
                value: cfg.simulator.min_latency_ms.to_string(),
            });
        }
        Ok(cfg)
    }
}

fn read_u64<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
