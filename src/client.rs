//! HTTP client for the external load-planning service.
//!
//! One request per call, no retries, no timeout beyond the transport's own, no
//! validation of the outbound payload. Transport and non-2xx failures come back as
//! [`LoadPlanError`]; a 2xx response whose body does not carry a `positions` array
//! is treated as an empty plan.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::package::Package;
use crate::uld::UldDescriptor;

pub const DEFAULT_ENDPOINT: &str = "https://localhost:7041/LoadPlan/execute";

#[derive(Debug, Error)]
pub enum LoadPlanError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Outbound body: `{ uld, packages }`.
#[derive(Debug, Serialize)]
pub struct LoadPlanRequest<'a> {
    pub uld: &'a UldDescriptor,
    pub packages: &'a [Package],
}

/// One placed box as reported by the planner.
///
/// `(x, y, z)` is the box center in the container frame; `width` runs along X,
/// `height` along Y and `length` along Z.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlacedPosition {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub width: f32,
    pub height: f32,
    pub length: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadPlanResponse {
    pub positions: Vec<PlacedPosition>,
}

impl LoadPlanResponse {
    /// Read a response body leniently.
    ///
    /// - missing or non-array `positions`: empty plan
    /// - entries that don't have the expected fields are skipped
    pub fn from_value(body: &serde_json::Value) -> Self {
        let Some(entries) = body.get("positions").and_then(|p| p.as_array()) else {
            debug!("load plan: response has no positions array");
            return Self::default();
        };

        let positions = entries
            .iter()
            .filter_map(|entry| match PlacedPosition::deserialize(entry) {
                Ok(pos) => Some(pos),
                Err(err) => {
                    warn!("load plan: skipping malformed position {entry}: {err}");
                    None
                }
            })
            .collect();

        Self { positions }
    }

    /// Like [`Self::from_value`], but starting from raw bytes; non-JSON is an empty plan.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                warn!("load plan: response body is not JSON: {err}");
                Self::default()
            }
        }
    }
}

/// Client for the load-planning endpoint.
#[derive(Debug, Clone)]
pub struct LoadPlanClient {
    http: reqwest::Client,
    endpoint: String,
}

impl Default for LoadPlanClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadPlanClient {
    /// Client for [`DEFAULT_ENDPOINT`].
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the container and package list, returning the computed placements.
    pub async fn execute(
        &self,
        uld: &UldDescriptor,
        packages: &[Package],
    ) -> Result<LoadPlanResponse, LoadPlanError> {
        debug!(
            "load plan: POST {} ({} packages)",
            self.endpoint,
            packages.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&LoadPlanRequest { uld, packages })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("title")
                        .or_else(|| v.get("message"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());
            return Err(LoadPlanError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let plan = LoadPlanResponse::from_body(&body);
        debug!("load plan: {} positions received", plan.positions.len());
        Ok(plan)
    }
}
