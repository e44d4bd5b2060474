//! Locally served adapter model.
//!
//! Contract: `POST {endpoint}/generate {"instruction": ...}` answers
//! `{"code", "safety_blocked", "safety_reason"}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::backend::{GenerationBackend, GenerationRequest};
use super::error::BackendError;

#[derive(Serialize)]
struct AdapterRequest<'a> {
    instruction: &'a str,
}

#[derive(Deserialize)]
struct AdapterResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    safety_blocked: bool,
    #[serde(default)]
    safety_reason: Option<String>,
}

pub struct LocalAdapterBackend {
    http_client: reqwest::Client,
    endpoint: String,
}

impl LocalAdapterBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    /// `GET {endpoint}/health` answered with a success status.
    pub async fn is_healthy(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl GenerationBackend for LocalAdapterBackend {
    fn name(&self) -> &str {
        "local_adapter"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let response = self
            .http_client
            .post(format!("{}/generate", self.endpoint))
            .json(&AdapterRequest {
                instruction: &request.instruction,
            })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if status != reqwest::StatusCode::OK {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: AdapterResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::InvalidBody(e.to_string()))?;
        if parsed.safety_blocked {
            return Err(BackendError::SafetyBlocked(
                parsed
                    .safety_reason
                    .unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        Ok(parsed.code)
    }
}
