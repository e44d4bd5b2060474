//! Hosted chat-completion backend and speech transcription.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Settings;

use super::backend::{ChatMessage, GenerationBackend, GenerationRequest, Transcriber};
use super::error::BackendError;

pub const TRANSCRIPTION_MODEL: &str = "whisper-1";

const MISSING_KEY: &str = "RenderMind API key not set. Please add it in the settings.";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Client for an OpenAI-compatible chat-completion API.
pub struct RemoteBackend {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
}

impl RemoteBackend {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("rendermind/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            temperature,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        Self::new(
            settings.endpoint.clone(),
            settings.api_key.clone(),
            settings.remote_model(),
            settings.temperature,
            settings.timeout,
        )
    }

    fn api_key(&self) -> Result<&str, BackendError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| BackendError::MissingCredential(MISSING_KEY.to_string()))
    }

    /// Read the body and turn anything but HTTP 200 into a status error.
    async fn ok_body(response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        let body = response.text().await?;
        if status != reqwest::StatusCode::OK {
            warn!(status = status.as_u16(), "backend returned an error status");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl GenerationBackend for RemoteBackend {
    fn name(&self) -> &str {
        "remote"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let key = self.api_key()?;
        let url = format!("{}/chat/completions", self.endpoint);
        debug!(url = %url, model = %self.model, messages = request.messages.len(), "chat completion request");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(key)
            .json(&ChatCompletionRequest {
                model: &self.model,
                messages: &request.messages,
                temperature: self.temperature,
            })
            .send()
            .await?;
        let body = Self::ok_body(response).await?;

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::InvalidBody(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(BackendError::EmptyResponse)
    }
}

#[async_trait]
impl Transcriber for RemoteBackend {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, BackendError> {
        let key = self.api_key()?;
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name("audio.webm")
            .mime_str("audio/webm")?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", TRANSCRIPTION_MODEL);

        let response = self
            .http_client
            .post(format!("{}/audio/transcriptions", self.endpoint))
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await?;
        let body = Self::ok_body(response).await?;

        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| BackendError::InvalidBody(e.to_string()))?;
        debug!(chars = parsed.text.len(), "transcription complete");
        Ok(parsed.text)
    }
}
