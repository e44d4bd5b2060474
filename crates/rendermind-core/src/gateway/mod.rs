//! Code generation gateway.
//!
//! Builds the request, calls the configured backend under a fixed timeout
//! and splits the raw response into a chat message and code.
//!
//! - [`backend`]: `GenerationBackend` / `Transcriber` traits
//! - [`remote`]: hosted chat-completion API (+ transcription)
//! - [`local`]: locally served adapter model
//! - [`demo`]: canned scripts, no network
//! - [`prompt`]: system prompt and message assembly
//! - [`response`]: first-fence response splitting

pub mod backend;
pub mod demo;
pub mod error;
pub mod local;
pub mod prompt;
pub mod remote;
pub mod response;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Provider, Settings};
use crate::metrics::METRICS;
use crate::obs;
use crate::scene::SceneSummary;

pub use backend::{ChatMessage, ChatRole, GenerationBackend, GenerationRequest, Transcriber};
pub use demo::{demo_script, DemoBackend, DEMO_MESSAGE};
pub use error::BackendError;
pub use local::LocalAdapterBackend;
pub use prompt::{build_messages, SYSTEM_PROMPT};
pub use remote::RemoteBackend;
pub use response::{split_response, SplitResponse, FALLBACK_MESSAGE};

/// Code and chat text extracted from one backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    pub code: String,
    pub message: String,
    /// False when the response had no fence and was used whole.
    pub fenced: bool,
}

#[derive(Clone)]
pub struct CodeGenerationGateway {
    backend: Arc<dyn GenerationBackend>,
    system_prompt: String,
    timeout: Duration,
}

impl CodeGenerationGateway {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            system_prompt: SYSTEM_PROMPT.to_string(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        Ok(Self::new(backend_for(settings)?).with_timeout(settings.timeout))
    }

    pub fn provider(&self) -> &str {
        self.backend.name()
    }

    pub fn build_request(
        &self,
        instruction: &str,
        scene: Option<&SceneSummary>,
    ) -> GenerationRequest {
        GenerationRequest {
            instruction: instruction.to_string(),
            messages: build_messages(&self.system_prompt, instruction, scene),
        }
    }

    /// Generate code for `instruction`.
    ///
    /// Exceeding the timeout is a [`BackendError::Timeout`]. An empty body or
    /// empty code block is [`BackendError::EmptyResponse`], never blank output.
    pub async fn generate(
        &self,
        instruction: &str,
        scene: Option<&SceneSummary>,
    ) -> Result<GenerationOutput, BackendError> {
        let request = self.build_request(instruction, scene);
        let started = Instant::now();

        let raw = match tokio::time::timeout(self.timeout, self.backend.complete(&request)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        };
        let result = raw.and_then(|raw| {
            let split = split_response(&raw);
            if split.code.is_empty() {
                return Err(BackendError::EmptyResponse);
            }
            Ok(GenerationOutput {
                code: split.code,
                message: split.message,
                fenced: split.fenced,
            })
        });

        let fenced = result.as_ref().map(|o| o.fenced).unwrap_or(false);
        obs::emit_generation_finished(
            self.backend.name(),
            started.elapsed().as_millis() as u64,
            fenced,
            result.is_ok(),
        );
        if result.is_err() {
            METRICS.inc_generation_failures();
        }
        result
    }
}

/// Backend for the configured provider.
pub fn backend_for(settings: &Settings) -> Result<Arc<dyn GenerationBackend>, BackendError> {
    let backend: Arc<dyn GenerationBackend> = match settings.provider {
        Provider::Remote => Arc::new(RemoteBackend::from_settings(settings)?),
        Provider::LocalAdapter => Arc::new(LocalAdapterBackend::new(
            settings.endpoint.clone(),
            settings.timeout,
        )?),
        Provider::Demo => Arc::new(DemoBackend),
    };
    Ok(backend)
}

/// Transcriber for the configured provider, if it has one.
pub fn transcriber_for(settings: &Settings) -> Result<Arc<dyn Transcriber>, BackendError> {
    match settings.provider {
        Provider::Remote => Ok(Arc::new(RemoteBackend::from_settings(settings)?)),
        other => Err(BackendError::Unsupported(format!(
            "speech recognition is not available with the {other} provider"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl GenerationBackend for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
            Ok(self.0.to_string())
        }
    }

    struct Stalled;

    #[async_trait]
    impl GenerationBackend for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_generate_splits_response() {
        let gw = CodeGenerationGateway::new(Arc::new(Fixed(
            "Done!\n```rhai\nfn rendermind_action(context) {}\n```",
        )));
        let out = gw.generate("cube", None).await.unwrap();
        assert_eq!(out.message, "Done!");
        assert_eq!(out.code, "fn rendermind_action(context) {}");
        assert!(out.fenced);
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let gw = CodeGenerationGateway::new(Arc::new(Fixed("")));
        assert_eq!(
            gw.generate("cube", None).await.unwrap_err(),
            BackendError::EmptyResponse
        );
        let gw = CodeGenerationGateway::new(Arc::new(Fixed("Hi\n```rhai\n```")));
        assert_eq!(
            gw.generate("cube", None).await.unwrap_err(),
            BackendError::EmptyResponse
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_backend_error() {
        let gw = CodeGenerationGateway::new(Arc::new(Stalled)).with_timeout(Duration::from_secs(30));
        let err = gw.generate("cube", None).await.unwrap_err();
        assert_eq!(err, BackendError::Timeout(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_demo_provider_from_settings() {
        let settings = Settings {
            provider: Provider::Demo,
            ..Settings::default()
        };
        let gw = CodeGenerationGateway::from_settings(&settings).unwrap();
        assert_eq!(gw.provider(), "demo");
        let out = gw.generate("a box", None).await.unwrap();
        assert_eq!(out.message, DEMO_MESSAGE);
        assert!(out.code.contains("RenderMind_Cube"));
        assert!(transcriber_for(&settings).is_err());
    }
}
