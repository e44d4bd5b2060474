//! Instruction preparation: asset shortcut first, generation otherwise.
//!
//! Everything here is `Send + Sync` and may run on a worker runtime. Only
//! the resulting [`Candidate`] crosses back to the main context.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assets::{build_import_script, AssetLibrary, AssetRecord};
use crate::config::Settings;
use crate::domain::{GeneratedScript, PipelineError, ScriptOrigin};
use crate::gateway::{demo_script, BackendError, CodeGenerationGateway};
use crate::metrics::METRICS;
use crate::obs;
use crate::safety::SafetyFilter;
use crate::scene::SceneSummary;

/// Assistant message attached to an asset-import candidate.
pub const ASSET_MESSAGE: &str = "I'll create that for you! Here's the code:";

/// Where a candidate script came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateSource {
    Asset { record: AssetRecord },
    Generated { provider: String, fenced: bool },
}

/// A script ready to become an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub script: GeneratedScript,
    pub message: String,
    pub source: CandidateSource,
}

#[derive(Clone)]
pub struct InstructionPipeline {
    assets: Option<AssetLibrary>,
    gateway: CodeGenerationGateway,
    filter: SafetyFilter,
}

impl InstructionPipeline {
    pub fn new(gateway: CodeGenerationGateway) -> Self {
        Self {
            assets: None,
            gateway,
            filter: SafetyFilter::standard(),
        }
    }

    pub fn with_assets(mut self, library: AssetLibrary) -> Self {
        self.assets = Some(library);
        self
    }

    /// Filter applied to asset import scripts before they are offered.
    pub fn with_filter(mut self, filter: SafetyFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Gateway for the configured provider plus the configured asset root.
    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        let gateway = CodeGenerationGateway::from_settings(settings)?;
        Ok(Self::new(gateway).with_assets(AssetLibrary::new(settings.asset_root.clone())))
    }

    pub fn gateway(&self) -> &CodeGenerationGateway {
        &self.gateway
    }

    pub fn assets(&self) -> Option<&AssetLibrary> {
        self.assets.as_ref()
    }

    async fn match_asset(&self, instruction: &str) -> Option<AssetRecord> {
        let library = self.assets.clone()?;
        let query = instruction.to_string();
        match tokio::task::spawn_blocking(move || library.best_match(&query)).await {
            Ok(found) => found,
            Err(err) => {
                warn!(error = %err, "asset search task failed");
                None
            }
        }
    }

    /// Turn an instruction into a candidate script.
    ///
    /// A confident asset match wins and no backend call is made.
    pub async fn prepare(
        &self,
        instruction: &str,
        scene: Option<SceneSummary>,
    ) -> Result<Candidate, PipelineError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(PipelineError::EmptyInstruction);
        }

        if let Some(record) = self.match_asset(instruction).await {
            let script = build_import_script(&record, instruction)?;
            // Library paths are copied into the script verbatim and may trip
            // the blocklist; such matches are left to the gateway.
            let verdict = self.filter.validate(&script.source);
            if verdict.is_safe {
                obs::emit_asset_shortcut(instruction, &record.path, record.score);
                METRICS.inc_shortcuts();
                return Ok(Candidate {
                    script,
                    message: ASSET_MESSAGE.to_string(),
                    source: CandidateSource::Asset { record },
                });
            }
            warn!(
                path = %record.path.display(),
                violations = verdict.violations.len(),
                "asset import script rejected; generating instead"
            );
        }

        let output = self.gateway.generate(instruction, scene.as_ref()).await?;
        Ok(Candidate {
            script: GeneratedScript::new(output.code, ScriptOrigin::Generated),
            message: output.message,
            source: CandidateSource::Generated {
                provider: self.gateway.provider().to_string(),
                fenced: output.fenced,
            },
        })
    }

    /// Up to `n` alternative scripts; the demo script when every call fails.
    pub async fn generate_variants(&self, instruction: &str, n: usize) -> Vec<GeneratedScript> {
        let mut variants = Vec::with_capacity(n);
        for i in 1..=n {
            let prompt = format!("{instruction} (variation {i})");
            match self.gateway.generate(&prompt, None).await {
                Ok(output) => {
                    variants.push(GeneratedScript::new(output.code, ScriptOrigin::Generated))
                }
                Err(err) => warn!(variation = i, error = %err, "variant generation failed"),
            }
        }
        if variants.is_empty() {
            debug!("falling back to the demo script");
            variants.push(GeneratedScript::new(demo_script(instruction), ScriptOrigin::Demo));
        }
        variants
    }
}
