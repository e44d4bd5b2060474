//! RenderMind daemon.
//!
//! The main thread owns the session and its scene host and runs every job
//! the bridge marshals onto it. The WebSocket bridge and all network calls
//! live on a worker thread with its own Tokio runtime.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use rendermind_bridge::{channel, serve, BridgeConfig, BridgeState, MainContext};
use rendermind_core::gateway::transcriber_for;
use rendermind_core::metrics::METRICS;
use rendermind_core::telemetry::{init_tracing, level_for_verbosity};
use rendermind_core::{
    ExecutionEngine, InstructionPipeline, MemoryHost, Provider, Session, Settings, Transcriber,
    UiSettings,
};

#[derive(Parser, Debug)]
#[command(name = "rendermindd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "RenderMind bridge daemon", long_about = None)]
struct Args {
    /// Interface to bind
    #[arg(long, default_value = rendermind_bridge::server::DEFAULT_HOST)]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = rendermind_bridge::server::DEFAULT_PORT)]
    port: u16,

    /// `.env`-style config file; its values win over the flags below
    #[arg(long, default_value = ".env")]
    config: PathBuf,

    /// Asset library root
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Generation provider (remote, local_adapter, demo)
    #[arg(long)]
    provider: Option<Provider>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Record answers without running them
    #[arg(long)]
    no_auto_execute: bool,

    /// Conversation log loaded at start and saved on exit
    #[arg(long)]
    history: Option<PathBuf>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn ui_settings(&self) -> UiSettings {
        UiSettings {
            model: self.model.clone().unwrap_or_default(),
            provider: self.provider,
            asset_root: self
                .assets
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            auto_execute: self.no_auto_execute.then_some(false),
            ..UiSettings::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json, level_for_verbosity(args.verbose.saturating_add(1)));

    let settings = Settings::resolve(Some(&args.config), &args.ui_settings())
        .context("Failed to resolve settings")?;
    info!(provider = %settings.provider, assets = %settings.asset_root.display(), "starting rendermindd");

    let pipeline =
        InstructionPipeline::from_settings(&settings).context("Failed to build generation backend")?;
    let transcriber = match transcriber_for(&settings) {
        Ok(t) => Some(t),
        Err(err) => {
            info!(reason = %err, "speech transcription disabled");
            None
        }
    };
    let config = BridgeConfig {
        host: args.host.clone(),
        port: args.port,
    };

    let (main, main_loop) = channel::<Session>();
    let worker = std::thread::Builder::new()
        .name("rendermind-bridge".to_string())
        .spawn(move || run_bridge(config, main, pipeline, transcriber))
        .context("Failed to start bridge thread")?;

    let mut session = Session::new(ExecutionEngine::standard(), Box::new(MemoryHost::new()))
        .with_auto_execute(settings.auto_execute);
    if let Some(path) = &args.history {
        restore_history(&mut session, path);
    }

    // Returns once the bridge runtime is gone and every handle dropped.
    main_loop.run(&mut session);

    if let Some(path) = &args.history {
        session
            .save_log(path)
            .with_context(|| format!("Failed to save history to {}", path.display()))?;
        info!(path = %path.display(), turns = session.log().len(), "history saved");
    }
    METRICS.flush();

    worker
        .join()
        .map_err(|_| anyhow!("bridge thread panicked"))?
}

fn restore_history(session: &mut Session, path: &Path) {
    if !path.exists() {
        return;
    }
    match session.load_log(path) {
        Ok(()) => info!(path = %path.display(), turns = session.log().len(), "history restored"),
        Err(err) => warn!(path = %path.display(), error = %err, "could not restore history"),
    }
}

fn run_bridge(
    config: BridgeConfig,
    main: MainContext<Session>,
    pipeline: InstructionPipeline,
    transcriber: Option<Arc<dyn Transcriber>>,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("rendermind-worker")
        .build()
        .context("Failed to build worker runtime")?;

    runtime.block_on(async move {
        let mut state = BridgeState::new(main, pipeline);
        if let Some(transcriber) = transcriber {
            state = state.with_transcriber(transcriber);
        }
        serve(&config, state, shutdown_signal())
            .await
            .context("Bridge server failed")
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => warn!(error = %err, "cannot listen for ctrl-c; running until killed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_become_ui_layer() {
        let args = Args::parse_from([
            "rendermindd",
            "--provider",
            "demo",
            "--assets",
            "/lib",
            "--no-auto-execute",
        ]);
        let ui = args.ui_settings();
        assert_eq!(ui.provider, Some(Provider::Demo));
        assert_eq!(ui.asset_root, "/lib");
        assert_eq!(ui.auto_execute, Some(false));
        assert_eq!(args.port, 8765);
    }

    #[test]
    fn test_restore_history_tolerates_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(ExecutionEngine::standard(), Box::new(MemoryHost::new()));
        restore_history(&mut session, &dir.path().join("absent.json"));

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "not json").unwrap();
        restore_history(&mut session, &corrupt);
        assert!(session.log().is_empty());
    }
}
