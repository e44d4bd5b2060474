//! RenderMind CLI
//!
//! The `rendermind` command drives the instruction pipeline without the
//! external UI, against an in-memory scene.
//!
//! ## Commands
//!
//! - `ask`: Turn an instruction into a script and run it
//! - `search`: Rank asset-library files against a query
//! - `validate` / `sanitize`: Run the safety filter over a script file
//! - `emit` / `preview`: Render a plan into a script, optionally previewing it
//! - `variants`: Generate and preview alternative scripts
//! - `history`: Show or clear the saved conversation log

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use rendermind_core::telemetry::init_tracing;
use rendermind_core::{
    emit, AssetLibrary, AssetRecord, ConversationLog, ExecutionEngine, InstructionPipeline,
    MemoryHost, Provider, QuickAction, SafetyFilter, SafetyVerdict, Session, Settings, TurnStatus,
    UiSettings, Variant,
};

#[derive(Parser)]
#[command(name = "rendermind")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Natural-language scene editing from the command line", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output and JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// `.env`-style config file; its values win over the flags below
    #[arg(long, global = true, default_value = ".env")]
    config: PathBuf,

    /// Asset library root
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// Generation provider (remote, local_adapter, demo)
    #[arg(long, global = true)]
    provider: Option<Provider>,

    /// Conversation log file
    #[arg(long, global = true, default_value = ".rendermind/history.json")]
    history: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn an instruction into a script and run it in a scratch scene
    Ask {
        /// Instruction text
        instruction: String,

        /// Record the answer without running it
        #[arg(long)]
        no_execute: bool,
    },

    /// Rank asset-library files against a query
    Search {
        /// Free-text query
        query: String,

        /// Maximum number of results to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Check a script file against the safety filter
    Validate {
        /// Script file
        file: PathBuf,
    },

    /// Strip blocked patterns from a script file (advisory only)
    Sanitize {
        /// Script file
        file: PathBuf,
    },

    /// Render a plan string into a script
    Emit {
        /// Plan text, e.g. "uv_sphere r=0.7"
        plan: String,

        /// Also apply the script to a scratch scene
        #[arg(long)]
        run: bool,
    },

    /// Preview a plan in a temporary scene and report the artifact path
    Preview {
        /// Plan text
        plan: String,

        /// Directory for preview artifacts
        #[arg(short, long, default_value = ".rendermind/previews")]
        out: PathBuf,
    },

    /// Generate alternative scripts and preview each one
    Variants {
        /// Instruction text
        instruction: String,

        /// Number of variants to request
        #[arg(short = 'n', long, default_value = "3")]
        count: usize,

        /// Directory for preview artifacts
        #[arg(short, long, default_value = ".rendermind/previews")]
        out: PathBuf,
    },

    /// Manage the conversation log
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Print a quick-action instruction prefix
    Template {
        /// create, modify or material
        action: QuickAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print every saved turn
    Show,
    /// Delete the saved log
    Clear,
}

impl Cli {
    fn ui_settings(&self) -> UiSettings {
        UiSettings {
            provider: self.provider,
            asset_root: self
                .assets
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            ..UiSettings::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    init_tracing(cli.json, level);

    let settings = Settings::resolve(Some(&cli.config), &cli.ui_settings())
        .context("Failed to resolve settings")?;
    let json = cli.json;

    match cli.command {
        Commands::Ask {
            instruction,
            no_execute,
        } => cmd_ask(&settings, &cli.history, &instruction, !no_execute, json).await,
        Commands::Search { query, limit } => {
            let library = AssetLibrary::new(settings.asset_root.clone());
            cmd_search(&library, &query, limit, json)
        }
        Commands::Validate { file } => cmd_validate(&file, json),
        Commands::Sanitize { file } => cmd_sanitize(&file),
        Commands::Emit { plan, run } => cmd_emit(&plan, run, json),
        Commands::Preview { plan, out } => cmd_preview(&plan, &out, json),
        Commands::Variants {
            instruction,
            count,
            out,
        } => cmd_variants(&settings, &instruction, count, &out, json).await,
        Commands::History { action } => match action {
            HistoryAction::Show => cmd_history_show(&cli.history, json),
            HistoryAction::Clear => cmd_history_clear(&cli.history),
        },
        Commands::Template { action } => {
            println!("{}", action.template());
            Ok(())
        }
    }
}

fn scratch_session() -> Session {
    Session::new(ExecutionEngine::standard(), Box::new(MemoryHost::new()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run one instruction through the pipeline and append it to the saved log
async fn cmd_ask(
    settings: &Settings,
    history: &Path,
    instruction: &str,
    execute: bool,
    json: bool,
) -> Result<()> {
    let pipeline = InstructionPipeline::from_settings(settings)
        .context("Failed to build generation backend")?;

    let mut session = scratch_session();
    session.set_auto_execute(execute && settings.auto_execute);
    if history.exists() {
        session
            .load_log(history)
            .with_context(|| format!("Failed to load history from {}", history.display()))?;
    }

    let index = session.submit(&pipeline, instruction).await?;
    session
        .save_log(history)
        .with_context(|| format!("Failed to save history to {}", history.display()))?;

    let Some(turn) = session.log().get(index) else {
        bail!("turn {} missing after submit", index);
    };

    if json {
        print_json(&json!({ "turn": turn, "scene": session.scene_summary() }))?;
    } else {
        println!("{}", turn.content());
        if let Some(code) = turn.code() {
            println!();
            println!("{}", code);
        }
        println!();
        println!("status: {}", turn.status());
        println!("objects: {}", session.scene_summary().objects.join(", "));
    }

    if turn.status() == TurnStatus::Error {
        bail!("{}", turn.error().unwrap_or("turn failed"));
    }
    Ok(())
}

fn render_search(records: &[AssetRecord], threshold: u32) -> String {
    if records.is_empty() {
        return "No matching assets".to_string();
    }
    let mut out = String::new();
    for record in records {
        let marker = if record.score >= threshold { "*" } else { " " };
        out.push_str(&format!(
            "{} {:>3}  {:<12} {}\n",
            marker,
            record.score,
            record.category,
            record.path.display()
        ));
    }
    out
}

/// Rank library files; `*` marks scores that would short-circuit generation
fn cmd_search(library: &AssetLibrary, query: &str, limit: usize, json: bool) -> Result<()> {
    let mut records = library
        .try_search(query)
        .with_context(|| format!("Failed to search {}", library.root().display()))?;
    records.truncate(limit);

    if json {
        return print_json(&records);
    }
    print!("{}", render_search(&records, library.config().shortcut_threshold));
    Ok(())
}

fn render_verdict(verdict: &SafetyVerdict) -> String {
    if verdict.is_safe {
        return "safe".to_string();
    }
    let mut out = format!("unsafe ({} violation(s))\n", verdict.violations.len());
    for violation in &verdict.violations {
        out.push_str(&format!("  - {}\n", violation));
    }
    out
}

fn read_script(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn cmd_validate(file: &Path, json: bool) -> Result<()> {
    let verdict = SafetyFilter::standard().validate(&read_script(file)?);
    if json {
        print_json(&verdict)?;
    } else {
        print!("{}", render_verdict(&verdict));
        if verdict.is_safe {
            println!();
        }
    }
    if !verdict.is_safe {
        bail!("{} rejected by the safety filter", file.display());
    }
    Ok(())
}

fn cmd_sanitize(file: &Path) -> Result<()> {
    let sanitized = SafetyFilter::standard().sanitize(&read_script(file)?);
    for warning in &sanitized.warnings {
        eprintln!("warning: {}", warning);
    }
    print!("{}", sanitized.text);
    Ok(())
}

fn cmd_emit(plan: &str, run: bool, json: bool) -> Result<()> {
    let script = emit(plan);
    if !run {
        if json {
            return print_json(&script);
        }
        println!("{}", script.source);
        return Ok(());
    }

    let mut session = scratch_session();
    session.record_plan(plan, plan);
    let report = session.apply_plan(plan).context("Failed to apply plan")?;
    let objects = session.scene_summary().objects;
    if json {
        return print_json(&json!({ "script": script, "report": report, "objects": objects }));
    }
    println!("{}", script.source);
    println!();
    for line in &report.log {
        println!("log: {}", line);
    }
    println!("objects: {}", objects.join(", "));
    Ok(())
}

fn cmd_preview(plan: &str, out: &Path, json: bool) -> Result<()> {
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create {}", out.display()))?;
    let mut session = scratch_session().with_preview_dir(out);
    let artifact = session.preview_plan(plan).context("Preview failed")?;
    info!(path = %artifact.path.display(), "preview written");

    if json {
        return print_json(&artifact);
    }
    println!("{}", artifact.path.display());
    Ok(())
}

fn render_variants(variants: &[Variant]) -> String {
    let mut out = String::new();
    for (i, variant) in variants.iter().enumerate() {
        let thumb = variant
            .thumb_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(no preview)".to_string());
        out.push_str(&format!("--- variant {} -> {}\n{}\n", i + 1, thumb, variant.code));
    }
    out
}

async fn cmd_variants(
    settings: &Settings,
    instruction: &str,
    count: usize,
    out: &Path,
    json: bool,
) -> Result<()> {
    if count == 0 {
        bail!("--count must be at least 1");
    }
    let pipeline = InstructionPipeline::from_settings(settings)
        .context("Failed to build generation backend")?;
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create {}", out.display()))?;

    let scripts = pipeline.generate_variants(instruction, count).await;
    let mut session = scratch_session().with_preview_dir(out);
    let variants = session.preview_variants(scripts);

    if json {
        return print_json(&variants);
    }
    print!("{}", render_variants(variants));
    Ok(())
}

fn render_history(log: &ConversationLog) -> String {
    if log.is_empty() {
        return "No saved turns".to_string();
    }
    let mut out = String::new();
    for (i, turn) in log.iter().enumerate() {
        out.push_str(&format!(
            "#{} [{}] {} ({}): {}\n",
            i,
            turn.display_time(),
            turn.role(),
            turn.status(),
            turn.content()
        ));
        if let Some(error) = turn.error() {
            out.push_str(&format!("    error: {}\n", error));
        }
    }
    out
}

fn cmd_history_show(history: &Path, json: bool) -> Result<()> {
    let log = if history.exists() {
        ConversationLog::load(history)
            .with_context(|| format!("Failed to load history from {}", history.display()))?
    } else {
        ConversationLog::new()
    };
    if json {
        return print_json(&log);
    }
    print!("{}", render_history(&log));
    if log.is_empty() {
        println!();
    }
    Ok(())
}

fn cmd_history_clear(history: &Path) -> Result<()> {
    if !history.exists() {
        println!("No history at {}", history.display());
        return Ok(());
    }
    std::fs::remove_file(history)
        .with_context(|| format!("Failed to remove {}", history.display()))?;
    println!("Cleared {}", history.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_settings(assets: &Path) -> Settings {
        let ui = UiSettings {
            provider: Some(Provider::Demo),
            asset_root: assets.display().to_string(),
            ..UiSettings::default()
        };
        Settings::resolve(None, &ui).unwrap()
    }

    #[test]
    fn test_global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "rendermind",
            "search",
            "red chair",
            "--limit",
            "3",
            "--provider",
            "demo",
        ])
        .unwrap();
        assert_eq!(cli.provider, Some(Provider::Demo));
        match cli.command {
            Commands::Search { query, limit } => {
                assert_eq!(query, "red chair");
                assert_eq!(limit, 3);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_template_parses_case_insensitively() {
        let cli = Cli::try_parse_from(["rendermind", "template", "MATERIAL"]).unwrap();
        match cli.command {
            Commands::Template { action } => {
                assert_eq!(action.template(), "Add a material that ")
            }
            _ => panic!("expected template"),
        }
        assert!(Cli::try_parse_from(["rendermind", "template", "explode"]).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected_by_parser() {
        assert!(Cli::try_parse_from(["rendermind", "--provider", "nope", "history", "show"]).is_err());
    }

    #[test]
    fn test_validate_rejects_unsafe_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.rhai");
        std::fs::write(&bad, "fn rendermind_action(context) { os.system(\"ls\"); }").unwrap();
        assert!(cmd_validate(&bad, false).is_err());

        let good = dir.path().join("good.rhai");
        std::fs::write(&good, "fn rendermind_action(context) { context.log(\"hi\"); }").unwrap();
        assert!(cmd_validate(&good, false).is_ok());
    }

    #[test]
    fn test_render_verdict_lists_violations() {
        let verdict = SafetyFilter::standard()
            .validate("fn rendermind_action(context) { os.system(\"ls\"); }");
        let text = render_verdict(&verdict);
        assert!(text.starts_with("unsafe"));
        assert!(text.contains("os.system"));
    }

    #[test]
    fn test_search_marks_shortcut_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("furniture")).unwrap();
        std::fs::write(dir.path().join("furniture/chair.obj"), b"").unwrap();

        let library = AssetLibrary::new(dir.path());
        let records = library.search("chair");
        assert_eq!(records.len(), 1);
        let text = render_search(&records, library.config().shortcut_threshold);
        assert!(text.starts_with('*'));
        assert!(text.contains("furniture"));

        assert_eq!(render_search(&[], 60), "No matching assets");
    }

    #[test]
    fn test_emit_run_builds_objects() {
        assert!(cmd_emit("uv_sphere r=0.7", true, false).is_ok());
        assert!(cmd_emit("something unknown", false, true).is_ok());
    }

    #[test]
    fn test_preview_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("previews");
        cmd_preview("cube", &out, false).unwrap();
        let written = std::fs::read_dir(&out).unwrap().count();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn test_ask_appends_to_history() {
        let dir = tempfile::tempdir().unwrap();
        let settings = demo_settings(&dir.path().join("no-assets"));
        let history = dir.path().join("state/history.json");

        cmd_ask(&settings, &history, "add a cube", true, false)
            .await
            .unwrap();
        cmd_ask(&settings, &history, "add a sphere", false, true)
            .await
            .unwrap();

        let log = ConversationLog::load(&history).unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log.get(1).unwrap().status(), TurnStatus::Success);
        assert_eq!(log.get(3).unwrap().status(), TurnStatus::None);
        assert!(render_history(&log).contains("add a sphere"));
    }

    #[tokio::test]
    async fn test_variants_fall_back_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        let settings = demo_settings(dir.path());
        cmd_variants(&settings, "add a cylinder", 2, &dir.path().join("v"), true)
            .await
            .unwrap();
        assert!(cmd_variants(&settings, "x", 0, dir.path(), false).await.is_err());
    }

    #[test]
    fn test_history_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history.json");
        ConversationLog::new().save(&history).unwrap();
        cmd_history_clear(&history).unwrap();
        assert!(!history.exists());
        cmd_history_clear(&history).unwrap();
        cmd_history_show(&history, false).unwrap();
    }
}
