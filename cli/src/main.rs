//! CLI entrypoint for the Consensus Engine
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use consensus_application::{
    ConversationLogger, CoordinatorError, RunTurnUseCase, SessionCoordinator, TurnObserver,
    TurnRequest,
};
use consensus_domain::{ExpertRegistry, OutputFormat};
use consensus_infrastructure::{
    ConfigLoader, FileConfig, GeminiLlmGateway, JsonFileSessionStore, JsonlConversationLogger,
    expand_home, load_attachments,
};
use consensus_presentation::{ChatRepl, Cli, ConsoleFormatter, ProgressReporter, SimpleProgress};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE: &str = "consensus-engine.log";

type Coordinator = SessionCoordinator<GeminiLlmGateway, JsonFileSessionStore>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        println!("{}", ConfigLoader::describe_sources(cli.config.as_deref()));
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow::anyhow!("{e}"))?
    };
    config.validate().context("Invalid configuration")?;

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| config.logging.log_dir.as_deref().map(expand_home));
    let log_guard = init_tracing(cli.verbose, log_dir.as_deref())?;

    info!("Starting Consensus Engine");

    if !config.output.color {
        colored::control::set_override(false);
    }

    let coordinator = Arc::new(build_coordinator(&cli, &config, log_dir.as_deref())?);
    let restored = coordinator
        .restore()
        .await
        .context("Failed to load stored sessions")?;
    info!("{} stored sessions", restored);

    if cli.is_maintenance() {
        return run_maintenance(&cli, &coordinator).await;
    }

    let format = cli
        .output
        .map(OutputFormat::from)
        .or(config.output.format)
        .unwrap_or_default();

    let attachments = load_attachments(cli.attach.as_slice())
        .await
        .context("Failed to load attachments")?;

    if let Some(id) = &cli.session
        && coordinator.session(id).is_none()
    {
        bail!("Unknown session: {id}");
    }

    // Chat mode
    if cli.chat {
        let history_file = config
            .repl
            .history_file
            .as_deref()
            .map(expand_home)
            .or_else(|| config.storage.resolve_data_dir().map(|dir| dir.join("history.txt")));
        let mut repl = ChatRepl::new(Arc::clone(&coordinator), cli.session.clone())
            .with_format(format)
            .with_progress(config.repl.show_progress && !cli.quiet)
            .with_history_file(history_file)
            .with_attachments(attachments);
        repl.run().await?;
        return Ok(());
    }

    // Single request mode - prompt is required
    let prompt = match cli.prompt.clone() {
        Some(p) => p,
        None if !attachments.is_empty() => String::new(),
        None => bail!("A prompt is required. Use --chat for interactive mode."),
    };

    let session_id = cli
        .session
        .clone()
        .unwrap_or_else(|| coordinator.create_session());
    let request = TurnRequest::new(prompt).with_attachments(attachments);

    let observer: Box<dyn TurnObserver> = if cli.quiet {
        Box::new(consensus_application::NoObserver)
    } else if format == OutputFormat::Json {
        Box::new(SimpleProgress::new())
    } else {
        Box::new(ProgressReporter::new())
    };

    let turn = match coordinator.submit(&session_id, request, observer.as_ref()).await {
        Ok(turn) => turn,
        Err(CoordinatorError::Turn(e)) => e.turn().clone(),
        Err(e) => return Err(e.into()),
    };

    println!("{}", ConsoleFormatter::render(&turn, format));
    if !cli.quiet && format != OutputFormat::Json {
        eprintln!("{} {}", "session:".dimmed(), session_id.dimmed());
    }

    if turn.error().is_some() {
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}

/// Console logging by verbosity, plus a plain-text log file when a log
/// directory is configured.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(filter).with(console).init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(Some(guard))
}

fn build_coordinator(cli: &Cli, config: &FileConfig, log_dir: Option<&Path>) -> Result<Coordinator> {
    let mut pipeline = config.to_pipeline_config();
    if cli.degraded {
        pipeline = pipeline.degraded(true);
    }

    // === Dependency Injection ===
    let gateway = Arc::new(GeminiLlmGateway::new(config.to_gemini_settings())?);
    let registry = Arc::new(ExpertRegistry::builtin());

    let mut run_turn = RunTurnUseCase::new(gateway, registry, &pipeline);
    if config.logging.transcript
        && let Some(dir) = log_dir
    {
        match JsonlConversationLogger::in_dir(dir) {
            Some(logger) => {
                info!("Writing turn transcript to {}", logger.path().display());
                let logger: Arc<dyn ConversationLogger> = Arc::new(logger);
                run_turn = run_turn.with_conversation_logger(logger);
            }
            None => warn!("Transcript disabled: cannot write to {}", dir.display()),
        }
    }

    let data_dir = config
        .storage
        .resolve_data_dir()
        .unwrap_or_else(|| PathBuf::from(".consensus-engine"));
    let store = Arc::new(JsonFileSessionStore::new(data_dir));

    Ok(SessionCoordinator::new(run_turn, store, pipeline.history_window))
}

async fn run_maintenance(cli: &Cli, coordinator: &Coordinator) -> Result<()> {
    if cli.clear_history {
        coordinator.clear_sessions().await?;
        println!("All sessions deleted.");
        return Ok(());
    }

    if let Some(id) = &cli.delete_session {
        if coordinator.delete_session(id).await? {
            println!("Deleted {id}");
        } else {
            bail!("Unknown session: {id}");
        }
        return Ok(());
    }

    let sessions = coordinator.list_sessions();
    if sessions.is_empty() {
        println!("No stored sessions.");
    }
    for session in sessions {
        println!(
            "{}  {}  {} turns  {}",
            session.id(),
            session.title(),
            session.turns().len(),
            session.updated_at().format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
