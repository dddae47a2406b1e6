//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use crate::progress::reporter::{ProgressReporter, SimpleProgress};
use colored::Colorize;
use consensus_application::{
    CoordinatorError, LlmGateway, SessionCoordinator, SessionStore, TurnObserver, TurnRequest,
};
use consensus_domain::{ChatTurn, FileAttachment, OutputFormat};
use consensus_infrastructure::load_attachment;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

const HISTORY_CAPACITY: usize = 1000;

/// What a slash command asks the loop to do next
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Interactive chat REPL
pub struct ChatRepl<G: LlmGateway + 'static, S: SessionStore + 'static> {
    coordinator: Arc<SessionCoordinator<G, S>>,
    session_id: String,
    format: OutputFormat,
    show_progress: bool,
    history_file: Option<PathBuf>,
    pending: Vec<FileAttachment>,
}

impl<G: LlmGateway + 'static, S: SessionStore + 'static> ChatRepl<G, S> {
    /// Start in `session_id`, or in a fresh session when `None`
    pub fn new(coordinator: Arc<SessionCoordinator<G, S>>, session_id: Option<String>) -> Self {
        let session_id = session_id.unwrap_or_else(|| coordinator.create_session());
        Self {
            coordinator,
            session_id,
            format: OutputFormat::Answer,
            show_progress: true,
            history_file: None,
            pending: Vec::new(),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set whether to show progress
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_file = path;
        self
    }

    /// Attachments sent with the next message
    pub fn with_attachments(mut self, attachments: Vec<FileAttachment>) -> Self {
        self.pending = attachments;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut editor = self.editor();
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("consensus".to_string()),
            DefaultPromptSegment::Empty,
        );

        self.print_welcome();

        loop {
            match editor.read_line(&prompt)? {
                Signal::Success(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line.starts_with('/') {
                        if self.handle_command(line).await == Flow::Exit {
                            break;
                        }
                        continue;
                    }
                    self.process_message(line).await;
                }
                Signal::CtrlC => {
                    println!("^C");
                }
                Signal::CtrlD => {
                    println!("Bye!");
                    break;
                }
            }
        }

        Ok(())
    }

    fn editor(&self) -> Reedline {
        let editor = Reedline::create();
        let Some(path) = &self.history_file else {
            return editor;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match FileBackedHistory::with_file(HISTORY_CAPACITY, path.clone()) {
            Ok(history) => editor.with_history(Box::new(history)),
            Err(e) => {
                warn!("Line history unavailable at {}: {}", path.display(), e);
                editor
            }
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│         Consensus Engine - Chat Mode        │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Session: {}", self.session_id.dimmed());
        println!("Type /help for commands.");
        println!();
    }

    fn print_help() {
        println!();
        println!("Commands:");
        println!("  /help, /h, /?          - Show this help");
        println!("  /new                   - Start a new session");
        println!("  /sessions              - List saved sessions");
        println!("  /switch <id>           - Continue another session");
        println!("  /delete <id>           - Delete a session");
        println!("  /clear                 - Delete all sessions");
        println!("  /attach <path>         - Attach a file to the next message");
        println!("  /prefs                 - Show preferences");
        println!("  /persona <text>        - Set persona");
        println!("  /style <text>          - Set answer style");
        println!("  /context <text>        - Set technical context");
        println!("  /memory on|off         - Send preferences to the models");
        println!("  /quit, /exit, /q       - Exit chat");
        println!();
    }

    /// Handle slash commands
    async fn handle_command(&mut self, line: &str) -> Flow {
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        let result = match command {
            "/quit" | "/exit" | "/q" => {
                println!("Bye!");
                return Flow::Exit;
            }
            "/help" | "/h" | "/?" => {
                Self::print_help();
                Ok(())
            }
            "/new" => {
                self.session_id = self.coordinator.create_session();
                println!("Started session {}", self.session_id.dimmed());
                Ok(())
            }
            "/sessions" => {
                self.print_sessions();
                Ok(())
            }
            "/switch" => {
                if self.coordinator.session(arg).is_some() {
                    self.session_id = arg.to_string();
                    println!("Switched to {}", arg.dimmed());
                } else {
                    println!("No session {}", arg);
                }
                Ok(())
            }
            "/delete" => self.delete_session(arg).await,
            "/clear" => self.coordinator.clear_sessions().await.map(|_| {
                self.session_id = self.coordinator.create_session();
                println!("All sessions deleted.");
            }),
            "/attach" => {
                self.attach(Path::new(arg)).await;
                Ok(())
            }
            "/prefs" => {
                self.print_preferences();
                Ok(())
            }
            "/persona" | "/style" | "/context" | "/memory" => {
                self.update_preferences(command, arg).await
            }
            _ => {
                println!("Unknown command: {}", command);
                println!("Type /help for available commands");
                Ok(())
            }
        };

        if let Err(e) = result {
            eprintln!("{} {}", "Error:".red(), e);
        }
        Flow::Continue
    }

    fn print_sessions(&self) {
        let sessions = self.coordinator.list_sessions();
        if sessions.is_empty() {
            println!("No sessions yet.");
            return;
        }
        for session in sessions {
            let marker = if session.id() == self.session_id { "*" } else { " " };
            println!(
                "{} {}  {}  {} turns  {}",
                marker,
                session.id().dimmed(),
                session.title(),
                session.turns().len(),
                session.updated_at().format("%Y-%m-%d %H:%M").to_string().dimmed()
            );
        }
    }

    async fn delete_session(&mut self, id: &str) -> Result<(), CoordinatorError> {
        if !self.coordinator.delete_session(id).await? {
            println!("No session {}", id);
            return Ok(());
        }
        println!("Deleted {}", id);
        if id == self.session_id {
            self.session_id = self.coordinator.create_session();
        }
        Ok(())
    }

    async fn attach(&mut self, path: &Path) {
        match load_attachment(path).await {
            Ok(attachment) => {
                println!("Attached {} ({})", attachment.name, attachment.mime_type);
                self.pending.push(attachment);
            }
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        }
    }

    fn print_preferences(&self) {
        let prefs = self.coordinator.preferences();
        println!();
        println!("Persona: {}", prefs.persona);
        println!("Style:   {}", prefs.style);
        println!("Context: {}", prefs.technical_context);
        println!("Memory:  {}", if prefs.memory_enabled { "on" } else { "off" });
        println!();
    }

    async fn update_preferences(&self, command: &str, arg: &str) -> Result<(), CoordinatorError> {
        let mut prefs = self.coordinator.preferences();
        match command {
            "/persona" => prefs.persona = arg.to_string(),
            "/style" => prefs.style = arg.to_string(),
            "/context" => prefs.technical_context = arg.to_string(),
            _ => match arg {
                "on" => prefs.memory_enabled = true,
                "off" => prefs.memory_enabled = false,
                _ => {
                    println!("Usage: /memory on|off");
                    return Ok(());
                }
            },
        }
        self.coordinator.set_preferences(prefs).await?;
        println!("Preferences saved.");
        Ok(())
    }

    async fn process_message(&mut self, message: &str) {
        println!();

        let request =
            TurnRequest::new(message).with_attachments(std::mem::take(&mut self.pending));
        let streaming = self.show_progress && self.format == OutputFormat::Answer;

        let result = if self.show_progress {
            let progress = ProgressReporter::new().with_streaming(streaming);
            self.submit(request, &progress).await
        } else {
            self.submit(request, &SimpleProgress::new()).await
        };

        match result {
            Ok(turn) if streaming && turn.error().is_none() => {
                println!("{}", ConsoleFormatter::format_after_stream(&turn));
            }
            Ok(turn) => println!("{}", ConsoleFormatter::render(&turn, self.format)),
            Err(CoordinatorError::Turn(e)) => {
                println!("{}", ConsoleFormatter::render(e.turn(), self.format));
            }
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        }
        println!();
    }

    async fn submit(
        &self,
        request: TurnRequest,
        observer: &dyn TurnObserver,
    ) -> Result<ChatTurn, CoordinatorError> {
        self.coordinator.submit(&self.session_id, request, observer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use consensus_application::{GatewayError, NoSessionStore, PipelineConfig, RunTurnUseCase};
    use consensus_domain::{ExpertRegistry, GenerateRequest, GenerateResponse};

    struct OfflineGateway;

    #[async_trait]
    impl LlmGateway for OfflineGateway {
        async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
            Err(GatewayError::ConnectionError("offline".to_string()))
        }
    }

    fn repl() -> ChatRepl<OfflineGateway, NoSessionStore> {
        let config = PipelineConfig::default();
        let run_turn = RunTurnUseCase::new(
            Arc::new(OfflineGateway),
            Arc::new(ExpertRegistry::builtin()),
            &config,
        );
        let coordinator = SessionCoordinator::new(run_turn, Arc::new(NoSessionStore), 6);
        ChatRepl::new(Arc::new(coordinator), None).with_progress(false)
    }

    #[tokio::test]
    async fn test_preference_commands_persist() {
        let mut repl = repl();
        assert_eq!(repl.handle_command("/persona SRE on call").await, Flow::Continue);
        repl.handle_command("/memory off").await;

        let prefs = repl.coordinator.preferences();
        assert_eq!(prefs.persona, "SRE on call");
        assert!(!prefs.memory_enabled);
    }

    #[tokio::test]
    async fn test_session_commands() {
        let mut repl = repl();
        let first = repl.session_id.clone();

        repl.handle_command("/new").await;
        assert_ne!(repl.session_id, first);

        repl.handle_command(&format!("/switch {first}")).await;
        assert_eq!(repl.session_id, first);

        repl.handle_command(&format!("/delete {first}")).await;
        assert_ne!(repl.session_id, first);
        assert!(repl.coordinator.session(&first).is_none());
    }

    #[tokio::test]
    async fn test_quit_exits() {
        let mut repl = repl();
        assert_eq!(repl.handle_command("/quit").await, Flow::Exit);
        assert_eq!(repl.handle_command("/bogus").await, Flow::Continue);
    }

    #[tokio::test]
    async fn test_missing_attachment_is_not_queued() {
        let mut repl = repl();
        repl.handle_command("/attach /definitely/not/here.png").await;
        assert!(repl.pending.is_empty());
    }
}
