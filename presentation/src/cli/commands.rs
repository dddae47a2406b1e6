//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for a finished turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Worker panels, synthesis, audit and token count
    Full,
    /// Only the synthesized answer
    Answer,
    /// The whole turn as JSON
    Json,
}

impl From<OutputFormat> for consensus_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => consensus_domain::OutputFormat::Full,
            OutputFormat::Answer => consensus_domain::OutputFormat::Answer,
            OutputFormat::Json => consensus_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for consensus-engine
#[derive(Parser, Debug)]
#[command(name = "consensus-engine")]
#[command(author, version, about = "Multi-expert consensus engine - several models answer, a judge synthesizes")]
#[command(long_about = r#"
The Consensus Engine routes each request to a handful of expert models,
runs them in parallel, and streams a single synthesized answer that a
critic then audits.

Each turn moves through five stages:
1. Framing:   classify the request's stance and audience
2. Routing:   pick the experts (text, image, video, action drafts)
3. Gathering: run the experts concurrently
4. Judging:   stream one synthesis with a confidence level
5. Auditing:  a critic flags omissions and overconfidence

Configuration files are loaded from (in priority order):
1. CONSENSUS_* environment variables
2. --config <path>         Explicit config file
3. ./consensus.toml        Project-level config
4. ~/.config/consensus-engine/config.toml   Global config

The API key comes from [backend] api_key, GEMINI_API_KEY or API_KEY.

Example:
  consensus-engine "Compare actor and CSP concurrency models"
  consensus-engine --attach diagram.png "Review this architecture"
  consensus-engine --chat
"#)]
pub struct Cli {
    /// The request (not required in chat mode)
    pub prompt: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Attach a file (can be specified multiple times)
    #[arg(short, long, value_name = "PATH")]
    pub attach: Vec<PathBuf>,

    /// Continue an existing session by id
    #[arg(short, long, value_name = "ID")]
    pub session: Option<String>,

    /// Route to a single generalist to spare a saturated backend
    #[arg(long)]
    pub degraded: bool,

    /// Output format [default: answer, or [output] format from config]
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// List stored sessions and exit
    #[arg(long)]
    pub list_sessions: bool,

    /// Delete a stored session and exit
    #[arg(long, value_name = "ID")]
    pub delete_session: Option<String>,

    /// Delete all stored sessions and exit
    #[arg(long)]
    pub clear_history: bool,

    /// Write a log file and turn transcripts to this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Whether this invocation only manages stored sessions
    pub fn is_maintenance(&self) -> bool {
        self.list_sessions || self.delete_session.is_some() || self.clear_history
    }
}
