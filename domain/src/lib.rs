//! Domain layer for consensus-engine
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Turn
//!
//! A turn is one user request moving through a fixed pipeline:
//!
//! ```text
//! framing → routing → gathering → judging → criticizing → complete
//! ```
//!
//! with `error` reachable from any non-terminal stage.
//!
//! ## Experts
//!
//! A static catalog of backend personas. The router picks a subset, the
//! worker pool runs them concurrently, the judge merges their outputs into a
//! single answer and the critic audits it.

pub mod config;
pub mod consensus;
pub mod core;
pub mod expert;
pub mod framing;
pub mod generation;
pub mod prompt;
pub mod turn;

// Re-export commonly used types
pub use config::OutputFormat;
pub use consensus::{ActionDraft, ActionKind, Confidence, extract_action_draft, extract_confidence};
pub use core::{
    error::DomainError,
    json::extract_json_object,
    model::Model,
    string::{estimate_tokens, truncate},
};
pub use expert::{ExpertKind, ExpertProfile, ExpertRegistry, ExpertTool};
pub use framing::{
    AudienceType, AuthoritySource, CorrectionTolerance, FramingDomain, FramingIntent,
    FramingProfile,
};
pub use generation::{
    ContentPart, GenerateRequest, GenerateResponse, InlineMedia, MediaJob, MediaJobRequest,
    MediaJobStatus, StreamEvent,
};
pub use prompt::PromptTemplate;
pub use turn::{
    ChatSession, ChatTurn, FileAttachment, GroundingCitation, HistoryEntry, HistorySnapshot,
    TurnStage, UserPreferences, WorkerOutcome, WorkerOutput, WorkerResult, WorkerStatus,
};
