//! Turn and session model
//!
//! A [`ChatTurn`](entities::ChatTurn) is one request/response cycle moving
//! through the [`TurnStage`](stage::TurnStage) state machine. Sessions are
//! ordered collections of turns.

pub mod attachment;
pub mod entities;
pub mod history;
pub mod preferences;
pub mod session;
pub mod stage;
pub mod worker;

pub use attachment::FileAttachment;
pub use entities::ChatTurn;
pub use history::{HistoryEntry, HistorySnapshot};
pub use preferences::UserPreferences;
pub use session::ChatSession;
pub use stage::TurnStage;
pub use worker::{GroundingCitation, WorkerOutcome, WorkerOutput, WorkerResult, WorkerStatus};
