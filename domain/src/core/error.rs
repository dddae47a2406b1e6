//! Domain error types

use crate::turn::stage::TurnStage;
use thiserror::Error;

/// Domain-level errors
///
/// These are invariant violations of the turn model. The pipeline never
/// produces them on the happy path; when one escapes orchestration the turn
/// is driven to its terminal `error` stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: TurnStage, to: TurnStage },

    #[error("Turn {0} is already terminal")]
    TurnTerminal(String),

    #[error("Operation requires stage {expected}, turn is in {actual}")]
    WrongStage {
        expected: TurnStage,
        actual: TurnStage,
    },

    #[error("Router selected no experts")]
    NoExpertsSelected,

    #[error("Worker results changed shape: expected {expected} results in selection order")]
    WorkerOrderViolated { expected: usize },

    #[error("Worker result for {0} was already resolved")]
    WorkerAlreadyResolved(String),

    #[error("Unknown expert: {0}")]
    UnknownExpert(String),
}

impl DomainError {
    /// Check if this error was caused by touching a finished turn
    pub fn is_terminal_violation(&self) -> bool {
        matches!(self, DomainError::TurnTerminal(_))
    }
}
