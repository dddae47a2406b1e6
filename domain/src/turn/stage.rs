//! Turn stages

use serde::{Deserialize, Serialize};

/// Stage of a chat turn
///
/// Stages only advance to their direct successor, or to `Error` from any
/// non-terminal stage. `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStage {
    Framing,
    Routing,
    Gathering,
    Judging,
    Criticizing,
    Complete,
    Error,
}

impl TurnStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStage::Framing => "framing",
            TurnStage::Routing => "routing",
            TurnStage::Gathering => "gathering",
            TurnStage::Judging => "judging",
            TurnStage::Criticizing => "criticizing",
            TurnStage::Complete => "complete",
            TurnStage::Error => "error",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TurnStage::Framing => "Detecting Framing",
            TurnStage::Routing => "Routing Experts",
            TurnStage::Gathering => "Gathering Expert Input",
            TurnStage::Judging => "Synthesizing Consensus",
            TurnStage::Criticizing => "Auditing Synthesis",
            TurnStage::Complete => "Complete",
            TurnStage::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnStage::Complete | TurnStage::Error)
    }

    /// The stage that follows on success
    pub fn successor(&self) -> Option<TurnStage> {
        match self {
            TurnStage::Framing => Some(TurnStage::Routing),
            TurnStage::Routing => Some(TurnStage::Gathering),
            TurnStage::Gathering => Some(TurnStage::Judging),
            TurnStage::Judging => Some(TurnStage::Criticizing),
            TurnStage::Criticizing => Some(TurnStage::Complete),
            TurnStage::Complete | TurnStage::Error => None,
        }
    }

    pub fn can_transition_to(&self, next: TurnStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == TurnStage::Error || self.successor() == Some(next)
    }
}

impl std::fmt::Display for TurnStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain() {
        let mut stage = TurnStage::Framing;
        let mut visited = vec![stage];
        while let Some(next) = stage.successor() {
            assert!(stage.can_transition_to(next));
            stage = next;
            visited.push(stage);
        }
        assert_eq!(
            visited,
            vec![
                TurnStage::Framing,
                TurnStage::Routing,
                TurnStage::Gathering,
                TurnStage::Judging,
                TurnStage::Criticizing,
                TurnStage::Complete,
            ]
        );
    }

    #[test]
    fn test_no_regression_or_skipping() {
        assert!(!TurnStage::Judging.can_transition_to(TurnStage::Routing));
        assert!(!TurnStage::Framing.can_transition_to(TurnStage::Gathering));
        assert!(!TurnStage::Gathering.can_transition_to(TurnStage::Gathering));
    }

    #[test]
    fn test_error_from_any_non_terminal() {
        for stage in [
            TurnStage::Framing,
            TurnStage::Routing,
            TurnStage::Gathering,
            TurnStage::Judging,
            TurnStage::Criticizing,
        ] {
            assert!(stage.can_transition_to(TurnStage::Error));
        }
        assert!(!TurnStage::Complete.can_transition_to(TurnStage::Error));
        assert!(!TurnStage::Error.can_transition_to(TurnStage::Error));
    }
}
