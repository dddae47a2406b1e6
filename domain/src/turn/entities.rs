//! Chat turn entity

use super::attachment::FileAttachment;
use super::preferences::UserPreferences;
use super::stage::TurnStage;
use super::worker::WorkerResult;
use crate::consensus::confidence::{Confidence, extract_confidence};
use crate::core::error::DomainError;
use crate::expert::entities::ExpertProfile;
use crate::framing::profile::FramingProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user request and its pipeline execution (Entity)
///
/// Every mutation goes through a stage-checked method, so a turn can only
/// move forward through its [`TurnStage`]s and becomes read-only once it
/// reaches `Complete` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    id: String,
    prompt: String,
    #[serde(default)]
    attachments: Vec<FileAttachment>,
    stage: TurnStage,
    #[serde(default)]
    framing: Option<FramingProfile>,
    #[serde(default)]
    selected_experts: Vec<ExpertProfile>,
    #[serde(default)]
    worker_results: Vec<WorkerResult>,
    #[serde(default)]
    synthesized: String,
    #[serde(default)]
    audit: Option<String>,
    #[serde(default)]
    total_tokens: u32,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    preferences: Option<UserPreferences>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(
        prompt: impl Into<String>,
        attachments: Vec<FileAttachment>,
        preferences: Option<UserPreferences>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            attachments,
            stage: TurnStage::Framing,
            framing: None,
            selected_experts: Vec::new(),
            worker_results: Vec::new(),
            synthesized: String::new(),
            audit: None,
            total_tokens: 0,
            error: None,
            preferences,
            created_at: now,
            updated_at: now,
        }
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn attachments(&self) -> &[FileAttachment] {
        &self.attachments
    }

    pub fn stage(&self) -> TurnStage {
        self.stage
    }

    pub fn framing(&self) -> Option<&FramingProfile> {
        self.framing.as_ref()
    }

    pub fn selected_experts(&self) -> &[ExpertProfile] {
        &self.selected_experts
    }

    pub fn worker_results(&self) -> &[WorkerResult] {
        &self.worker_results
    }

    pub fn successful_results(&self) -> impl Iterator<Item = &WorkerResult> {
        self.worker_results.iter().filter(|r| r.is_success())
    }

    pub fn synthesized(&self) -> &str {
        &self.synthesized
    }

    /// Synthesis split into its confidence marker and display text
    pub fn confidence(&self) -> (Option<Confidence>, String) {
        extract_confidence(&self.synthesized)
    }

    pub fn audit(&self) -> Option<&str> {
        self.audit.as_deref()
    }

    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn preferences(&self) -> Option<&UserPreferences> {
        self.preferences.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    // ==================== Stage Transitions ====================

    /// framing → routing
    pub fn complete_framing(&mut self, profile: FramingProfile) -> Result<(), DomainError> {
        self.expect_stage(TurnStage::Framing)?;
        self.framing = Some(profile);
        self.advance(TurnStage::Routing)
    }

    /// routing → gathering. Fixes the worker list: one pending result per
    /// expert, in selection order.
    pub fn complete_routing(&mut self, experts: Vec<ExpertProfile>) -> Result<(), DomainError> {
        self.expect_stage(TurnStage::Routing)?;
        if experts.is_empty() {
            return Err(DomainError::NoExpertsSelected);
        }
        self.worker_results = experts.iter().cloned().map(WorkerResult::pending).collect();
        self.selected_experts = experts;
        self.advance(TurnStage::Gathering)
    }

    /// Publish an intermediate worker snapshot while gathering.
    pub fn update_workers(&mut self, results: Vec<WorkerResult>) -> Result<(), DomainError> {
        self.expect_stage(TurnStage::Gathering)?;
        self.check_worker_order(&results)?;
        self.worker_results = results;
        self.touch();
        Ok(())
    }

    /// gathering → judging. Token total starts with the worker estimates.
    pub fn complete_gathering(&mut self, results: Vec<WorkerResult>) -> Result<(), DomainError> {
        self.update_workers(results)?;
        self.total_tokens = self.worker_results.iter().map(|r| r.estimated_tokens).sum();
        self.advance(TurnStage::Judging)
    }

    /// Append one streamed synthesis fragment.
    pub fn append_synthesis(&mut self, chunk: &str) -> Result<(), DomainError> {
        self.expect_stage(TurnStage::Judging)?;
        self.synthesized.push_str(chunk);
        self.touch();
        Ok(())
    }

    /// judging → criticizing
    pub fn complete_judging(&mut self, judge_tokens: u32) -> Result<(), DomainError> {
        self.expect_stage(TurnStage::Judging)?;
        self.total_tokens = self.total_tokens.saturating_add(judge_tokens);
        self.advance(TurnStage::Criticizing)
    }

    /// criticizing → complete
    pub fn complete_audit(
        &mut self,
        audit: impl Into<String>,
        critic_tokens: u32,
    ) -> Result<(), DomainError> {
        self.expect_stage(TurnStage::Criticizing)?;
        self.audit = Some(audit.into());
        self.total_tokens = self.total_tokens.saturating_add(critic_tokens);
        self.advance(TurnStage::Complete)
    }

    /// Any non-terminal stage → error
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        self.error = Some(message.into());
        self.advance(TurnStage::Error)
    }

    // ==================== Internals ====================

    fn ensure_mutable(&self) -> Result<(), DomainError> {
        if self.is_terminal() {
            return Err(DomainError::TurnTerminal(self.id.clone()));
        }
        Ok(())
    }

    fn expect_stage(&self, expected: TurnStage) -> Result<(), DomainError> {
        self.ensure_mutable()?;
        if self.stage != expected {
            return Err(DomainError::WrongStage {
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }

    fn advance(&mut self, next: TurnStage) -> Result<(), DomainError> {
        if !self.stage.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        self.stage = next;
        self.touch();
        Ok(())
    }

    fn check_worker_order(&self, results: &[WorkerResult]) -> Result<(), DomainError> {
        let same_order = results.len() == self.worker_results.len()
            && results
                .iter()
                .zip(&self.worker_results)
                .all(|(new, old)| new.expert.id == old.expert.id);
        if !same_order {
            return Err(DomainError::WorkerOrderViolated {
                expected: self.worker_results.len(),
            });
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Model;
    use crate::expert::entities::ExpertKind;
    use crate::turn::worker::{WorkerOutcome, WorkerOutput};

    fn expert(id: &str) -> ExpertProfile {
        ExpertProfile::new(id, id, ExpertKind::Text, Model::Gemini3Flash)
    }

    fn routed_turn() -> ChatTurn {
        let mut turn = ChatTurn::new("What is Rust?", vec![], None);
        turn.complete_framing(FramingProfile::default()).unwrap();
        turn.complete_routing(vec![expert("a"), expert("b")]).unwrap();
        turn
    }

    #[test]
    fn test_new_turn_starts_framing() {
        let turn = ChatTurn::new("hi", vec![], None);
        assert_eq!(turn.stage(), TurnStage::Framing);
        assert!(turn.worker_results().is_empty());
        assert!(!turn.id().is_empty());
    }

    #[test]
    fn test_routing_fixes_worker_list() {
        let turn = routed_turn();
        assert_eq!(turn.stage(), TurnStage::Gathering);
        assert_eq!(turn.worker_results().len(), 2);
        assert!(turn.worker_results().iter().all(|r| r.is_pending()));
        assert_eq!(turn.worker_results()[1].expert.id, "b");
    }

    #[test]
    fn test_empty_routing_rejected() {
        let mut turn = ChatTurn::new("hi", vec![], None);
        turn.complete_framing(FramingProfile::default()).unwrap();
        assert_eq!(
            turn.complete_routing(vec![]),
            Err(DomainError::NoExpertsSelected)
        );
    }

    #[test]
    fn test_reordered_workers_rejected() {
        let mut turn = routed_turn();
        let mut results = turn.worker_results().to_vec();
        results.reverse();
        assert!(matches!(
            turn.update_workers(results),
            Err(DomainError::WorkerOrderViolated { expected: 2 })
        ));

        let shorter = turn.worker_results()[..1].to_vec();
        assert!(turn.update_workers(shorter).is_err());
    }

    #[test]
    fn test_full_lifecycle_accumulates_tokens() {
        let mut turn = routed_turn();
        let mut results = turn.worker_results().to_vec();
        results[0]
            .resolve(WorkerOutcome::Success(WorkerOutput::text("A", 10)))
            .unwrap();
        results[1].resolve(WorkerOutcome::failure("boom")).unwrap();
        turn.complete_gathering(results).unwrap();
        assert_eq!(turn.total_tokens(), 10);
        assert_eq!(turn.successful_results().count(), 1);

        turn.append_synthesis("Confidence: High\n").unwrap();
        turn.append_synthesis("Answer").unwrap();
        turn.complete_judging(5).unwrap();
        turn.complete_audit("Looks fine.", 3).unwrap();

        assert_eq!(turn.stage(), TurnStage::Complete);
        assert_eq!(turn.total_tokens(), 18);
        assert_eq!(turn.synthesized(), "Confidence: High\nAnswer");
        assert_eq!(turn.confidence(), (Some(Confidence::High), "Answer".to_string()));
    }

    #[test]
    fn test_terminal_turn_is_immutable() {
        let mut turn = ChatTurn::new("hi", vec![], None);
        turn.fail("Critical process failure.").unwrap();
        assert_eq!(turn.stage(), TurnStage::Error);
        assert_eq!(turn.error(), Some("Critical process failure."));

        let id = turn.id().to_string();
        assert_eq!(
            turn.complete_framing(FramingProfile::default()),
            Err(DomainError::TurnTerminal(id.clone()))
        );
        assert_eq!(turn.fail("again"), Err(DomainError::TurnTerminal(id)));
    }

    #[test]
    fn test_out_of_order_call_rejected() {
        let mut turn = ChatTurn::new("hi", vec![], None);
        assert_eq!(
            turn.append_synthesis("x"),
            Err(DomainError::WrongStage {
                expected: TurnStage::Judging,
                actual: TurnStage::Framing,
            })
        );
    }

    #[test]
    fn test_serde_roundtrip_keeps_stage() {
        let turn = routed_turn();
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"stage\":\"gathering\""));
        let back: ChatTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }
}
