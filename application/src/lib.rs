//! Application layer for the consensus engine
//!
//! This crate contains the pipeline use cases, port definitions, and
//! pipeline configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{PipelineConfig, RetryPolicy};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    llm_gateway::{GatewayError, LlmGateway, StreamHandle},
    observer::{CompositeObserver, NoObserver, TurnObserver},
    session_store::{NoSessionStore, SessionStore, StoreError},
};
pub use use_cases::critic_audit::{AUDITOR_UNAVAILABLE, Audit, CriticAuditUseCase, NO_AUDIT_NOTES};
pub use use_cases::detect_framing::DetectFramingUseCase;
pub use use_cases::gather_workers::{GatherWorkersUseCase, WorkerContext};
pub use use_cases::judge_synthesis::{
    JudgeSynthesisUseCase, NO_VALID_RESPONSES, SYNTHESIS_ERROR,
};
pub use use_cases::route_experts::{
    RouteExpertsUseCase, RoutingDecision, RoutingFallback, select_experts,
};
pub use use_cases::run_turn::{CRITICAL_FAILURE, RunTurnError, RunTurnInput, RunTurnUseCase};
pub use use_cases::session_coordinator::{CoordinatorError, SessionCoordinator, TurnRequest};
