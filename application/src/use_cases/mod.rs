//! Use cases
//!
//! One use case per pipeline stage, plus the turn orchestrator and the
//! session coordinator built on top of it.

pub mod critic_audit;
pub mod detect_framing;
pub mod gather_workers;
pub mod judge_synthesis;
pub mod route_experts;
pub mod run_turn;
pub mod session_coordinator;

#[cfg(test)]
pub(crate) mod test_support;
