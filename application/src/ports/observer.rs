//! Turn observer port
//!
//! Callbacks through which the pipeline reports progress. Implementations
//! live in the presentation layer (progress bars, streaming output) or wrap
//! other observers (session mirroring). The core makes no assumption about
//! how snapshots are rendered.

use consensus_domain::{ChatTurn, ExpertProfile, WorkerResult};

/// Callback for progress updates during a turn
///
/// All methods default to no-ops; every snapshot passed in is an owned
/// clone, safe to keep.
pub trait TurnObserver: Send + Sync {
    /// Stage transition, called before the next stage starts
    fn on_stage_change(&self, _turn: &ChatTurn) {}

    /// Routing finished
    fn on_experts_selected(&self, _experts: &[ExpertProfile]) {}

    /// One worker settled; full ordered result list
    fn on_worker_update(&self, _results: &[WorkerResult]) {}

    /// One synthesis fragment, in stream order
    fn on_synthesis_chunk(&self, _chunk: &str) {}

    /// Any change to the turn record (for persistence)
    fn on_turn_updated(&self, _turn: &ChatTurn) {}

    fn on_complete(&self, _turn: &ChatTurn) {}

    /// Turn reached the error stage
    fn on_error(&self, _turn: &ChatTurn, _message: &str) {}
}

/// No-op observer
pub struct NoObserver;

impl TurnObserver for NoObserver {}

/// Fans every callback out to several observers, in order.
pub struct CompositeObserver<'a> {
    observers: Vec<&'a dyn TurnObserver>,
}

impl<'a> CompositeObserver<'a> {
    pub fn new(observers: Vec<&'a dyn TurnObserver>) -> Self {
        Self { observers }
    }
}

impl TurnObserver for CompositeObserver<'_> {
    fn on_stage_change(&self, turn: &ChatTurn) {
        self.observers.iter().for_each(|o| o.on_stage_change(turn));
    }

    fn on_experts_selected(&self, experts: &[ExpertProfile]) {
        self.observers.iter().for_each(|o| o.on_experts_selected(experts));
    }

    fn on_worker_update(&self, results: &[WorkerResult]) {
        self.observers.iter().for_each(|o| o.on_worker_update(results));
    }

    fn on_synthesis_chunk(&self, chunk: &str) {
        self.observers.iter().for_each(|o| o.on_synthesis_chunk(chunk));
    }

    fn on_turn_updated(&self, turn: &ChatTurn) {
        self.observers.iter().for_each(|o| o.on_turn_updated(turn));
    }

    fn on_complete(&self, turn: &ChatTurn) {
        self.observers.iter().for_each(|o| o.on_complete(turn));
    }

    fn on_error(&self, turn: &ChatTurn, message: &str) {
        self.observers.iter().for_each(|o| o.on_error(turn, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl TurnObserver for Recorder {
        fn on_synthesis_chunk(&self, chunk: &str) {
            self.0.lock().unwrap().push(chunk.to_string());
        }
    }

    #[test]
    fn test_composite_fans_out() {
        let a = Recorder::default();
        let b = Recorder::default();
        let composite = CompositeObserver::new(vec![&a, &b, &NoObserver]);
        composite.on_synthesis_chunk("x");
        assert_eq!(*a.0.lock().unwrap(), vec!["x"]);
        assert_eq!(*b.0.lock().unwrap(), vec!["x"]);
    }
}
