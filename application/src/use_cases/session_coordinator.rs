//! Session Coordinator
//!
//! Owns chat sessions and runs turns against them. Turns within one session
//! are serialized: a per-session async lock is held for the whole turn, so
//! each turn sees the completed history of the previous one. Turns in
//! different sessions run independently.

use crate::ports::llm_gateway::LlmGateway;
use crate::ports::observer::{CompositeObserver, TurnObserver};
use crate::ports::session_store::{SessionStore, StoreError};
use crate::use_cases::run_turn::{RunTurnError, RunTurnUseCase};
use consensus_domain::{ChatSession, ChatTurn, FileAttachment, UserPreferences};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Nothing to send: provide a prompt or an attachment")]
    EmptyRequest,

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error(transparent)]
    Turn(#[from] RunTurnError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// One user request
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub prompt: String,
    pub attachments: Vec<FileAttachment>,
}

impl TurnRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<FileAttachment>) -> Self {
        self.attachments = attachments;
        self
    }

    fn is_empty(&self) -> bool {
        self.prompt.trim().is_empty() && self.attachments.is_empty()
    }
}

struct SessionSlot {
    /// Held for the duration of a turn
    turn_lock: tokio::sync::Mutex<()>,
    /// Held across the deleted-check and the store write of one save
    save_lock: tokio::sync::Mutex<()>,
    deleted: AtomicBool,
    record: Mutex<ChatSession>,
}

impl SessionSlot {
    fn new(session: ChatSession) -> Arc<Self> {
        Arc::new(Self {
            turn_lock: tokio::sync::Mutex::new(()),
            save_lock: tokio::sync::Mutex::new(()),
            deleted: AtomicBool::new(false),
            record: Mutex::new(session),
        })
    }

    fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Stop all future saves and wait out one already in progress.
    async fn retire(&self) {
        self.deleted.store(true, Ordering::SeqCst);
        let _save = self.save_lock.lock().await;
    }

    fn record(&self) -> MutexGuard<'_, ChatSession> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct SessionCoordinator<G: LlmGateway + 'static, S: SessionStore + 'static> {
    run_turn: RunTurnUseCase<G>,
    store: Arc<S>,
    history_window: usize,
    sessions: Mutex<HashMap<String, Arc<SessionSlot>>>,
    preferences: Mutex<UserPreferences>,
}

impl<G: LlmGateway + 'static, S: SessionStore + 'static> SessionCoordinator<G, S> {
    pub fn new(run_turn: RunTurnUseCase<G>, store: Arc<S>, history_window: usize) -> Self {
        Self {
            run_turn,
            store,
            history_window,
            sessions: Mutex::new(HashMap::new()),
            preferences: Mutex::new(UserPreferences::default()),
        }
    }

    /// Load preferences and sessions from the store; returns the session count.
    pub async fn restore(&self) -> Result<usize, CoordinatorError> {
        if let Some(preferences) = self.store.load_preferences().await? {
            *self.preferences.lock().unwrap_or_else(PoisonError::into_inner) = preferences;
        }
        let loaded = self.store.load_sessions().await?;
        let count = loaded.len();
        let mut sessions = self.sessions();
        for session in loaded {
            sessions.insert(session.id().to_string(), SessionSlot::new(session));
        }
        info!("Restored {} sessions", count);
        Ok(count)
    }

    // ==================== Preferences ====================

    pub fn preferences(&self) -> UserPreferences {
        self.preferences
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn set_preferences(&self, preferences: UserPreferences) -> Result<(), CoordinatorError> {
        self.store.save_preferences(&preferences).await?;
        *self.preferences.lock().unwrap_or_else(PoisonError::into_inner) = preferences;
        Ok(())
    }

    // ==================== Sessions ====================

    /// Start an empty session; it is persisted with its first turn.
    pub fn create_session(&self) -> String {
        let session = ChatSession::new();
        let id = session.id().to_string();
        self.sessions().insert(id.clone(), SessionSlot::new(session));
        debug!("Created session {}", id);
        id
    }

    pub fn session(&self, id: &str) -> Option<ChatSession> {
        self.sessions().get(id).map(|slot| slot.record().clone())
    }

    /// Snapshots of every session, most recently updated first
    pub fn list_sessions(&self) -> Vec<ChatSession> {
        let mut sessions: Vec<ChatSession> = self
            .sessions()
            .values()
            .map(|slot| slot.record().clone())
            .collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.updated_at()));
        sessions
    }

    /// Remove a session. A turn still running in it keeps going but is
    /// never saved again.
    pub async fn delete_session(&self, id: &str) -> Result<bool, CoordinatorError> {
        let removed = self.sessions().remove(id);
        let known = removed.is_some();
        if let Some(slot) = removed {
            slot.retire().await;
        }
        let stored = self.store.delete_session(id).await?;
        Ok(known || stored)
    }

    pub async fn clear_sessions(&self) -> Result<(), CoordinatorError> {
        let removed: Vec<_> = self.sessions().drain().map(|(_, slot)| slot).collect();
        for slot in removed {
            slot.retire().await;
        }
        self.store.clear_sessions().await?;
        Ok(())
    }

    // ==================== Turns ====================

    /// Run one turn in `session_id`.
    ///
    /// The pending turn is appended to the session before the pipeline
    /// starts; every later snapshot replaces it, and the session is saved
    /// after each stage. Save failures are logged and never abort the turn.
    pub async fn submit(
        &self,
        session_id: &str,
        request: TurnRequest,
        observer: &dyn TurnObserver,
    ) -> Result<ChatTurn, CoordinatorError> {
        if request.is_empty() {
            return Err(CoordinatorError::EmptyRequest);
        }
        let slot = self
            .sessions()
            .get(session_id)
            .cloned()
            .ok_or_else(|| CoordinatorError::UnknownSession(session_id.to_string()))?;

        let _turn_guard = slot.turn_lock.lock().await;

        let turn = ChatTurn::new(request.prompt, request.attachments, Some(self.preferences()));
        let history = {
            let mut session = slot.record();
            let history = session.history(self.history_window);
            session.push_turn(turn.clone());
            history
        };
        debug!(
            "Session {}: turn {} with {} history entries",
            session_id,
            turn.id(),
            history.len()
        );

        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let persister = tokio::spawn(persist_sessions(
            Arc::clone(&self.store),
            Arc::clone(&slot),
            persist_rx,
        ));

        let outcome = {
            let mirror = SessionMirror {
                slot: Arc::clone(&slot),
                persist: persist_tx,
            };
            let observers = CompositeObserver::new(vec![&mirror, observer]);
            self.run_turn.execute_turn(turn, history, &observers).await
        };

        if let Err(e) = persister.await {
            warn!("Session persister stopped unexpectedly: {}", e);
        }
        Ok(outcome?)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<SessionSlot>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mirrors turn snapshots into the session record and queues saves.
struct SessionMirror {
    slot: Arc<SessionSlot>,
    persist: mpsc::UnboundedSender<ChatSession>,
}

impl SessionMirror {
    fn mirror(&self, turn: &ChatTurn) -> Option<ChatSession> {
        let mut session = self.slot.record();
        if !session.update_turn(turn) {
            warn!("Turn {} missing from session {}", turn.id(), session.id());
            return None;
        }
        Some(session.clone())
    }
}

impl TurnObserver for SessionMirror {
    fn on_stage_change(&self, turn: &ChatTurn) {
        if let Some(session) = self.mirror(turn)
            && self.persist.send(session).is_err()
        {
            warn!("Session persister is gone; skipping save");
        }
    }

    fn on_turn_updated(&self, turn: &ChatTurn) {
        self.mirror(turn);
    }
}

/// Save queued snapshots until the sender closes, collapsing bursts to the
/// newest snapshot. Nothing is written once the slot has been deleted.
async fn persist_sessions<S: SessionStore>(
    store: Arc<S>,
    slot: Arc<SessionSlot>,
    mut rx: mpsc::UnboundedReceiver<ChatSession>,
) {
    while let Some(mut session) = rx.recv().await {
        while let Ok(newer) = rx.try_recv() {
            session = newer;
        }
        let _save = slot.save_lock.lock().await;
        if slot.is_deleted() {
            debug!("Session {} was deleted; dropping snapshot", session.id());
            continue;
        }
        if let Err(e) = store.save_session(&session).await {
            warn!("Failed to save session {}: {}", session.id(), e);
        }
    }
}
