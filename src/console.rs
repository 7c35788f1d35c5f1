//! Console facade: live ingestion, session switching, and replay entry.
//!
//! Owns the handler registry and the session store, and routes every event
//! through the dispatch path — nothing mutates session state around it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::HandlerRegistry;
use crate::error::EngineError;
use crate::event::TraceEvent;
use crate::replay::{ReplayController, ReplayOptions};
use crate::session::{SessionSnapshot, SessionStore};

pub struct TraceConsole {
    store: Arc<Mutex<SessionStore>>,
    registry: Arc<HandlerRegistry>,
    replay: Mutex<Option<ReplayController>>,
}

impl TraceConsole {
    /// A console with the built-in handler set.
    pub fn new() -> Self {
        Self::with_registry(HandlerRegistry::with_default_handlers())
    }

    /// A console with a caller-assembled registry (e.g. extra handlers in
    /// front of the built-ins, or a reduced set for tests).
    pub fn with_registry(registry: HandlerRegistry) -> Self {
        Self {
            store: Arc::new(Mutex::new(SessionStore::new())),
            registry: Arc::new(registry),
            replay: Mutex::new(None),
        }
    }

    /// Ingest one live event.
    ///
    /// Events carrying no session id are attributed to the active session;
    /// with no active session either, the event is dropped with a
    /// diagnostic. Returns whether a handler claimed the event.
    pub fn ingest(&self, event: &TraceEvent) -> bool {
        let session_id = match &event.session_id {
            Some(session_id) => session_id.clone(),
            None => match self.store.lock().active_session() {
                Some(active) => active.to_string(),
                None => {
                    tracing::debug!(
                        kind = %event.kind(),
                        "event names no session and none is active; dropped"
                    );
                    return false;
                }
            },
        };

        let mut store = self.store.lock();
        self.registry.dispatch(event, &session_id, &mut store)
    }

    /// Ingest an ordered batch; returns how many events a handler claimed.
    pub fn ingest_all<'a>(&self, events: impl IntoIterator<Item = &'a TraceEvent>) -> usize {
        events.into_iter().filter(|event| self.ingest(event)).count()
    }

    /// Switch the console to another session (or none). An engaged replay
    /// owns the display, so it is exited first.
    pub fn set_active_session(&self, session_id: Option<&str>) {
        if let Some(controller) = self.replay.lock().take() {
            controller.exit();
        }
        self.store.lock().set_active_session(session_id);
    }

    pub fn active_session(&self) -> Option<String> {
        self.store.lock().active_session().map(str::to_string)
    }

    /// Read-only projection of one session's derived state.
    pub fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.store.lock().snapshot(session_id)
    }

    /// Clear one session's derived state.
    pub fn reset_session(&self, session_id: &str) {
        self.store.lock().reset(session_id);
    }

    /// Enter replay over a complete ordered log. Any previously engaged
    /// replay is exited; the returned controller is also retained so a
    /// later session switch can tear it down.
    pub fn begin_replay(
        &self,
        events: Vec<TraceEvent>,
        session_id: &str,
        options: ReplayOptions,
    ) -> Result<ReplayController, EngineError> {
        if let Some(previous) = self.replay.lock().take() {
            previous.exit();
        }

        let controller = ReplayController::new(
            events,
            session_id,
            self.store.clone(),
            self.registry.clone(),
        )?;
        controller.engage(&options);
        *self.replay.lock() = Some(controller.clone());
        Ok(controller)
    }

    /// Exit any engaged replay and return the display to live mode.
    pub fn end_replay(&self) {
        if let Some(controller) = self.replay.lock().take() {
            controller.exit();
        }
    }

    pub fn replay_engaged(&self) -> bool {
        self.replay.lock().is_some()
    }
}

impl Default for TraceConsole {
    fn default() -> Self {
        Self::new()
    }
}
