//! Event-kind dispatch.
//!
//! One handler per event kind, registered up front. The registry is an
//! explicit object constructed per console (never a module-global), so
//! tests get isolated registries for free.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::event::{EventKind, TraceEvent};
use crate::session::{SessionScope, SessionStore};

/// Applies one event kind's effect to its session's state.
///
/// Handlers must be deterministic: the same event applied to the same
/// starting state produces the same resulting state. Anything else breaks
/// replay.
pub trait EventHandler: Send + Sync {
    /// The single event kind this handler claims.
    fn kind(&self) -> EventKind;

    /// Apply the event within the scope of its own session.
    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError>;
}

/// Maps each event kind to exactly one handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Box<dyn EventHandler>>,
}

impl HandlerRegistry {
    /// An empty registry; callers register their own handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the built-in handler for every kind.
    pub fn with_default_handlers() -> Self {
        let mut registry = Self::new();
        crate::engine::handlers::register_defaults(&mut registry)
            .expect("built-in handlers claim distinct kinds");
        registry
    }

    /// Register a handler. Two handlers claiming the same kind is a
    /// configuration error, never a silent override.
    pub fn register(&mut self, handler: Box<dyn EventHandler>) -> Result<(), EngineError> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(EngineError::DuplicateHandler(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Dispatch one event into the store, attributed to `session_id`.
    ///
    /// Returns whether a handler claimed the event. A handler failure is
    /// logged and degrades to a no-op for that single event, so one corrupt
    /// record never halts reconstruction of the rest of the log.
    pub fn dispatch(
        &self,
        event: &TraceEvent,
        session_id: &str,
        store: &mut SessionStore,
    ) -> bool {
        let kind = event.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            tracing::debug!(%kind, session_id, "no handler registered for event");
            return false;
        };

        let mut scope = store.scope_for(session_id);
        if let Err(err) = handler.apply(event, &mut scope) {
            tracing::warn!(%kind, session_id, error = %err, "handler failed; event skipped");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventPayload, UserMessageEvent};

    struct NoopHandler(EventKind);

    impl EventHandler for NoopHandler {
        fn kind(&self) -> EventKind {
            self.0
        }

        fn apply(&self, _: &TraceEvent, _: &mut SessionScope<'_>) -> Result<(), EngineError> {
            Ok(())
        }
    }

    struct FailingHandler;

    impl EventHandler for FailingHandler {
        fn kind(&self) -> EventKind {
            EventKind::UserMessage
        }

        fn apply(&self, event: &TraceEvent, _: &mut SessionScope<'_>) -> Result<(), EngineError> {
            Err(EngineError::malformed(event.kind(), "always fails"))
        }
    }

    fn user_event() -> TraceEvent {
        TraceEvent::new(
            1,
            EventPayload::UserMessage(UserMessageEvent {
                content: "hi".to_string(),
                message_id: None,
            }),
        )
    }

    #[test]
    fn duplicate_registration_is_a_configuration_error() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Box::new(NoopHandler(EventKind::RunStart)))
            .unwrap();

        let err = registry
            .register(Box::new(NoopHandler(EventKind::RunStart)))
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateHandler(EventKind::RunStart)));
    }

    #[test]
    fn unregistered_kind_is_reported_not_fatal() {
        let registry = HandlerRegistry::new();
        let mut store = SessionStore::new();
        assert!(!registry.dispatch(&user_event(), "s1", &mut store));
    }

    #[test]
    fn handler_failure_degrades_to_noop() {
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(FailingHandler)).unwrap();
        let mut store = SessionStore::new();

        assert!(registry.dispatch(&user_event(), "s1", &mut store));
        assert!(store.snapshot("s1").unwrap().messages.is_empty());
    }

    #[test]
    fn default_registry_covers_every_kind() {
        let registry = HandlerRegistry::with_default_handlers();
        for kind in [
            EventKind::RunStart,
            EventKind::RunEnd,
            EventKind::UserMessage,
            EventKind::AssistantMessage,
            EventKind::AssistantStreamingMessage,
            EventKind::AssistantStreamingThinking,
            EventKind::ToolCall,
            EventKind::StreamingToolCallDelta,
            EventKind::ToolResult,
            EventKind::PlanStart,
            EventKind::PlanUpdate,
            EventKind::PlanFinish,
            EventKind::SystemMessage,
            EventKind::EnvironmentInput,
            EventKind::FinalAnswer,
            EventKind::FinalAnswerStreaming,
        ] {
            assert!(registry.is_registered(kind), "missing handler for {kind}");
        }
    }
}
