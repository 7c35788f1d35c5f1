use thiserror::Error;

use crate::event::EventKind;

/// Errors surfaced by the trace engine.
///
/// Normal event processing recovers from bad records locally (diagnostic
/// log, no-op); these variants cover contract violations and the archive
/// I/O boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A second handler claimed an event kind that is already registered.
    #[error("handler for `{0}` is already registered")]
    DuplicateHandler(EventKind),

    /// Replay was constructed over an empty event log.
    #[error("cannot play an empty event log")]
    EmptyLog,

    /// An event payload is missing or carries an invalid field.
    #[error("malformed `{kind}` event: {reason}")]
    MalformedEvent { kind: EventKind, reason: String },

    /// The archive file has no header line or a header in the wrong place.
    #[error("trace archive header error: {0}")]
    ArchiveHeader(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn malformed(kind: EventKind, reason: impl Into<String>) -> Self {
        EngineError::MalformedEvent {
            kind,
            reason: reason.into(),
        }
    }
}
