pub mod console;
pub mod engine;
pub mod error;
pub mod event;
pub mod replay;
pub mod session;

pub use console::TraceConsole;
pub use engine::{ArgumentAssembler, EventHandler, HandlerRegistry};
pub use error::EngineError;
pub use event::{
    EventKind, EventPayload, PlanStep, TraceArchive, TraceArchiveWriter, TraceEvent,
};
pub use replay::{ReplayController, ReplayOptions, ReplayPhase};
pub use session::{
    DisplayPolicy, Message, MessageRole, PanelContent, Plan, PlanKeyframe, RendererKind, RunStatus,
    SessionSnapshot, SessionStore, ToolCall, ToolResult,
};
