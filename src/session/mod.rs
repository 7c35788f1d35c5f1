pub mod model;
pub mod store;

pub use model::{
    is_file_write_tool, Message, MessageRole, PanelContent, Plan, PlanKeyframe, RendererKind,
    RunStatus, ToolCall, ToolResult,
};
pub use store::{DisplayPolicy, SessionScope, SessionSnapshot, SessionStore};
