//! Derived session state types.
//!
//! Everything a console renders for one session: the message transcript,
//! tool results, the live plan with its keyframe history, and the single
//! panel artifact slot. These are projections of the event log — consumers
//! read them through [`SessionSnapshot`](crate::session::SessionSnapshot)
//! and never mutate them directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::PlanStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Environment,
}

/// One entry in a session's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Engine-assigned id, a deterministic per-session sequence number.
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: u64,

    /// Accumulated reasoning text, when the agent streams any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,

    /// Open messages accept further deltas; a completing delta closes them.
    pub is_streaming: bool,

    #[serde(default)]
    pub is_final_answer: bool,

    /// Upstream message id, when the transport supplied one. Closure is
    /// matched on this whenever present; the last-open-of-role heuristic is
    /// the documented fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl Message {
    pub(crate) fn new(id: String, role: MessageRole, timestamp: u64) -> Self {
        Self {
            id,
            role,
            content: String::new(),
            timestamp,
            thinking: None,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            is_streaming: false,
            is_final_answer: false,
            message_id: None,
        }
    }
}

/// A tool invocation as displayed inside its owning message.
///
/// `arguments` refines monotonically while deltas stream in; a failed
/// partial parse never rolls back the last good value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// How the console should render a tool result or panel artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    File,
    Terminal,
    Browser,
    Environment,
    Search,
    Text,
}

impl RendererKind {
    /// Classify a tool by name.
    pub fn for_tool(name: &str) -> Self {
        if is_file_write_tool(name) || matches!(name, "read_file" | "list_files") {
            RendererKind::File
        } else if matches!(name, "shell" | "run_command" | "bash") {
            RendererKind::Terminal
        } else if name == "browser_vision_control" {
            RendererKind::Environment
        } else if name.starts_with("browser_") {
            RendererKind::Browser
        } else if matches!(name, "search" | "web_search" | "grep") {
            RendererKind::Search
        } else {
            RendererKind::Text
        }
    }
}

/// Tools whose streamed arguments carry file content worth previewing live.
pub fn is_file_write_tool(name: &str) -> bool {
    matches!(name, "write_file" | "create_file" | "append_file" | "edit_file")
}

/// Outcome of one completed tool call; exactly one per tool-result event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Engine-assigned id, a deterministic per-session sequence number.
    pub id: String,
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub renderer: RendererKind,
    /// Declared arguments of the matching call, carried for rendering.
    #[serde(default)]
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

/// Live plan view plus its append-only keyframe history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub has_generated_plan: bool,
    /// Snapshot per plan-update/plan-finish; appended, never overwritten.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyframes: Vec<PlanKeyframe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanKeyframe {
    pub timestamp: u64,
    pub steps: Vec<PlanStep>,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// The "currently displayed artifact" slot; at most one per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelContent {
    pub kind: RendererKind,
    pub source: String,
    pub title: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Run lifecycle for one session, driven by run-start/run-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_classification() {
        assert_eq!(RendererKind::for_tool("write_file"), RendererKind::File);
        assert_eq!(RendererKind::for_tool("shell"), RendererKind::Terminal);
        assert_eq!(
            RendererKind::for_tool("browser_vision_control"),
            RendererKind::Environment
        );
        assert_eq!(RendererKind::for_tool("browser_click"), RendererKind::Browser);
        assert_eq!(RendererKind::for_tool("web_search"), RendererKind::Search);
        assert_eq!(RendererKind::for_tool("made_up_tool"), RendererKind::Text);
    }

    #[test]
    fn file_write_tools() {
        assert!(is_file_write_tool("write_file"));
        assert!(is_file_write_tool("edit_file"));
        assert!(!is_file_write_tool("read_file"));
        assert!(!is_file_write_tool("shell"));
    }
}
