//! Typed agent trace events.
//!
//! The closed set of event kinds a console session is derived from. Events
//! are immutable once appended and totally ordered per session; the engine
//! never mutates or reorders them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single record in a session's append-only event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Milliseconds since the Unix epoch; non-decreasing within a session
    /// (same-tick events may share a timestamp).
    pub timestamp: u64,

    /// Owning session. Live sources may omit it for single-session feeds;
    /// replay always stamps its own session id at dispatch time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(flatten)]
    pub payload: EventPayload,
}

impl TraceEvent {
    pub fn new(timestamp: u64, payload: EventPayload) -> Self {
        Self {
            timestamp,
            session_id: None,
            payload,
        }
    }

    pub fn for_session(
        timestamp: u64,
        session_id: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            timestamp,
            session_id: Some(session_id.into()),
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// Payload of a [`TraceEvent`], tagged by the wire-level `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventPayload {
    /// Agent run began for this session.
    RunStart(RunStartEvent),

    /// Agent run finished (successfully or not).
    RunEnd(RunEndEvent),

    /// Complete user message.
    UserMessage(UserMessageEvent),

    /// Complete assistant message.
    AssistantMessage(AssistantMessageEvent),

    /// Incremental fragment of an assistant message.
    AssistantStreamingMessage(StreamingMessageEvent),

    /// Incremental fragment of assistant reasoning.
    AssistantStreamingThinking(StreamingThinkingEvent),

    /// Tool call with fully-formed arguments.
    ToolCall(ToolCallEvent),

    /// Incremental fragment of an in-flight tool call's JSON arguments.
    StreamingToolCallDelta(ToolCallDeltaEvent),

    /// Outcome of a completed tool call.
    ToolResult(ToolResultEvent),

    /// Plan generation began; the previous plan view is discarded.
    PlanStart,

    /// Plan steps replaced with a new revision.
    PlanUpdate(PlanUpdateEvent),

    /// Plan completed with an optional summary.
    PlanFinish(PlanFinishEvent),

    /// Message injected by the harness rather than either party.
    SystemMessage(SystemMessageEvent),

    /// Input pushed by the environment (e.g. a browser frame).
    EnvironmentInput(EnvironmentInputEvent),

    /// Complete final answer.
    FinalAnswer(FinalAnswerEvent),

    /// Incremental fragment of the final answer.
    FinalAnswerStreaming(StreamingFinalAnswerEvent),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::RunStart(_) => EventKind::RunStart,
            EventPayload::RunEnd(_) => EventKind::RunEnd,
            EventPayload::UserMessage(_) => EventKind::UserMessage,
            EventPayload::AssistantMessage(_) => EventKind::AssistantMessage,
            EventPayload::AssistantStreamingMessage(_) => EventKind::AssistantStreamingMessage,
            EventPayload::AssistantStreamingThinking(_) => EventKind::AssistantStreamingThinking,
            EventPayload::ToolCall(_) => EventKind::ToolCall,
            EventPayload::StreamingToolCallDelta(_) => EventKind::StreamingToolCallDelta,
            EventPayload::ToolResult(_) => EventKind::ToolResult,
            EventPayload::PlanStart => EventKind::PlanStart,
            EventPayload::PlanUpdate(_) => EventKind::PlanUpdate,
            EventPayload::PlanFinish(_) => EventKind::PlanFinish,
            EventPayload::SystemMessage(_) => EventKind::SystemMessage,
            EventPayload::EnvironmentInput(_) => EventKind::EnvironmentInput,
            EventPayload::FinalAnswer(_) => EventKind::FinalAnswer,
            EventPayload::FinalAnswerStreaming(_) => EventKind::FinalAnswerStreaming,
        }
    }
}

/// Discriminant of [`EventPayload`], used for registry keying and
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    RunStart,
    RunEnd,
    UserMessage,
    AssistantMessage,
    AssistantStreamingMessage,
    AssistantStreamingThinking,
    ToolCall,
    StreamingToolCallDelta,
    ToolResult,
    PlanStart,
    PlanUpdate,
    PlanFinish,
    SystemMessage,
    EnvironmentInput,
    FinalAnswer,
    FinalAnswerStreaming,
}

impl EventKind {
    /// The wire-level tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RunStart => "run-start",
            EventKind::RunEnd => "run-end",
            EventKind::UserMessage => "user-message",
            EventKind::AssistantMessage => "assistant-message",
            EventKind::AssistantStreamingMessage => "assistant-streaming-message",
            EventKind::AssistantStreamingThinking => "assistant-streaming-thinking",
            EventKind::ToolCall => "tool-call",
            EventKind::StreamingToolCallDelta => "streaming-tool-call-delta",
            EventKind::ToolResult => "tool-result",
            EventKind::PlanStart => "plan-start",
            EventKind::PlanUpdate => "plan-update",
            EventKind::PlanFinish => "plan-finish",
            EventKind::SystemMessage => "system-message",
            EventKind::EnvironmentInput => "environment-input",
            EventKind::FinalAnswer => "final-answer",
            EventKind::FinalAnswerStreaming => "final-answer-streaming",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStartEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunEndEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessageEvent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessageEvent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingMessageEvent {
    pub delta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Closes the open message this delta lands in.
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingThinkingEvent {
    pub delta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallEvent {
    pub tool_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDeltaEvent {
    pub tool_id: String,
    /// Usually present only on the first delta of a call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub arguments_delta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultEvent {
    pub tool_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

/// A single step of the agent's plan, as delivered by plan-update events
/// and mirrored into derived plan state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanUpdateEvent {
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanFinishEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMessageEvent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentInputEvent {
    #[serde(default)]
    pub content: String,
    /// Rendered frame for the environment panel, when the input carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswerEvent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingFinalAnswerEvent {
    pub delta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub is_final: bool,
}
