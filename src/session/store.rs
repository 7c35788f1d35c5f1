//! Per-session derived state and the isolation rule.
//!
//! All mutable state is partitioned by session id. Handlers never hold the
//! store directly; the registry hands them a [`SessionScope`] constructed
//! for the event's own session, so writing into a different session's state
//! is impossible by construction. Panel publication is further gated by the
//! [`DisplayPolicy`]: only the active session may publish in live mode, and
//! only the replay target while a replay controls the display.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::engine::ArgumentAssembler;
use crate::event::PlanStep;
use crate::session::model::{
    is_file_write_tool, Message, MessageRole, PanelContent, Plan, PlanKeyframe, RendererKind,
    RunStatus, ToolCall, ToolResult,
};

/// Which session, if any, may publish panel content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayPolicy {
    /// Live ingestion: the active session owns the panel.
    #[default]
    Live,
    /// A replay controller owns the display for one session.
    Replay { session_id: String },
}

/// Arguments recorded for an in-flight or completed call, kept for
/// correlation when the matching tool-result event arrives.
#[derive(Debug, Clone, Default)]
struct RecordedCall {
    name: String,
    arguments: Value,
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<Message>,
    tool_results: Vec<ToolResult>,
    plan: Plan,
    panel: Option<PanelContent>,
    status: RunStatus,
    assembler: ArgumentAssembler,
    recorded_calls: HashMap<String, RecordedCall>,
    next_message_seq: u64,
    next_result_seq: u64,
}

impl SessionState {
    fn next_message_id(&mut self) -> String {
        self.next_message_seq += 1;
        format!("msg-{}", self.next_message_seq)
    }

    fn next_result_id(&mut self) -> String {
        self.next_result_seq += 1;
        format!("result-{}", self.next_result_seq)
    }
}

/// Read-only projection of one session's derived state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: RunStatus,
    pub messages: Vec<Message>,
    pub tool_results: Vec<ToolResult>,
    pub plan: Plan,
    pub panel: Option<PanelContent>,
}

/// Holds every session's derived state; the only shared mutable resource
/// in the engine, reached exclusively through the dispatch path.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, SessionState>,
    active_session: Option<String>,
    policy: DisplayPolicy,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active_session(&mut self, session_id: Option<&str>) {
        self.active_session = session_id.map(str::to_string);
    }

    pub fn active_session(&self) -> Option<&str> {
        self.active_session.as_deref()
    }

    pub fn display_policy(&self) -> &DisplayPolicy {
        &self.policy
    }

    /// Hand display ownership to a replay of `session_id`.
    pub fn begin_replay_display(&mut self, session_id: &str) {
        self.policy = DisplayPolicy::Replay {
            session_id: session_id.to_string(),
        };
    }

    /// Return display ownership to live mode, if `session_id` still holds it.
    pub fn end_replay_display(&mut self, session_id: &str) {
        if matches!(&self.policy, DisplayPolicy::Replay { session_id: owner } if owner == session_id)
        {
            self.policy = DisplayPolicy::Live;
        }
    }

    fn panel_allowed(&self, session_id: &str) -> bool {
        match &self.policy {
            DisplayPolicy::Live => self.active_session.as_deref() == Some(session_id),
            DisplayPolicy::Replay { session_id: owner } => owner == session_id,
        }
    }

    /// Scope all mutation to one session; creates the session on first touch.
    pub(crate) fn scope_for(&mut self, session_id: &str) -> SessionScope<'_> {
        let panel_allowed = self.panel_allowed(session_id);
        let state = self.sessions.entry(session_id.to_string()).or_default();
        SessionScope {
            state,
            panel_allowed,
        }
    }

    /// Clear one session's derived state (creating the session if it was
    /// never touched); used before every replay rebuild.
    pub fn reset(&mut self, session_id: &str) {
        self.sessions
            .insert(session_id.to_string(), SessionState::default());
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    pub fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        let state = self.sessions.get(session_id)?;
        Some(SessionSnapshot {
            session_id: session_id.to_string(),
            status: state.status,
            messages: state.messages.clone(),
            tool_results: state.tool_results.clone(),
            plan: state.plan.clone(),
            panel: state.panel.clone(),
        })
    }

    /// Pre-select a generated artifact in the panel, subject to the display
    /// policy. Matches a tool result by call id, file path, or title.
    pub fn focus_artifact(&mut self, session_id: &str, target: &str) -> bool {
        if !self.panel_allowed(session_id) {
            return false;
        }
        let Some(state) = self.sessions.get_mut(session_id) else {
            return false;
        };
        let found = state.tool_results.iter().rev().find(|result| {
            result.tool_call_id == target
                || result.arguments.get("path").and_then(Value::as_str) == Some(target)
                || panel_title(result) == target
        });
        match found {
            Some(result) => {
                state.panel = Some(panel_for_result(result));
                true
            }
            None => {
                tracing::debug!(session_id, target, "focus target not found among tool results");
                false
            }
        }
    }
}

/// Mutable view of exactly one session's state, plus the panel permission
/// computed for the event being dispatched.
pub struct SessionScope<'a> {
    state: &'a mut SessionState,
    panel_allowed: bool,
}

impl SessionScope<'_> {
    pub fn panel_allowed(&self) -> bool {
        self.panel_allowed
    }

    // ------------------------------------------------------------------
    // Run lifecycle
    // ------------------------------------------------------------------

    pub fn apply_run_start(&mut self) {
        self.state.status = RunStatus::Running;
    }

    pub fn apply_run_end(&mut self, error: Option<&str>) {
        self.state.status = if error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    pub fn apply_user_message(&mut self, content: &str, message_id: Option<&str>, timestamp: u64) {
        let id = self.state.next_message_id();
        let mut message = Message::new(id, MessageRole::User, timestamp);
        message.content = content.to_string();
        message.message_id = message_id.map(str::to_string);
        self.state.messages.push(message);
    }

    pub fn apply_system_message(&mut self, content: &str, timestamp: u64) {
        let id = self.state.next_message_id();
        let mut message = Message::new(id, MessageRole::System, timestamp);
        message.content = content.to_string();
        self.state.messages.push(message);
    }

    /// Append a complete assistant message, or close the open streaming one
    /// it completes (located by `message_id`, else last-open-of-role).
    pub fn apply_assistant_message(
        &mut self,
        content: &str,
        message_id: Option<&str>,
        timestamp: u64,
    ) {
        self.complete_message(MessageRole::Assistant, false, content, message_id, timestamp);
    }

    pub fn apply_final_answer(&mut self, content: &str, message_id: Option<&str>, timestamp: u64) {
        self.complete_message(MessageRole::Assistant, true, content, message_id, timestamp);
    }

    fn complete_message(
        &mut self,
        role: MessageRole,
        is_final_answer: bool,
        content: &str,
        message_id: Option<&str>,
        timestamp: u64,
    ) {
        // A complete message merges only into the open stream it explicitly
        // names; without a message_id it always appends.
        let open = message_id.and_then(|mid| {
            self.state
                .messages
                .iter()
                .rposition(|m| m.message_id.as_deref() == Some(mid) && m.is_streaming)
        });
        match open {
            Some(index) => {
                let message = &mut self.state.messages[index];
                message.content = content.to_string();
                message.is_streaming = false;
            }
            None => {
                let id = self.state.next_message_id();
                let mut message = Message::new(id, role, timestamp);
                message.content = content.to_string();
                message.is_final_answer = is_final_answer;
                message.message_id = message_id.map(str::to_string);
                self.state.messages.push(message);
            }
        }
    }

    pub fn apply_streaming_message(
        &mut self,
        delta: &str,
        message_id: Option<&str>,
        is_final: bool,
        timestamp: u64,
    ) {
        self.append_streaming_delta(MessageRole::Assistant, false, delta, message_id, is_final, timestamp);
    }

    pub fn apply_streaming_final_answer(
        &mut self,
        delta: &str,
        message_id: Option<&str>,
        is_final: bool,
        timestamp: u64,
    ) {
        self.append_streaming_delta(MessageRole::Assistant, true, delta, message_id, is_final, timestamp);
    }

    pub fn apply_streaming_thinking(&mut self, delta: &str, message_id: Option<&str>, timestamp: u64) {
        let index = self.open_or_new_streaming(MessageRole::Assistant, false, message_id, timestamp);
        let message = &mut self.state.messages[index];
        message
            .thinking
            .get_or_insert_with(String::new)
            .push_str(delta);
    }

    fn append_streaming_delta(
        &mut self,
        role: MessageRole,
        is_final_answer: bool,
        delta: &str,
        message_id: Option<&str>,
        is_final: bool,
        timestamp: u64,
    ) {
        let index = self.open_or_new_streaming(role, is_final_answer, message_id, timestamp);
        let message = &mut self.state.messages[index];
        message.content.push_str(delta);
        if is_final {
            message.is_streaming = false;
        }
    }

    /// Locate the open message a delta belongs to. A supplied `message_id`
    /// is authoritative; without one, the most recent still-streaming
    /// message of the same role is the documented fallback.
    fn open_message_position(
        &self,
        role: MessageRole,
        is_final_answer: bool,
        message_id: Option<&str>,
    ) -> Option<usize> {
        match message_id {
            Some(mid) => self
                .state
                .messages
                .iter()
                .rposition(|m| m.message_id.as_deref() == Some(mid) && m.is_streaming),
            None => self.state.messages.iter().rposition(|m| {
                m.is_streaming && m.role == role && m.is_final_answer == is_final_answer
            }),
        }
    }

    fn open_or_new_streaming(
        &mut self,
        role: MessageRole,
        is_final_answer: bool,
        message_id: Option<&str>,
        timestamp: u64,
    ) -> usize {
        if let Some(index) = self.open_message_position(role, is_final_answer, message_id) {
            return index;
        }
        let id = self.state.next_message_id();
        let mut message = Message::new(id, role, timestamp);
        message.is_streaming = true;
        message.is_final_answer = is_final_answer;
        message.message_id = message_id.map(str::to_string);
        self.state.messages.push(message);
        self.state.messages.len() - 1
    }

    // ------------------------------------------------------------------
    // Tool calls and results
    // ------------------------------------------------------------------

    /// Record a fully-formed call for later correlation and attach it to
    /// the most recent assistant message (created closed if none exists).
    pub fn apply_tool_call(&mut self, tool_id: &str, name: &str, arguments: &Value, timestamp: u64) {
        self.state.recorded_calls.insert(
            tool_id.to_string(),
            RecordedCall {
                name: name.to_string(),
                arguments: arguments.clone(),
            },
        );

        let index = match self
            .state
            .messages
            .iter()
            .rposition(|m| m.role == MessageRole::Assistant)
        {
            Some(index) => index,
            None => {
                let id = self.state.next_message_id();
                self.state
                    .messages
                    .push(Message::new(id, MessageRole::Assistant, timestamp));
                self.state.messages.len() - 1
            }
        };
        let message = &mut self.state.messages[index];
        match message.tool_calls.iter_mut().find(|call| call.id == tool_id) {
            Some(call) => {
                call.name = name.to_string();
                call.arguments = arguments.clone();
            }
            None => message.tool_calls.push(ToolCall {
                id: tool_id.to_string(),
                name: name.to_string(),
                arguments: arguments.clone(),
            }),
        }
    }

    /// Feed one argument fragment through the assembler, then refine the
    /// call entry inside its owning streaming message. File-write tools
    /// mirror partial content into the panel for live preview.
    pub fn apply_tool_call_delta(
        &mut self,
        tool_id: &str,
        tool_name: Option<&str>,
        arguments_delta: &str,
        message_id: Option<&str>,
        timestamp: u64,
    ) {
        let parsed = self.state.assembler.append_delta(tool_id, arguments_delta);

        let recorded = self
            .state
            .recorded_calls
            .entry(tool_id.to_string())
            .or_default();
        if let Some(name) = tool_name {
            recorded.name = name.to_string();
        }
        if let Some(value) = &parsed {
            recorded.arguments = value.clone();
        }
        let call_name = recorded.name.clone();

        let index = self.open_or_new_streaming(MessageRole::Assistant, false, message_id, timestamp);
        let message = &mut self.state.messages[index];
        let position = match message.tool_calls.iter().position(|call| call.id == tool_id) {
            Some(position) => position,
            None => {
                message.tool_calls.push(ToolCall {
                    id: tool_id.to_string(),
                    name: call_name.clone(),
                    arguments: Value::Null,
                });
                message.tool_calls.len() - 1
            }
        };
        let call = &mut message.tool_calls[position];
        if !call_name.is_empty() {
            call.name = call_name.clone();
        }
        if let Some(value) = parsed.clone() {
            call.arguments = value;
        }

        if self.panel_allowed && is_file_write_tool(&call_name) {
            if let Some(arguments) = parsed {
                let source = arguments
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let title = arguments
                    .get("path")
                    .and_then(Value::as_str)
                    .unwrap_or(&call_name)
                    .to_string();
                self.state.panel = Some(PanelContent {
                    kind: RendererKind::File,
                    source,
                    title,
                    timestamp,
                    tool_call_id: Some(tool_id.to_string()),
                    arguments,
                    error: None,
                    extra: None,
                });
            }
        }
    }

    /// Create the result, attach it to its owning message (newest-first
    /// scan by call id), append it to the session list, and republish the
    /// panel subject to the isolation rule.
    pub fn apply_tool_result(
        &mut self,
        tool_id: &str,
        content: &str,
        error: Option<&str>,
        elapsed_ms: Option<u64>,
        timestamp: u64,
    ) {
        let finalized = self.state.assembler.finalize(tool_id);
        let recorded = self.state.recorded_calls.get(tool_id);

        let name = recorded
            .map(|call| call.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let arguments = finalized
            .or_else(|| recorded.map(|call| call.arguments.clone()))
            .unwrap_or(Value::Null);

        let result = ToolResult {
            id: self.state.next_result_id(),
            tool_call_id: tool_id.to_string(),
            name: name.clone(),
            content: content.to_string(),
            timestamp,
            error: error.map(str::to_string),
            renderer: RendererKind::for_tool(&name),
            arguments,
            elapsed_ms,
        };

        match self
            .state
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.tool_calls.iter().any(|call| call.id == tool_id))
        {
            Some(message) => message.tool_results.push(result.clone()),
            None => {
                tracing::debug!(tool_id, "tool result has no owning message; kept in session list only");
            }
        }

        if self.panel_allowed {
            self.republish_panel(&result);
        }

        self.state.tool_results.push(result);
    }

    /// A `browser_vision_control` frame refreshes an in-progress
    /// environment panel in place; everything else replaces the panel.
    fn republish_panel(&mut self, result: &ToolResult) {
        if result.name == "browser_vision_control" {
            if let Some(panel) = &mut self.state.panel {
                if panel.kind == RendererKind::Environment {
                    panel.source = result.content.clone();
                    panel.timestamp = result.timestamp;
                    return;
                }
            }
        }
        self.state.panel = Some(panel_for_result(result));
    }

    // ------------------------------------------------------------------
    // Plan
    // ------------------------------------------------------------------

    /// Reset the live plan view. The keyframe history is an audit trail
    /// independent of the live plan and survives the reset.
    pub fn apply_plan_start(&mut self) {
        let keyframes = std::mem::take(&mut self.state.plan.keyframes);
        self.state.plan = Plan {
            keyframes,
            ..Plan::default()
        };
    }

    pub fn apply_plan_update(&mut self, steps: &[PlanStep], timestamp: u64) {
        self.state.plan.steps = steps.to_vec();
        self.state.plan.has_generated_plan = true;
        self.push_keyframe(timestamp);
    }

    pub fn apply_plan_finish(&mut self, summary: Option<&str>, timestamp: u64) {
        self.state.plan.is_complete = true;
        self.state.plan.summary = summary.map(str::to_string);
        self.push_keyframe(timestamp);
    }

    fn push_keyframe(&mut self, timestamp: u64) {
        let plan = &mut self.state.plan;
        plan.keyframes.push(PlanKeyframe {
            timestamp,
            steps: plan.steps.clone(),
            is_complete: plan.is_complete,
            summary: plan.summary.clone(),
        });
    }

    // ------------------------------------------------------------------
    // Environment
    // ------------------------------------------------------------------

    pub fn apply_environment_input(
        &mut self,
        content: &str,
        screenshot: Option<&str>,
        timestamp: u64,
    ) {
        let id = self.state.next_message_id();
        let mut message = Message::new(id, MessageRole::Environment, timestamp);
        message.content = content.to_string();
        self.state.messages.push(message);

        if self.panel_allowed {
            if let Some(frame) = screenshot {
                self.state.panel = Some(PanelContent {
                    kind: RendererKind::Environment,
                    source: frame.to_string(),
                    title: "environment".to_string(),
                    timestamp,
                    tool_call_id: None,
                    arguments: Value::Null,
                    error: None,
                    extra: None,
                });
            }
        }
    }
}

fn panel_title(result: &ToolResult) -> String {
    result
        .arguments
        .get("path")
        .and_then(Value::as_str)
        .unwrap_or(&result.name)
        .to_string()
}

fn panel_for_result(result: &ToolResult) -> PanelContent {
    let source = if result.renderer == RendererKind::File {
        result
            .arguments
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| result.content.clone())
    } else {
        result.content.clone()
    };
    PanelContent {
        kind: result.renderer,
        source,
        title: panel_title(result),
        timestamp: result.timestamp,
        tool_call_id: Some(result.tool_call_id.clone()),
        arguments: result.arguments.clone(),
        error: result.error.clone(),
        extra: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn active_store(session: &str) -> SessionStore {
        let mut store = SessionStore::new();
        store.set_active_session(Some(session));
        store
    }

    #[test]
    fn streaming_message_closed_by_message_id() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_streaming_message("Hel", Some("m1"), false, 10);
        scope.apply_streaming_message("lo", Some("m1"), true, 11);

        let snap = store.snapshot("s1").unwrap();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].content, "Hello");
        assert!(!snap.messages[0].is_streaming);
    }

    #[test]
    fn streaming_fallback_targets_last_open_of_role() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_streaming_message("first", None, true, 10);
        scope.apply_streaming_message("sec", None, false, 11);
        scope.apply_streaming_message("ond", None, true, 12);

        let snap = store.snapshot("s1").unwrap();
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(snap.messages[0].content, "first");
        assert_eq!(snap.messages[1].content, "second");
    }

    #[test]
    fn unknown_message_id_opens_a_new_message() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_streaming_message("a", Some("m1"), false, 10);
        scope.apply_streaming_message("b", Some("m2"), false, 11);

        let snap = store.snapshot("s1").unwrap();
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(snap.messages[0].message_id.as_deref(), Some("m1"));
        assert_eq!(snap.messages[1].message_id.as_deref(), Some("m2"));
    }

    #[test]
    fn complete_assistant_message_closes_open_stream() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_streaming_message("partial...", Some("m1"), false, 10);
        scope.apply_assistant_message("full text", Some("m1"), 11);

        let snap = store.snapshot("s1").unwrap();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].content, "full text");
        assert!(!snap.messages[0].is_streaming);
    }

    #[test]
    fn thinking_deltas_accumulate_without_closing() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_streaming_thinking("hmm, ", None, 10);
        scope.apply_streaming_thinking("let me check", None, 11);
        scope.apply_streaming_message("answer", None, true, 12);

        let snap = store.snapshot("s1").unwrap();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].thinking.as_deref(), Some("hmm, let me check"));
        assert_eq!(snap.messages[0].content, "answer");
    }

    #[test]
    fn tool_result_attaches_newest_first() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_tool_call("call_1", "shell", &json!({"command": "ls"}), 10);
        scope.apply_assistant_message("next", None, 11);
        scope.apply_tool_call("call_2", "shell", &json!({"command": "pwd"}), 12);
        scope.apply_tool_result("call_1", "a.txt", None, Some(12), 13);

        let snap = store.snapshot("s1").unwrap();
        assert_eq!(snap.tool_results.len(), 1);
        let result = &snap.tool_results[0];
        assert_eq!(result.name, "shell");
        assert_eq!(result.arguments, json!({"command": "ls"}));
        assert_eq!(result.renderer, RendererKind::Terminal);

        // Attached to the first message (owner of call_1), not the second.
        assert_eq!(snap.messages[0].tool_results.len(), 1);
        assert!(snap.messages[1].tool_results.is_empty());
    }

    #[test]
    fn orphan_tool_result_kept_in_session_list() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_tool_result("ghost", "output", None, None, 10);

        let snap = store.snapshot("s1").unwrap();
        assert_eq!(snap.tool_results.len(), 1);
        assert_eq!(snap.tool_results[0].name, "unknown");
        assert!(snap.messages.is_empty());
    }

    #[test]
    fn file_write_delta_mirrors_panel_for_active_session() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_tool_call_delta(
            "call_1",
            Some("write_file"),
            r##"{"path":"note.md","content":"# dra"##,
            None,
            10,
        );

        let snap = store.snapshot("s1").unwrap();
        let panel = snap.panel.expect("live preview panel");
        assert_eq!(panel.kind, RendererKind::File);
        assert_eq!(panel.title, "note.md");
        assert_eq!(panel.source, "# dra");
    }

    #[test]
    fn panel_suppressed_for_inactive_session() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s2");

        scope.apply_tool_call_delta(
            "call_1",
            Some("write_file"),
            r#"{"path":"note.md","content":"x"}"#,
            None,
            10,
        );
        scope.apply_tool_result("call_1", "ok", None, None, 11);

        let snap = store.snapshot("s2").unwrap();
        assert!(snap.panel.is_none());
        // The transcript itself still records everything.
        assert_eq!(snap.tool_results.len(), 1);
    }

    #[test]
    fn vision_result_refreshes_environment_panel_in_place() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_environment_input("page loaded", Some("frame-0"), 10);
        scope.apply_tool_call("call_1", "browser_vision_control", &json!({"action": "look"}), 11);
        scope.apply_tool_result("call_1", "frame-1", None, None, 12);

        let snap = store.snapshot("s1").unwrap();
        let panel = snap.panel.expect("environment panel");
        assert_eq!(panel.kind, RendererKind::Environment);
        assert_eq!(panel.source, "frame-1");
        // Identity preserved: still the environment slot, not a fresh panel.
        assert_eq!(panel.title, "environment");
        assert!(panel.tool_call_id.is_none());
    }

    #[test]
    fn plan_lifecycle_and_keyframes() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_plan_start();
        scope.apply_plan_update(&[PlanStep { title: "step".into(), done: false }], 10);
        scope.apply_plan_update(&[PlanStep { title: "step".into(), done: true }], 11);
        scope.apply_plan_finish(Some("done"), 12);

        let snap = store.snapshot("s1").unwrap();
        assert!(snap.plan.is_complete);
        assert!(snap.plan.has_generated_plan);
        assert_eq!(snap.plan.summary.as_deref(), Some("done"));
        assert_eq!(snap.plan.keyframes.len(), 3);
        assert!(!snap.plan.keyframes[0].is_complete);
        assert!(snap.plan.keyframes[2].is_complete);
    }

    #[test]
    fn plan_start_preserves_keyframe_history() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");

        scope.apply_plan_update(&[PlanStep::default()], 10);
        scope.apply_plan_start();

        let snap = store.snapshot("s1").unwrap();
        assert!(snap.plan.steps.is_empty());
        assert!(!snap.plan.has_generated_plan);
        assert_eq!(snap.plan.keyframes.len(), 1);
    }

    #[test]
    fn reset_clears_derived_state_and_sequences() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");
        scope.apply_user_message("hi", None, 10);
        scope.apply_tool_result("ghost", "x", None, None, 11);

        store.reset("s1");
        let mut scope = store.scope_for("s1");
        scope.apply_user_message("hi again", None, 12);

        let snap = store.snapshot("s1").unwrap();
        assert_eq!(snap.messages.len(), 1);
        assert!(snap.tool_results.is_empty());
        // Sequence counters restart, so rebuilt ids are identical.
        assert_eq!(snap.messages[0].id, "msg-1");
    }

    #[test]
    fn focus_artifact_selects_by_path() {
        let mut store = active_store("s1");
        let mut scope = store.scope_for("s1");
        scope.apply_tool_call("call_1", "write_file", &json!({"path": "report.md", "content": "body"}), 10);
        scope.apply_tool_result("call_1", "written", None, None, 11);
        scope.apply_tool_call("call_2", "shell", &json!({"command": "ls"}), 12);
        scope.apply_tool_result("call_2", "a b c", None, None, 13);

        assert!(store.focus_artifact("s1", "report.md"));
        let panel = store.snapshot("s1").unwrap().panel.unwrap();
        assert_eq!(panel.title, "report.md");
        assert_eq!(panel.source, "body");

        assert!(!store.focus_artifact("s1", "missing.md"));
    }
}
