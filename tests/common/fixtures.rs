//! Event fixture builders.
//!
//! Thin constructors over the event taxonomy so tests read as scripts of
//! what the agent did, not as struct literals.

use serde_json::Value;

use tracedeck::event::{
    AssistantMessageEvent, EnvironmentInputEvent, EventPayload, FinalAnswerEvent, PlanFinishEvent,
    PlanStep, PlanUpdateEvent, RunEndEvent, RunStartEvent, StreamingFinalAnswerEvent,
    StreamingMessageEvent, StreamingThinkingEvent, SystemMessageEvent, ToolCallDeltaEvent,
    ToolCallEvent, ToolResultEvent, UserMessageEvent,
};
use tracedeck::TraceEvent;

pub fn ev(timestamp: u64, session: &str, payload: EventPayload) -> TraceEvent {
    TraceEvent::for_session(timestamp, session, payload)
}

pub fn run_start(ts: u64, session: &str) -> TraceEvent {
    ev(ts, session, EventPayload::RunStart(RunStartEvent::default()))
}

pub fn run_end(ts: u64, session: &str) -> TraceEvent {
    ev(ts, session, EventPayload::RunEnd(RunEndEvent::default()))
}

pub fn user(ts: u64, session: &str, text: &str) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::UserMessage(UserMessageEvent {
            content: text.to_string(),
            message_id: None,
        }),
    )
}

pub fn assistant(ts: u64, session: &str, text: &str) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::AssistantMessage(AssistantMessageEvent {
            content: text.to_string(),
            message_id: None,
        }),
    )
}

pub fn streaming(ts: u64, session: &str, delta: &str, message_id: &str, is_final: bool) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::AssistantStreamingMessage(StreamingMessageEvent {
            delta: delta.to_string(),
            message_id: Some(message_id.to_string()),
            is_final,
        }),
    )
}

pub fn thinking(ts: u64, session: &str, delta: &str) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::AssistantStreamingThinking(StreamingThinkingEvent {
            delta: delta.to_string(),
            message_id: None,
            is_final: false,
        }),
    )
}

pub fn system(ts: u64, session: &str, text: &str) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::SystemMessage(SystemMessageEvent {
            content: text.to_string(),
        }),
    )
}

pub fn environment(ts: u64, session: &str, text: &str, screenshot: Option<&str>) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::EnvironmentInput(EnvironmentInputEvent {
            content: text.to_string(),
            screenshot: screenshot.map(str::to_string),
        }),
    )
}

pub fn tool_call(ts: u64, session: &str, id: &str, name: &str, arguments: Value) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::ToolCall(ToolCallEvent {
            tool_id: id.to_string(),
            tool_name: name.to_string(),
            arguments,
        }),
    )
}

pub fn tool_delta(
    ts: u64,
    session: &str,
    id: &str,
    name: Option<&str>,
    delta: &str,
) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::StreamingToolCallDelta(ToolCallDeltaEvent {
            tool_id: id.to_string(),
            tool_name: name.map(str::to_string),
            arguments_delta: delta.to_string(),
            message_id: None,
        }),
    )
}

pub fn tool_result(ts: u64, session: &str, id: &str, content: &str) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::ToolResult(ToolResultEvent {
            tool_id: id.to_string(),
            content: content.to_string(),
            error: None,
            elapsed_ms: None,
        }),
    )
}

pub fn plan_update(ts: u64, session: &str, steps: &[(&str, bool)]) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::PlanUpdate(PlanUpdateEvent {
            steps: steps
                .iter()
                .map(|(title, done)| PlanStep {
                    title: title.to_string(),
                    done: *done,
                })
                .collect(),
        }),
    )
}

pub fn plan_finish(ts: u64, session: &str, summary: &str) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::PlanFinish(PlanFinishEvent {
            summary: Some(summary.to_string()),
        }),
    )
}

pub fn final_answer(ts: u64, session: &str, text: &str) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::FinalAnswer(FinalAnswerEvent {
            content: text.to_string(),
            message_id: None,
        }),
    )
}

pub fn final_answer_delta(ts: u64, session: &str, delta: &str, is_final: bool) -> TraceEvent {
    ev(
        ts,
        session,
        EventPayload::FinalAnswerStreaming(StreamingFinalAnswerEvent {
            delta: delta.to_string(),
            message_id: None,
            is_final,
        }),
    )
}

/// A representative ten-event session: run, streamed answer, a streamed
/// file write with result, plan updates, and a final answer.
pub fn scripted_session(session: &str) -> Vec<TraceEvent> {
    vec![
        run_start(100, session),
        user(110, session, "write me a note"),
        plan_update(120, session, &[("draft note", false)]),
        streaming(130, session, "Writing it ", "m1", false),
        streaming(140, session, "now.", "m1", true),
        tool_delta(150, session, "call_1", Some("write_file"), r#"{"path":"note.md","con"#),
        tool_delta(160, session, "call_1", None, r#"tent":"hello"}"#),
        tool_result(170, session, "call_1", "wrote note.md"),
        plan_finish(180, session, "note written"),
        final_answer(190, session, "Done: note.md"),
    ]
}
