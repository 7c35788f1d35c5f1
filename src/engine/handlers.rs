//! Built-in handlers, one per event kind.
//!
//! Each handler unpacks its payload and delegates to the matching store
//! operation. A payload that does not match the registered kind is a
//! malformed event; the registry logs it and moves on.

use crate::engine::registry::{EventHandler, HandlerRegistry};
use crate::error::EngineError;
use crate::event::{EventKind, EventPayload, TraceEvent};
use crate::session::SessionScope;

macro_rules! expect_payload {
    ($event:expr, $variant:ident) => {
        match &$event.payload {
            EventPayload::$variant(payload) => payload,
            _ => {
                return Err(EngineError::malformed(
                    $event.kind(),
                    "payload does not match registered kind",
                ))
            }
        }
    };
}

pub(crate) struct RunStartHandler;

impl EventHandler for RunStartHandler {
    fn kind(&self) -> EventKind {
        EventKind::RunStart
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        expect_payload!(event, RunStart);
        scope.apply_run_start();
        Ok(())
    }
}

pub(crate) struct RunEndHandler;

impl EventHandler for RunEndHandler {
    fn kind(&self) -> EventKind {
        EventKind::RunEnd
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, RunEnd);
        scope.apply_run_end(payload.error.as_deref());
        Ok(())
    }
}

pub(crate) struct UserMessageHandler;

impl EventHandler for UserMessageHandler {
    fn kind(&self) -> EventKind {
        EventKind::UserMessage
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, UserMessage);
        scope.apply_user_message(&payload.content, payload.message_id.as_deref(), event.timestamp);
        Ok(())
    }
}

pub(crate) struct AssistantMessageHandler;

impl EventHandler for AssistantMessageHandler {
    fn kind(&self) -> EventKind {
        EventKind::AssistantMessage
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, AssistantMessage);
        scope.apply_assistant_message(
            &payload.content,
            payload.message_id.as_deref(),
            event.timestamp,
        );
        Ok(())
    }
}

pub(crate) struct StreamingMessageHandler;

impl EventHandler for StreamingMessageHandler {
    fn kind(&self) -> EventKind {
        EventKind::AssistantStreamingMessage
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, AssistantStreamingMessage);
        scope.apply_streaming_message(
            &payload.delta,
            payload.message_id.as_deref(),
            payload.is_final,
            event.timestamp,
        );
        Ok(())
    }
}

pub(crate) struct StreamingThinkingHandler;

impl EventHandler for StreamingThinkingHandler {
    fn kind(&self) -> EventKind {
        EventKind::AssistantStreamingThinking
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, AssistantStreamingThinking);
        scope.apply_streaming_thinking(
            &payload.delta,
            payload.message_id.as_deref(),
            event.timestamp,
        );
        Ok(())
    }
}

pub(crate) struct ToolCallHandler;

impl EventHandler for ToolCallHandler {
    fn kind(&self) -> EventKind {
        EventKind::ToolCall
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, ToolCall);
        if payload.tool_id.is_empty() {
            return Err(EngineError::malformed(event.kind(), "empty tool_id"));
        }
        scope.apply_tool_call(
            &payload.tool_id,
            &payload.tool_name,
            &payload.arguments,
            event.timestamp,
        );
        Ok(())
    }
}

pub(crate) struct ToolCallDeltaHandler;

impl EventHandler for ToolCallDeltaHandler {
    fn kind(&self) -> EventKind {
        EventKind::StreamingToolCallDelta
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, StreamingToolCallDelta);
        if payload.tool_id.is_empty() {
            return Err(EngineError::malformed(event.kind(), "empty tool_id"));
        }
        scope.apply_tool_call_delta(
            &payload.tool_id,
            payload.tool_name.as_deref(),
            &payload.arguments_delta,
            payload.message_id.as_deref(),
            event.timestamp,
        );
        Ok(())
    }
}

pub(crate) struct ToolResultHandler;

impl EventHandler for ToolResultHandler {
    fn kind(&self) -> EventKind {
        EventKind::ToolResult
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, ToolResult);
        if payload.tool_id.is_empty() {
            return Err(EngineError::malformed(event.kind(), "empty tool_id"));
        }
        scope.apply_tool_result(
            &payload.tool_id,
            &payload.content,
            payload.error.as_deref(),
            payload.elapsed_ms,
            event.timestamp,
        );
        Ok(())
    }
}

pub(crate) struct PlanStartHandler;

impl EventHandler for PlanStartHandler {
    fn kind(&self) -> EventKind {
        EventKind::PlanStart
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        if !matches!(event.payload, EventPayload::PlanStart) {
            return Err(EngineError::malformed(
                event.kind(),
                "payload does not match registered kind",
            ));
        }
        scope.apply_plan_start();
        Ok(())
    }
}

pub(crate) struct PlanUpdateHandler;

impl EventHandler for PlanUpdateHandler {
    fn kind(&self) -> EventKind {
        EventKind::PlanUpdate
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, PlanUpdate);
        scope.apply_plan_update(&payload.steps, event.timestamp);
        Ok(())
    }
}

pub(crate) struct PlanFinishHandler;

impl EventHandler for PlanFinishHandler {
    fn kind(&self) -> EventKind {
        EventKind::PlanFinish
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, PlanFinish);
        scope.apply_plan_finish(payload.summary.as_deref(), event.timestamp);
        Ok(())
    }
}

pub(crate) struct SystemMessageHandler;

impl EventHandler for SystemMessageHandler {
    fn kind(&self) -> EventKind {
        EventKind::SystemMessage
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, SystemMessage);
        scope.apply_system_message(&payload.content, event.timestamp);
        Ok(())
    }
}

pub(crate) struct EnvironmentInputHandler;

impl EventHandler for EnvironmentInputHandler {
    fn kind(&self) -> EventKind {
        EventKind::EnvironmentInput
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, EnvironmentInput);
        scope.apply_environment_input(
            &payload.content,
            payload.screenshot.as_deref(),
            event.timestamp,
        );
        Ok(())
    }
}

pub(crate) struct FinalAnswerHandler;

impl EventHandler for FinalAnswerHandler {
    fn kind(&self) -> EventKind {
        EventKind::FinalAnswer
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, FinalAnswer);
        scope.apply_final_answer(&payload.content, payload.message_id.as_deref(), event.timestamp);
        Ok(())
    }
}

pub(crate) struct StreamingFinalAnswerHandler;

impl EventHandler for StreamingFinalAnswerHandler {
    fn kind(&self) -> EventKind {
        EventKind::FinalAnswerStreaming
    }

    fn apply(&self, event: &TraceEvent, scope: &mut SessionScope<'_>) -> Result<(), EngineError> {
        let payload = expect_payload!(event, FinalAnswerStreaming);
        scope.apply_streaming_final_answer(
            &payload.delta,
            payload.message_id.as_deref(),
            payload.is_final,
            event.timestamp,
        );
        Ok(())
    }
}

/// Register the built-in handler for every event kind.
pub fn register_defaults(registry: &mut HandlerRegistry) -> Result<(), EngineError> {
    let handlers: Vec<Box<dyn EventHandler>> = vec![
        Box::new(RunStartHandler),
        Box::new(RunEndHandler),
        Box::new(UserMessageHandler),
        Box::new(AssistantMessageHandler),
        Box::new(StreamingMessageHandler),
        Box::new(StreamingThinkingHandler),
        Box::new(ToolCallHandler),
        Box::new(ToolCallDeltaHandler),
        Box::new(ToolResultHandler),
        Box::new(PlanStartHandler),
        Box::new(PlanUpdateHandler),
        Box::new(PlanFinishHandler),
        Box::new(SystemMessageHandler),
        Box::new(EnvironmentInputHandler),
        Box::new(FinalAnswerHandler),
        Box::new(StreamingFinalAnswerHandler),
    ];
    for handler in handlers {
        registry.register(handler)?;
    }
    Ok(())
}
