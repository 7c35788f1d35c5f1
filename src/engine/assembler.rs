//! Streaming tool-call argument assembly.
//!
//! Transports deliver large JSON argument payloads as UTF-8 fragments keyed
//! by tool call id. The assembler accumulates fragments per call and keeps
//! the most recent successful parse; unparseable intermediate states are
//! expected and never abort processing.

use std::collections::HashMap;

use serde_json::Value;

#[derive(Debug, Default)]
struct ArgumentSlot {
    buffer: String,
    parsed: Option<Value>,
}

/// Reconstructs tool-call arguments from incremental JSON fragments.
///
/// One accumulator per in-flight call, evicted on [`finalize`] — memory is
/// bounded by the number of in-flight calls, not by session length.
/// Interleaved calls are independent; completion order does not have to
/// match the order of first appearance.
///
/// [`finalize`]: ArgumentAssembler::finalize
#[derive(Debug, Default)]
pub struct ArgumentAssembler {
    slots: HashMap<String, ArgumentSlot>,
}

impl ArgumentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and re-parse the accumulated text.
    ///
    /// Returns the newly parsed arguments, or `None` when the accumulated
    /// text does not yet parse — the caller keeps the last good value.
    pub fn append_delta(&mut self, tool_call_id: &str, delta: &str) -> Option<Value> {
        let slot = self.slots.entry(tool_call_id.to_string()).or_default();
        slot.buffer.push_str(delta);

        match parse_relaxed(&slot.buffer) {
            Some(value) => {
                slot.parsed = Some(value.clone());
                Some(value)
            }
            None => {
                tracing::trace!(
                    tool_call_id,
                    buffered = slot.buffer.len(),
                    "arguments not yet parseable"
                );
                None
            }
        }
    }

    /// Most recent successful parse for an in-flight call.
    pub fn last_parsed(&self, tool_call_id: &str) -> Option<&Value> {
        self.slots.get(tool_call_id).and_then(|slot| slot.parsed.as_ref())
    }

    /// Mark a call complete and evict its accumulator.
    ///
    /// Prefers a strict parse of the full accumulated text over the last
    /// relaxed parse; the final fragment usually completes the JSON.
    pub fn finalize(&mut self, tool_call_id: &str) -> Option<Value> {
        let slot = self.slots.remove(tool_call_id)?;
        serde_json::from_str(&slot.buffer).ok().or(slot.parsed)
    }

    /// Number of in-flight accumulators.
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }
}

/// Parse accumulated text, falling back to a best-effort repair.
///
/// Attempts in order: strict parse, repaired parse, repaired parse with a
/// closing quote appended (a fragment ending mid-string is the common
/// case). `None` means "no update"; this never panics.
fn parse_relaxed(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    if let Ok(value) = serde_json::from_str(&repair_json(text)) {
        return Some(value);
    }
    let mut patched = String::with_capacity(text.len() + 1);
    patched.push_str(text);
    patched.push('"');
    serde_json::from_str(&repair_json(&patched)).ok()
}

/// Balance quotes and brackets in truncated JSON.
fn repair_json(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut repaired = text.to_string();
    if in_string {
        if escaped {
            // Fragment ended on a bare backslash; it cannot be closed as-is.
            repaired.pop();
        }
        repaired.push('"');
    }

    // Truncation can leave a dangling separator just before the close.
    let trimmed_len = repaired.trim_end().len();
    repaired.truncate(trimmed_len);
    if repaired.ends_with(',') {
        repaired.pop();
    } else if repaired.ends_with(':') {
        repaired.push_str("null");
    }

    for close in stack.iter().rev() {
        repaired.push(*close);
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunked_object_converges() {
        let mut assembler = ArgumentAssembler::new();

        assembler.append_delta("call_1", r#"{"path":"a."#);
        assembler.append_delta("call_1", r#"txt","content":"hi"#);
        let last = assembler.append_delta("call_1", r#""}"#);

        assert_eq!(last, Some(json!({"path": "a.txt", "content": "hi"})));
        assert_eq!(
            assembler.finalize("call_1"),
            Some(json!({"path": "a.txt", "content": "hi"}))
        );
        assert_eq!(assembler.in_flight(), 0);
    }

    #[test]
    fn mid_string_fragment_parses_via_repair() {
        let mut assembler = ArgumentAssembler::new();

        let parsed = assembler.append_delta("call_1", r#"{"path":"a."#);
        assert_eq!(parsed, Some(json!({"path": "a."})));

        let parsed = assembler.append_delta("call_1", r#"txt","content":"hi"#);
        assert_eq!(parsed, Some(json!({"path": "a.txt", "content": "hi"})));
    }

    #[test]
    fn unparseable_intermediate_keeps_last_good_parse() {
        let mut assembler = ArgumentAssembler::new();

        assembler.append_delta("call_1", r#"{"a": 1"#);
        assert_eq!(assembler.last_parsed("call_1"), Some(&json!({"a": 1})));

        // A fragment ending mid-key cannot be repaired; no update.
        let parsed = assembler.append_delta("call_1", r#", "b"#);
        assert_eq!(parsed, None);
        assert_eq!(assembler.last_parsed("call_1"), Some(&json!({"a": 1})));

        let parsed = assembler.append_delta("call_1", r#"": 2}"#);
        assert_eq!(parsed, Some(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn interleaved_calls_use_independent_accumulators() {
        let mut assembler = ArgumentAssembler::new();

        assembler.append_delta("call_a", r#"{"x":"#);
        assembler.append_delta("call_b", r#"{"y": true}"#);
        assembler.append_delta("call_a", "1}");

        // Completion order is independent of first appearance.
        assert_eq!(assembler.finalize("call_b"), Some(json!({"y": true})));
        assert_eq!(assembler.finalize("call_a"), Some(json!({"x": 1})));
    }

    #[test]
    fn trailing_comma_and_dangling_colon_repair() {
        let mut assembler = ArgumentAssembler::new();
        assert_eq!(
            assembler.append_delta("c", r#"{"a": 1,"#),
            Some(json!({"a": 1}))
        );

        let mut assembler = ArgumentAssembler::new();
        assert_eq!(
            assembler.append_delta("c", r#"{"a":"#),
            Some(json!({"a": null}))
        );
    }

    #[test]
    fn nested_structures_repair() {
        let mut assembler = ArgumentAssembler::new();
        let parsed = assembler.append_delta("c", r#"{"files": [{"path": "src/main.rs", "lines": [1, 2"#);
        assert_eq!(
            parsed,
            Some(json!({"files": [{"path": "src/main.rs", "lines": [1, 2]}]}))
        );
    }

    #[test]
    fn garbage_never_panics() {
        let mut assembler = ArgumentAssembler::new();
        assert_eq!(assembler.append_delta("c", "}}}]]]"), None);
        assert_eq!(assembler.append_delta("c", "\\\\\""), None);
        assert_eq!(assembler.finalize("missing"), None);
    }

    #[test]
    fn finalize_falls_back_to_last_relaxed_parse() {
        let mut assembler = ArgumentAssembler::new();
        assembler.append_delta("c", r#"{"path":"a.txt","content":"unfinished"#);
        // The stream died mid-string; finalize still yields the repair.
        assert_eq!(
            assembler.finalize("c"),
            Some(json!({"path": "a.txt", "content": "unfinished"}))
        );
    }

    mod convergence {
        use super::*;
        use proptest::prelude::*;

        fn arb_scalar() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i32>().prop_map(|n| json!(n)),
                "[a-z0-9 .,_-]{0,12}".prop_map(Value::String),
            ]
        }

        fn arb_arguments() -> impl Strategy<Value = Value> {
            let leaf = arb_scalar();
            let nested = prop::collection::hash_map("[a-z_]{1,6}", arb_scalar(), 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect()));
            let list = prop::collection::vec(arb_scalar(), 0..4).prop_map(Value::Array);
            prop::collection::hash_map(
                "[a-z_]{1,8}",
                prop_oneof![leaf, nested, list],
                1..5,
            )
            .prop_map(|m| Value::Object(m.into_iter().collect()))
        }

        proptest! {
            /// Any JSON object split into arbitrary contiguous chunks
            /// converges to the original once the last chunk arrives.
            #[test]
            fn arbitrary_chunking_converges(
                object in arb_arguments(),
                cuts in prop::collection::vec(0.0f64..1.0, 0..8),
            ) {
                let serialized = serde_json::to_string(&object).unwrap();
                let mut indices: Vec<usize> = cuts
                    .iter()
                    .map(|f| (f * serialized.len() as f64) as usize)
                    .collect();
                indices.push(serialized.len());
                indices.sort_unstable();

                let mut assembler = ArgumentAssembler::new();
                let mut start = 0;
                for end in indices {
                    if end > start {
                        assembler.append_delta("call", &serialized[start..end]);
                        start = end;
                    }
                }

                prop_assert_eq!(assembler.finalize("call"), Some(object));
            }
        }
    }
}
