//! Typed view of the agent turn stream.
//!
//! Each SSE payload looks like `{"event": {"payload": {"event_type": ...}}}`;
//! failures arrive as `{"error": {"message": ...}}`.

use serde_json::Value;

use crate::error::{AgentError, Result};

/// One event of a streaming agent turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    TurnStart,
    StepStart { step_type: String },
    /// Incremental output of a step. `text` is set for text deltas.
    StepProgress {
        step_type: String,
        text: Option<String>,
    },
    StepComplete(CompletedStep),
    TurnComplete,
    /// Explicit error reported by the service.
    Error(String),
    /// Any event type this consumer does not act on.
    Other(String),
}

/// Details of a finished step.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletedStep {
    Inference { role: String, content: String },
    ToolExecution { tools: Vec<String> },
    Other { step_type: String },
}

impl TurnEvent {
    /// Parse one SSE data payload.
    pub fn parse(data: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(data)
            .map_err(|e| AgentError::Stream(format!("malformed event: {e}")))?;
        Ok(Self::from_value(&value))
    }

    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
            let message = err["message"]
                .as_str()
                .or_else(|| err.as_str())
                .unwrap_or("unknown error");
            return Self::Error(message.to_string());
        }

        let payload = &value["event"]["payload"];
        let event_type = payload["event_type"].as_str().unwrap_or_default();
        let step_type = || payload["step_type"].as_str().unwrap_or_default().to_string();

        match event_type {
            "turn_start" => Self::TurnStart,
            "step_start" => Self::StepStart {
                step_type: step_type(),
            },
            "step_progress" => {
                let delta = &payload["delta"];
                let text = (delta["type"].as_str() == Some("text"))
                    .then(|| delta["text"].as_str().map(str::to_string))
                    .flatten();
                Self::StepProgress {
                    step_type: step_type(),
                    text,
                }
            },
            "step_complete" => Self::StepComplete(completed_step(payload)),
            "turn_complete" => Self::TurnComplete,
            other => Self::Other(other.to_string()),
        }
    }
}

fn completed_step(payload: &Value) -> CompletedStep {
    let details = &payload["step_details"];
    let step_type = payload["step_type"]
        .as_str()
        .or_else(|| details["step_type"].as_str())
        .unwrap_or_default();

    match step_type {
        "inference" => {
            let response = ["model_response", "api_model_response"]
                .iter()
                .map(|key| &details[*key])
                .find(|v| v.is_object())
                .unwrap_or(&Value::Null);
            CompletedStep::Inference {
                role: response["role"].as_str().unwrap_or_default().to_string(),
                content: content_text(&response["content"]),
            }
        },
        "tool_execution" => CompletedStep::ToolExecution {
            tools: details["tool_calls"]
                .as_array()
                .map(|calls| {
                    calls
                        .iter()
                        .filter_map(|c| c["tool_name"].as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
        },
        other => CompletedStep::Other {
            step_type: other.to_string(),
        },
    }
}

/// Message content as text: a plain string, or the first non-empty text item
/// of a content list.
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.as_str()),
                _ if item["type"].as_str() == Some("text") => item["text"].as_str(),
                _ => None,
            })
            .find(|text| !text.trim().is_empty())
            .unwrap_or_default()
            .to_string(),
        Value::Object(_) if content["type"].as_str() == Some("text") => {
            content["text"].as_str().unwrap_or_default().to_string()
        },
        _ => String::new(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(payload: &str) -> String {
        format!(r#"{{"event":{{"payload":{payload}}}}}"#)
    }

    #[test]
    fn parses_turn_boundaries() {
        assert_eq!(
            TurnEvent::parse(&wrap(r#"{"event_type":"turn_start","turn_id":"t1"}"#)).unwrap(),
            TurnEvent::TurnStart
        );
        assert_eq!(
            TurnEvent::parse(&wrap(r#"{"event_type":"turn_complete","turn":{}}"#)).unwrap(),
            TurnEvent::TurnComplete
        );
    }

    #[test]
    fn parses_text_progress() {
        let ev = TurnEvent::parse(&wrap(
            r#"{"event_type":"step_progress","step_type":"inference","delta":{"type":"text","text":"Hel"}}"#,
        ))
        .unwrap();
        assert_eq!(
            ev,
            TurnEvent::StepProgress {
                step_type: "inference".into(),
                text: Some("Hel".into())
            }
        );

        let tool_delta = TurnEvent::parse(&wrap(
            r#"{"event_type":"step_progress","step_type":"inference","delta":{"type":"tool_call","tool_call":"{}"}}"#,
        ))
        .unwrap();
        assert!(matches!(tool_delta, TurnEvent::StepProgress { text: None, .. }));
    }

    #[test]
    fn parses_inference_with_string_content() {
        let ev = TurnEvent::parse(&wrap(
            r#"{"event_type":"step_complete","step_type":"inference","step_details":{"step_type":"inference","model_response":{"role":"assistant","content":"It is sunny.","stop_reason":"end_of_turn"}}}"#,
        ))
        .unwrap();
        assert_eq!(
            ev,
            TurnEvent::StepComplete(CompletedStep::Inference {
                role: "assistant".into(),
                content: "It is sunny.".into()
            })
        );
    }

    #[test]
    fn parses_inference_with_list_content_and_api_key() {
        let ev = TurnEvent::parse(&wrap(
            r#"{"event_type":"step_complete","step_type":"inference","step_details":{"api_model_response":{"role":"assistant","content":[{"type":"image","image":{}},{"type":"text","text":"  "},{"type":"text","text":"First"},{"type":"text","text":"Second"}]}}}"#,
        ))
        .unwrap();
        assert_eq!(
            ev,
            TurnEvent::StepComplete(CompletedStep::Inference {
                role: "assistant".into(),
                content: "First".into()
            })
        );
    }

    #[test]
    fn parses_tool_execution() {
        let ev = TurnEvent::parse(&wrap(
            r#"{"event_type":"step_complete","step_type":"tool_execution","step_details":{"tool_calls":[{"tool_name":"list_chats"}],"tool_responses":[]}}"#,
        ))
        .unwrap();
        assert_eq!(
            ev,
            TurnEvent::StepComplete(CompletedStep::ToolExecution {
                tools: vec!["list_chats".into()]
            })
        );
    }

    #[test]
    fn parses_error_chunk() {
        let ev = TurnEvent::parse(r#"{"error":{"message":"model overloaded"}}"#).unwrap();
        assert_eq!(ev, TurnEvent::Error("model overloaded".into()));
    }

    #[test]
    fn unknown_and_malformed() {
        assert_eq!(
            TurnEvent::parse(&wrap(r#"{"event_type":"turn_awaiting_input"}"#)).unwrap(),
            TurnEvent::Other("turn_awaiting_input".into())
        );
        assert!(matches!(
            TurnEvent::parse("{not json"),
            Err(AgentError::Stream(_))
        ));
    }
}
