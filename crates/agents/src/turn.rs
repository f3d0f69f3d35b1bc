//! Turn consumer: folds the event stream of one turn into a final answer.

use {
    futures::StreamExt,
    tokio_stream::Stream,
    tracing::{debug, warn},
};

use crate::{
    error::{AgentError, Result},
    events::{CompletedStep, TurnEvent},
};

/// Terminal result of a turn.
#[derive(Debug)]
pub enum TurnOutcome {
    Complete(String),
    Failed(AgentError),
}

impl TurnOutcome {
    pub fn into_result(self) -> Result<String> {
        match self {
            Self::Complete(text) => Ok(text),
            Self::Failed(e) => Err(e),
        }
    }
}

/// State machine over [`TurnEvent`]s.
///
/// The last assistant inference step seen before `turn_complete` is the
/// answer, even when it is blank. Tool steps are only logged.
#[derive(Debug, Default)]
pub struct TurnConsumer {
    candidate: Option<String>,
    started: bool,
    events: usize,
}

impl TurnConsumer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event. Returns the outcome once the turn is over.
    pub fn on_event(&mut self, event: TurnEvent) -> Option<TurnOutcome> {
        self.events += 1;
        match event {
            TurnEvent::TurnStart => {
                self.started = true;
                None
            },
            TurnEvent::StepStart { .. } | TurnEvent::StepProgress { .. } => None,
            TurnEvent::StepComplete(CompletedStep::Inference { role, content }) => {
                if role == "assistant" {
                    self.candidate = Some(content.trim().to_string());
                }
                None
            },
            TurnEvent::StepComplete(CompletedStep::ToolExecution { tools }) => {
                debug!(tools = ?tools, "agent executed tools");
                None
            },
            TurnEvent::StepComplete(CompletedStep::Other { step_type }) => {
                debug!(step_type = %step_type, "agent completed step");
                None
            },
            TurnEvent::TurnComplete => Some(match self.candidate.take() {
                Some(text) if !text.is_empty() => TurnOutcome::Complete(text),
                _ => TurnOutcome::Failed(AgentError::NoResponse),
            }),
            TurnEvent::Error(message) => Some(TurnOutcome::Failed(AgentError::Stream(message))),
            TurnEvent::Other(event_type) => {
                debug!(event_type = %event_type, "ignoring agent event");
                None
            },
        }
    }

    /// The stream ended without `turn_complete`.
    #[must_use]
    pub fn finish(self) -> TurnOutcome {
        warn!(
            events = self.events,
            started = self.started,
            has_candidate = self.candidate.is_some(),
            "agent stream ended before turn_complete"
        );
        TurnOutcome::Failed(AgentError::NoResponse)
    }
}

/// Drive a stream of raw SSE payloads to completion.
///
/// Malformed payloads are skipped; transport errors end the turn.
pub async fn consume<S>(stream: S) -> Result<String>
where
    S: Stream<Item = Result<String>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut consumer = TurnConsumer::new();

    while let Some(item) = stream.next().await {
        let data = item?;
        let event = match TurnEvent::parse(&data) {
            Ok(ev) => ev,
            Err(e) => {
                warn!(error = %e, "skipping malformed agent event");
                continue;
            },
        };
        if let Some(outcome) = consumer.on_event(event) {
            return outcome.into_result();
        }
    }

    consumer.finish().into_result()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn payload(p: &str) -> Result<String> {
        Ok(format!(r#"{{"event":{{"payload":{p}}}}}"#))
    }

    fn inference(text: &str) -> Result<String> {
        payload(&format!(
            r#"{{"event_type":"step_complete","step_type":"inference","step_details":{{"model_response":{{"role":"assistant","content":"{text}"}}}}}}"#
        ))
    }

    fn start() -> Result<String> {
        payload(r#"{"event_type":"turn_start"}"#)
    }

    fn complete() -> Result<String> {
        payload(r#"{"event_type":"turn_complete"}"#)
    }

    #[tokio::test]
    async fn last_inference_wins() {
        let events = vec![
            start(),
            inference("Let me check."),
            payload(
                r#"{"event_type":"step_complete","step_type":"tool_execution","step_details":{"tool_calls":[{"tool_name":"get_time"}]}}"#,
            ),
            inference("It is 5pm."),
            complete(),
        ];
        let answer = consume(futures::stream::iter(events)).await.unwrap();
        assert_eq!(answer, "It is 5pm.");
    }

    #[tokio::test]
    async fn complete_without_candidate_is_no_response() {
        let events = vec![start(), complete()];
        let err = consume(futures::stream::iter(events)).await.unwrap_err();
        assert!(matches!(err, AgentError::NoResponse));
    }

    #[tokio::test]
    async fn non_assistant_inference_is_ignored() {
        let events = vec![
            start(),
            inference("Real answer"),
            payload(
                r#"{"event_type":"step_complete","step_type":"inference","step_details":{"model_response":{"role":"tool","content":"raw"}}}"#,
            ),
            complete(),
        ];
        let answer = consume(futures::stream::iter(events)).await.unwrap();
        assert_eq!(answer, "Real answer");
    }

    #[tokio::test]
    async fn trailing_blank_answer_replaces_preamble() {
        let events = vec![
            start(),
            inference("Let me look that up."),
            inference(""),
            complete(),
        ];
        let err = consume(futures::stream::iter(events)).await.unwrap_err();
        assert!(matches!(err, AgentError::NoResponse));

        let events = vec![start(), inference("Let me look that up."), inference("   "), complete()];
        let err = consume(futures::stream::iter(events)).await.unwrap_err();
        assert!(matches!(err, AgentError::NoResponse));
    }

    #[tokio::test]
    async fn error_event_fails_turn() {
        let events = vec![
            start(),
            inference("partial"),
            Ok(r#"{"error":{"message":"tool crashed"}}"#.to_string()),
            complete(),
        ];
        let err = consume(futures::stream::iter(events)).await.unwrap_err();
        assert!(matches!(err, AgentError::Stream(ref m) if m == "tool crashed"));
    }

    #[tokio::test]
    async fn truncated_stream_is_no_response() {
        let events = vec![start(), inference("almost")];
        let err = consume(futures::stream::iter(events)).await.unwrap_err();
        assert!(matches!(err, AgentError::NoResponse));
    }

    #[tokio::test]
    async fn transport_error_ends_turn() {
        let events = vec![start(), Err(AgentError::Stream("connection reset".into()))];
        let err = consume(futures::stream::iter(events)).await.unwrap_err();
        assert!(matches!(err, AgentError::Stream(_)));
    }

    #[tokio::test]
    async fn malformed_payloads_are_skipped() {
        let events = vec![
            start(),
            Ok("{garbage".to_string()),
            inference("Still fine"),
            complete(),
        ];
        let answer = consume(futures::stream::iter(events)).await.unwrap();
        assert_eq!(answer, "Still fine");
    }
}
