//! Agent turn consumer for the Llama Stack agents API.
//!
//! Creates a one-shot agent and session per user message, streams the turn
//! over SSE and folds the typed events into a single reply.

pub mod client;
pub mod error;
pub mod events;
pub mod fallback;
pub mod sse;
pub mod turn;

pub use {
    client::{AgentResponder, LlamaStackClient},
    error::{AgentError, Result},
    events::{CompletedStep, TurnEvent},
    fallback::canned_reply,
    turn::{TurnConsumer, TurnOutcome, consume},
};
