//! Boundary to the external reasoning service
//!
//! The service receives the situational context, the transcript so far and
//! the tool catalogue, and answers with text plus zero or more tool calls.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors from the reasoning service
#[derive(Error, Debug)]
pub enum ReasoningError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Reasoning service returned status {0}")]
    Status(u16),

    #[error("Malformed reasoning response: {0}")]
    Malformed(String),
}

/// A request to invoke one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    /// Correlation id echoed back with the tool result
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Fixed reply shape: always text, optionally tool calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReasoningReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ReasoningReply {
    /// A final answer
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// One transcript message
#[derive(Debug, Clone, PartialEq)]
pub enum TurnMessage {
    User(String),
    Assistant {
        text: String,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

/// Description of a callable tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// Everything the service sees for one step
#[derive(Debug, Clone)]
pub struct ReasoningTurn<'a> {
    pub system_prompt: String,
    pub transcript: &'a [TurnMessage],
    pub tools: &'a [ToolSpec],
}

#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn respond(&self, turn: ReasoningTurn<'_>) -> Result<ReasoningReply, ReasoningError>;
}
