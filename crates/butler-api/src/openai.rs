//! OpenAI-compatible chat-completions reasoning service

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::reasoning::{
    ReasoningError, ReasoningReply, ReasoningService, ReasoningTurn, ToolCall, TurnMessage,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for any endpoint speaking the chat-completions protocol
pub struct OpenAiReasoner {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiReasoner {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, ReasoningError> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn request_body(&self, turn: &ReasoningTurn<'_>) -> Value {
        let mut messages = vec![json!({"role": "system", "content": turn.system_prompt})];
        messages.extend(turn.transcript.iter().map(message_json));

        let tools: Vec<Value> = turn
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect();

        json!({
            "model": self.model,
            "messages": messages,
            "tools": tools,
        })
    }
}

fn message_json(message: &TurnMessage) -> Value {
    match message {
        TurnMessage::User(text) => json!({"role": "user", "content": text}),
        TurnMessage::Assistant { text, tool_calls } if tool_calls.is_empty() => {
            json!({"role": "assistant", "content": text})
        }
        TurnMessage::Assistant { text, tool_calls } => json!({
            "role": "assistant",
            "content": text,
            "tool_calls": tool_calls.iter().map(|call| json!({
                "id": call.id,
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": call.arguments.to_string(),
                }
            })).collect::<Vec<_>>(),
        }),
        TurnMessage::Tool { call_id, content } => {
            json!({"role": "tool", "tool_call_id": call_id, "content": content})
        }
    }
}

/// Extract the reply from a chat-completions response body
fn parse_reply(body: &Value) -> Result<ReasoningReply, ReasoningError> {
    let message = body
        .pointer("/choices/0/message")
        .ok_or_else(|| ReasoningError::Malformed("missing choices[0].message".into()))?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let function = call.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    // Arguments arrive as a JSON-encoded string
                    let arguments = function
                        .get("arguments")
                        .and_then(Value::as_str)
                        .and_then(|raw| serde_json::from_str(raw).ok())
                        .unwrap_or_else(|| json!({}));
                    Some(ToolCall {
                        id: call
                            .get("id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        name,
                        arguments,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ReasoningReply { text, tool_calls })
}

#[async_trait]
impl ReasoningService for OpenAiReasoner {
    async fn respond(&self, turn: ReasoningTurn<'_>) -> Result<ReasoningReply, ReasoningError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&turn))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReasoningError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_call_reply() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "control_light",
                            "arguments": "{\"room\": \"bedroom\", \"action\": \"dim\", \"brightness\": 20}"
                        }
                    }]
                }
            }]
        });
        let reply = parse_reply(&body).unwrap();
        assert_eq!(reply.text, "");
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "control_light");
        assert_eq!(reply.tool_calls[0].arguments["brightness"], 20);
    }

    #[test]
    fn test_parse_plain_answer_and_malformed() {
        let reply = parse_reply(&json!({"choices": [{"message": {"content": "Hi!"}}]})).unwrap();
        assert_eq!(reply, ReasoningReply::answer("Hi!"));
        assert!(parse_reply(&json!({"error": "nope"})).is_err());
    }

    #[test]
    fn test_transcript_encoding() {
        let call = ToolCall {
            id: "call_9".into(),
            name: "list_schedules".into(),
            arguments: json!({}),
        };
        let assistant = message_json(&TurnMessage::Assistant {
            text: String::new(),
            tool_calls: vec![call],
        });
        assert_eq!(assistant["tool_calls"][0]["function"]["arguments"], "{}");

        let tool = message_json(&TurnMessage::Tool {
            call_id: "call_9".into(),
            content: "No scheduled tasks or reminders.".into(),
        });
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_9");
    }
}
