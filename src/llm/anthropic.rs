//! Anthropic Messages API client.
//!
//! Converts the transcript into Messages API content blocks (tool_use /
//! tool_result) and parses the response back into a [`ModelUtterance`].

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::transcript::{Message, ModelUtterance, ToolCall, Transcript};
use crate::tools::ToolDefinition;

use super::{LlmClient, LlmError};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: String,
        model: String,
        timeout: std::time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("deck-agent/0.3")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn converse(
        &self,
        system_prompt: &str,
        transcript: &Transcript,
        tools: &[ToolDefinition],
    ) -> Result<ModelUtterance, LlmError> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": system_prompt,
            "messages": convert_messages(transcript),
            "tools": convert_tools(tools),
        });

        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response.json().await?;
        parse_utterance(&payload)
    }
}

/// Tool catalogue in Messages API shape.
fn convert_tools(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.parameters,
            })
        })
        .collect()
}

/// Transcript as Messages API turns.
///
/// Tool results travel as user-role tool_result blocks; consecutive
/// same-role entries (a result followed by a steering message, say) are
/// merged into one turn to keep user/assistant alternation.
fn convert_messages(transcript: &Transcript) -> Vec<Value> {
    let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

    let mut push_block = |role: &'static str, block: Value| match turns.last_mut() {
        Some((last_role, blocks)) if *last_role == role => blocks.push(block),
        _ => turns.push((role, vec![block])),
    };

    for message in transcript.messages() {
        match message {
            Message::UserPrompt(text) => {
                push_block("user", json!({ "type": "text", "text": text }));
            }
            Message::Model(ModelUtterance::Text(text)) => {
                push_block("assistant", json!({ "type": "text", "text": text }));
            }
            Message::Model(ModelUtterance::ToolUse { narration, call }) => {
                if let Some(text) = narration {
                    push_block("assistant", json!({ "type": "text", "text": text }));
                }
                push_block(
                    "assistant",
                    json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.tool_name,
                        "input": call.arguments,
                    }),
                );
            }
            Message::ToolResult(result) => {
                push_block(
                    "user",
                    json!({
                        "type": "tool_result",
                        "tool_use_id": result.tool_call_id,
                        "content": result.payload_json().to_string(),
                        "is_error": result.is_error(),
                    }),
                );
            }
        }
    }

    turns
        .into_iter()
        .map(|(role, blocks)| json!({ "role": role, "content": blocks }))
        .collect()
}

/// Parse the response content blocks into a single utterance.
///
/// The first tool_use block wins; any further tool_use blocks in the same
/// turn are ignored with a warning (the loop executes at most one call per
/// turn).
fn parse_utterance(payload: &Value) -> Result<ModelUtterance, LlmError> {
    let blocks = payload["content"]
        .as_array()
        .ok_or_else(|| LlmError::UnexpectedResponse("response had no content".to_string()))?;

    let mut narration: Option<String> = None;
    let mut call: Option<ToolCall> = None;

    for block in blocks {
        match block["type"].as_str() {
            Some("text") => {
                let text = block["text"].as_str().unwrap_or_default();
                if call.is_none() && !text.is_empty() {
                    narration = Some(match narration.take() {
                        Some(mut existing) => {
                            existing.push('\n');
                            existing.push_str(text);
                            existing
                        }
                        None => text.to_string(),
                    });
                }
            }
            Some("tool_use") => {
                if call.is_some() {
                    tracing::warn!(
                        "Model requested multiple tool calls in one turn; ignoring extras"
                    );
                    continue;
                }
                let id = block["id"].as_str().ok_or_else(|| {
                    LlmError::UnexpectedResponse("tool_use block had no id".to_string())
                })?;
                let name = block["name"].as_str().ok_or_else(|| {
                    LlmError::UnexpectedResponse("tool_use block had no name".to_string())
                })?;
                call = Some(ToolCall {
                    id: id.to_string(),
                    tool_name: name.to_string(),
                    arguments: block["input"].clone(),
                });
            }
            _ => {}
        }
    }

    match (narration, call) {
        (narration, Some(call)) => Ok(ModelUtterance::ToolUse { narration, call }),
        (Some(text), None) => Ok(ModelUtterance::Text(text)),
        (None, None) => Err(LlmError::UnexpectedResponse(
            "response had neither text nor a tool call".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::transcript::{ToolOutcome, ToolResult};
    use crate::tools::ToolRegistry;

    #[test]
    fn tools_convert_to_input_schema_shape() {
        let registry = ToolRegistry::new();
        let tools = convert_tools(registry.definitions());
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[0]["name"], "create_presentation");
        assert!(tools[0]["input_schema"]["properties"].is_object());
    }

    #[test]
    fn tool_results_are_user_role_blocks() {
        let mut transcript = Transcript::new("AI");
        transcript.push_model(ModelUtterance::ToolUse {
            narration: Some("Creating the deck first.".to_string()),
            call: ToolCall {
                id: "call_1".to_string(),
                tool_name: "create_presentation".to_string(),
                arguments: json!({ "title": "AI" }),
            },
        });
        transcript.push_tool_result(ToolResult {
            tool_call_id: "call_1".to_string(),
            tool_name: "create_presentation".to_string(),
            outcome: ToolOutcome::Success(json!({ "success": true })),
        });

        let messages = convert_messages(&transcript);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        // Narration and tool_use share the assistant turn.
        assert_eq!(messages[1]["content"].as_array().unwrap().len(), 2);
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[2]["content"][0]["is_error"], false);
    }

    #[test]
    fn consecutive_user_entries_merge_into_one_turn() {
        let mut transcript = Transcript::new("AI");
        transcript.push_user("Please finalize the presentation.");

        let messages = convert_messages(&transcript);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["content"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn parses_a_text_only_turn() {
        let payload = json!({
            "content": [ { "type": "text", "text": "Let me plan the outline." } ]
        });
        match parse_utterance(&payload).unwrap() {
            ModelUtterance::Text(text) => assert!(text.contains("outline")),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn parses_a_tool_use_turn_with_narration() {
        let payload = json!({
            "content": [
                { "type": "text", "text": "Adding the first slide." },
                { "type": "tool_use", "id": "toolu_1", "name": "add_slide",
                  "input": { "layout": "TITLE", "title": "AI", "content": "" } }
            ]
        });
        match parse_utterance(&payload).unwrap() {
            ModelUtterance::ToolUse { narration, call } => {
                assert_eq!(narration.as_deref(), Some("Adding the first slide."));
                assert_eq!(call.tool_name, "add_slide");
                assert_eq!(call.id, "toolu_1");
            }
            other => panic!("expected tool use, got {:?}", other),
        }
    }

    #[test]
    fn first_tool_use_wins_when_the_model_sends_several() {
        let payload = json!({
            "content": [
                { "type": "tool_use", "id": "toolu_1", "name": "create_presentation",
                  "input": { "title": "AI" } },
                { "type": "tool_use", "id": "toolu_2", "name": "add_slide",
                  "input": { "layout": "TITLE", "title": "AI", "content": "" } }
            ]
        });
        match parse_utterance(&payload).unwrap() {
            ModelUtterance::ToolUse { call, .. } => assert_eq!(call.id, "toolu_1"),
            other => panic!("expected tool use, got {:?}", other),
        }
    }

    #[test]
    fn empty_content_is_an_error() {
        let payload = json!({ "content": [] });
        assert!(matches!(
            parse_utterance(&payload),
            Err(LlmError::UnexpectedResponse(_))
        ));
    }
}
