//! Conversation state for one agent run.
//!
//! The transcript is the model's entire working memory: an append-only,
//! ordered sequence of user prompts, model utterances, and tool results.
//! It is owned by exactly one run and discarded when the run ends.

use serde_json::{json, Value};

/// A structured request from the model naming one registered operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Transport-assigned id, echoed back in the matching result
    pub id: String,

    /// Name of the requested tool
    pub tool_name: String,

    /// Arguments as a JSON object
    pub arguments: Value,
}

/// A tool invocation the executor refused. These are surfaced to the model
/// as ordinary error results so it can self-correct on the next turn; they
/// never fail the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRejection {
    /// The requested tool is not in the registry
    UnknownTool { tool_name: String },

    /// Arguments failed schema validation (or reused a call id)
    InvalidArguments { field: String, message: String },

    /// A tool ordering invariant was violated
    Precondition { message: String },
}

impl ToolRejection {
    /// Stable tag included in the error payload.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolRejection::UnknownTool { .. } => "unknown_tool",
            ToolRejection::InvalidArguments { .. } => "invalid_arguments",
            ToolRejection::Precondition { .. } => "precondition_error",
        }
    }
}

impl std::fmt::Display for ToolRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolRejection::UnknownTool { tool_name } => {
                write!(f, "Unknown tool: {}", tool_name)
            }
            ToolRejection::InvalidArguments { field, message } => {
                write!(f, "Invalid argument '{}': {}", field, message)
            }
            ToolRejection::Precondition { message } => write!(f, "{}", message),
        }
    }
}

/// What a tool invocation produced: a payload for the model to read, or a
/// rejection it can recover from.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Rejected(ToolRejection),
}

/// The answer to exactly one prior [`ToolCall`]. Every call gets one,
/// success or error - never silence.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Id of the call this result answers
    pub tool_call_id: String,

    /// Name of the tool that was invoked
    pub tool_name: String,

    /// Payload or rejection
    pub outcome: ToolOutcome,
}

impl ToolResult {
    /// JSON payload sent back to the model.
    pub fn payload_json(&self) -> Value {
        match &self.outcome {
            ToolOutcome::Success(payload) => payload.clone(),
            ToolOutcome::Rejected(rejection) => json!({
                "success": false,
                "error_type": rejection.kind(),
                "error": rejection.to_string(),
            }),
        }
    }

    /// Whether the outcome is an error payload.
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Rejected(_))
    }
}

/// One model turn: free text, or one tool call (optionally preceded by
/// narration text in the same turn). Exactly two cases - there is no
/// ambiguous "response object".
#[derive(Debug, Clone, PartialEq)]
pub enum ModelUtterance {
    /// Free text with no tool request
    Text(String),

    /// A single tool request
    ToolUse {
        /// Narration the model emitted before the call, if any
        narration: Option<String>,
        call: ToolCall,
    },
}

impl ModelUtterance {
    /// The tool call, if this turn requested one.
    pub fn tool_call(&self) -> Option<&ToolCall> {
        match self {
            ModelUtterance::Text(_) => None,
            ModelUtterance::ToolUse { call, .. } => Some(call),
        }
    }
}

/// One entry in the transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// The caller's prompt, or a mid-run steering message
    UserPrompt(String),

    /// A model turn
    Model(ModelUtterance),

    /// The answer to a model tool call
    ToolResult(ToolResult),
}

/// Append-only message history for one run.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Seed a new transcript with the user's prompt.
    pub fn new(prompt: &str) -> Self {
        Self {
            messages: vec![Message::UserPrompt(format!(
                "Create a presentation about: {}",
                prompt
            ))],
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::UserPrompt(text.into()));
    }

    pub fn push_model(&mut self, utterance: ModelUtterance) {
        self.messages.push(Message::Model(utterance));
    }

    pub fn push_tool_result(&mut self, result: ToolResult) {
        self.messages.push(Message::ToolResult(result));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of tool calls the model has issued.
    pub fn tool_call_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::Model(ModelUtterance::ToolUse { .. })))
            .count()
    }

    /// Number of tool results appended. Always equals
    /// [`Self::tool_call_count`] between turns.
    pub fn tool_result_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::ToolResult(_)))
            .count()
    }
}
