//! API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to generate a presentation.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratePresentationRequest {
    /// What the presentation should be about
    pub prompt: String,

    /// Optional iteration-cap override (uses the configured default if not
    /// specified)
    pub max_iterations: Option<u32>,
}

/// Response for a finalized presentation.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratePresentationResponse {
    /// Run identifier
    pub run_id: Uuid,

    /// Backend id of the presentation
    pub presentation_id: String,

    /// Anyone-with-link view URL
    pub shareable_link: String,

    /// Title the agent gave the deck
    pub title: Option<String>,

    /// Number of slides in the finished deck
    pub slide_count: usize,

    /// Model round-trips the run took
    pub iterations: u32,
}

/// Error body for capped and failed runs.
#[derive(Debug, Clone, Serialize)]
pub struct RunErrorResponse {
    /// Run identifier
    pub run_id: Uuid,

    /// Stable error tag: "iteration_cap_exceeded", "backend_error",
    /// "model_transport_error", or "cancelled"
    pub error_type: String,

    /// Human-readable cause
    pub error: String,

    /// Partial progress, if any backend resource exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialProgress>,
}

/// Progress snapshot preserved for incomplete runs.
#[derive(Debug, Clone, Serialize)]
pub struct PartialProgress {
    pub presentation_id: Option<String>,
    pub slide_count: usize,
    pub iterations: u32,
}

/// A single entry in the run execution log.
#[derive(Debug, Clone, Serialize)]
pub struct RunLogEntry {
    /// Timestamp (RFC 3339)
    pub timestamp: String,

    /// Entry type
    pub entry_type: LogEntryType,

    /// Content of the entry
    pub content: String,
}

impl RunLogEntry {
    /// Entry stamped with the current time.
    pub fn now(entry_type: LogEntryType, content: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            entry_type,
            content: content.into(),
        }
    }
}

/// Types of log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryType {
    /// Agent is narrating / planning
    Thinking,
    /// Tool is being called
    ToolCall,
    /// Tool returned a result
    ToolResult,
    /// Run produced its final response
    Response,
    /// An error occurred
    Error,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
