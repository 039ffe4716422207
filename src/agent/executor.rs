//! Tool executor - turns a model tool call into a tool result.
//!
//! Every call gets exactly one result. Recoverable problems (unknown tool,
//! bad arguments, ordering violations) come back as error payloads for the
//! model to read; only backend failures that are non-retryable (or exhaust
//! the retry budget) escalate to the loop.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::RetryConfig;
use crate::slides::{BackendError, SlideLayout, SlidesBackend};
use crate::tools::{self, validate_arguments, ToolRegistry};

use super::transcript::{ToolCall, ToolOutcome, ToolRejection, ToolResult};

/// One slide the agent has created, as remembered in run state.
#[derive(Debug, Clone)]
pub struct SlideRecord {
    pub index: usize,
    pub layout: SlideLayout,
    pub title: String,
    pub content: String,
}

/// Mutable side-channel state of one agent run.
///
/// Mutated only by the executor's side effects and the loop's bookkeeping;
/// owned by exactly one run and destroyed with it.
#[derive(Debug)]
pub struct AgentRunState {
    /// Model round-trips so far; bounded by `max_iterations`
    pub iteration_count: u32,

    /// Hard cap on model round-trips
    pub max_iterations: u32,

    /// Opaque backend handle, set once by `create_presentation`
    pub presentation_ref: Option<String>,

    /// Title passed to `create_presentation`
    pub presentation_title: Option<String>,

    /// Flips false -> true exactly once, on successful finalize
    pub finalized: bool,

    /// Slides added so far
    pub slide_count: usize,

    /// Shareable link, present once finalized
    pub shareable_link: Option<String>,

    /// What the agent has put on each slide
    pub slide_history: Vec<SlideRecord>,

    /// Call ids already consumed; a repeated id is rejected, never replayed
    seen_call_ids: HashSet<String>,
}

impl AgentRunState {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            iteration_count: 0,
            max_iterations,
            presentation_ref: None,
            presentation_title: None,
            finalized: false,
            slide_count: 0,
            shareable_link: None,
            slide_history: Vec::new(),
            seen_call_ids: HashSet::new(),
        }
    }

    /// Summary the model sees when reviewing, and the caller sees on a
    /// capped run.
    pub fn summary_json(&self) -> Value {
        json!({
            "presentation_id": self.presentation_ref,
            "presentation_title": self.presentation_title,
            "slides_created": self.slide_count,
            "finalized": self.finalized,
        })
    }
}

/// Executes tool calls from the model against the presentation backend.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    backend: Arc<dyn SlidesBackend>,
    retry: RetryConfig,
}

impl ToolExecutor {
    pub fn new(
        registry: Arc<ToolRegistry>,
        backend: Arc<dyn SlidesBackend>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            retry,
        }
    }

    /// Execute one tool call against the backend, mutating `state` as the
    /// tool prescribes.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` only when the backend failed non-retryably or
    /// the retry budget ran out; every other problem is a rejection inside
    /// the returned `ToolResult`.
    pub async fn execute(
        &self,
        call: &ToolCall,
        state: &mut AgentRunState,
    ) -> Result<ToolResult, BackendError> {
        if let Some(rejection) = self.check_call(call, state) {
            tracing::debug!("Rejected tool call {}: {}", call.tool_name, rejection);
            return Ok(reply(call, ToolOutcome::Rejected(rejection)));
        }

        let outcome = match call.tool_name.as_str() {
            tools::CREATE_PRESENTATION => self.create_presentation(call, state).await?,
            tools::ADD_SLIDE => self.add_slide(call, state).await?,
            tools::REVIEW_PRESENTATION => self.review_presentation(state).await?,
            tools::REFINE_SLIDE => self.refine_slide(call, state).await?,
            tools::FINALIZE_PRESENTATION => self.finalize_presentation(state).await?,
            // check_call verified the name against the registry
            other => ToolOutcome::Rejected(ToolRejection::UnknownTool {
                tool_name: other.to_string(),
            }),
        };

        Ok(reply(call, outcome))
    }

    /// Registry lookup, duplicate-id detection, and schema validation.
    fn check_call(&self, call: &ToolCall, state: &mut AgentRunState) -> Option<ToolRejection> {
        if !state.seen_call_ids.insert(call.id.clone()) {
            return Some(ToolRejection::InvalidArguments {
                field: "id".to_string(),
                message: format!("duplicate tool_call id '{}'", call.id),
            });
        }

        let Some(definition) = self.registry.get(&call.tool_name) else {
            return Some(ToolRejection::UnknownTool {
                tool_name: call.tool_name.clone(),
            });
        };

        if let Err(e) = validate_arguments(&definition.parameters, &call.arguments) {
            return Some(ToolRejection::InvalidArguments {
                field: e.field,
                message: e.message,
            });
        }

        None
    }

    async fn create_presentation(
        &self,
        call: &ToolCall,
        state: &mut AgentRunState,
    ) -> Result<ToolOutcome, BackendError> {
        if state.presentation_ref.is_some() {
            return Ok(ToolOutcome::Rejected(ToolRejection::Precondition {
                message: format!(
                    "Presentation already created. Current presentation: {}",
                    state.presentation_title.as_deref().unwrap_or("untitled")
                ),
            }));
        }

        let title = str_arg(call, "title");
        let backend = &self.backend;
        let presentation_id = self
            .with_retry("create_presentation", || backend.create_presentation(title))
            .await?;

        state.presentation_ref = Some(presentation_id.clone());
        state.presentation_title = Some(title.to_string());

        Ok(ToolOutcome::Success(json!({
            "success": true,
            "message": format!("Presentation \"{}\" created successfully", title),
            "presentation_id": presentation_id,
        })))
    }

    async fn add_slide(
        &self,
        call: &ToolCall,
        state: &mut AgentRunState,
    ) -> Result<ToolOutcome, BackendError> {
        let Some(presentation_id) = state.presentation_ref.clone() else {
            return Ok(no_presentation());
        };

        let layout: SlideLayout =
            match serde_json::from_value(call.arguments["layout"].clone()) {
                Ok(layout) => layout,
                Err(_) => {
                    return Ok(ToolOutcome::Rejected(ToolRejection::InvalidArguments {
                        field: "layout".to_string(),
                        message: "unrecognized layout".to_string(),
                    }))
                }
            };
        let title = str_arg(call, "title");
        let content = str_arg(call, "content");

        let backend = &self.backend;
        let slide_id = self
            .with_retry("add_slide", || {
                backend.add_slide(&presentation_id, layout, title, content)
            })
            .await?;

        let index = state.slide_count;
        state.slide_count += 1;
        state.slide_history.push(SlideRecord {
            index,
            layout,
            title: title.to_string(),
            content: content.to_string(),
        });

        Ok(ToolOutcome::Success(json!({
            "success": true,
            "slide_id": slide_id,
            "slide_index": index,
            "layout": layout.as_str(),
            "title": title,
            "total_slides": state.slide_count,
        })))
    }

    async fn review_presentation(
        &self,
        state: &mut AgentRunState,
    ) -> Result<ToolOutcome, BackendError> {
        let Some(presentation_id) = state.presentation_ref.clone() else {
            return Ok(no_presentation());
        };

        let backend = &self.backend;
        let snapshot = self
            .with_retry("review_presentation", || backend.snapshot(&presentation_id))
            .await?;

        let info = serde_json::to_value(&snapshot).unwrap_or(Value::Null);
        Ok(ToolOutcome::Success(json!({
            "success": true,
            "presentation_info": info,
            "state": state.summary_json(),
        })))
    }

    async fn refine_slide(
        &self,
        call: &ToolCall,
        state: &mut AgentRunState,
    ) -> Result<ToolOutcome, BackendError> {
        let Some(presentation_id) = state.presentation_ref.clone() else {
            return Ok(no_presentation());
        };

        // Schema validation admits any integer; negatives are rejected here
        // rather than coerced onto an existing slide.
        let Some(slide_index) = call.arguments["slide_index"].as_u64().map(|i| i as usize) else {
            return Ok(ToolOutcome::Rejected(ToolRejection::InvalidArguments {
                field: "slide_index".to_string(),
                message: "expected a non-negative integer".to_string(),
            }));
        };
        if slide_index >= state.slide_count {
            return Ok(ToolOutcome::Rejected(ToolRejection::InvalidArguments {
                field: "slide_index".to_string(),
                message: format!(
                    "slide index {} out of range, presentation has {} slides",
                    slide_index, state.slide_count
                ),
            }));
        }

        let new_content = str_arg(call, "new_content");
        let new_title = call.arguments["new_title"].as_str();

        let backend = &self.backend;
        self.with_retry("refine_slide", || {
            backend.refine_slide(&presentation_id, slide_index, new_content, new_title)
        })
        .await?;

        if let Some(record) = state.slide_history.get_mut(slide_index) {
            if let Some(title) = new_title {
                record.title = title.to_string();
            }
            record.content = new_content.to_string();
        }

        Ok(ToolOutcome::Success(json!({
            "success": true,
            "slide_index": slide_index,
            "message": "Slide updated successfully",
        })))
    }

    async fn finalize_presentation(
        &self,
        state: &mut AgentRunState,
    ) -> Result<ToolOutcome, BackendError> {
        let Some(presentation_id) = state.presentation_ref.clone() else {
            return Ok(no_presentation());
        };

        if state.finalized {
            return Ok(ToolOutcome::Rejected(ToolRejection::Precondition {
                message: "Presentation is already finalized.".to_string(),
            }));
        }

        if state.slide_count == 0 {
            return Ok(ToolOutcome::Rejected(ToolRejection::Precondition {
                message: "Cannot finalize an empty presentation. Add at least one slide first."
                    .to_string(),
            }));
        }

        let backend = &self.backend;
        let shareable_link = self
            .with_retry("finalize_presentation", || backend.share(&presentation_id))
            .await?;

        state.finalized = true;
        state.shareable_link = Some(shareable_link.clone());

        Ok(ToolOutcome::Success(json!({
            "success": true,
            "message": "Presentation finalized and shared successfully",
            "presentation_id": presentation_id,
            "shareable_link": shareable_link,
            "title": state.presentation_title,
            "total_slides": state.slide_count,
        })))
    }

    /// Run a backend call, retrying retryable failures with backoff until
    /// the budget is spent.
    async fn with_retry<T, F, Fut>(&self, op: &str, f: F) -> Result<T, BackendError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempt = 1u32;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff_delay(attempt);
                    tracing::warn!(
                        "Backend call {} failed (attempt {}), retrying in {:?}: {}",
                        op,
                        attempt,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn reply(call: &ToolCall, outcome: ToolOutcome) -> ToolResult {
    ToolResult {
        tool_call_id: call.id.clone(),
        tool_name: call.tool_name.clone(),
        outcome,
    }
}

fn no_presentation() -> ToolOutcome {
    ToolOutcome::Rejected(ToolRejection::Precondition {
        message: "No presentation created yet. Call create_presentation first.".to_string(),
    })
}

/// Read a string argument that schema validation already guaranteed.
fn str_arg<'a>(call: &'a ToolCall, field: &str) -> &'a str {
    call.arguments[field].as_str().unwrap_or_default()
}
