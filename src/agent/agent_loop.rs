//! Core agent loop implementation.
//!
//! Drives the turn-by-turn cycle: send the transcript and tool catalogue to
//! the model, interpret the reply, execute at most one tool call, append the
//! result, and decide whether to continue. Terminates deterministically in
//! exactly one of three shapes: finalized, capped, or failed.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::types::{LogEntryType, RunLogEntry};
use crate::config::RetryConfig;
use crate::llm::{LlmClient, LlmError};
use crate::slides::{BackendError, SlidesBackend};
use crate::tools::{ToolRegistry, FINALIZE_PRESENTATION};

use super::executor::{AgentRunState, ToolExecutor};
use super::prompt::build_system_prompt;
use super::transcript::{ModelUtterance, Transcript};

/// Steering message appended when the model narrates instead of acting while
/// a finished-looking deck is waiting.
const FINALIZE_NUDGE: &str =
    "Please finalize the presentation using the finalize_presentation tool.";

/// Fatal cause that ends a run as `Failed`.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model transport failed: {0}")]
    Model(#[from] LlmError),

    #[error("presentation backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("run was cancelled")]
    Cancelled,
}

/// A successfully finalized presentation.
#[derive(Debug, Clone)]
pub struct FinalizedRun {
    pub presentation_id: String,
    pub shareable_link: String,
    pub title: Option<String>,
    pub slide_count: usize,
    pub iterations: u32,
}

/// Snapshot of partial progress for capped or failed runs. Keeps whatever
/// backend resource exists so the caller is not left with an orphan.
#[derive(Debug, Clone)]
pub struct PartialRun {
    pub presentation_id: Option<String>,
    pub slide_count: usize,
    pub iterations: u32,
}

impl PartialRun {
    fn from_state(state: &AgentRunState) -> Self {
        Self {
            presentation_id: state.presentation_ref.clone(),
            slide_count: state.slide_count,
            iterations: state.iteration_count,
        }
    }
}

/// How a run ended. Never ambiguous, never null.
#[derive(Debug)]
pub enum RunOutcome {
    /// The agent finalized and shared the presentation
    Finalized(FinalizedRun),

    /// The iteration cap was hit before finalization
    Capped(PartialRun),

    /// A fatal error ended the run
    Failed {
        cause: AgentError,
        partial: PartialRun,
    },
}

/// The autonomous presentation agent.
#[derive(Clone)]
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    backend: Arc<dyn SlidesBackend>,
    registry: Arc<ToolRegistry>,
    retry: RetryConfig,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        backend: Arc<dyn SlidesBackend>,
        registry: Arc<ToolRegistry>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            llm,
            backend,
            registry,
            retry,
        }
    }

    /// Run one agent task and return the outcome plus the execution log.
    ///
    /// The run is strictly sequential: each model call and tool execution
    /// completes before the next turn begins. Cancellation is observed at
    /// the top of each turn; a call already in flight finishes but its
    /// result is discarded.
    pub async fn run(
        &self,
        prompt: &str,
        max_iterations: u32,
        cancel: CancellationToken,
    ) -> (RunOutcome, Vec<RunLogEntry>) {
        let mut log = Vec::new();
        let mut state = AgentRunState::new(max_iterations);
        let mut transcript = Transcript::new(prompt);
        let executor = ToolExecutor::new(
            self.registry.clone(),
            self.backend.clone(),
            self.retry.clone(),
        );
        let system_prompt = build_system_prompt(&self.registry);

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Run cancelled before next model call");
                return (
                    RunOutcome::Failed {
                        cause: AgentError::Cancelled,
                        partial: PartialRun::from_state(&state),
                    },
                    log,
                );
            }

            // Cap check happens before entering Thinking, so a capped run
            // never spends another model call.
            if state.iteration_count >= state.max_iterations {
                tracing::info!(
                    "Iteration cap ({}) reached with {} slides, stopping",
                    state.max_iterations,
                    state.slide_count
                );
                return (RunOutcome::Capped(PartialRun::from_state(&state)), log);
            }

            state.iteration_count += 1;
            tracing::debug!(
                "Agent iteration {}/{}",
                state.iteration_count,
                state.max_iterations
            );

            let utterance = match self
                .converse_with_retry(&system_prompt, &transcript)
                .await
            {
                Ok(utterance) => utterance,
                Err(e) => {
                    log.push(RunLogEntry::now(LogEntryType::Error, e.to_string()));
                    return (
                        RunOutcome::Failed {
                            cause: AgentError::Model(e),
                            partial: PartialRun::from_state(&state),
                        },
                        log,
                    );
                }
            };

            let (narration, call) = match utterance {
                ModelUtterance::Text(text) => {
                    log.push(RunLogEntry::now(LogEntryType::Thinking, text.clone()));
                    transcript.push_model(ModelUtterance::Text(text));

                    // Narration without action: if a deck with slides exists,
                    // steer the model toward finalizing instead of stalling.
                    if state.presentation_ref.is_some() && state.slide_count > 0 {
                        transcript.push_user(FINALIZE_NUDGE);
                    }
                    continue;
                }
                ModelUtterance::ToolUse { narration, call } => (narration, call),
            };

            if cancel.is_cancelled() {
                tracing::info!("Run cancelled before tool execution");
                return (
                    RunOutcome::Failed {
                        cause: AgentError::Cancelled,
                        partial: PartialRun::from_state(&state),
                    },
                    log,
                );
            }

            log.push(RunLogEntry::now(
                LogEntryType::ToolCall,
                format!("Calling tool: {} with args: {}", call.tool_name, call.arguments),
            ));
            transcript.push_model(ModelUtterance::ToolUse {
                narration,
                call: call.clone(),
            });

            let result = match executor.execute(&call, &mut state).await {
                Ok(result) => result,
                Err(e) => {
                    log.push(RunLogEntry::now(LogEntryType::Error, e.to_string()));
                    return (
                        RunOutcome::Failed {
                            cause: AgentError::Backend(e),
                            partial: PartialRun::from_state(&state),
                        },
                        log,
                    );
                }
            };

            log.push(RunLogEntry::now(
                LogEntryType::ToolResult,
                truncate_for_log(&result.payload_json().to_string(), 1000),
            ));

            let finalized = state.finalized
                && call.tool_name == FINALIZE_PRESENTATION
                && !result.is_error();
            transcript.push_tool_result(result);

            if finalized {
                let outcome = FinalizedRun {
                    presentation_id: state.presentation_ref.clone().unwrap_or_default(),
                    shareable_link: state.shareable_link.clone().unwrap_or_default(),
                    title: state.presentation_title.clone(),
                    slide_count: state.slide_count,
                    iterations: state.iteration_count,
                };
                log.push(RunLogEntry::now(
                    LogEntryType::Response,
                    format!(
                        "Finalized presentation with {} slides: {}",
                        outcome.slide_count, outcome.shareable_link
                    ),
                ));
                return (RunOutcome::Finalized(outcome), log);
            }
        }
    }

    /// Run one agent task on a detached tokio task.
    ///
    /// Dropping the returned future (a caller disconnect, say) cancels the
    /// run token instead of aborting the task: whatever model or backend
    /// call is in flight completes, and the run stops at its next
    /// cancellation checkpoint.
    pub async fn run_detached(
        &self,
        prompt: &str,
        max_iterations: u32,
    ) -> Result<(RunOutcome, Vec<RunLogEntry>), tokio::task::JoinError> {
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let agent = self.clone();
        let prompt = prompt.to_string();
        tokio::spawn(async move { agent.run(&prompt, max_iterations, cancel).await }).await
    }

    /// One model round-trip, retrying retryable transport failures with
    /// backoff until the budget is spent.
    async fn converse_with_retry(
        &self,
        system_prompt: &str,
        transcript: &Transcript,
    ) -> Result<ModelUtterance, LlmError> {
        let mut attempt = 1u32;
        loop {
            match self
                .llm
                .converse(system_prompt, transcript, self.registry.definitions())
                .await
            {
                Ok(utterance) => return Ok(utterance),
                Err(e) if e.retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff_delay(attempt);
                    tracing::warn!(
                        "Model call failed (attempt {}), retrying in {:?}: {}",
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

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut idx = max_len;
        while idx > 0 && !s.is_char_boundary(idx) {
            idx -= 1;
        }
        format!("{}... [truncated]", &s[..idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "héllo wörld".repeat(200);
        let t = truncate_for_log(&s, 1000);
        assert!(t.ends_with("[truncated]"));
        assert!(t.len() <= 1000 + "... [truncated]".len());
    }
}
