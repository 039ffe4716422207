//! Agent module - the core autonomous agent logic.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Seed the transcript with the user's prompt
//! 2. Call the model with the tool catalogue
//! 3. If the model requests a tool, execute it and feed the result back
//! 4. Repeat until the presentation is finalized, the iteration cap is hit,
//!    or a fatal error occurs

mod agent_loop;
mod executor;
mod prompt;
pub mod transcript;

pub use agent_loop::{Agent, AgentError, FinalizedRun, PartialRun, RunOutcome};
pub use executor::{AgentRunState, SlideRecord, ToolExecutor};
pub use prompt::build_system_prompt;
