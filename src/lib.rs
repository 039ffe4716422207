//! # Deck Agent
//!
//! An autonomous agent that builds and shares Google Slides presentations.
//!
//! This library provides:
//! - An HTTP API for submitting presentation prompts
//! - A tool-based agent loop that drives a presentation-editing backend
//! - Integration with the Anthropic Messages API for tool selection
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a prompt via the API
//! 2. Build context with the system prompt and the tool catalogue
//! 3. Call the model; if it requests a tool, execute it against Google Slides
//! 4. Feed the result back and repeat until the presentation is finalized,
//!    the iteration cap is hit, or a fatal error occurs
//!
//! ## Example
//!
//! ```rust,ignore
//! use deck_agent::{agent::Agent, config::Config, tools::ToolRegistry};
//!
//! let config = Config::from_env()?;
//! let agent = Agent::new(llm, backend, registry, config.retry.clone());
//! let (outcome, log) = agent.run("The history of aviation", 20, cancel).await;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod slides;
pub mod tools;

pub use config::Config;
