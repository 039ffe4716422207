//! HTTP front door for the agent.
//!
//! A thin layer: one entry point that runs the agent and maps its three
//! outcome shapes to success/4xx/5xx responses, plus health endpoints.

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
