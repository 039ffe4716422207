//! HTTP routes and server setup.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::agent::{Agent, AgentError, RunOutcome};
use crate::config::Config;
use crate::llm::AnthropicClient;
use crate::slides::GoogleSlidesClient;
use crate::tools::ToolRegistry;

use super::types::{
    GeneratePresentationRequest, GeneratePresentationResponse, HealthResponse, PartialProgress,
    RunErrorResponse, RunLogEntry,
};

/// Shared state for all request handlers.
pub struct AppState {
    pub agent: Agent,
    pub default_max_iterations: u32,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/generate-presentation", post(generate_presentation))
        .with_state(state)
}

/// Wire up the agent and serve the HTTP API.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let registry = Arc::new(ToolRegistry::new());
    let llm = Arc::new(AnthropicClient::new(
        config.anthropic_api_key.clone(),
        config.agent_model.clone(),
        config.request_timeout,
    )?);
    let backend = Arc::new(GoogleSlidesClient::new(
        config.google_access_token.clone(),
        config.template_presentation_id.clone(),
        config.request_timeout,
    )?);
    let agent = Agent::new(llm, backend, registry, config.retry.clone());

    let state = Arc::new(AppState {
        agent,
        default_max_iterations: config.max_iterations,
    });

    let app = router(state)
        .layer(build_cors(&config))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS policy: permissive in dev mode, otherwise local frontends plus the
/// configured deployment origin.
fn build_cors(config: &Config) -> CorsLayer {
    if config.dev_mode {
        return CorsLayer::permissive();
    }

    let mut origins: Vec<HeaderValue> = vec![
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://127.0.0.1:5173"),
    ];
    if let Some(origin) = &config.frontend_origin {
        match origin.parse() {
            Ok(value) => origins.push(value),
            Err(_) => tracing::warn!("Ignoring invalid FRONTEND_URL origin: {}", origin),
        }
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Deck Agent API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Run the agent for one prompt and map the outcome onto a status code:
/// finalized -> 200, capped -> 422, failed -> 502.
async fn generate_presentation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GeneratePresentationRequest>,
) -> Response {
    let run_id = Uuid::new_v4();

    if request.prompt.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "prompt must not be empty" })),
        )
            .into_response();
    }

    let max_iterations = request
        .max_iterations
        .unwrap_or(state.default_max_iterations);
    tracing::info!(
        "Run {}: generating presentation (cap {} iterations)",
        run_id,
        max_iterations
    );

    // The run lives on its own task; if the caller disconnects, the dropped
    // handler future cancels the run instead of aborting it mid-call.
    let (outcome, log) = match state
        .agent
        .run_detached(&request.prompt, max_iterations)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Run {}: run task failed: {}", run_id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "run task failed" })),
            )
                .into_response();
        }
    };

    outcome_response(run_id, outcome, log)
}

fn outcome_response(run_id: Uuid, outcome: RunOutcome, log: Vec<RunLogEntry>) -> Response {
    match outcome {
        RunOutcome::Finalized(run) => {
            tracing::info!(
                "Run {}: finalized {} slides in {} iterations",
                run_id,
                run.slide_count,
                run.iterations
            );
            (
                StatusCode::OK,
                Json(GeneratePresentationResponse {
                    run_id,
                    presentation_id: run.presentation_id,
                    shareable_link: run.shareable_link,
                    title: run.title,
                    slide_count: run.slide_count,
                    iterations: run.iterations,
                }),
            )
                .into_response()
        }
        RunOutcome::Capped(partial) => {
            tracing::warn!(
                "Run {}: iteration cap hit after {} slides",
                run_id,
                partial.slide_count
            );
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(RunErrorResponse {
                    run_id,
                    error_type: "iteration_cap_exceeded".to_string(),
                    error: format!(
                        "Agent did not complete the task within {} iterations. \
                         Presentation may be incomplete.",
                        partial.iterations
                    ),
                    partial: Some(PartialProgress {
                        presentation_id: partial.presentation_id,
                        slide_count: partial.slide_count,
                        iterations: partial.iterations,
                    }),
                }),
            )
                .into_response()
        }
        RunOutcome::Failed { cause, partial } => {
            tracing::error!("Run {}: failed: {}", run_id, cause);
            for entry in &log {
                tracing::debug!("Run {} log: {:?} {}", run_id, entry.entry_type, entry.content);
            }
            (
                StatusCode::BAD_GATEWAY,
                Json(RunErrorResponse {
                    run_id,
                    error_type: error_type(&cause).to_string(),
                    error: cause.to_string(),
                    partial: Some(PartialProgress {
                        presentation_id: partial.presentation_id,
                        slide_count: partial.slide_count,
                        iterations: partial.iterations,
                    }),
                }),
            )
                .into_response()
        }
    }
}

fn error_type(cause: &AgentError) -> &'static str {
    match cause {
        AgentError::Model(_) => "model_transport_error",
        AgentError::Backend(_) => "backend_error",
        AgentError::Cancelled => "cancelled",
    }
}
