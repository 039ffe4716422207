//! Presentation backend boundary.
//!
//! The agent drives an opaque presentation-editing service through the
//! [`SlidesBackend`] trait: create, add a slide, snapshot for review, refine
//! a slide, share. The production implementation talks to the Google Slides
//! and Drive APIs; tests substitute an in-memory fake.

mod google;

pub use google::GoogleSlidesClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slide layout kinds supported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlideLayout {
    Title,
    TitleAndBody,
    TitleAndTwoColumns,
    Blank,
}

impl SlideLayout {
    /// Wire name used in Slides API requests and tool arguments.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideLayout::Title => "TITLE",
            SlideLayout::TitleAndBody => "TITLE_AND_BODY",
            SlideLayout::TitleAndTwoColumns => "TITLE_AND_TWO_COLUMNS",
            SlideLayout::Blank => "BLANK",
        }
    }

    /// Whether the layout carries a body placeholder in addition to a title.
    pub fn has_body(&self) -> bool {
        matches!(self, SlideLayout::TitleAndBody | SlideLayout::TitleAndTwoColumns)
    }
}

/// One slide in a review snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideInfo {
    /// 0-based position in the deck
    pub index: usize,

    /// Backend object id of the slide
    pub slide_id: String,

    /// Extracted title text
    pub title: String,

    /// Extracted body text
    pub content: String,
}

/// Current state of a presentation, as reported for agent review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationSnapshot {
    pub presentation_id: String,
    pub title: String,
    pub total_slides: usize,
    pub slides: Vec<SlideInfo>,
}

/// Failure talking to the presentation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport failure (connect, timeout, body read)
    #[error("backend transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with an error status
    #[error("backend returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The backend answered successfully but the payload made no sense
    #[error("unexpected backend response: {0}")]
    UnexpectedResponse(String),
}

impl BackendError {
    /// Whether the failure is worth retrying with backoff.
    ///
    /// Rate limits and server-side errors are; auth/permission/validation
    /// errors and malformed responses are not.
    pub fn retryable(&self) -> bool {
        match self {
            BackendError::Transport(e) => e.is_timeout() || e.is_connect(),
            BackendError::Api { status, .. } => *status == 429 || *status >= 500,
            BackendError::UnexpectedResponse(_) => false,
        }
    }
}

/// The fixed operation set of the presentation backend.
#[async_trait]
pub trait SlidesBackend: Send + Sync {
    /// Prepare an empty presentation and return its opaque reference.
    async fn create_presentation(&self, title: &str) -> Result<String, BackendError>;

    /// Append a slide; returns the backend id of the new slide.
    async fn add_slide(
        &self,
        presentation_id: &str,
        layout: SlideLayout,
        title: &str,
        content: &str,
    ) -> Result<String, BackendError>;

    /// Read back the full deck for review.
    async fn snapshot(&self, presentation_id: &str) -> Result<PresentationSnapshot, BackendError>;

    /// Replace the content (and optionally the title) of an existing slide.
    async fn refine_slide(
        &self,
        presentation_id: &str,
        slide_index: usize,
        new_content: &str,
        new_title: Option<&str>,
    ) -> Result<(), BackendError>;

    /// Share the presentation and return the shareable link.
    async fn share(&self, presentation_id: &str) -> Result<String, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_round_trips_through_wire_names() {
        for layout in [
            SlideLayout::Title,
            SlideLayout::TitleAndBody,
            SlideLayout::TitleAndTwoColumns,
            SlideLayout::Blank,
        ] {
            let wire = serde_json::to_value(layout).unwrap();
            assert_eq!(wire, layout.as_str());
            let back: SlideLayout = serde_json::from_value(wire).unwrap();
            assert_eq!(back, layout);
        }
    }

    #[test]
    fn only_body_layouts_have_bodies() {
        assert!(SlideLayout::TitleAndBody.has_body());
        assert!(SlideLayout::TitleAndTwoColumns.has_body());
        assert!(!SlideLayout::Title.has_body());
        assert!(!SlideLayout::Blank.has_body());
    }

    #[test]
    fn api_errors_classify_retryability_by_status() {
        let rate_limited = BackendError::Api {
            status: 429,
            message: "quota".to_string(),
        };
        let server = BackendError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        let forbidden = BackendError::Api {
            status: 403,
            message: "insufficient permissions".to_string(),
        };
        assert!(rate_limited.retryable());
        assert!(server.retryable());
        assert!(!forbidden.retryable());
    }
}
