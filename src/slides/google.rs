//! Google Slides/Drive implementation of the presentation backend.
//!
//! "Create" reuses a pre-configured template presentation and clears its
//! slides; adding and refining slides go through `presentations.batchUpdate`;
//! sharing creates an anyone-with-link Drive permission and reads back the
//! web view link.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{BackendError, PresentationSnapshot, SlideInfo, SlideLayout, SlidesBackend};

const SLIDES_BASE: &str = "https://slides.googleapis.com/v1";
const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Backend client for the Google Slides and Drive APIs.
pub struct GoogleSlidesClient {
    http: reqwest::Client,
    access_token: String,
    template_presentation_id: String,
}

impl GoogleSlidesClient {
    /// Build a client with the given bearer token and template presentation.
    pub fn new(
        access_token: String,
        template_presentation_id: String,
        timeout: std::time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("deck-agent/0.3")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            access_token,
            template_presentation_id,
        })
    }

    async fn get_presentation(&self, presentation_id: &str) -> Result<Value, BackendError> {
        let url = format!("{}/presentations/{}", SLIDES_BASE, presentation_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        read_json(response).await
    }

    async fn batch_update(
        &self,
        presentation_id: &str,
        requests: Vec<Value>,
    ) -> Result<Value, BackendError> {
        let url = format!(
            "{}/presentations/{}:batchUpdate",
            SLIDES_BASE, presentation_id
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl SlidesBackend for GoogleSlidesClient {
    async fn create_presentation(&self, title: &str) -> Result<String, BackendError> {
        tracing::info!("Preparing template presentation for: {}", title);

        // Clear every existing slide so the agent starts from a blank deck.
        let presentation = self.get_presentation(&self.template_presentation_id).await?;
        let slide_ids = existing_slide_ids(&presentation);
        if !slide_ids.is_empty() {
            let requests = build_clear_requests(&slide_ids);
            self.batch_update(&self.template_presentation_id, requests)
                .await?;
        }

        Ok(self.template_presentation_id.clone())
    }

    async fn add_slide(
        &self,
        presentation_id: &str,
        layout: SlideLayout,
        title: &str,
        content: &str,
    ) -> Result<String, BackendError> {
        let ids = SlideObjectIds::generate(layout, title);
        let requests = build_add_slide_requests(layout, title, content, &ids);
        let response = self.batch_update(presentation_id, requests).await?;

        created_slide_id(&response).ok_or_else(|| {
            BackendError::UnexpectedResponse("batchUpdate reply had no createSlide id".to_string())
        })
    }

    async fn snapshot(&self, presentation_id: &str) -> Result<PresentationSnapshot, BackendError> {
        let presentation = self.get_presentation(presentation_id).await?;
        Ok(extract_snapshot(presentation_id, &presentation))
    }

    async fn refine_slide(
        &self,
        presentation_id: &str,
        slide_index: usize,
        new_content: &str,
        new_title: Option<&str>,
    ) -> Result<(), BackendError> {
        let presentation = self.get_presentation(presentation_id).await?;
        let slides = presentation["slides"].as_array().cloned().unwrap_or_default();

        let slide = slides.get(slide_index).ok_or_else(|| {
            BackendError::UnexpectedResponse(format!(
                "slide index {} out of range, presentation has {} slides",
                slide_index,
                slides.len()
            ))
        })?;

        let (title_element_id, body_element_id) = text_element_ids(slide);
        let requests =
            build_refine_requests(title_element_id, body_element_id, new_content, new_title);

        if !requests.is_empty() {
            self.batch_update(presentation_id, requests).await?;
        }

        Ok(())
    }

    async fn share(&self, presentation_id: &str) -> Result<String, BackendError> {
        // Anyone-with-link reader permission.
        let url = format!("{}/files/{}/permissions", DRIVE_BASE, presentation_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await?;
        read_json(response).await?;

        let url = format!(
            "{}/files/{}?fields=webViewLink",
            DRIVE_BASE, presentation_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let file = read_json(response).await?;

        file["webViewLink"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| {
                BackendError::UnexpectedResponse("file metadata had no webViewLink".to_string())
            })
    }
}

/// Parse a response body, mapping error statuses to `BackendError::Api`.
async fn read_json(response: reqwest::Response) -> Result<Value, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let body = response.text().await.unwrap_or_default();
        let message = body
            .get(..500)
            .map(String::from)
            .unwrap_or(body);
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Object ids for a new slide's placeholders. Slides object ids must start
/// with a word character and only contain `[a-zA-Z0-9_-]`.
struct SlideObjectIds {
    title: String,
    body: String,
}

impl SlideObjectIds {
    fn generate(layout: SlideLayout, title: &str) -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis() % 1_000_000;
        let safe_title: String = title
            .chars()
            .take(10)
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();

        Self {
            title: format!("slide_title_{}_{}_{}", layout.as_str(), timestamp, safe_title),
            body: format!("slide_body_{}_{}_{}", layout.as_str(), timestamp, safe_title),
        }
    }
}

fn existing_slide_ids(presentation: &Value) -> Vec<String> {
    presentation["slides"]
        .as_array()
        .map(|slides| {
            slides
                .iter()
                .filter_map(|s| s["objectId"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Delete requests for every slide, last first so indices stay stable.
fn build_clear_requests(slide_ids: &[String]) -> Vec<Value> {
    slide_ids
        .iter()
        .rev()
        .map(|id| json!({ "deleteObject": { "objectId": id } }))
        .collect()
}

fn build_add_slide_requests(
    layout: SlideLayout,
    title: &str,
    content: &str,
    ids: &SlideObjectIds,
) -> Vec<Value> {
    let mut placeholder_mappings = vec![json!({
        "objectId": ids.title,
        "layoutPlaceholder": { "type": "TITLE", "index": 0 }
    })];

    if layout.has_body() {
        placeholder_mappings.push(json!({
            "objectId": ids.body,
            "layoutPlaceholder": { "type": "BODY", "index": 0 }
        }));
    }

    let mut requests = vec![
        json!({
            "createSlide": {
                "slideLayoutReference": { "predefinedLayout": layout.as_str() },
                "placeholderIdMappings": placeholder_mappings
            }
        }),
        json!({
            "insertText": { "objectId": ids.title, "text": title }
        }),
    ];

    if layout.has_body() && !content.is_empty() {
        // Tool arguments carry literal "\n" sequences for line breaks.
        let formatted = content.replace("\\n", "\n");
        requests.push(json!({
            "insertText": { "objectId": ids.body, "text": formatted }
        }));
    }

    requests
}

fn created_slide_id(response: &Value) -> Option<String> {
    response["replies"].as_array().and_then(|replies| {
        replies
            .iter()
            .find_map(|r| r["createSlide"]["objectId"].as_str().map(String::from))
    })
}

fn extract_snapshot(presentation_id: &str, presentation: &Value) -> PresentationSnapshot {
    let empty = Vec::new();
    let slides = presentation["slides"].as_array().unwrap_or(&empty);

    let slides_info = slides
        .iter()
        .enumerate()
        .map(|(index, slide)| {
            let (title, content) = extract_slide_text(slide);
            SlideInfo {
                index,
                slide_id: slide["objectId"].as_str().unwrap_or_default().to_string(),
                title,
                content,
            }
        })
        .collect();

    PresentationSnapshot {
        presentation_id: presentation_id.to_string(),
        title: presentation["title"].as_str().unwrap_or_default().to_string(),
        total_slides: slides.len(),
        slides: slides_info,
    }
}

/// Pull title and body text out of a slide's page elements. The first text
/// run is taken as the title, everything after it as body content.
fn extract_slide_text(slide: &Value) -> (String, String) {
    let mut title = String::new();
    let mut body = String::new();

    let empty = Vec::new();
    for element in slide["pageElements"].as_array().unwrap_or(&empty) {
        let runs = element["shape"]["text"]["textElements"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        for run in runs {
            if let Some(text) = run["textRun"]["content"].as_str() {
                if title.is_empty() {
                    title = text.trim().to_string();
                } else {
                    body.push_str(text);
                }
            }
        }
    }

    (title, body.trim().to_string())
}

/// Identify the title and body text elements of a slide. First text box is
/// the title, second the body.
fn text_element_ids(slide: &Value) -> (Option<String>, Option<String>) {
    let mut title_id = None;
    let mut body_id = None;

    let empty = Vec::new();
    for element in slide["pageElements"].as_array().unwrap_or(&empty) {
        if element["shape"].is_object() {
            let id = element["objectId"].as_str().map(String::from);
            if title_id.is_none() {
                title_id = id;
            } else if body_id.is_none() {
                body_id = id;
            }
        }
    }

    (title_id, body_id)
}

fn build_refine_requests(
    title_element_id: Option<String>,
    body_element_id: Option<String>,
    new_content: &str,
    new_title: Option<&str>,
) -> Vec<Value> {
    let mut requests = Vec::new();

    if let (Some(title), Some(element_id)) = (new_title, &title_element_id) {
        requests.push(json!({
            "deleteText": { "objectId": element_id, "textRange": { "type": "ALL" } }
        }));
        requests.push(json!({
            "insertText": { "objectId": element_id, "text": title }
        }));
    }

    if let Some(element_id) = &body_element_id {
        if !new_content.is_empty() {
            let formatted = new_content.replace("\\n", "\n");
            requests.push(json!({
                "deleteText": { "objectId": element_id, "textRange": { "type": "ALL" } }
            }));
            requests.push(json!({
                "insertText": { "objectId": element_id, "text": formatted }
            }));
        }
    }

    requests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids_are_sanitized() {
        let ids = SlideObjectIds::generate(SlideLayout::TitleAndBody, "AI & ML: The Future");
        assert!(ids.title.starts_with("slide_title_TITLE_AND_BODY_"));
        assert!(ids
            .title
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn clear_requests_delete_in_reverse_order() {
        let ids = vec!["s1".to_string(), "s2".to_string(), "s3".to_string()];
        let requests = build_clear_requests(&ids);
        assert_eq!(requests[0]["deleteObject"]["objectId"], "s3");
        assert_eq!(requests[2]["deleteObject"]["objectId"], "s1");
    }

    #[test]
    fn title_layout_has_no_body_placeholder() {
        let ids = SlideObjectIds::generate(SlideLayout::Title, "Cover");
        let requests = build_add_slide_requests(SlideLayout::Title, "Cover", "ignored", &ids);

        let mappings = requests[0]["createSlide"]["placeholderIdMappings"]
            .as_array()
            .unwrap();
        assert_eq!(mappings.len(), 1);
        // Only createSlide + title insertText; no body insert.
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn body_layout_inserts_content_with_unescaped_newlines() {
        let ids = SlideObjectIds::generate(SlideLayout::TitleAndBody, "Agenda");
        let requests =
            build_add_slide_requests(SlideLayout::TitleAndBody, "Agenda", "a\\nb", &ids);

        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2]["insertText"]["text"], "a\nb");
    }

    #[test]
    fn snapshot_extraction_reads_titles_and_bodies() {
        let presentation = serde_json::json!({
            "title": "Demo Deck",
            "slides": [
                {
                    "objectId": "slide_1",
                    "pageElements": [
                        { "objectId": "t1", "shape": { "text": { "textElements": [
                            { "textRun": { "content": "Welcome\n" } }
                        ] } } },
                        { "objectId": "b1", "shape": { "text": { "textElements": [
                            { "textRun": { "content": "First point\n" } },
                            { "textRun": { "content": "Second point\n" } }
                        ] } } }
                    ]
                }
            ]
        });

        let snapshot = extract_snapshot("p-1", &presentation);
        assert_eq!(snapshot.title, "Demo Deck");
        assert_eq!(snapshot.total_slides, 1);
        assert_eq!(snapshot.slides[0].title, "Welcome");
        assert!(snapshot.slides[0].content.contains("Second point"));
    }

    #[test]
    fn refine_without_title_touches_body_only() {
        let requests = build_refine_requests(
            Some("title_el".to_string()),
            Some("body_el".to_string()),
            "new content",
            None,
        );
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["deleteText"]["objectId"], "body_el");
        assert_eq!(requests[1]["insertText"]["objectId"], "body_el");
    }

    #[test]
    fn created_slide_id_comes_from_first_create_reply() {
        let response = serde_json::json!({
            "replies": [
                { "insertText": {} },
                { "createSlide": { "objectId": "slide_abc" } }
            ]
        });
        assert_eq!(created_slide_id(&response).as_deref(), Some("slide_abc"));
    }
}
