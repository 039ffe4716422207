//! Tool schema registry - the closed set of operations the model may request.
//!
//! One `ToolRegistry` value is built at startup and shared (behind an `Arc`)
//! between the model-facing catalogue and the executor's argument validation,
//! so the schemas the model sees are always the schemas calls are checked
//! against.

mod schema;

pub use schema::{validate_arguments, ArgumentError};

use serde_json::{json, Value};

/// A single invokable operation: name, parameter schema, description.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Tool name the model uses to request it
    pub name: &'static str,

    /// Human-readable description shown to the model
    pub description: &'static str,

    /// JSON schema for the tool's arguments
    pub parameters: Value,
}

/// Tool names, referenced by the executor's dispatch.
pub const CREATE_PRESENTATION: &str = "create_presentation";
pub const ADD_SLIDE: &str = "add_slide";
pub const REVIEW_PRESENTATION: &str = "review_presentation";
pub const REFINE_SLIDE: &str = "refine_slide";
pub const FINALIZE_PRESENTATION: &str = "finalize_presentation";

/// Static catalogue of the operations available to the model.
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Build the catalogue. The definitions are fixed for the process
    /// lifetime.
    pub fn new() -> Self {
        let definitions = vec![
            ToolDefinition {
                name: CREATE_PRESENTATION,
                description: "Initializes the presentation by clearing all existing slides from the template. Call this first before adding new slides.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "The title/theme of the presentation, used to guide slide creation"
                        }
                    },
                    "required": ["title"]
                }),
            },
            ToolDefinition {
                name: ADD_SLIDE,
                description: "Adds a new slide to the presentation. Use this to add content slides after creating the presentation.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "layout": {
                            "type": "string",
                            "enum": ["TITLE", "TITLE_AND_BODY", "TITLE_AND_TWO_COLUMNS", "BLANK"],
                            "description": "The layout type for the slide. Use TITLE for title slides, TITLE_AND_BODY for content slides."
                        },
                        "title": {
                            "type": "string",
                            "description": "The title text for the slide"
                        },
                        "content": {
                            "type": "string",
                            "description": "The body content for the slide. Use bullet points or paragraphs. Use \\n for line breaks."
                        }
                    },
                    "required": ["layout", "title", "content"]
                }),
            },
            ToolDefinition {
                name: REVIEW_PRESENTATION,
                description: "Reviews the current state of the presentation. Returns information about all slides created so far, including their titles and content. Use this to check your work before finalizing.",
                parameters: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            ToolDefinition {
                name: REFINE_SLIDE,
                description: "Refines or updates an existing slide's content. Use this to improve slides after reviewing the presentation.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "slide_index": {
                            "type": "integer",
                            "description": "The index of the slide to refine (0-based)"
                        },
                        "new_content": {
                            "type": "string",
                            "description": "The updated content for the slide. This replaces the existing content."
                        },
                        "new_title": {
                            "type": "string",
                            "description": "Optional: new title for the slide. If not provided, the title is unchanged."
                        }
                    },
                    "required": ["slide_index", "new_content"]
                }),
            },
            ToolDefinition {
                name: FINALIZE_PRESENTATION,
                description: "Finalizes the presentation by sharing it and generating a shareable link. Call this when you're done creating and refining all slides. This should be your last action.",
                parameters: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
        ];

        Self { definitions }
    }

    /// All tool definitions, in catalogue order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Look up a single definition by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_contains_all_five_tools() {
        let registry = ToolRegistry::new();
        let names: Vec<_> = registry.definitions().iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                CREATE_PRESENTATION,
                ADD_SLIDE,
                REVIEW_PRESENTATION,
                REFINE_SLIDE,
                FINALIZE_PRESENTATION
            ]
        );
    }

    #[test]
    fn get_finds_known_tools_only() {
        let registry = ToolRegistry::new();
        assert!(registry.get(ADD_SLIDE).is_some());
        assert!(registry.get("delete_everything").is_none());
    }

    #[test]
    fn add_slide_layout_is_a_closed_enum() {
        let registry = ToolRegistry::new();
        let def = registry.get(ADD_SLIDE).unwrap();
        let layouts = def.parameters["properties"]["layout"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(layouts.len(), 4);
    }
}
