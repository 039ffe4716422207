//! System prompt template for the agent.

use crate::tools::ToolRegistry;

/// Build the system prompt with tool definitions.
pub fn build_system_prompt(tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .definitions()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert AI agent that creates Google Slides presentations.

Your task is to:
1. Create a presentation using the create_presentation tool
2. Add slides one by one using the add_slide tool
3. Optionally review the presentation using review_presentation
4. Optionally refine slides using refine_slide if needed
5. Finalize the presentation using finalize_presentation when done

## Available Tools
{tool_descriptions}

## Guidelines
- Create 5-10 comprehensive slides
- First slide should be a title slide (use TITLE layout)
- Use TITLE_AND_BODY layout for content slides
- Make content informative and well-organized
- Ensure logical flow between slides
- Review your work before finalizing if you want to improve it
- Always call finalize_presentation as your last action

Think step by step and use the tools available to you."#,
        tool_descriptions = tool_descriptions
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_tool() {
        let registry = ToolRegistry::new();
        let prompt = build_system_prompt(&registry);
        for definition in registry.definitions() {
            assert!(prompt.contains(definition.name));
        }
    }
}
