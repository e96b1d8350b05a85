//! # Prompts
//!
//! Prompt construction for the vision, planning and validation calls.

use agentic_core::{PlanningRequest, ToolRegistry};

/// Vision prompt: list the interactive elements relevant to `goal`
pub fn vision_prompt(goal: &str) -> String {
    format!(
        "You are a computer vision assistant looking at a screenshot. \
         Identify the interactive UI elements that matter for this goal: '{goal}'. \
         Cover buttons, input fields, links and menus. For every element give a short \
         description and its bounding box as [x1, y1, x2, y2], one element per line, e.g.\n\
         Element: Search input field, Coords: [450, 300, 650, 340]"
    )
}

/// System prompt for the planning call
pub fn planning_system_prompt() -> &'static str {
    "You are an agent operating a computer on behalf of a user. Break the user's goal into \
     small, concrete steps. Reply with exactly one JSON object and nothing else. It has three keys:\n\
     1. \"thought\": a short assessment of the situation and why the next step makes sense.\n\
     2. \"intermediate_goal\": the objective of this turn only.\n\
     3. \"plan\": a list of one or more tool calls, each {\"tool\": ..., \"parameters\": {...}}."
}

/// Tool descriptions shown to the planner, restricted to registered tools
pub fn tool_catalogue(registry: &ToolRegistry) -> String {
    const DESCRIPTIONS: &[(&str, &str)] = &[
        ("navigate", "`navigate(url)`: open a URL in the browser."),
        (
            "click",
            "`click(selector)` or `click(coordinates: [x, y])`: click the element matching a CSS selector, or a screen position.",
        ),
        (
            "type_text",
            "`type_text(text, selector?)`: type into the element matching the selector, or into the focused element when no selector is given.",
        ),
        ("scroll", "`scroll(direction: \"up\" | \"down\")`: scroll the page."),
        (
            "finish_task",
            "`finish_task(result)`: end the task. `result` MUST carry the actual information that answers the goal, not a description of the screen.",
        ),
    ];

    let mut lines: Vec<String> = DESCRIPTIONS
        .iter()
        .filter(|(name, _)| registry.contains(name))
        .map(|(_, text)| format!("- {}", text))
        .collect();

    for name in registry.names() {
        if !DESCRIPTIONS.iter().any(|(known, _)| *known == name) {
            lines.push(format!("- `{}(...)`", name));
        }
    }

    lines.join("\n")
}

/// User prompt for the planning call
pub fn planning_user_prompt(request: &PlanningRequest<'_>, registry: &ToolRegistry) -> String {
    let history = if request.history.is_empty() {
        "None".to_string()
    } else {
        request
            .history
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("{}. {}", i + 1, entry))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r##"Main goal: "{goal}"

Current screen:
{screen}

History so far:
{history}

Error from the previous step:
{error}

Rules:
1. Read the goal, the screen, the history and the error before deciding anything.
2. Pick the single most sensible next objective as `intermediate_goal`.
3. Put every action needed for it in `plan`. Group actions that need no new look at the screen (for example filling a username, a password and pressing login).
4. If the screen shows the goal is achieved, the plan must call `finish_task`.
5. If the previous step failed, do not repeat it unchanged.

Available tools:
{tools}

Example:
{{
    "thought": "The login form is visible, so I can fill it and submit.",
    "intermediate_goal": "Log into the account.",
    "plan": [
        {{"tool": "type_text", "parameters": {{"selector": "#username", "text": "my_user"}}}},
        {{"tool": "type_text", "parameters": {{"selector": "#password", "text": "my_password"}}}},
        {{"tool": "click", "parameters": {{"selector": "button[type='submit']"}}}}
    ]
}}"##,
        goal = request.goal,
        screen = request.screen_description,
        history = history,
        error = request.previous_error.unwrap_or("None"),
        tools = tool_catalogue(registry),
    )
}

/// System prompt for completion validation
pub fn completion_system_prompt() -> &'static str {
    "You are a strict validation agent. Decide whether the user's goal has been achieved, \
     judging only from the description of the final screen. Be skeptical and never assume \
     completion. Reply with one JSON object: {\"is_complete\": true|false, \"reasoning\": \"...\"}."
}

/// User prompt for completion validation
pub fn completion_user_prompt(goal: &str, screen_description: &str) -> String {
    format!(
        "User goal: \"{goal}\"\n\nFinal screen:\n{screen_description}\n\n\
         Has the goal been fully achieved?"
    )
}

/// Prompt for validating a single action against a screenshot
pub fn action_validation_prompt(desired_outcome: &str) -> String {
    format!(
        "You are a careful validation assistant. Does this screenshot show the desired outcome? \
         Desired outcome: '{desired_outcome}'. Reply with one JSON object: \
         {{\"validated\": true|false, \"reasoning\": \"...\"}}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_prompt_contents() {
        let history = vec!["Vision Analysis: a form".to_string()];
        let request = PlanningRequest {
            goal: "log in",
            screen_description: "Element: Login button, Coords: [1, 2, 3, 4]",
            history: &history,
            previous_error: Some("Element not found: #user"),
        };
        let prompt = planning_user_prompt(&request, &ToolRegistry::default());

        assert!(prompt.contains("Main goal: \"log in\""));
        assert!(prompt.contains("Login button"));
        assert!(prompt.contains("1. Vision Analysis: a form"));
        assert!(prompt.contains("Element not found: #user"));
        assert!(prompt.contains("`finish_task(result)`"));
        assert!(prompt.contains("\"intermediate_goal\": \"Log into the account.\""));
    }

    #[test]
    fn test_planning_prompt_without_error() {
        let request = PlanningRequest {
            goal: "g",
            screen_description: "",
            history: &[],
            previous_error: None,
        };
        let prompt = planning_user_prompt(&request, &ToolRegistry::default());
        assert!(prompt.contains("History so far:\nNone"));
        assert!(prompt.contains("Error from the previous step:\nNone"));
    }

    #[test]
    fn test_catalogue_follows_registry() {
        let mut registry = ToolRegistry::empty();
        registry.register_extension("hover");
        registry.register("finish_task", agentic_core::ToolKind::Terminal);
        let catalogue = tool_catalogue(&registry);
        assert!(catalogue.contains("finish_task"));
        assert!(catalogue.contains("`hover(...)`"));
        assert!(!catalogue.contains("navigate"));
    }

    #[test]
    fn test_vision_prompt_mentions_goal() {
        assert!(vision_prompt("buy a stool").contains("'buy a stool'"));
    }
}
