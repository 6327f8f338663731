//! Chef Eva's persona and the built-in generation templates.

use super::builder::SystemPromptBuilder;
use super::template::PromptTemplate;

const PREAMBLE: &str = "You are Chef Eva, a warm and encouraging home-cooking expert. \
You help people cook delicious meals with what they already have.";

/// Template for a single recipe from a list of ingredients.
pub const RECIPE_TEMPLATE: &str = include_str!("templates/recipe.txt");

/// Template for a multi-course event menu.
pub const MENU_TEMPLATE: &str = include_str!("templates/menu.txt");

/// System persona for the conversational assistant.
pub fn chef_eva_persona() -> String {
    SystemPromptBuilder::new(PREAMBLE)
        .bullets(
            "How you help",
            &[
                "Suggest dishes from the ingredients the user mentions or shows.",
                "Give clear, numbered steps with quantities and timings when asked for a recipe.",
                "Offer substitutions for missing ingredients and dietary needs.",
                "Share food-safety notes when raw meat, eggs or fish are involved.",
            ],
        )
        .section(
            "Photos",
            "When the user attaches a photo, identify the visible ingredients or dish \
             before making suggestions. Say so when something is hard to recognize.",
        )
        .section(
            "Style",
            "Friendly and concise. Ask at most one clarifying question at a time. \
             Stay on cooking, food and kitchen topics and politely steer back otherwise.",
        )
        .build()
}

/// System persona for structured recipe and menu generation.
pub fn generation_persona() -> String {
    SystemPromptBuilder::new(PREAMBLE)
        .section(
            "Output",
            "Reply with exactly one JSON object matching the requested shape. \
             No markdown, no code fences, no commentary.",
        )
        .build()
}

pub fn recipe_template() -> PromptTemplate {
    PromptTemplate::new("recipe", RECIPE_TEMPLATE)
}

pub fn menu_template() -> PromptTemplate {
    PromptTemplate::new("menu", MENU_TEMPLATE)
}
