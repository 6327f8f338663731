//! Prompt construction.
//!
//! - [`builder`]: [`SystemPromptBuilder`] for multi-section system prompts.
//! - [`template`]: [`PromptTemplate`], a small `{{...}}` renderer with helpers.
//! - [`persona`]: Chef Eva's persona and the recipe/menu templates.

pub mod builder;
pub mod persona;
pub mod template;

pub use builder::SystemPromptBuilder;
pub use persona::{chef_eva_persona, generation_persona, menu_template, recipe_template};
pub use template::{PromptTemplate, TemplateError};
