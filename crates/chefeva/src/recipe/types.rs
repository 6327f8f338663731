//! Request and reply shapes for recipe and menu generation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::RecipeConfig;

// ── Requests ───────────────────────────────────────────────────────

/// A request validation failure, reported to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("too many {field} (max {max})")]
    TooMany { field: &'static str, max: usize },
    #[error("each of {field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
    },
}

/// Ingredients and preferences for a single recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest {
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub max_minutes: Option<u32>,
    /// Language name for the reply; the generator default applies if absent.
    #[serde(default)]
    pub language: Option<String>,
}

impl RecipeRequest {
    pub fn new<S: Into<String>>(ingredients: impl IntoIterator<Item = S>) -> Self {
        Self {
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_servings(mut self, servings: u32) -> Self {
        self.servings = Some(servings);
        self
    }

    pub fn with_cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = Some(cuisine.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Check the request shape. Returns the cleaned ingredient list.
    pub fn validate(&self, config: &RecipeConfig) -> Result<Vec<String>, RequestError> {
        let ingredients = clean_list(&self.ingredients);
        if ingredients.is_empty() {
            return Err(RequestError::Missing("ingredients"));
        }
        check_list("ingredients", &ingredients, config)?;
        check_list("dietary restrictions", &clean_list(&self.dietary_restrictions), config)?;
        if let Some(servings) = self.servings {
            check_range("servings", servings, 1, config.max_servings)?;
        }
        if let Some(minutes) = self.max_minutes {
            check_range("max minutes", minutes, 5, 24 * 60)?;
        }
        Ok(ingredients)
    }
}

/// Event parameters for a multi-course menu.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuRequest {
    pub event_type: String,
    pub guests: u32,
    /// Course names in serving order. Defaults to starter, main, dessert.
    #[serde(default)]
    pub courses: Vec<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl MenuRequest {
    pub fn new(event_type: impl Into<String>, guests: u32) -> Self {
        Self {
            event_type: event_type.into(),
            guests,
            ..Default::default()
        }
    }

    /// Check the request shape. Returns the course list to plan.
    pub fn validate(&self, config: &RecipeConfig) -> Result<Vec<String>, RequestError> {
        if self.event_type.trim().is_empty() {
            return Err(RequestError::Missing("event type"));
        }
        if self.event_type.chars().count() > config.max_item_chars {
            return Err(RequestError::TooLong {
                field: "event type",
                max: config.max_item_chars,
            });
        }
        check_range("guests", self.guests, 1, config.max_guests)?;
        let mut courses = clean_list(&self.courses);
        if courses.is_empty() {
            courses = DEFAULT_COURSES.iter().map(|c| c.to_string()).collect();
        }
        if courses.len() > config.max_courses {
            return Err(RequestError::TooMany {
                field: "courses",
                max: config.max_courses,
            });
        }
        check_list("courses", &courses, config)?;
        check_list("dietary restrictions", &clean_list(&self.dietary_restrictions), config)?;
        Ok(courses)
    }
}

pub const DEFAULT_COURSES: [&str; 3] = ["starter", "main", "dessert"];

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_list(field: &'static str, items: &[String], config: &RecipeConfig) -> Result<(), RequestError> {
    if items.len() > config.max_list_items {
        return Err(RequestError::TooMany {
            field,
            max: config.max_list_items,
        });
    }
    if items.iter().any(|i| i.chars().count() > config.max_item_chars) {
        return Err(RequestError::TooLong {
            field,
            max: config.max_item_chars,
        });
    }
    Ok(())
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), RequestError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(RequestError::OutOfRange { field, min, max })
    }
}

// ── Replies ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RecipeIngredient {
    pub name: String,
    pub quantity: String,
}

/// A generated recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Recipe {
    pub title: String,
    pub description: String,
    pub servings: u32,
    pub prep_minutes: u32,
    pub cook_minutes: u32,
    #[schemars(length(min = 1))]
    pub ingredients: Vec<RecipeIngredient>,
    #[schemars(length(min = 1))]
    pub steps: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

impl Recipe {
    pub fn total_minutes(&self) -> u32 {
        self.prep_minutes.saturating_add(self.cook_minutes)
    }
}

/// One dish of a menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Course {
    /// Which course this dish fills ("starter", "main", ...).
    pub course: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub key_ingredients: Vec<String>,
}

/// A generated multi-course menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Menu {
    pub title: String,
    pub description: String,
    #[schemars(length(min = 1))]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RecipeConfig {
        RecipeConfig::default()
    }

    #[test]
    fn recipe_request_trims_and_requires_ingredients() {
        let req = RecipeRequest::new(["  leeks ", "", "potatoes"]);
        assert_eq!(req.validate(&config()).unwrap(), vec!["leeks", "potatoes"]);

        let empty = RecipeRequest::new(["  "]);
        assert_eq!(
            empty.validate(&config()),
            Err(RequestError::Missing("ingredients"))
        );
    }

    #[test]
    fn recipe_request_limits() {
        let many = RecipeRequest::new((0..31).map(|i| format!("item {i}")));
        assert!(matches!(
            many.validate(&config()),
            Err(RequestError::TooMany { field: "ingredients", .. })
        ));

        let long = RecipeRequest::new(["x".repeat(101)]);
        assert!(matches!(
            long.validate(&config()),
            Err(RequestError::TooLong { .. })
        ));

        let servings = RecipeRequest::new(["egg"]).with_servings(0);
        assert_eq!(
            servings.validate(&config()).unwrap_err().to_string(),
            "servings must be between 1 and 50"
        );
    }

    #[test]
    fn menu_request_defaults_courses() {
        let req = MenuRequest::new("birthday", 8);
        assert_eq!(
            req.validate(&config()).unwrap(),
            vec!["starter", "main", "dessert"]
        );
    }

    #[test]
    fn menu_request_rejects_bad_shapes() {
        assert_eq!(
            MenuRequest::new(" ", 8).validate(&config()),
            Err(RequestError::Missing("event type"))
        );
        assert!(matches!(
            MenuRequest::new("party", 0).validate(&config()),
            Err(RequestError::OutOfRange { field: "guests", .. })
        ));
        let mut courses = MenuRequest::new("party", 4);
        courses.courses = (0..9).map(|i| format!("course {i}")).collect();
        assert!(matches!(
            courses.validate(&config()),
            Err(RequestError::TooMany { field: "courses", .. })
        ));
    }

    #[test]
    fn requests_deserialize_camel_case() {
        let req: MenuRequest = serde_json::from_str(
            r#"{"eventType":"picnic","guests":5,"dietaryRestrictions":["vegan"]}"#,
        )
        .unwrap();
        assert_eq!(req.event_type, "picnic");
        assert_eq!(req.dietary_restrictions, vec!["vegan"]);
        assert!(req.courses.is_empty());
    }

    #[test]
    fn recipe_total_time() {
        let recipe = Recipe {
            title: "Soup".into(),
            description: "Leek and potato".into(),
            servings: 4,
            prep_minutes: 15,
            cook_minutes: 30,
            ingredients: vec![],
            steps: vec![],
            tips: vec![],
        };
        assert_eq!(recipe.total_minutes(), 45);
    }
}
