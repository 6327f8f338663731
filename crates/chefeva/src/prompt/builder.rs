//! Structured system prompt builder.
//!
//! [`SystemPromptBuilder`] assembles multi-section prompts. Chef Eva's
//! persona and the generation personas are built with it.

/// Builder for multi-section system prompts.
///
/// Sections are joined with double newlines. Empty sections are skipped.
///
/// # Example
///
/// ```
/// use chefeva::prompt::SystemPromptBuilder;
///
/// let prompt = SystemPromptBuilder::new("You are Chef Eva.")
///     .section("Kitchen", "Oven and two burners.")
///     .section("Allergies", "")
///     .bullets("Pantry", &["rice", "lentils"])
///     .build();
///
/// assert!(prompt.contains("## Kitchen"));
/// assert!(prompt.contains("- lentils"));
/// assert!(!prompt.contains("## Allergies"));
/// ```
pub struct SystemPromptBuilder {
    sections: Vec<String>,
}

impl SystemPromptBuilder {
    /// Create a builder with a preamble, included as-is without a heading.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
        }
    }

    /// Append a `## heading` section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(format!("## {heading}\n\n{content}"));
        }
        self
    }

    /// Append a bulleted section from a list of items. Skipped when empty.
    pub fn bullets<S: AsRef<str>>(self, heading: &str, items: &[S]) -> Self {
        let content = items
            .iter()
            .map(|i| format!("- {}", i.as_ref()))
            .collect::<Vec<_>>()
            .join("\n");
        self.section(heading, content)
    }

    /// Join all sections with double newlines.
    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_only() {
        assert_eq!(SystemPromptBuilder::new("You are Eva.").build(), "You are Eva.");
    }

    #[test]
    fn sections_get_headings() {
        let prompt = SystemPromptBuilder::new("Preamble")
            .section("Style", "Warm")
            .build();
        assert_eq!(prompt, "Preamble\n\n## Style\n\nWarm");
    }

    #[test]
    fn empty_sections_skipped() {
        let prompt = SystemPromptBuilder::new("P").section("Empty", "").build();
        assert_eq!(prompt, "P");
    }

    #[test]
    fn bullets_section() {
        let prompt = SystemPromptBuilder::new("P")
            .bullets("Rules", &["one", "two"])
            .bullets::<&str>("Nothing", &[])
            .build();
        assert!(prompt.contains("## Rules\n\n- one\n- two"));
        assert!(!prompt.contains("Nothing"));
    }
}
