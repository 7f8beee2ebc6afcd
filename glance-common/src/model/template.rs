//! Prompt templates.

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the selected text when a template is applied.
pub const TEXT_PLACEHOLDER: &str = "{{text}}";

/// A reusable prompt body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    #[serde(alias = "content")]
    pub body: String,
    #[serde(default, alias = "isPreset")]
    pub is_builtin: bool,
}

impl PromptTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            body: body.into(),
            is_builtin: false,
        }
    }

    pub fn has_placeholder(&self) -> bool {
        self.body.contains(TEXT_PLACEHOLDER)
    }

    /// Substitute every placeholder with `selected_text`.
    pub fn apply(&self, selected_text: &str) -> String {
        self.body.replace(TEXT_PLACEHOLDER, selected_text)
    }

    /// Builtins first, then by name.
    pub fn sort(templates: &mut [PromptTemplate]) {
        templates.sort_by(|a, b| {
            b.is_builtin
                .cmp(&a.is_builtin)
                .then_with(|| a.name.cmp(&b.name))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_replaces_all_placeholders() {
        let t = PromptTemplate::new("t", "Twice", "{{text}} / {{text}}");
        assert!(t.has_placeholder());
        assert_eq!(t.apply("x"), "x / x");
    }

    #[test]
    fn test_apply_without_placeholder_is_identity() {
        let t = PromptTemplate::new("t", "Plain", "Explain quantum computing");
        assert_eq!(t.apply("ignored"), "Explain quantum computing");
    }

    #[test]
    fn test_sort_builtins_first() {
        let mut builtin = PromptTemplate::new("preset-x", "Zulu", "");
        builtin.is_builtin = true;
        let mut list = vec![
            PromptTemplate::new("b", "Bravo", ""),
            builtin,
            PromptTemplate::new("a", "Alpha", ""),
        ];
        PromptTemplate::sort(&mut list);
        let names: Vec<_> = list.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Zulu", "Alpha", "Bravo"]);
    }
}
