//! Builtin prompt templates.

use glance_common::{notices, PromptTemplate};

pub const PRESET_TRANSLATE_ID: &str = "preset-translate";
pub const PRESET_SUMMARIZE_ID: &str = "preset-summarize";

pub fn builtin_templates() -> Vec<PromptTemplate> {
    [
        (PRESET_TRANSLATE_ID, notices::PRESET_TRANSLATE_NAME, notices::PRESET_TRANSLATE_BODY),
        (PRESET_SUMMARIZE_ID, notices::PRESET_SUMMARIZE_NAME, notices::PRESET_SUMMARIZE_BODY),
    ]
    .into_iter()
    .map(|(id, name, body)| PromptTemplate {
        is_builtin: true,
        ..PromptTemplate::new(id, name, body)
    })
    .collect()
}

/// Make sure every builtin is present and flagged, keeping user edits to
/// builtins. Returns whether the list changed and must be persisted.
pub fn seed_builtins(templates: &mut Vec<PromptTemplate>) -> bool {
    if templates.is_empty() {
        *templates = builtin_templates();
        return true;
    }

    let mut changed = false;

    for builtin in builtin_templates() {
        match templates.iter_mut().find(|t| t.id == builtin.id) {
            Some(existing) if !existing.is_builtin => {
                existing.is_builtin = true;
                changed = true;
            }
            Some(_) => {}
            None => {
                templates.insert(0, builtin);
                changed = true;
            }
        }
    }

    let builtin_ids = [PRESET_TRANSLATE_ID, PRESET_SUMMARIZE_ID];
    for template in templates.iter_mut() {
        if template.is_builtin && !builtin_ids.contains(&template.id.as_str()) {
            template.is_builtin = false;
            changed = true;
        }
    }

    changed
}

/// Look a template up by id.
pub fn find<'a>(templates: &'a [PromptTemplate], id: &str) -> Option<&'a PromptTemplate> {
    templates.iter().find(|t| t.id == id)
}
