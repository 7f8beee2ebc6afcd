//! Combining typed input, selected page text and an image into one turn.

use glance_common::model::TEXT_PLACEHOLDER;
use glance_common::notices;

/// A turn ready to display and send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedTurn {
    /// Text of the user message shown in the conversation.
    pub display: String,
    /// Text sent to the provider.
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("{}", notices::EMPTY_INPUT)]
    EmptyInput,
}

/// Build the displayed and sent text for a turn.
///
/// - `{{text}}` in the input is replaced by the selection;
/// - otherwise input and selection become a quoted question;
/// - a selection alone is sent as is;
/// - an image with no text gets the default image prompt.
pub fn compose(
    input: &str,
    selected_text: Option<&str>,
    has_image: bool,
) -> Result<ComposedTurn, ComposeError> {
    let input = input.trim();
    let selection = selected_text.filter(|s| !s.is_empty());

    let (mut display, mut prompt) = match selection {
        Some(sel) if input.contains(TEXT_PLACEHOLDER) => {
            let filled = input.replace(TEXT_PLACEHOLDER, sel);
            (filled.clone(), filled)
        }
        Some(sel) if !input.is_empty() => (
            format!("{} {}", notices::quoted_display(sel), input),
            notices::combined_query(sel, input),
        ),
        Some(sel) => (sel.to_string(), sel.to_string()),
        None => (input.to_string(), input.to_string()),
    };

    if prompt.trim().is_empty() && !has_image {
        return Err(ComposeError::EmptyInput);
    }

    if has_image {
        if prompt.trim().is_empty() && selection.is_none() {
            display = notices::IMAGE_DISPLAY.to_string();
            prompt = notices::DEFAULT_IMAGE_PROMPT.to_string();
        } else if display.is_empty() {
            display = notices::IMAGE_WITH_TEXT_DISPLAY.to_string();
        } else {
            display = format!("{} {}", display, notices::IMAGE_WITH_TEXT_DISPLAY);
        }
    }

    Ok(ComposedTurn { display, prompt })
}

/// Prompt asking the provider to summarize `text`.
pub fn summarize_prompt(body: &str, text: &str) -> String {
    let quoted = format!("\"{}\"", text);
    if body.contains(TEXT_PLACEHOLDER) {
        body.replace(TEXT_PLACEHOLDER, &quoted)
    } else {
        format!("{}\n\n{}", body, quoted)
    }
}
