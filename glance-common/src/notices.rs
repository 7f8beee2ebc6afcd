//! User-visible strings.
//!
//! Every message the core shows in the conversation comes from here so the
//! wording stays consistent across surfaces.

use crate::util::take_chars;

pub const THINKING: &str = "Thinking...";
pub const QA_ARCHIVED: &str = "This Q&A pair has been archived.";
pub const ARCHIVE_FAILED_NO_QUESTION: &str =
    "Archive failed: Could not find corresponding user question.";
pub const CHAT_SPLIT_ARCHIVED: &str = "Chat has been split and archived. A new chat has started.";
pub const ALL_HISTORY_CLEARED: &str = "All chat history has been cleared.";

pub const CONFIG_INCOMPLETE: &str =
    "Error: Active API configuration is incomplete. Please check plugin options.";
pub const CONFIG_MISSING: &str = "Error: No API configuration found or no active configuration set. Please add and set an active configuration in plugin options.";
pub const CONFIG_LOAD_FAILED: &str = "Error: Failed to load API configuration.";
pub const NEW_CONFIG_INCOMPLETE: &str =
    "Error: The new active API configuration is incomplete. Please check plugin options.";
pub const NO_ACTIVE_CONFIG: &str =
    "No valid active API configuration found. Please set one in options.";
pub const API_KEY_MISSING: &str = "Error: API Key not set. Please set it in plugin options.";
pub const MODEL_NAME_MISSING: &str = "Error: Model name not set.";
pub const ENDPOINT_MISSING: &str = "Error: OpenAI API Endpoint not set.";

pub const EMPTY_INPUT: &str = "Please enter a message or select an image/text before sending.";
pub const DEFAULT_IMAGE_PROMPT: &str = "Please describe this image.";
pub const IMAGE_WITH_TEXT_DISPLAY: &str = "(Image selected, combined with current text)";
pub const IMAGE_DISPLAY: &str = "(Image selected)";

pub const PAGE_CONTENT_EMPTY: &str =
    "Page content is empty or no valid text could be extracted for summary.";
pub const SUMMARY_REQUEST_CURRENT_PAGE: &str = "Summary request: Current page";

pub const PAGE_LOAD_TIMEOUT: &str = "Page load timeout, cannot extract content.";

pub const PRESET_TRANSLATE_NAME: &str = "Translate";
pub const PRESET_TRANSLATE_BODY: &str =
    "Please translate the following text into [target language, e.g., English]:\n\n{{text}}";
pub const PRESET_SUMMARIZE_NAME: &str = "Summarize";
pub const PRESET_SUMMARIZE_BODY: &str =
    "Please summarize the main content of the following text:\n\n{{text}}";

pub fn config_loaded(name: &str, kind: &str) -> String {
    format!("Loaded configuration: \"{}\" ({})", name, kind)
}

pub fn config_switched(name: &str, kind: &str) -> String {
    format!("Switched to configuration: \"{}\" ({})", name, kind)
}

pub fn summarizing_link(title: &str) -> String {
    format!("Summarizing link: [{}]... Please wait.", title)
}

pub fn summarizing_link_failed(title: &str, message: &str) -> String {
    format!("Failed to summarize link [{}]: {}", title, message)
}

pub fn summary_request_link(title: &str, url: &str, length: usize) -> String {
    format!("Summary request: [{}]({}) (Content length: {})", title, url, length)
}

pub fn link_summary_no_text(title: &str, url: &str) -> String {
    format!("Cannot summarize [{}]({}), no valid text extracted.", title, url)
}

pub fn link_summary_warning(warning: &str) -> String {
    format!("Note: {}", warning)
}

pub fn summary_error(message: &str) -> String {
    format!("Summary error: {}", message)
}

pub fn api_call_failed(status: &str, message: &str) -> String {
    format!("API call failed ({}): {}", status, message)
}

pub fn api_comms_error(provider: &str, message: &str) -> String {
    format!("Error communicating with API ({}): {}", provider, message)
}

pub fn image_processing_error(provider: &str, message: &str) -> String {
    format!("Image processing error ({}): {}", provider, message)
}

pub fn cannot_open_link(message: &str) -> String {
    format!("Cannot open link: {}", message)
}

pub fn extraction_injection_failed(message: &str) -> String {
    format!("Failed to extract content (injection failure): {}", message)
}

/// Prompt sent when the user quotes page text and adds their own instruction.
pub fn combined_query(quote: &str, instruction: &str) -> String {
    format!(
        "Regarding the following quote:\n\"{}\"\n\nMy question/instruction is:\n\"{}\"",
        quote, instruction
    )
}

/// Short display form of a quote, first 50 characters.
pub fn quoted_display(quote: &str) -> String {
    format!("(Quoted content: {}...)", take_chars(quote, 50))
}
