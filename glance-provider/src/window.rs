//! Selecting which prior messages are sent as context.

use glance_common::Message;

/// Prior messages eligible as provider context.
///
/// Keeps messages strictly older than the in-flight placeholder that are
/// neither transient nor archived. `turn_timestamp` names the message that
/// displays the current turn; it is excluded because the turn is sent
/// separately.
pub fn history_window(
    prior: &[Message],
    placeholder_timestamp: i64,
    turn_timestamp: Option<i64>,
) -> Vec<&Message> {
    prior
        .iter()
        .filter(|m| m.timestamp < placeholder_timestamp)
        .filter(|m| !m.transient && !m.archived)
        .filter(|m| turn_timestamp != Some(m.timestamp))
        .collect()
}
