//! Unified line diff of two pretty-printed document versions.

use serde_json::Value;
use similar::TextDiff;

/// Render `old` against `new` as a unified diff with three lines of context.
///
/// Returns an empty string when the two print identically.
pub fn unified(old: &Value, new: &Value, old_label: &str, new_label: &str) -> String {
    let old = format!("{old:#}\n");
    let new = format!("{new:#}\n");
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(&old, &new)
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string()
}
