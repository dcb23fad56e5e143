//! Shared prompt-assembly and output-extraction helpers.

/// Delimiter between retrieved chunks in the prompt's context block.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Goal text used when the request carries no goal query.
pub const DEFAULT_GOAL: &str = "an engaging narrative to the destination";

/// Join retrieved chunks in retrieval order into one context block.
///
/// An empty slice yields the empty string, which downstream prompts treat as
/// "no context" rather than an error.
pub fn join_context(chunks: &[String]) -> String {
    chunks.join(CONTEXT_DELIMITER)
}

/// Extract the outermost JSON object from free-form oracle output.
///
/// Models frequently wrap JSON in prose or code fences; this takes the span
/// from the first `{` to the last `}`. Returns `None` when no balanced span
/// exists — the caller decides whether that is fatal.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end > start {
        Some(&trimmed[start..=end])
    } else {
        None
    }
}
