//! Cleanup of proposer-written change descriptions.
//!
//! Language-model explanations tend to open with a restatement of the
//! request ("The user wants to ..."). History rows only need the gist.

/// Longest description kept verbatim, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 60;

/// Description used when the proposer supplied none.
pub const EMPTY_DESCRIPTION: &str = "Modified";

const VERBOSE_PREFIXES: &[&str] = &[
    "The operator wants to ",
    "The user wants to ",
    "The request is to ",
    "Operator requested to ",
    "User requested to ",
];

/// Shortens a description for the version history.
///
/// Strips one leading verbose prefix, capitalizes the first character and
/// truncates to [`MAX_DESCRIPTION_CHARS`] characters (ending in `...`).
pub fn clean_description(description: &str) -> String {
    if description.is_empty() {
        return EMPTY_DESCRIPTION.to_string();
    }

    let stripped = VERBOSE_PREFIXES
        .iter()
        .find_map(|prefix| description.strip_prefix(prefix))
        .unwrap_or(description);

    let mut chars = stripped.chars();
    let mut cleaned: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };

    if cleaned.chars().count() > MAX_DESCRIPTION_CHARS {
        cleaned = cleaned.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
        cleaned.push_str("...");
    }

    cleaned
}
