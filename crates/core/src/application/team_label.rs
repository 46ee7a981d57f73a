// Team Label Resolver - avatar codes for an in-service card

use crate::domain::Entry;

/// At most this many avatar codes are shown per entry
pub const MAX_AVATAR_CODES: usize = 2;

/// Initials code of one name: first letter of the first word plus first
/// letter of the last word ("John Van Doe" -> "JD", "Cher" -> "C").
fn name_code(name: &str) -> Option<String> {
    let words: Vec<&str> = name.split_whitespace().collect();
    let first = words.first()?.chars().next()?;
    let last = if words.len() > 1 {
        words.last().and_then(|w| w.chars().next())
    } else {
        None
    };
    Some(
        std::iter::once(first)
            .chain(last)
            .flat_map(char::to_uppercase)
            .collect(),
    )
}

/// Codes derived from a free-text "A & B" label. Only the first two
/// non-empty sides of the separator count.
pub fn label_codes(label: &str) -> Vec<String> {
    label
        .split('&')
        .map(str::trim)
        .filter(|side| !side.is_empty())
        .take(MAX_AVATAR_CODES)
        .filter_map(name_code)
        .collect()
}

/// Avatar codes for an entry: the team label's codes, or the guest's own
/// initials when there is no usable label.
pub fn avatar_codes(entry: &Entry) -> Vec<String> {
    let codes = entry
        .team_label
        .as_deref()
        .map(label_codes)
        .unwrap_or_default();
    if codes.is_empty() {
        vec![entry.initials()]
    } else {
        codes
    }
}
