//! Case conversion for entity type names.

/// Title-case each run of letters: the first letter after any non-letter is uppercased, the rest
/// lowercased. e.g. "key_results" -> "Key_Results", "okr2goals" -> "Okr2Goals"
pub fn to_title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        if prev_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_cased = c.is_alphabetic();
    }
    out
}

/// Relation name to PascalCase type segment: title case with underscores removed.
/// e.g. "key_results" -> "KeyResults", "keyresults" -> "Keyresults"
pub fn to_pascal_case(s: &str) -> String {
    to_title_case(s).replace('_', "")
}
