//! Region key normalization.
//!
//! # Responsibility
//! - Produce canonical region keys shared by every record source.
//! - Provide the lowercase join key used by population rate joins.
//!
//! # Invariants
//! - `normalize_region` is total and idempotent.
//! - Every region string (crime, population, boundary, query parameter) goes
//!   through `normalize_region` before any comparison.

/// Canonicalizes a free-text region name.
///
/// Trims surrounding whitespace, then title-cases: a letter that starts a
/// word (first character, or preceded by a non-letter) is uppercased and all
/// other letters are lowercased. Letters whose uppercase or lowercase form
/// expands to more than one character are kept unchanged.
///
/// ```
/// use crimemap_core::normalize_region;
///
/// assert_eq!(normalize_region("  KENSINGTON and chelsea "), "Kensington And Chelsea");
/// assert_eq!(normalize_region("barking-dagenham"), "Barking-Dagenham");
/// ```
pub fn normalize_region(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut previous_is_letter = false;

    for ch in trimmed.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                push_within_word(&mut out, ch);
            } else {
                push_word_start(&mut out, ch);
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }

    out
}

/// Returns the case-insensitive join key for a region name.
pub fn join_key(raw: &str) -> String {
    normalize_region(raw).to_lowercase()
}

fn push_word_start(out: &mut String, ch: char) {
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => out.push(single),
        _ => out.push(ch),
    }
}

// `İ` lowercases to `i` plus a combining dot, which is not a letter and would
// split the word on a second pass.
fn push_within_word(out: &mut String, ch: char) {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(single), None) => out.push(single),
        _ => out.push(ch),
    }
}
