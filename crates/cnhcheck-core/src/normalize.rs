//! Field normalisation for cross-source comparison.
//!
//! OCR of the printed card and the QR/VIO payload format the same value
//! differently: `"111.222.333-44"` vs `"11122233344"`, `"01/01/1990"` vs
//! `"01011990"`, `"MARIA SILVA"` vs `"maria silva"`. Normalisation folds
//! those differences away so that equality means "same value".
//!
//! The normalised form is a comparison key only. Records and reports always
//! keep the value exactly as the provider returned it.

/// Characters removed from the interior of a value before comparison.
const FOLDED: &[char] = &[' ', '.', '-', '/'];

/// Normalise a field value into its comparison key.
///
/// 1. Trim surrounding whitespace
/// 2. Lower-case
/// 3. Drop every space, `.`, `-` and `/`
pub fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !FOLDED.contains(c))
        .collect()
}

/// Normalise an optional value. An absent value normalises to `""`, so two
/// absent values compare equal and absent vs present never does.
pub fn normalize_opt(s: Option<&str>) -> String {
    s.map(normalize).unwrap_or_default()
}
