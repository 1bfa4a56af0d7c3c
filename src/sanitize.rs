//! Formula sanitisation before rendering.
//!
//! Formula previews come out of PDF text extraction, where superscripts are
//! often encoded with the spacing circumflex U+02C6 (`ˆ`) and stray
//! non-ASCII glyphs (`Â`, ligatures, private-use code points) leak in.
//! The math renderer only accepts ASCII, so every preview goes through
//! [`sanitize`] first:
//!
//! 1. absent or empty input → [`NO_FORMULA_PLACEHOLDER`]
//! 2. U+02C6 → `^`
//! 3. drop every character outside 7-bit ASCII
//! 4. empty result → [`NO_FORMULA_PLACEHOLDER`]
//!
//! The placeholder is itself ASCII, so `sanitize(sanitize(x)) == sanitize(x)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Rendered in place of a missing or fully-stripped formula.
pub const NO_FORMULA_PLACEHOLDER: &str = r"\text{No formula data}";

static RE_NON_ASCII: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\x00-\x7F]").unwrap());

/// Sanitise an optional formula preview.
pub fn sanitize(raw: Option<&str>) -> String {
    sanitize_str(raw.unwrap_or_default())
}

/// Sanitise a formula preview; empty input yields the placeholder.
pub fn sanitize_str(raw: &str) -> String {
    if raw.is_empty() {
        return NO_FORMULA_PLACEHOLDER.to_string();
    }
    let caret = raw.replace('\u{02C6}', "^");
    let ascii = RE_NON_ASCII.replace_all(&caret, "");
    if ascii.is_empty() {
        NO_FORMULA_PLACEHOLDER.to_string()
    } else {
        ascii.into_owned()
    }
}
