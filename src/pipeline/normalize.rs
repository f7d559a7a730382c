//! Text normalisation: raw extracted text → clean single-spaced text.
//!
//! PDF text layers are noisy: hard line breaks in the middle of sentences,
//! runs of spaces used for layout, ligature glyphs, soft hyphens and other
//! invisible characters. Every rule below is idempotent, so normalising an
//! already-normalised string returns it unchanged.
//!
//! ## Rules (applied in order)
//!
//! 1. Drop control characters that are not whitespace.
//! 2. Drop invisible characters (zero-width space, BOM, soft hyphen, joiners).
//! 3. Expand typographic ligatures (ﬁ → fi, ﬂ → fl, …).
//! 4. Collapse every whitespace run to one ASCII space and trim both ends.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Characters that render as nothing but break word matching.
const INVISIBLE: &[char] = &[
    '\u{200B}', // zero-width space
    '\u{200C}', // zero-width non-joiner
    '\u{200D}', // zero-width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // BOM / zero-width no-break space
    '\u{00AD}', // soft hyphen
];

/// Normalise extracted text. Empty or whitespace-only input yields "".
pub fn normalize(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        if (c.is_control() && !c.is_whitespace()) || INVISIBLE.contains(&c) {
            continue;
        }
        match expand_ligature(c) {
            Some(expanded) => cleaned.push_str(expanded),
            None => cleaned.push(c),
        }
    }

    RE_WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

fn expand_ligature(c: char) -> Option<&'static str> {
    match c {
        '\u{FB00}' => Some("ff"),
        '\u{FB01}' => Some("fi"),
        '\u{FB02}' => Some("fl"),
        '\u{FB03}' => Some("ffi"),
        '\u{FB04}' => Some("ffl"),
        _ => None,
    }
}
