//! Chunking: normalised text → ordered, bounded slices.
//!
//! The summarisation model has a hard input limit, so every chunk must
//! measure at most `max_len` in the configured [`LengthUnit`]. Chunks are
//! exact slices of the input: concatenating them in order gives the text
//! back byte for byte.
//!
//! ## Boundary policy
//!
//! The text is scanned as alternating runs of non-whitespace ("words") and
//! whitespace. Runs are appended greedily while the chunk still fits; when
//! the next run would overflow, the chunk is closed and the run opens the
//! next one. A single run that is longer than `max_len` on its own (a URL,
//! a DNA sequence, a table flattened without spaces) is hard-split on
//! character boundaries.

use crate::config::LengthUnit;
use crate::output::TextChunk;

/// Character and word count of a span.
#[derive(Debug, Clone, Copy, Default)]
struct Measure {
    chars: usize,
    words: usize,
}

impl Measure {
    fn plus(self, other: Measure) -> Measure {
        Measure {
            chars: self.chars + other.chars,
            words: self.words + other.words,
        }
    }

    fn len(self, unit: LengthUnit) -> usize {
        unit.measure(self.chars, self.words)
    }
}

/// A maximal run of either whitespace or non-whitespace characters.
struct Run<'a> {
    offset: usize,
    text: &'a str,
    is_word: bool,
}

impl Run<'_> {
    fn measure(&self) -> Measure {
        Measure {
            chars: self.text.chars().count(),
            words: usize::from(self.is_word),
        }
    }
}

fn runs(text: &str) -> impl Iterator<Item = Run<'_>> {
    let mut rest = text.char_indices().peekable();
    std::iter::from_fn(move || {
        let (start, first) = rest.next()?;
        let is_word = !first.is_whitespace();
        let mut end = start + first.len_utf8();
        while let Some(&(i, c)) = rest.peek() {
            if c.is_whitespace() == is_word {
                break;
            }
            end = i + c.len_utf8();
            rest.next();
        }
        Some(Run {
            offset: start,
            text: &text[start..end],
            is_word,
        })
    })
}

/// Split `text` into consecutive chunks of at most `max_len` units.
///
/// Empty text yields no chunks. A `max_len` of 0 is treated as 1.
///
/// ```rust
/// use edgequake_sysreview::{chunk, LengthUnit};
///
/// let chunks = chunk("alpha beta gamma", 10, LengthUnit::Chars);
/// let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
/// assert_eq!(texts, ["alpha beta", " gamma"]);
/// ```
pub fn chunk(text: &str, max_len: usize, unit: LengthUnit) -> Vec<TextChunk> {
    let max_len = max_len.max(1);
    let mut chunks: Vec<TextChunk> = Vec::new();
    let mut push = |start: usize, end: usize| {
        chunks.push(TextChunk {
            index: chunks.len(),
            offset: start,
            text: text[start..end].to_string(),
        });
    };

    let mut start = 0;
    let mut current = Measure::default();

    for run in runs(text) {
        let m = run.measure();

        if current.plus(m).len(unit) <= max_len {
            current = current.plus(m);
            continue;
        }

        if current.chars > 0 {
            push(start, run.offset);
        }
        start = run.offset;

        if m.len(unit) <= max_len {
            current = m;
            continue;
        }

        // Oversized run: cut it into pieces that each fit.
        let words = m.words;
        let mut piece = Measure::default();
        for (i, _) in run.text.char_indices() {
            let at = run.offset + i;
            let grown = Measure {
                chars: piece.chars + 1,
                words,
            };
            if piece.chars > 0 && grown.len(unit) > max_len {
                push(start, at);
                start = at;
                piece = Measure { chars: 0, words };
            }
            piece.chars += 1;
            piece.words = words;
        }
        current = piece;
    }

    if current.chars > 0 {
        push(start, text.len());
    }
    chunks
}
