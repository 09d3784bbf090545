//! Phrase segmentation for services with input-length limits.
//!
//! Some backends cap how much text one call may carry (for example web
//! APIs with a query-string budget). [`split`] subdivides a phrase at
//! natural break points so the resulting audio can be stitched back
//! together without audible artifacts.

use tracing::debug;

/// Break symbols in priority order, strongest breaks first:
/// sentence-ending punctuation, clause punctuation, whitespace, and
/// hyphen-like dashes. Each tier includes the CJK equivalents.
pub const SPLIT_PRIORITY: [&[char]; 4] = [
    &['.', '?', '!', '\u{3002}'],
    &[',', ';', ':', '\u{3001}'],
    &[' ', '\u{3000}'],
    &['-', '\u{2027}', '\u{30fb}'],
];

/// Minimum cut offset; offsets at or below this are rejected so that
/// splitting never emits degenerate micro-chunks.
pub const SPLIT_MINIMUM: usize = 5;

fn is_split_char(c: char) -> bool {
    SPLIT_PRIORITY.iter().any(|tier| tier.contains(&c))
}

/// Subdivide `text` into chunks of at most `limit` characters.
///
/// Tiers are scanned in priority order; within a tier the rightmost
/// qualifying symbol wins and the cut lands immediately after it. When no
/// tier yields a cut beyond [`SPLIT_MINIMUM`], a hard cut is forced at
/// exactly `limit`, which may land mid-word. Emitted chunks have trailing
/// whitespace trimmed, and leading break symbols are stripped from the
/// remainder after every cut.
///
/// Text already within the limit comes back as a single-element vector,
/// unchanged.
pub fn split(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let chars: Vec<char> = text.chars().collect();

    let mut bits: Vec<String> = Vec::new();
    let mut start = 0;

    while chars.len() - start > limit {
        let window = &chars[start..start + limit];

        let cut = SPLIT_PRIORITY.iter().find_map(|tier| {
            window
                .iter()
                .enumerate()
                .rev()
                .find(|(offset, c)| *offset > SPLIT_MINIMUM && tier.contains(c))
                .map(|(offset, _)| offset)
        });

        match cut {
            Some(offset) => {
                let chunk: String = window[..=offset].iter().collect();
                let chunk = chunk.trim_end();
                if !chunk.is_empty() {
                    bits.push(chunk.to_string());
                }
                start += offset + 1;
            }
            None => {
                // no natural break point; force a mid-word cut
                bits.push(window.iter().collect());
                start += limit;
            }
        }

        while start < chars.len() && is_split_char(chars[start]) {
            start += 1;
        }
    }

    let tail: String = chars[start..].iter().collect();
    if !tail.is_empty() || bits.is_empty() {
        bits.push(tail);
    }

    if bits.len() > 1 {
        debug!(limit, chunks = ?bits, "input phrase split");
    }

    bits
}
