//! Greedy structural text chunker with overlap.
//!
//! A single forward pass consumes the source text unit by unit. At every step
//! the largest structural unit that still fits the current chunk is appended,
//! cascading through paragraph, heading line, sentence, line, and finally
//! single word. When nothing fits, the chunk is flushed and the next chunk
//! starts with the trailing `overlap` characters of the one just flushed.
//!
//! Sizes are measured in characters, and every slice point is derived from a
//! char boundary, so multi-byte text can never be split mid-character.
//! Whitespace is preserved verbatim: concatenating the chunks (minus each
//! chunk's overlap prefix) reproduces the source exactly.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by invalid chunker configuration.
///
/// These are caller contract violations and fail fast at construction time;
/// chunking itself never fails for valid configurations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// `max_size` must be at least one character.
    #[error("invalid argument: max chunk size must be positive")]
    ZeroMaxSize,

    /// `overlap` must leave room for fresh content in every chunk.
    #[error("invalid argument: overlap ({overlap}) must be smaller than max chunk size ({max_size})")]
    OverlapTooLarge { overlap: usize, max_size: usize },
}

/// Splits document text into overlapping, size-bounded chunks.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    /// Maximum chunk size in characters.
    max_size: usize,
    /// Characters of trailing context repeated into the next chunk.
    overlap: usize,
}

impl Chunker {
    /// Create a chunker.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::ZeroMaxSize`] if `max_size` is zero, and
    /// [`ChunkError::OverlapTooLarge`] if `overlap >= max_size`.
    pub fn new(max_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if max_size == 0 {
            return Err(ChunkError::ZeroMaxSize);
        }
        if overlap >= max_size {
            return Err(ChunkError::OverlapTooLarge { overlap, max_size });
        }
        Ok(Self { max_size, overlap })
    }

    /// Split `text` into chunks, keyed by zero-based sequence index.
    ///
    /// Index order is document order. An empty document produces an empty
    /// map. Every chunk is at most `max_size` characters, except when a
    /// single indivisible unit (one word) alone exceeds the budget; such a
    /// unit becomes the oversized payload of its own chunk rather than being
    /// split mid-word.
    #[must_use]
    pub fn chunk(&self, text: &str) -> BTreeMap<usize, String> {
        let mut chunks = BTreeMap::new();
        if text.is_empty() {
            return chunks;
        }

        let mut rest = text;
        let mut buf = String::new();
        // Characters currently buffered (overlap carry + fresh content).
        let mut buf_chars = 0usize;
        // Characters consumed from the source since the last flush. The carry
        // alone must never be emitted as a chunk of its own.
        let mut fresh_chars = 0usize;
        let mut index = 0usize;

        while !rest.is_empty() {
            let (unit_end, unit_chars) = match self.next_fitting_unit(rest, buf_chars) {
                Some(unit) => unit,
                None if fresh_chars == 0 => {
                    // Nothing fits an empty chunk: accept the smallest unit
                    // whole. This is the only path by which a chunk can
                    // exceed max_size, and it guarantees forward progress.
                    let end = word_end(rest);
                    let unit_chars = chars_up_to(rest, end);
                    tracing::debug!(
                        target: "doc_chunker",
                        unit_chars,
                        max_size = self.max_size,
                        "Indivisible unit exceeds the chunk budget"
                    );
                    (end, unit_chars)
                }
                None => {
                    let (carry, carry_chars) = self.overlap_tail(&buf, buf_chars);
                    chunks.insert(index, std::mem::take(&mut buf));
                    index += 1;
                    buf = carry;
                    buf_chars = carry_chars;
                    fresh_chars = 0;
                    continue;
                }
            };

            buf.push_str(rest.get(..unit_end).unwrap_or(rest));
            buf_chars += unit_chars;
            fresh_chars += unit_chars;
            rest = rest.get(unit_end..).unwrap_or("");
        }

        if fresh_chars > 0 {
            chunks.insert(index, buf);
        }
        chunks
    }

    /// Find the largest structural unit at the head of `rest` that still fits
    /// the current chunk, trying paragraph, heading line, sentence, line, and
    /// word in that order. Returns the unit's byte end and character count,
    /// or `None` when not even a single word fits.
    fn next_fitting_unit(&self, rest: &str, buf_chars: usize) -> Option<(usize, usize)> {
        let budget = self.max_size.saturating_sub(buf_chars);
        if budget == 0 {
            return None;
        }

        let candidates = [
            Some(paragraph_end(rest)),
            heading_end(rest),
            Some(sentence_end(rest)),
            Some(line_end(rest)),
            Some(word_end(rest)),
        ];

        for end in candidates.into_iter().flatten() {
            let unit_chars = chars_up_to(rest, end);
            if unit_chars <= budget {
                return Some((end, unit_chars));
            }
        }
        None
    }

    /// The trailing `overlap` characters of a flushed chunk, carried into the
    /// next one. Limited to the chunk itself: overlap never reaches further
    /// than one chunk back.
    fn overlap_tail(&self, buf: &str, buf_chars: usize) -> (String, usize) {
        let carry_chars = self.overlap.min(buf_chars);
        if carry_chars == 0 {
            return (String::new(), 0);
        }
        let start = char_offset(buf, buf_chars - carry_chars);
        (buf.get(start..).unwrap_or("").to_string(), carry_chars)
    }
}

// =============================================================================
// Structural units
// =============================================================================
//
// Each function returns the byte offset just past the unit at the head of the
// given text. Offsets always land on char boundaries. Units include their
// trailing delimiters (or, for words, their leading whitespace), so
// consuming units back to back loses nothing.

/// End of the first blank-line-delimited block, including the entire newline
/// run that terminates it.
fn paragraph_end(s: &str) -> usize {
    let Some(pos) = s.find("\n\n") else {
        return s.len();
    };
    let newline_run = s
        .get(pos..)
        .unwrap_or("")
        .chars()
        .take_while(|&c| c == '\n')
        .count();
    pos + newline_run
}

/// End of the first line if it is a heading (wiki `= ... =` or Markdown
/// `# ...` style), `None` otherwise.
fn heading_end(s: &str) -> Option<usize> {
    let end = line_end(s);
    let first_line = s.get(..end).unwrap_or(s);
    let trimmed = first_line.trim_start();
    if trimmed.starts_with('=') || trimmed.starts_with('#') {
        Some(end)
    } else {
        None
    }
}

/// End of the first sentence: just past the first terminal punctuation mark
/// that is followed by whitespace (or ends the text). Falls back to the whole
/// text when no such boundary exists.
fn sentence_end(s: &str) -> usize {
    let mut iter = s.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?') {
            match iter.peek() {
                Some(&(_, next)) if next.is_whitespace() => return i + c.len_utf8(),
                None => return s.len(),
                Some(_) => {}
            }
        }
    }
    s.len()
}

/// End of the first line, including its newline.
fn line_end(s: &str) -> usize {
    s.find('\n').map_or(s.len(), |pos| pos + 1)
}

/// End of the first whitespace-delimited token, including any leading
/// whitespace. All-whitespace text is consumed whole.
fn word_end(s: &str) -> usize {
    let mut in_word = false;
    for (i, c) in s.char_indices() {
        if c.is_whitespace() {
            if in_word {
                return i;
            }
        } else {
            in_word = true;
        }
    }
    s.len()
}

/// Character count of `s[..end]`.
fn chars_up_to(s: &str, end: usize) -> usize {
    s.get(..end).unwrap_or(s).chars().count()
}

/// Byte offset of the `n`-th character of `s` (or the end of `s`).
fn char_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

// =============================================================================
// Tests
// =============================================================================
