//! Text chunking.
//!
//! Splits document content into ordered, overlapping chunk texts. Two
//! strategies exist: a generic fixed-size splitter for plain text and a
//! structure-aware splitter for markdown-like input that prefers cutting at
//! section headers so a section is not arbitrarily bisected. Both walk the
//! same boundary ladder before hard-splitting: paragraph break, newline,
//! whitespace.
//!
//! Splitting is deterministic: the same content and strategy always yield
//! the same ordered sequence. Non-empty input always yields at least one
//! chunk; empty input yields none (the ingest layer treats that as an
//! integrity error).

use crate::config::ChunkingConfig;

/// Split `content` using the strategy selected by the caller's
/// content-type hint.
pub fn split(content: &str, structured: bool, config: &ChunkingConfig) -> Vec<String> {
    if structured {
        split_with(content, config.structured_target, config.structured_overlap, true)
    } else {
        split_with(content, config.plain_target, config.plain_overlap, false)
    }
}

fn split_with(content: &str, target: usize, overlap: usize, headers: bool) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    if content.len() <= target {
        return vec![content.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < content.len() {
        let mut end = floor_char_boundary(content, (start + target).min(content.len()));
        if end <= start {
            // Degenerate target smaller than one char: take the next char.
            end = ceil_char_boundary(content, start + 1);
        }
        let cut = if end < content.len() {
            find_cut(content, start, end, headers)
        } else {
            end
        };

        chunks.push(content[start..cut].to_string());

        if cut >= content.len() {
            break;
        }

        // Step back by the overlap, but always advance past the previous
        // start so the loop terminates.
        let next = floor_char_boundary(content, cut.saturating_sub(overlap));
        start = if next > start { next } else { cut };
    }

    chunks
}

/// Pick a cut point in `(start, end]`, preferring natural boundaries.
fn find_cut(content: &str, start: usize, end: usize, headers: bool) -> usize {
    let window = &content[start..end];

    if headers {
        // Cut just before the last section header in the window, so the
        // header opens the next chunk.
        if let Some(pos) = window.rfind("\n#") {
            if pos > 0 {
                return start + pos + 1;
            }
        }
    }

    if let Some(pos) = window.rfind("\n\n") {
        if pos > 0 {
            return start + pos + 2;
        }
    }
    if let Some(pos) = window.rfind('\n') {
        if pos > 0 {
            return start + pos + 1;
        }
    }
    if let Some(pos) = window.rfind(' ') {
        if pos > 0 {
            return start + pos + 1;
        }
    }

    end
}

/// Largest char-boundary index not exceeding `idx`.
fn floor_char_boundary(content: &str, mut idx: usize) -> usize {
    if idx >= content.len() {
        return content.len();
    }
    while !content.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest char-boundary index not below `idx`.
fn ceil_char_boundary(content: &str, mut idx: usize) -> usize {
    if idx >= content.len() {
        return content.len();
    }
    while !content.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
