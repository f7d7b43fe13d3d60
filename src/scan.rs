//! Source-line analysis: fence tracking and blank-run extraction.
//!
//! Markdown renderers collapse any run of blank lines between two blocks into
//! a single implicit paragraph break. This module re-derives the lost counts
//! from the original source so they can be re-injected into the rendered
//! structure as empty paragraphs.

use std::collections::BTreeSet;

/// Block-level element kinds that participate in blank-run tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    Paragraph,
    BulletList,
    OrderedList,
    Blockquote,
}

/// A tracked block-level element with its half-open source line range.
///
/// Tokens appear in stream order, nested blocks included; a token's position
/// in the stream is its `block_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockToken {
    pub kind: BlockKind,
    /// First source line of the block (0-based).
    pub start_line: usize,
    /// One past the last source line of the block.
    pub end_line: usize,
}

/// A run of 3 or more blank source lines following a tracked block.
///
/// `extra` is the number of blank lines beyond the first: the renderer
/// already preserves one implicit break for any run of blank lines, so only
/// the lines past the first are materialized as empty paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankRun {
    pub block_index: usize,
    pub extra: usize,
}

/// Returns the indices of source lines that lie inside a fenced code region.
///
/// A fence opens on a line starting with a run of 3+ backticks or tildes and
/// closes on a later line starting with the same marker text (same character,
/// at least the same run length). Both delimiter lines count as inside. An
/// unclosed fence runs to the end of input.
pub fn fenced_lines(source: &str) -> BTreeSet<usize> {
    let mut inside = BTreeSet::new();
    let mut fence: Option<String> = None;
    for (index, line) in source.lines().enumerate() {
        match &fence {
            None => {
                if let Some(marker) = fence_marker(line) {
                    fence = Some(marker.to_string());
                    inside.insert(index);
                }
            }
            Some(delimiter) => {
                inside.insert(index);
                if line.starts_with(delimiter.as_str()) {
                    fence = None;
                }
            }
        }
    }
    inside
}

/// Extracts the blank runs following tracked blocks.
///
/// For each token in stream order, counts the consecutive blank unfenced
/// lines immediately after the block and records a [`BlankRun`] when the
/// count reaches 3. Tokens that start inside a fence are skipped (they still
/// consume a block index).
pub fn blank_runs(tokens: &[BlockToken], source: &str) -> Vec<BlankRun> {
    let lines: Vec<&str> = source.lines().collect();
    let fenced = fenced_lines(source);
    let mut runs = Vec::new();

    for (block_index, token) in tokens.iter().enumerate() {
        if fenced.contains(&token.start_line) {
            continue;
        }
        let mut line = token.end_line;
        let mut count = 0;
        while line < lines.len() && lines[line].trim().is_empty() && !fenced.contains(&line) {
            count += 1;
            line += 1;
        }
        if count >= 3 {
            runs.push(BlankRun {
                block_index,
                extra: count - 1,
            });
        }
    }
    runs
}

/// Returns the fence marker text when a line opens (or could close) a fence.
fn fence_marker(line: &str) -> Option<&str> {
    let first = line.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run = line.chars().take_while(|&c| c == first).count();
    if run >= 3 { Some(&line[..run]) } else { None }
}
