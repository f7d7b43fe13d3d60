//! Markdown rendering and tokenization seams.
//!
//! The seeding pipeline consumes markdown through two capability traits so
//! the core logic can be tested against substitutes:
//!
//! - [`Tokenizer`] - block tokens with source line ranges
//! - [`Renderer`] - HTML annotated with block correlation markers
//!
//! The default implementations are backed by pulldown-cmark. The renderer
//! walks the same event stream the tokenizer walks and assigns block indices
//! at block *start* in event order, so the marker numbering always agrees
//! with token numbering, nesting included.

use crate::patch::block_marker;
use crate::scan::{BlockKind, BlockToken};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

/// Produces the tracked block tokens of a markdown source, in stream order.
pub trait Tokenizer {
    fn tokenize(&self, source: &str) -> Vec<BlockToken>;
}

/// Renders markdown to HTML, with a correlation marker after each tracked
/// block's closing tag.
pub trait Renderer {
    fn render(&self, source: &str) -> String;
}

/// Default [`Tokenizer`] backed by pulldown-cmark's offset iterator.
#[derive(Debug, Default)]
pub struct CmarkTokenizer;

impl Tokenizer for CmarkTokenizer {
    fn tokenize(&self, source: &str) -> Vec<BlockToken> {
        let starts = line_starts(source);
        let mut tokens = Vec::new();
        for (event, range) in Parser::new_ext(source, parse_options()).into_offset_iter() {
            if let Event::Start(tag) = event
                && let Some(kind) = tracked_kind(&tag)
            {
                let start_line = line_of(&starts, range.start);
                let end_line = if range.end == 0 {
                    0
                } else {
                    line_of(&starts, range.end - 1) + 1
                };
                tokens.push(BlockToken {
                    kind,
                    start_line,
                    end_line,
                });
            }
        }
        tokens
    }
}

/// Default [`Renderer`] backed by pulldown-cmark's HTML writer.
///
/// Emits `<!--blk:N-->` immediately after the closing tag of the block whose
/// stream-order index is `N`. The marker carries its own trailing newline so
/// the writer's newline bookkeeping is undisturbed: stripping all markers
/// reproduces the plain render byte-for-byte.
#[derive(Debug, Default)]
pub struct CmarkRenderer;

impl Renderer for CmarkRenderer {
    fn render(&self, source: &str) -> String {
        let mut events = Vec::new();
        let mut next_index = 0usize;
        let mut open: Vec<usize> = Vec::new();

        for event in Parser::new_ext(source, parse_options()) {
            let closed = match &event {
                Event::Start(tag) if tracked_kind(tag).is_some() => {
                    open.push(next_index);
                    next_index += 1;
                    None
                }
                Event::End(end) if tracked_end(end) => open.pop(),
                _ => None,
            };
            events.push(event);
            if let Some(index) = closed {
                events.push(Event::Html(block_marker(index).into()));
            }
        }

        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        out
    }
}

fn parse_options() -> Options {
    Options::empty()
}

fn tracked_kind(tag: &Tag) -> Option<BlockKind> {
    match tag {
        Tag::Heading { .. } => Some(BlockKind::Heading),
        Tag::Paragraph => Some(BlockKind::Paragraph),
        Tag::List(Some(_)) => Some(BlockKind::OrderedList),
        Tag::List(None) => Some(BlockKind::BulletList),
        Tag::BlockQuote(_) => Some(BlockKind::Blockquote),
        _ => None,
    }
}

fn tracked_end(end: &TagEnd) -> bool {
    matches!(
        end,
        TagEnd::Heading(_) | TagEnd::Paragraph | TagEnd::List(_) | TagEnd::BlockQuote(_)
    )
}

/// Byte offset of the start of each source line.
fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (offset, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(offset + 1);
        }
    }
    starts
}

/// 0-based line index containing the given byte offset.
fn line_of(starts: &[usize], offset: usize) -> usize {
    starts.partition_point(|&start| start <= offset) - 1
}
