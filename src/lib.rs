//! md-seed: deterministic initial-state seeding for collaborative rich-text
//! documents.
//!
//! This crate converts a markdown source string into the canonical initial
//! state of a collaboratively-editable document, expressed as a CRDT update
//! byte-stream applied onto a caller-supplied target document. The pipeline
//! is deterministic: the same input always produces byte-identical update
//! output, independent of process identity or call time.
//!
//! The stages, in data-flow order:
//!
//! - **Scan** - blank-line runs between blocks are re-derived from the
//!   source, skipping fenced code regions
//! - **Render** - markdown becomes HTML annotated with one correlation
//!   marker per tracked block
//! - **Patch** - markers are replaced with the empty paragraphs the blank
//!   runs call for
//! - **Build** - the patched HTML becomes a structured document tree
//! - **Seed** - the tree is mirrored into a fixed-identity scratch CRDT
//!   document whose encoded state is merge-applied onto the target
//!
//! # Quick Start
//!
//! ```rust
//! use md_seed::{CrdtDoc, SeedOptions, seed_initial_state};
//!
//! let mut target = CrdtDoc::new(42);
//! seed_initial_state(&mut target, "# Hello\n\nWorld", &SeedOptions { rich_editor: true })
//!     .expect("well-formed markdown seeds cleanly");
//! ```

// Source-line analysis
pub mod scan;

// Markdown rendering and tokenization seams
pub mod render;

// Blank-run re-injection into rendered HTML
pub mod patch;

// Structured document tree and HTML schema
pub mod tree;

// Initial document construction
pub mod builder;

// Tree CRDT document and update codec
pub mod crdt;

// Deterministic seeding
pub mod seed;

// Re-export scan types
pub use scan::{BlankRun, BlockKind, BlockToken, blank_runs, fenced_lines};

// Re-export rendering seams
pub use render::{CmarkRenderer, CmarkTokenizer, Renderer, Tokenizer};

// Re-export patching
pub use patch::{EMPTY_PARAGRAPH, patch_blank_runs};

// Re-export tree types
pub use tree::{DocNode, DocTree, DocumentSchema, HtmlSchema, Mark, NodeKind, SchemaError};

// Re-export builder
pub use builder::InitialDocumentBuilder;

// Re-export CRDT types
pub use crdt::{
    CrdtDoc, CrdtError, DEFAULT_ROOT, MarkContent, Node, NodeContent, Op, OpId, PeerId, Update,
};

// Re-export seeding
pub use seed::{SCRATCH_PEER, SeedError, SeedOptions, Seeder, seed_initial_state};
