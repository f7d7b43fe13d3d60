//! Deterministic CRDT seeding.
//!
//! The structured tree is mirrored into a scratch document created with the
//! fixed [`SCRATCH_PEER`] identity, the scratch state is encoded as a binary
//! update, and the update is merge-applied onto the caller's target. Because
//! the peer identity, operation counters, and traversal order are all fixed,
//! the update bytes are a pure function of the tree.

use crate::builder::InitialDocumentBuilder;
use crate::crdt::{CrdtDoc, CrdtError, DEFAULT_ROOT, MarkContent, NodeContent, OpId, PeerId};
use crate::tree::{DocNode, DocTree, Mark, NodeKind, SchemaError};
use std::collections::BTreeMap;

/// Peer identity of every scratch document. Seeding must produce identical
/// bytes on any machine at any time, and update encoding embeds the
/// originating peer, so the scratch peer is a constant.
pub const SCRATCH_PEER: PeerId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOptions {
    /// Rich markdown pipeline when true, verbatim preformatted text when
    /// false.
    pub rich_editor: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Crdt(#[from] CrdtError),
}

/// Seeds the canonical initial state for `content` into `target`.
///
/// The computed update is merge-applied in place; applying the same seed to
/// the same target twice leaves the state unchanged.
pub fn seed_initial_state(
    target: &mut CrdtDoc,
    content: &str,
    options: &SeedOptions,
) -> Result<(), SeedError> {
    let tree = InitialDocumentBuilder::default().build(content, options.rich_editor)?;
    let update = Seeder::update_for(&tree)?;
    target.apply_update(&update)?;
    Ok(())
}

/// Mirrors structured trees into scratch CRDT documents.
pub struct Seeder;

impl Seeder {
    /// Encodes the canonical update for a tree.
    pub fn update_for(tree: &DocTree) -> Result<Vec<u8>, CrdtError> {
        let mut scratch = CrdtDoc::new(SCRATCH_PEER);
        Self::mirror(&mut scratch, tree)?;
        scratch.encode_update()
    }

    /// Mirrors `tree` into `doc` under the shared root, preserving node
    /// order, attributes, and marks.
    ///
    /// A document without the shared root attached is left untouched; the
    /// caller gets an empty-but-valid document, not an error.
    pub fn mirror(doc: &mut CrdtDoc, tree: &DocTree) -> Result<(), CrdtError> {
        if !doc.has_root(DEFAULT_ROOT) {
            tracing::debug!("shared root unattached, seeding an empty document");
            return Ok(());
        }
        mirror_children(doc, None, &tree.children)
    }
}

fn mirror_children(
    doc: &mut CrdtDoc,
    parent: Option<OpId>,
    nodes: &[DocNode],
) -> Result<(), CrdtError> {
    let mut after = None;
    for node in nodes {
        let id = doc.insert_node(DEFAULT_ROOT, parent, after, node_content(node))?;
        if let DocNode::Element { children, .. } = node {
            mirror_children(doc, Some(id), children)?;
        }
        after = Some(id);
    }
    Ok(())
}

fn node_content(node: &DocNode) -> NodeContent {
    match node {
        DocNode::Element { kind, .. } => {
            let (kind, attrs) = element_content(kind);
            NodeContent::Element {
                kind: kind.to_string(),
                attrs,
            }
        }
        DocNode::Text { text, marks } => NodeContent::Text {
            text: text.clone(),
            marks: marks.iter().map(mark_content).collect(),
        },
    }
}

fn element_content(kind: &NodeKind) -> (&'static str, BTreeMap<String, String>) {
    let mut attrs = BTreeMap::new();
    let name = match kind {
        NodeKind::Paragraph => "paragraph",
        NodeKind::Heading { level } => {
            attrs.insert("level".to_string(), level.to_string());
            "heading"
        }
        NodeKind::BulletList => "bullet_list",
        NodeKind::OrderedList { start } => {
            attrs.insert("start".to_string(), start.to_string());
            "ordered_list"
        }
        NodeKind::ListItem => "list_item",
        NodeKind::Blockquote => "blockquote",
        NodeKind::Preformatted => "preformatted",
        NodeKind::HardBreak => "hard_break",
    };
    (name, attrs)
}

fn mark_content(mark: &Mark) -> MarkContent {
    let mut attrs = BTreeMap::new();
    let kind = match mark {
        Mark::Bold => "bold",
        Mark::Italic => "italic",
        Mark::Code => "code",
        Mark::Link { href } => {
            attrs.insert("href".to_string(), href.clone());
            "link"
        }
    };
    MarkContent {
        kind: kind.to_string(),
        attrs,
    }
}
