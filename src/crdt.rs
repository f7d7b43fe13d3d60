//! Minimal tree CRDT document and its binary update codec.
//!
//! A document holds named root containers whose children form an ordered
//! node tree. Every node is created by an insert operation identified by a
//! Lamport [`OpId`]; the full state of a document is its operation log,
//! encoded with postcard. Operations are idempotent to apply, so merging the
//! same update twice equals merging it once.
//!
//! Peer identity is an explicit constructor parameter. The determinism
//! contract of seeding rests on this: update bytes embed the originating
//! peer, so two documents built with the same peer and the same inserts
//! encode identically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type PeerId = u64;

/// Unique operation identifier, ordered by Lamport counter then peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpId {
    pub counter: u64,
    pub peer: PeerId,
}

/// Name of the single shared root container used for document content.
pub const DEFAULT_ROOT: &str = "default";

/// Content carried by a node: a typed element or a marked text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeContent {
    Element {
        kind: String,
        attrs: BTreeMap<String, String>,
    },
    Text {
        text: String,
        marks: Vec<MarkContent>,
    },
}

/// One inline formatting mark on a text node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkContent {
    pub kind: String,
    pub attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Insert {
        root: String,
        id: OpId,
        parent: Option<OpId>,
        after: Option<OpId>,
        content: NodeContent,
    },
}

/// Wire form of a document's full state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub ops: Vec<Op>,
}

#[derive(Debug, thiserror::Error)]
pub enum CrdtError {
    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),
    #[error("unknown root container {0:?}")]
    UnknownRoot(String),
    #[error("missing parent for insert {0:?}")]
    MissingParent(OpId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub content: NodeContent,
    pub children: Vec<OpId>,
    after: Option<OpId>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct RootState {
    children: Vec<OpId>,
    nodes: BTreeMap<OpId, Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrdtDoc {
    peer: PeerId,
    clock: u64,
    roots: BTreeMap<String, RootState>,
    log: Vec<Op>,
}

impl CrdtDoc {
    /// Creates a document owned by `peer` with the default shared root
    /// attached.
    pub fn new(peer: PeerId) -> Self {
        let mut roots = BTreeMap::new();
        roots.insert(DEFAULT_ROOT.to_string(), RootState::default());
        Self {
            peer,
            clock: 0,
            roots,
            log: Vec::new(),
        }
    }

    /// Creates a document with no root containers attached. Inserts against
    /// it fail with [`CrdtError::UnknownRoot`]; consumers are expected to
    /// treat such a document as empty rather than as an error.
    pub fn detached(peer: PeerId) -> Self {
        Self {
            peer,
            clock: 0,
            roots: BTreeMap::new(),
            log: Vec::new(),
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn has_root(&self, name: &str) -> bool {
        self.roots.contains_key(name)
    }

    /// Ordered ids of the root container's direct children.
    pub fn root_children(&self, root: &str) -> Option<&[OpId]> {
        self.roots.get(root).map(|state| state.children.as_slice())
    }

    pub fn node(&self, root: &str, id: &OpId) -> Option<&Node> {
        self.roots.get(root).and_then(|state| state.nodes.get(id))
    }

    /// Inserts a node locally, issuing the next operation id for this peer.
    ///
    /// `after` is the sibling the node follows (`None` for first position);
    /// `parent` is `None` for a direct child of the root container.
    pub fn insert_node(
        &mut self,
        root: &str,
        parent: Option<OpId>,
        after: Option<OpId>,
        content: NodeContent,
    ) -> Result<OpId, CrdtError> {
        if !self.roots.contains_key(root) {
            return Err(CrdtError::UnknownRoot(root.to_string()));
        }
        self.clock += 1;
        let id = OpId {
            counter: self.clock,
            peer: self.peer,
        };
        let op = Op::Insert {
            root: root.to_string(),
            id,
            parent,
            after,
            content,
        };
        if !self.apply_op(&op) {
            return Err(CrdtError::MissingParent(id));
        }
        self.log.push(op);
        Ok(id)
    }

    /// Encodes the document's full state as a binary update.
    pub fn encode_update(&self) -> Result<Vec<u8>, CrdtError> {
        Ok(postcard::to_allocvec(&Update {
            ops: self.log.clone(),
        })?)
    }

    /// Merge-applies an encoded update. Already-present operations are
    /// skipped, so application is idempotent.
    pub fn apply_update(&mut self, bytes: &[u8]) -> Result<(), CrdtError> {
        let update: Update = postcard::from_bytes(bytes)?;
        for op in update.ops {
            let Op::Insert { id, .. } = &op;
            self.clock = self.clock.max(id.counter);
            if self.apply_op(&op) {
                self.log.push(op);
            }
        }
        Ok(())
    }

    /// Applies one operation. Returns false when the operation is a
    /// duplicate or its root/parent is absent.
    fn apply_op(&mut self, op: &Op) -> bool {
        let Op::Insert {
            root,
            id,
            parent,
            after,
            content,
        } = op;
        let Some(state) = self.roots.get_mut(root) else {
            tracing::debug!(root, "dropping insert against unattached root");
            return false;
        };
        if state.nodes.contains_key(id) {
            return false;
        }
        if let Some(parent_id) = parent
            && !state.nodes.contains_key(parent_id)
        {
            tracing::debug!(?parent_id, "dropping insert with missing parent");
            return false;
        }

        let position = {
            let siblings = match parent {
                None => &state.children,
                Some(parent_id) => &state.nodes[parent_id].children,
            };
            let mut position = match after {
                None => 0,
                Some(anchor) => siblings
                    .iter()
                    .position(|sibling| sibling == anchor)
                    .map(|index| index + 1)
                    .unwrap_or(siblings.len()),
            };
            // RGA tiebreak: concurrent inserts at the same anchor order by
            // descending OpId.
            while position < siblings.len() {
                let sibling = &state.nodes[&siblings[position]];
                if sibling.after == *after && siblings[position] > *id {
                    position += 1;
                } else {
                    break;
                }
            }
            position
        };

        state.nodes.insert(
            *id,
            Node {
                content: content.clone(),
                children: Vec::new(),
                after: *after,
            },
        );
        match parent {
            None => state.children.insert(position, *id),
            Some(parent_id) => {
                if let Some(parent_node) = state.nodes.get_mut(parent_id) {
                    parent_node.children.insert(position, *id);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph() -> NodeContent {
        NodeContent::Element {
            kind: "paragraph".to_string(),
            attrs: BTreeMap::new(),
        }
    }

    fn text(value: &str) -> NodeContent {
        NodeContent::Text {
            text: value.to_string(),
            marks: Vec::new(),
        }
    }

    #[test]
    fn inserts_preserve_sibling_order() {
        let mut doc = CrdtDoc::new(0);
        let first = doc
            .insert_node(DEFAULT_ROOT, None, None, paragraph())
            .unwrap();
        let second = doc
            .insert_node(DEFAULT_ROOT, None, Some(first), paragraph())
            .unwrap();
        let child = doc
            .insert_node(DEFAULT_ROOT, Some(first), None, text("hi"))
            .unwrap();

        assert_eq!(doc.root_children(DEFAULT_ROOT).unwrap(), &[first, second]);
        assert_eq!(
            doc.node(DEFAULT_ROOT, &first).unwrap().children,
            vec![child]
        );
    }

    #[test]
    fn update_round_trips_into_fresh_document() {
        let mut source = CrdtDoc::new(0);
        let p = source
            .insert_node(DEFAULT_ROOT, None, None, paragraph())
            .unwrap();
        source
            .insert_node(DEFAULT_ROOT, Some(p), None, text("hello"))
            .unwrap();
        let update = source.encode_update().unwrap();

        let mut target = CrdtDoc::new(7);
        target.apply_update(&update).unwrap();
        assert_eq!(
            target.root_children(DEFAULT_ROOT),
            source.root_children(DEFAULT_ROOT)
        );
        assert_eq!(target.node(DEFAULT_ROOT, &p), source.node(DEFAULT_ROOT, &p));
    }

    #[test]
    fn applying_an_update_twice_is_idempotent() {
        let mut source = CrdtDoc::new(0);
        source
            .insert_node(DEFAULT_ROOT, None, None, paragraph())
            .unwrap();
        let update = source.encode_update().unwrap();

        let mut target = CrdtDoc::new(7);
        target.apply_update(&update).unwrap();
        let once = target.encode_update().unwrap();
        target.apply_update(&update).unwrap();
        let twice = target.encode_update().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn same_anchor_inserts_order_by_descending_id() {
        // Two peers insert at the front concurrently; the higher OpId wins
        // the earlier position regardless of arrival order.
        let mut doc_a = CrdtDoc::new(1);
        let a = doc_a
            .insert_node(DEFAULT_ROOT, None, None, text("a"))
            .unwrap();
        let update_a = doc_a.encode_update().unwrap();

        let mut doc_b = CrdtDoc::new(2);
        let b = doc_b
            .insert_node(DEFAULT_ROOT, None, None, text("b"))
            .unwrap();
        let update_b = doc_b.encode_update().unwrap();

        let mut merged_ab = CrdtDoc::new(9);
        merged_ab.apply_update(&update_a).unwrap();
        merged_ab.apply_update(&update_b).unwrap();

        let mut merged_ba = CrdtDoc::new(9);
        merged_ba.apply_update(&update_b).unwrap();
        merged_ba.apply_update(&update_a).unwrap();

        assert_eq!(
            merged_ab.root_children(DEFAULT_ROOT),
            merged_ba.root_children(DEFAULT_ROOT)
        );
        assert_eq!(merged_ab.root_children(DEFAULT_ROOT).unwrap(), &[b, a]);
    }

    #[test]
    fn detached_document_rejects_inserts() {
        let mut doc = CrdtDoc::detached(0);
        assert!(!doc.has_root(DEFAULT_ROOT));
        assert!(matches!(
            doc.insert_node(DEFAULT_ROOT, None, None, paragraph()),
            Err(CrdtError::UnknownRoot(_))
        ));
    }

    #[test]
    fn encoding_is_a_pure_function_of_state() {
        let build = || {
            let mut doc = CrdtDoc::new(0);
            let p = doc
                .insert_node(DEFAULT_ROOT, None, None, paragraph())
                .unwrap();
            doc.insert_node(DEFAULT_ROOT, Some(p), None, text("x"))
                .unwrap();
            doc.encode_update().unwrap()
        };
        assert_eq!(build(), build());
    }
}
