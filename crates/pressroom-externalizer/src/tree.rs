//! Temporal reference trees
//!
//! All trees spawned from one root share a [`NodeArena`]. A tree is an
//! ordered list of arena indices, so splitting a tree copies indices and
//! never versions.

use crate::merger::MergeResult;
use pressroom_domain::{Interval, ItemUri, Version, VersionId};
use std::sync::Arc;

/// Index of a node in its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// One version placed in a composition tree
#[derive(Debug, Clone)]
pub struct Node {
    /// The version this node renders
    pub version: Version,
    /// Composing node, `None` for the root
    pub parent: Option<NodeId>,
    depth: usize,
}

impl Node {
    /// Distance from the root (root is 0)
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Append-only node storage shared by every tree of one resolution
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub(crate) fn push(&mut self, version: Version, parent: Option<NodeId>) -> NodeId {
        let depth = parent.map_or(0, |p| self.get(p).depth + 1);
        self.nodes.push(Node {
            version,
            parent,
            depth,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Look up a node
    ///
    /// Ids are only handed out by this arena, so every id is in range.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// True if `item` is `id`'s own item or that of any of its ancestors
    pub(crate) fn on_path(&self, id: NodeId, item: &ItemUri) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.get(current);
            if &node.version.item == item {
                return true;
            }
            cursor = node.parent;
        }
        false
    }

    /// Number of nodes allocated
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if nothing was allocated
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Borrowed view of a node during a merger visit
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    /// Arena index
    pub id: NodeId,
    /// The node itself
    pub node: &'a Node,
}

impl<'a> NodeRef<'a> {
    /// The node's version
    pub fn version(&self) -> &'a Version {
        &self.node.version
    }

    /// Composing node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.node.parent
    }

    /// True for the tree's root
    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }
}

/// A tree still being expanded
#[derive(Debug, Clone)]
pub(crate) struct PendingTree {
    pub interval: Interval,
    pub nodes: Vec<NodeId>,
    /// Position in `nodes` of the node being expanded
    pub cursor: usize,
    /// Next composition group of that node
    pub next_group: usize,
}

impl PendingTree {
    pub fn new(interval: Interval, root: NodeId) -> Self {
        Self {
            interval,
            nodes: vec![root],
            cursor: 0,
            next_group: 0,
        }
    }

    pub fn structure(&self, arena: &NodeArena) -> TreeStructure {
        let nodes = self
            .nodes
            .iter()
            .map(|&id| {
                let node = arena.get(id);
                let parent = node
                    .parent
                    .and_then(|p| self.nodes.iter().position(|&n| n == p));
                (node.version.id, parent)
            })
            .collect();
        TreeStructure {
            interval: self.interval,
            nodes,
        }
    }
}

/// Structural value of a tree: pinned interval plus `(version, parent position)`
/// for every node in order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeStructure {
    /// Pinned interval
    pub interval: Interval,
    /// Node versions with the position of their parent in this list
    pub nodes: Vec<(VersionId, Option<usize>)>,
}

/// A fully expanded and merged tree
#[derive(Debug, Clone)]
pub struct TemporalReferenceTree {
    arena: Arc<NodeArena>,
    nodes: Vec<NodeId>,
    structure: TreeStructure,
    result: MergeResult,
}

impl TemporalReferenceTree {
    pub(crate) fn new(
        arena: Arc<NodeArena>,
        pending: PendingTree,
        structure: TreeStructure,
        result: MergeResult,
    ) -> Self {
        Self {
            arena,
            nodes: pending.nodes,
            structure,
            result,
        }
    }

    /// Interval over which this combination of versions is valid
    pub fn interval(&self) -> Interval {
        self.structure.interval
    }

    /// Root node
    pub fn root(&self) -> NodeRef<'_> {
        let id = self.nodes[0];
        NodeRef {
            id,
            node: self.arena.get(id),
        }
    }

    /// Every node in the order it was added
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.nodes.iter().map(|&id| NodeRef {
            id,
            node: self.arena.get(id),
        })
    }

    /// Direct children of `parent` in the order they were added
    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.nodes().filter(move |n| n.parent() == Some(parent))
    }

    /// Ids of every version in the tree
    pub fn version_ids(&self) -> Vec<VersionId> {
        self.nodes().map(|n| n.version().id).collect()
    }

    /// Structural value used for de-duplication and comparison
    pub fn structure(&self) -> &TreeStructure {
        &self.structure
    }

    /// What the merger produced for this tree
    pub fn result(&self) -> &MergeResult {
        &self.result
    }
}
