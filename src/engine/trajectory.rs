//! Trajectory tree arena.
//!
//! The engine's trajectory "tree" is a set of parent-linked chains whose
//! ancestor tails are shared between particles. Nodes live in an arena and
//! are addressed by stable indices, so particles can alias ancestors
//! without pointer graphs. The map synthesizer only ever borrows the tree
//! read-only, for the duration of one synthesis pass.

use crate::core::types::Pose2D;

/// Stable index of a node in a [`TrajectoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// One historical pose in a particle's ancestry chain.
#[derive(Debug, Clone)]
pub struct TrajectoryNode {
    /// Corrected sensor pose at the time this node was recorded.
    pub pose: Pose2D,
    /// Adapted range readings attached at this node.
    ///
    /// `None` for nodes the engine kept for trajectory bookkeeping only
    /// (sparse keyframing); such nodes are skipped during synthesis.
    pub reading: Option<Vec<f32>>,
    /// Parent node, `None` for the session root.
    pub parent: Option<NodeId>,
}

/// Arena of trajectory nodes.
#[derive(Debug, Default)]
pub struct TrajectoryTree {
    nodes: Vec<TrajectoryNode>,
}

impl TrajectoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its id.
    pub fn push(&mut self, node: TrajectoryNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Look up a node by id.
    ///
    /// Returns `None` for ids that were never issued by this tree.
    pub fn get(&self, id: NodeId) -> Option<&TrajectoryNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk from `leaf` to the root via parent links.
    ///
    /// Each node on the chain is visited exactly once, leaf first.
    pub fn ancestors(&self, leaf: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(leaf),
        }
    }
}

/// Iterator over a leaf-to-root ancestry chain.
pub struct Ancestors<'a> {
    tree: &'a TrajectoryTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a TrajectoryNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        let node = self.tree.get(id)?;
        self.next = node.parent;
        Some(node)
    }
}
