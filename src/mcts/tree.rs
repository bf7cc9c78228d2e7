//! Arena-based MCTS tree.
//!
//! Uses a flat `Vec<MCTSNode>` with index-based references for efficiency,
//! cache-friendliness, and serializability. The arena outlives a single
//! decision: subtrees registered in the transposition cache stay addressable
//! until the arena is compacted.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::node::{MCTSNode, NodeId};
use crate::core::ChoiceDescriptor;

/// Arena-based MCTS tree.
///
/// Nodes are stored in a flat vector and referenced by `NodeId` indices.
/// This avoids reference counting overhead and enables serialization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MCTSTree {
    /// All nodes, reachable or not.
    nodes: Vec<MCTSNode>,
}

impl MCTSTree {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create an arena with custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Get a node by ID.
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> &MCTSNode {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MCTSNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Allocate a new node, returning its ID.
    pub fn alloc(&mut self, node: MCTSNode) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create the next child of `parent` in discovery order.
    pub fn add_child(&mut self, parent: NodeId, descriptor: ChoiceDescriptor) -> NodeId {
        let index = self.get(parent).children.len() as u32;
        debug_assert!(
            self.get(parent).max_children().map_or(true, |max| (index as usize) < max),
            "child count exceeds branching factor"
        );
        let child = self.alloc(MCTSNode::new(parent, index, descriptor));
        self.get_mut(parent).children.push(child);
        child
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Iterate over all nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &MCTSNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i as u32), n))
    }

    /// Check a node against the live enumeration at its decision point.
    ///
    /// Consistent when the recorded branching factor and descriptors match
    /// and every explored child sits at the position its descriptor names.
    #[must_use]
    pub fn is_consistent(&self, id: NodeId, live: &[ChoiceDescriptor]) -> bool {
        let node = self.get(id);
        if !node.matches_choices(live) || node.children.len() > live.len() {
            return false;
        }
        node.children.iter().enumerate().all(|(i, &child)| {
            let child = self.get(child);
            child.choice_index as usize == i && child.descriptor == live[i]
        })
    }

    /// Forget everything below a stale node.
    ///
    /// Children become unreachable from this node; the node keeps its own
    /// statistics, which describe the choice leading to it.
    pub fn discard_subtree(&mut self, id: NodeId) {
        let node = self.get_mut(id);
        node.children.clear();
        node.details = None;
        node.lose_count = 0;
        node.stats.max_child_visits = 0;
    }

    /// Depth of the deepest node below `root` (root = 0).
    #[must_use]
    pub fn depth_from(&self, root: NodeId) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            stack.extend(self.get(id).children.iter().map(|&c| (c, depth + 1)));
        }
        max_depth
    }

    /// Rebuild the arena keeping only the subtrees under `roots`.
    ///
    /// Returns the old-to-new id mapping for every kept node. Parents that
    /// were dropped become `NodeId::NONE`.
    pub fn compact(&mut self, roots: &[NodeId]) -> FxHashMap<NodeId, NodeId> {
        let mut remap: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let mut kept: Vec<NodeId> = Vec::new();
        let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if remap.contains_key(&id) {
                continue;
            }
            remap.insert(id, NodeId::new(kept.len() as u32));
            kept.push(id);
            stack.extend(self.get(id).children.iter().rev().copied());
        }

        let mut old: Vec<Option<MCTSNode>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        self.nodes.reserve(kept.len());

        for id in kept {
            if let Some(mut node) = old[id.0 as usize].take() {
                node.parent = remap.get(&node.parent).copied().unwrap_or(NodeId::NONE);
                for child in node.children.iter_mut() {
                    *child = remap.get(child).copied().unwrap_or(NodeId::NONE);
                }
                self.nodes.push(node);
            }
        }

        remap
    }

    /// Get statistics about the arena.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            node_count: self.nodes.len(),
            ..TreeStats::default()
        };
        for node in &self.nodes {
            if node.is_win() {
                stats.proven_wins += 1;
            } else if node.is_loss() {
                stats.proven_losses += 1;
            }
            if node.cached {
                stats.cached_count += 1;
            }
            stats.total_children += node.children.len();
            stats.total_choices += node.max_children().unwrap_or(0);
        }
        stats
    }
}

/// Statistics about the MCTS arena.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total number of nodes.
    pub node_count: usize,

    /// Nodes proven as agent wins.
    pub proven_wins: usize,

    /// Nodes proven as agent losses.
    pub proven_losses: usize,

    /// Nodes registered in the transposition cache.
    pub cached_count: usize,

    /// Total explored children.
    pub total_children: usize,

    /// Total live choices over observed decision points.
    pub total_choices: usize,
}

impl TreeStats {
    /// Fraction of observed choices that have a child node.
    #[must_use]
    pub fn expansion_ratio(&self) -> f64 {
        if self.total_choices == 0 {
            0.0
        } else {
            self.total_children as f64 / self.total_choices as f64
        }
    }
}
