//! Generic game tree with schema-defined tag storage.
//!
//! Nodes live in an arena owned by the [`GameTree`] and are addressed by
//! [`NodeId`]. Each node holds a position, its exactly-legal moves in
//! ascending order (fixed at creation), one lazily filled child slot per move
//! and the tag bytes laid out by the tree's [`Schema`].
//!
//! Subtree deletion walks an explicit stack in postorder, sized from the
//! deepest node the tree has created, so deep trees never recurse.

use std::collections::TryReserveError;
use std::sync::Arc;

use thiserror::Error;

use crate::board::{Board, Move};
use crate::schema::{Schema, TagId};

/// Handle to a node of one [`GameTree`].
///
/// Once its node is deleted an id stays dead, even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    slot: usize,
    generation: u32,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("failed to allocate tree node: {0}")]
    Alloc(#[from] TryReserveError),
}

/// A position reachable from the tree's root.
pub struct Node {
    state: Board,
    /// Depth below the tree's first root; survives re-rooting
    depth: usize,
    parent: Option<NodeId>,
    moves: Vec<Move>,
    children: Vec<Option<NodeId>>,
    tags: Vec<u8>,
}

impl Node {
    pub fn state(&self) -> &Board {
        &self.state
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Legal moves, ascending.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Position of `mv` in [`Node::moves`], by binary search.
    pub fn move_index(&self, mv: Move) -> Option<usize> {
        self.moves.binary_search(&mv).ok()
    }

    /// Child for the move at `index`, if it has been expanded.
    pub fn child_at(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied().flatten()
    }

    /// Expanded children with their moves, in move order.
    pub fn children(&self) -> impl Iterator<Item = (Move, NodeId)> + '_ {
        self.moves
            .iter()
            .zip(&self.children)
            .filter_map(|(&mv, c)| c.map(|c| (mv, c)))
    }
}

/// Arena slot; the generation is bumped whenever its node is released.
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A reachability tree over positions.
pub struct GameTree {
    schema: Arc<Schema>,
    nodes: Vec<Slot>,
    vacant: Vec<usize>,
    root: NodeId,
    root_depth: usize,
    /// Deepest node ever created, relative to the root
    max_depth: usize,
}

impl GameTree {
    /// Build a tree whose root is a copy of `state`.
    pub fn setup(state: &Board, schema: Arc<Schema>) -> Result<Self, TreeError> {
        let mut tree = GameTree {
            schema,
            nodes: Vec::new(),
            vacant: Vec::new(),
            root: NodeId {
                slot: 0,
                generation: 0,
            },
            root_depth: 0,
            max_depth: 0,
        };
        tree.reserve_slot()?;
        let root = tree.build_node(state.clone(), 0, None)?;
        tree.root = tree.insert(root);
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Deepest level any node has reached, relative to the root.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of live nodes; never zero, the root is always live.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.vacant.len()
    }

    /// The live node behind `id`, or `None` once it has been deleted.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.slot)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.slot)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    /// Depth of `id` below the current root.
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.node(id).map(|n| n.depth - self.root_depth)
    }

    pub fn move_index(&self, id: NodeId, mv: Move) -> Option<usize> {
        self.node(id)?.move_index(mv)
    }

    /// Make sure the next [`GameTree::insert`] cannot allocate.
    fn reserve_slot(&mut self) -> Result<(), TreeError> {
        if self.vacant.is_empty() {
            self.nodes.try_reserve(1)?;
        }
        Ok(())
    }

    fn insert(&mut self, node: Node) -> NodeId {
        match self.vacant.pop() {
            Some(slot) => {
                let entry = &mut self.nodes[slot];
                entry.node = Some(node);
                NodeId {
                    slot,
                    generation: entry.generation,
                }
            }
            None => {
                self.nodes.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    slot: self.nodes.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn build_node(
        &self,
        state: Board,
        depth: usize,
        parent: Option<NodeId>,
    ) -> Result<Node, TreeError> {
        let moves = state.moves();

        let mut children = Vec::new();
        children.try_reserve_exact(moves.len())?;
        children.resize(moves.len(), None);

        let size = self.schema.storage_size(moves.len());
        let mut tags = Vec::new();
        tags.try_reserve_exact(size)?;
        tags.resize(size, 0);

        self.schema.init_tags(&mut tags, &state, &moves);
        Ok(Node {
            state,
            depth,
            parent,
            moves,
            children,
            tags,
        })
    }

    /// Child of `id` reached by `mv`.
    ///
    /// Returns `Ok(None)` if `mv` is not one of the node's moves, or if the
    /// child does not exist yet and `expand` is false.
    ///
    /// # Panics
    /// If a move from the node's own legal list fails to apply.
    pub fn child(
        &mut self,
        id: NodeId,
        mv: Move,
        expand: bool,
    ) -> Result<Option<NodeId>, TreeError> {
        let Some(node) = self.node(id) else {
            return Ok(None);
        };
        let Some(index) = node.move_index(mv) else {
            return Ok(None);
        };
        if let Some(child) = node.children[index] {
            return Ok(Some(child));
        }
        if !expand {
            return Ok(None);
        }

        let mut state = node.state.clone();
        if let Err(e) = state.play(mv) {
            panic!("move {mv} from the node's own legal list failed to apply: {e}");
        }
        let depth = node.depth + 1;

        self.reserve_slot()?;
        let child = self.build_node(state, depth, Some(id))?;
        let child = self.insert(child);
        if let Some(node) = self.node_mut(id) {
            node.children[index] = Some(child);
        }
        self.max_depth = self.max_depth.max(depth - self.root_depth);
        Ok(Some(child))
    }

    /// Delete the subtree under `id`'s child for `mv`, if it exists.
    pub fn prune(&mut self, id: NodeId, mv: Move) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let Some(index) = node.move_index(mv) else {
            return;
        };
        if let Some(child) = node.children[index].take() {
            self.delete_subtree(child);
        }
    }

    /// Free a node's slot after running every tag's destroy hook.
    fn release(&mut self, id: NodeId) -> Option<Node> {
        let slot = self
            .nodes
            .get_mut(id.slot)
            .filter(|s| s.generation == id.generation)?;
        let mut node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.schema.free_tags(&mut node.tags, node.moves.len());
        self.vacant.push(id.slot);
        Some(node)
    }

    fn delete_subtree(&mut self, top: NodeId) {
        let Some(depth) = self.node(top).map(|n| n.depth) else {
            return;
        };
        let bound = (self.root_depth + self.max_depth + 1).saturating_sub(depth).max(1);

        // (node, next child slot to visit)
        let mut stack: Vec<(NodeId, usize)> = Vec::with_capacity(bound);
        stack.push((top, 0));
        while let Some((id, next)) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if next < node.children.len() {
                let child = node.children[next];
                stack.push((id, next + 1));
                if let Some(child) = child {
                    stack.push((child, 0));
                    debug_assert!(stack.len() <= bound, "subtree deeper than max depth");
                }
            } else {
                self.release(id);
            }
        }
    }

    /// Visit every live node in preorder.
    pub fn walk(&self, mut f: impl FnMut(NodeId, &Node)) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            f(id, node);
            // reversed so children come off the stack in move order
            stack.extend(node.children.iter().rev().flatten());
        }
    }

    /// Make `id` the new root, deleting every node that is not below it.
    ///
    /// Returns false if `id` is not a live node.
    pub fn descend_to(&mut self, id: NodeId) -> bool {
        let Some(new_depth) = self.node(id).map(|n| n.depth) else {
            return false;
        };

        let mut keep = id;
        while let Some(parent) = self.node(keep).and_then(|n| n.parent) {
            let siblings: Vec<NodeId> = self
                .node(parent)
                .map(|p| p.children.iter().flatten().copied().filter(|&c| c != keep).collect())
                .unwrap_or_default();
            for sibling in siblings {
                self.delete_subtree(sibling);
            }
            if let Some(node) = self.node_mut(keep) {
                node.parent = None;
            }
            self.release(parent);
            keep = parent;
        }

        self.max_depth = self.max_depth.saturating_sub(new_depth - self.root_depth);
        self.root_depth = new_depth;
        self.root = id;
        true
    }

    pub fn state_tag(&self, id: NodeId, tag: TagId) -> Option<&[u8]> {
        let range = self.schema.state_range(tag)?;
        Some(&self.node(id)?.tags[range])
    }

    pub fn state_tag_mut(&mut self, id: NodeId, tag: TagId) -> Option<&mut [u8]> {
        let range = self.schema.state_range(tag)?;
        Some(&mut self.node_mut(id)?.tags[range])
    }

    pub fn move_tag(&self, id: NodeId, tag: TagId, mv: Move) -> Option<&[u8]> {
        let node = self.node(id)?;
        let index = node.move_index(mv)?;
        let range = self.schema.move_tag_range(tag, node.moves.len(), index)?;
        Some(&node.tags[range])
    }

    pub fn move_tag_mut(&mut self, id: NodeId, tag: TagId, mv: Move) -> Option<&mut [u8]> {
        let schema = Arc::clone(&self.schema);
        let node = self.node_mut(id)?;
        let index = node.move_index(mv)?;
        let range = schema.move_tag_range(tag, node.moves.len(), index)?;
        Some(&mut node.tags[range])
    }

    /// Every move tag of `tag` for node `id`, in move order.
    pub fn move_tags(&self, id: NodeId, tag: TagId) -> Option<&[u8]> {
        let node = self.node(id)?;
        let range = self.schema.move_tags_range(tag, node.moves.len())?;
        Some(&node.tags[range])
    }

    pub fn move_tags_mut(&mut self, id: NodeId, tag: TagId) -> Option<&mut [u8]> {
        let schema = Arc::clone(&self.schema);
        let node = self.node_mut(id)?;
        let range = schema.move_tags_range(tag, node.moves.len())?;
        Some(&mut node.tags[range])
    }
}

impl Drop for GameTree {
    fn drop(&mut self) {
        self.delete_subtree(self.root);
    }
}
