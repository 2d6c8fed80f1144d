use fnv::FnvHashMap;

use crate::moves::PushMove;
use crate::state::State;

/// Stable handle into the tree's node pool. The pool is append-only, so
/// handles never dangle; cells of the feature space store these instead of
/// references, which keeps the node/cell cycle ownership-free.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[cfg(test)]
    pub(crate) fn new_for_tests(id: u32) -> NodeId {
        NodeId(id)
    }
}

/// A move waiting to be tried from some node, with the weight the advisors
/// gave it. Expanded at most once per node.
pub(crate) struct RatedMove {
    pub(crate) mov: PushMove,
    pub(crate) weight: u8,
    pub(crate) expanded: bool,
}

pub(crate) struct Node {
    /// Canonicalized - see `preprocessing::canonicalize`.
    pub(crate) state: State,
    pub(crate) parent: Option<NodeId>,
    /// The push that produced this state, `None` for the root.
    pub(crate) mov: Option<PushMove>,
    /// Sum of move weights from the root. Root has zero.
    pub(crate) accumulated_weight: u32,
    pub(crate) moves: Vec<RatedMove>,
}

/// Append-only search tree with duplicate detection by canonical state.
/// The state table is the sole duplicate filter - an equal state is never
/// inserted twice, no matter which path found it.
pub(crate) struct SearchTree {
    nodes: Vec<Node>,
    by_state: FnvHashMap<State, NodeId>,
}

impl SearchTree {
    pub(crate) fn new() -> SearchTree {
        SearchTree {
            nodes: Vec::new(),
            by_state: FnvHashMap::default(),
        }
    }

    pub(crate) fn add_root(&mut self, state: State) -> NodeId {
        assert!(self.nodes.is_empty());
        let id = NodeId(0);
        self.by_state.insert(state.clone(), id);
        self.nodes.push(Node {
            state,
            parent: None,
            mov: None,
            accumulated_weight: 0,
            moves: Vec::new(),
        });
        id
    }

    /// Inserts a new node unless an equal state already exists.
    pub(crate) fn try_add(
        &mut self,
        state: State,
        parent: NodeId,
        mov: PushMove,
        weight: u8,
    ) -> Option<NodeId> {
        if self.by_state.contains_key(&state) {
            return None;
        }
        let id = NodeId(self.nodes.len() as u32);
        let accumulated_weight = self.node(parent).accumulated_weight + u32::from(weight);
        self.by_state.insert(state.clone(), id);
        self.nodes.push(Node {
            state,
            parent: Some(parent),
            mov: Some(mov),
            accumulated_weight,
            moves: Vec::new(),
        });
        Some(id)
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids from the root to `id`, root first.
    pub(crate) fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent {
            path.push(parent);
            cur = parent;
        }
        path.reverse();
        path
    }
}
