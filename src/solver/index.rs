use fnv::FnvHashMap;

use crate::solver::features::FeatureVector;
use crate::solver::tree::NodeId;

/// One bucket of the feature space - the tree nodes whose states project to
/// the same feature vector. Cells hold node handles, the tree owns the nodes.
pub(crate) struct FeatureCell {
    pub(crate) vector: FeatureVector,
    pub(crate) nodes: Vec<NodeId>,
}

/// Sparse map from feature vectors to cells with a round-robin cursor.
///
/// Cells are appended in first-insertion order and never removed; the cursor
/// wraps modulo the growing cell list, so every cell gets its turn no matter
/// how small it is. That cycling, not a scalar heuristic, is what spreads
/// the search across the feature landscape.
pub(crate) struct FeatureSpace {
    by_vector: FnvHashMap<FeatureVector, usize>,
    cells: Vec<FeatureCell>,
    cursor: usize,
}

impl FeatureSpace {
    pub(crate) fn new() -> FeatureSpace {
        FeatureSpace {
            by_vector: FnvHashMap::default(),
            cells: Vec::new(),
            cursor: 0,
        }
    }

    pub(crate) fn insert(&mut self, vector: FeatureVector, node: NodeId) {
        let index = match self.by_vector.get(&vector).copied() {
            Some(index) => index,
            None => {
                self.cells.push(FeatureCell {
                    vector,
                    nodes: Vec::new(),
                });
                self.by_vector.insert(vector, self.cells.len() - 1);
                self.cells.len() - 1
            }
        };
        self.cells[index].nodes.push(node);
    }

    /// The next cell in round-robin order. `None` only while the space is
    /// completely empty.
    pub(crate) fn next_cell(&mut self) -> Option<usize> {
        if self.cells.is_empty() {
            return None;
        }
        let index = self.cursor % self.cells.len();
        self.cursor = index + 1;
        Some(index)
    }

    pub(crate) fn cell(&self, index: usize) -> &FeatureCell {
        &self.cells[index]
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
