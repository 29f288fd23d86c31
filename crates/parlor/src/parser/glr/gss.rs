//! Graph-structured stack.
//!
//! An arena of nodes identified by dense handles. A node is unique per
//! `(state, input position)`; edges point from newer nodes back toward the
//! stack bottom and carry the SPPF node that labels the step. Shared
//! prefixes across concurrent parse heads fall out of node sharing.

use super::sppf::SppfId;
use crate::table::StateId;
use ahash::RandomState;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Dense handle of a GSS node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GssNodeId(u32);

impl GssNodeId {
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Edge toward the stack bottom, labeled with a parse value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GssEdge {
    pub target: GssNodeId,
    pub label: SppfId,
}

/// One stack node: an automaton state at an input position.
#[derive(Debug, Clone)]
pub(crate) struct GssNode {
    pub state: StateId,
    #[allow(dead_code)] // Identity component; kept for debugging dumps.
    pub pos: usize,
    pub edges: SmallVec<[GssEdge; 2]>,
}

/// The graph-structured stack arena.
pub(crate) struct Gss {
    nodes: Vec<GssNode>,
    index: HashMap<(StateId, usize), GssNodeId, RandomState>,
}

impl Gss {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::with_hasher(RandomState::new()),
        }
    }

    pub(crate) fn node(&self, id: GssNodeId) -> &GssNode {
        &self.nodes[id.index()]
    }

    /// Node for `(state, pos)`, creating it when absent. The second return
    /// value reports creation.
    pub(crate) fn get_or_insert(&mut self, state: StateId, pos: usize) -> (GssNodeId, bool) {
        if let Some(&id) = self.index.get(&(state, pos)) {
            return (id, false);
        }
        let id = GssNodeId(self.nodes.len() as u32);
        self.nodes.push(GssNode {
            state,
            pos,
            edges: SmallVec::new(),
        });
        self.index.insert((state, pos), id);
        (id, true)
    }

    /// Add an edge, deduplicated by `(target, label)`. Returns whether the
    /// edge is new; a new edge into an existing node is where ambiguity
    /// packs.
    pub(crate) fn add_edge(&mut self, from: GssNodeId, target: GssNodeId, label: SppfId) -> bool {
        let edge = GssEdge { target, label };
        let edges = &mut self.nodes[from.index()].edges;
        if edges.contains(&edge) {
            return false;
        }
        edges.push(edge);
        true
    }

    /// Every backward path of exactly `len` edges from `from`. Labels are
    /// returned in left-to-right (rhs) order together with the node the
    /// path ends on.
    pub(crate) fn paths(
        &self,
        from: GssNodeId,
        len: usize,
    ) -> Vec<(SmallVec<[SppfId; 4]>, GssNodeId)> {
        let mut out = Vec::new();
        let mut labels: SmallVec<[SppfId; 4]> = SmallVec::new();
        self.walk(from, len, &mut labels, &mut out);
        out
    }

    fn walk(
        &self,
        node: GssNodeId,
        remaining: usize,
        labels: &mut SmallVec<[SppfId; 4]>,
        out: &mut Vec<(SmallVec<[SppfId; 4]>, GssNodeId)>,
    ) {
        if remaining == 0 {
            // Edges were collected top-down, i.e. rightmost symbol first.
            out.push((labels.iter().rev().copied().collect(), node));
            return;
        }
        for edge in &self.node(node).edges {
            labels.push(edge.label);
            self.walk(edge.target, remaining - 1, labels, out);
            labels.pop();
        }
    }
}
