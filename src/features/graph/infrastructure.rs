//! The graph substrate itself (spec §4.B, §9 "Cyclic graph" design note): an
//! append-only node arena addressed by stable integer IDs, edges stored as
//! per-node adjacency lists keyed by edge type, and an `empty -> building ->
//! sealed` lifecycle (spec "State machines") enforced by panicking on
//! out-of-phase calls — the only kind of failure spec §7 allows to be fatal.

use super::domain::{EdgeKind, Node, NodeId, NodeKind};
use crate::errors::invariant_violation;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphState {
    Empty,
    Building,
    Sealed,
}

#[derive(Debug)]
pub struct Graph {
    state: GraphState,
    nodes: Vec<Node>,
    /// Outgoing adjacency, keyed by edge kind, per node.
    adjacency: Vec<FxHashMap<EdgeKind, Vec<NodeId>>>,
    edge_set: FxHashSet<(NodeId, NodeId, EdgeKind)>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            state: GraphState::Empty,
            nodes: Vec::new(),
            adjacency: Vec::new(),
            edge_set: FxHashSet::default(),
        }
    }

    /// `empty -> building`.
    pub fn begin_building(&mut self) {
        if self.state != GraphState::Empty {
            invariant_violation(format_args!(
                "begin_building called on a graph already in {:?}",
                self.state
            ));
        }
        self.state = GraphState::Building;
    }

    /// `building -> sealed`. Queries are only valid after this.
    pub fn seal(&mut self) {
        if self.state != GraphState::Building {
            invariant_violation(format_args!("seal called on a graph in {:?}", self.state));
        }
        self.state = GraphState::Sealed;
    }

    pub fn is_sealed(&self) -> bool {
        self.state == GraphState::Sealed
    }

    fn require_building(&self) {
        if self.state != GraphState::Building {
            invariant_violation(format_args!(
                "graph mutation attempted outside building (state = {:?})",
                self.state
            ));
        }
    }

    fn require_sealed(&self) {
        if self.state != GraphState::Sealed {
            invariant_violation(format_args!(
                "graph query attempted before sealing (state = {:?})",
                self.state
            ));
        }
    }

    /// Derives `function`/`param_index`/`debug_type` from `kind` and appends
    /// the node. IDs are assigned in call order (spec §5 ordering
    /// guarantee).
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.require_building();
        let id = NodeId(self.nodes.len() as u32);
        let (function, param_index, debug_type) = match &kind {
            NodeKind::Inst { function, .. } => (Some(*function), None, None),
            NodeKind::Var { .. } => (None, None, None),
            NodeKind::FunctionEntry { function, .. } => (Some(*function), None, None),
            NodeKind::Param {
                owner,
                child_index,
                debug_type,
                ..
            } => {
                let function = match owner {
                    super::domain::ParamOwner::Argument { function, .. } => Some(*function),
                    super::domain::ParamOwner::Return(function) => Some(*function),
                    super::domain::ParamOwner::Global(_) => None,
                };
                let param_index = if let super::domain::ParamOwner::Argument { index, .. } = owner
                {
                    Some(*index)
                } else {
                    *child_index
                };
                (function, param_index, Some(*debug_type))
            }
            NodeKind::Annotation { .. } => (None, None, None),
        };
        self.nodes.push(Node {
            id,
            function,
            param_index,
            debug_type,
            kind,
        });
        self.adjacency.push(FxHashMap::default());
        id
    }

    /// Idempotent per `(src, dst, kind)`.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, kind: EdgeKind) {
        self.require_building();
        if !self.edge_set.insert((src, dst, kind)) {
            return;
        }
        self.adjacency[src.0 as usize]
            .entry(kind)
            .or_default()
            .push(dst);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Nodes reachable from `n` by exactly one edge whose kind is in `kinds`.
    pub fn neighbors(&self, n: NodeId, kinds: &[EdgeKind]) -> Vec<NodeId> {
        self.require_sealed();
        let mut out = Vec::new();
        for kind in kinds {
            if let Some(targets) = self.adjacency[n.0 as usize].get(kind) {
                out.extend(targets.iter().copied());
            }
        }
        out
    }

    /// BFS reachability from `src` to `dst`, following every edge kind except
    /// those in `exclude_kinds`. Bounded by node count (visited set), so it
    /// terminates on cyclic graphs.
    pub fn reach(&self, src: NodeId, dst: NodeId, exclude_kinds: &[EdgeKind]) -> bool {
        self.require_sealed();
        if src == dst {
            return true;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        visited[src.0 as usize] = true;
        queue.push_back(src);
        while let Some(cur) = queue.pop_front() {
            for (kind, targets) in &self.adjacency[cur.0 as usize] {
                if exclude_kinds.contains(kind) {
                    continue;
                }
                for &next in targets {
                    if next == dst {
                        return true;
                    }
                    if !visited[next.0 as usize] {
                        visited[next.0 as usize] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::graph::domain::{InstNodeKind, ParamOwner};
    use crate::ir::{FunctionId, InstructionId};

    fn inst_node(n: u32) -> NodeKind {
        NodeKind::Inst {
            sub: InstNodeKind::Other,
            function: FunctionId(0),
            instruction: InstructionId(n),
        }
    }

    #[test]
    fn mutation_before_building_panics() {
        let result = std::panic::catch_unwind(|| {
            let mut g = Graph::new();
            g.add_node(inst_node(0));
        });
        assert!(result.is_err());
    }

    #[test]
    fn query_before_seal_panics() {
        let result = std::panic::catch_unwind(|| {
            let mut g = Graph::new();
            g.begin_building();
            let a = g.add_node(inst_node(0));
            g.neighbors(a, &[]);
        });
        assert!(result.is_err());
    }

    #[test]
    fn add_edge_is_idempotent() {
        let mut g = Graph::new();
        g.begin_building();
        let a = g.add_node(inst_node(0));
        let b = g.add_node(inst_node(1));
        g.add_edge(a, b, EdgeKind::DataDep(super::super::domain::DataDepKind::DefUse));
        g.add_edge(a, b, EdgeKind::DataDep(super::super::domain::DataDepKind::DefUse));
        g.seal();
        let neighbors = g.neighbors(
            a,
            &[EdgeKind::DataDep(super::super::domain::DataDepKind::DefUse)],
        );
        assert_eq!(neighbors, vec![b]);
    }

    #[test]
    fn reach_terminates_on_cycle() {
        let mut g = Graph::new();
        g.begin_building();
        let a = g.add_node(inst_node(0));
        let b = g.add_node(inst_node(1));
        let c = g.add_node(inst_node(2));
        let kind = EdgeKind::DataDep(super::super::domain::DataDepKind::DefUse);
        g.add_edge(a, b, kind);
        g.add_edge(b, c, kind);
        g.add_edge(c, a, kind);
        g.seal();
        assert!(g.reach(a, c, &[]));
        assert!(!g.reach(a, c, &[kind]));
    }

    #[test]
    fn param_node_derives_function_and_index_from_owner() {
        let mut g = Graph::new();
        g.begin_building();
        let fid = FunctionId(3);
        let root = g.add_node(NodeKind::Param {
            sub: super::super::domain::ParamNodeKind::FormalIn,
            owner: ParamOwner::Argument {
                function: fid,
                index: 0,
            },
            parent: None,
            child_index: None,
            debug_type: crate::ir::DebugTypeId(0),
        });
        g.seal();
        assert_eq!(g.node(root).function, Some(fid));
        assert_eq!(g.node(root).param_index, Some(0));
        assert_eq!(g.node(root).debug_type, Some(crate::ir::DebugTypeId(0)));
    }
}
