//! Component B: the graph substrate every later component builds edges
//! into. Node/edge vocabulary lives in [`domain`]; the arena, adjacency
//! lists, and `empty -> building -> sealed` lifecycle live in
//! [`infrastructure`].

mod domain;
mod infrastructure;
mod registry;

pub use domain::{
    AnnotationEdgeKind, AnnotationNodeKind, ControlDepKind, DataDepKind, EdgeKind, InstNodeKind,
    Node, NodeId, NodeKind, ParamNodeKind, ParamOwner, ParameterKind, VarNodeKind,
};
pub use infrastructure::Graph;
pub use registry::{populate_base_nodes, NodeRegistry};
