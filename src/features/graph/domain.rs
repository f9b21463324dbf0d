//! Node and edge vocabulary of the PDG (spec §3). Pure data — no petgraph
//! dependency here, so the vocabulary can be unit-tested and matched on
//! without pulling in the graph substrate.

use crate::ir::{DebugTypeId, FunctionId, GlobalId, InstructionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstNodeKind {
    Call,
    Ret,
    Br,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarNodeKind {
    StaticGlobal,
    StaticModule,
    StaticFunction,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamNodeKind {
    FormalIn,
    FormalOut,
    ActualIn,
    ActualOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationNodeKind {
    Var,
    Global,
    Other,
}

/// What a `Param` node is rooted in (spec §3: "owning argument / global /
/// return identity").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamOwner {
    Argument { function: FunctionId, index: u32 },
    Global(GlobalId),
    Return(FunctionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Inst {
        sub: InstNodeKind,
        function: FunctionId,
        instruction: InstructionId,
    },
    Var {
        sub: VarNodeKind,
        global: Option<GlobalId>,
    },
    FunctionEntry {
        function: FunctionId,
        annotation: Option<String>,
    },
    Param {
        sub: ParamNodeKind,
        owner: ParamOwner,
        parent: Option<NodeId>,
        child_index: Option<u32>,
        debug_type: crate::ir::DebugTypeId,
    },
    Annotation {
        sub: AnnotationNodeKind,
        text: String,
    },
}

/// A PDG vertex. `function`/`param_index`/`debug_type` mirror spec §3's "every
/// node has an optional enclosing function; an optional parameter index; an
/// optional debug type" — derived once at construction from `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub function: Option<FunctionId>,
    pub param_index: Option<u32>,
    pub debug_type: Option<DebugTypeId>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlDepKind {
    CallInv,
    IndirectCallInv,
    CallRet,
    Entry,
    Br,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataDepKind {
    DefUse,
    Raw,
    Alias,
    Ret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    In,
    Out,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationEdgeKind {
    Global,
    Var,
    Other,
}

/// One of the five edge families of spec §3. Fieldless sub-enums keep
/// `EdgeKind` itself `Copy`, so it can be used both as edge payload and as
/// an adjacency-map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    ControlDep(ControlDepKind),
    DataDep(DataDepKind),
    Parameter(ParameterKind),
    Annotation(AnnotationEdgeKind),
    ValDep,
}
