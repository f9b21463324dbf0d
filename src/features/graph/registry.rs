//! Maps IR entities (instructions, functions, globals) to the [`NodeId`]s
//! component B created for them. Every later component (C through F) looks
//! nodes up this way instead of re-deriving them, so "one `FunctionEntry` per
//! defined function" (spec §3 invariant) only has to be enforced in one
//! place.

use super::domain::{InstNodeKind, NodeId, NodeKind, VarNodeKind};
use super::infrastructure::Graph;
use crate::ir::instruction::Opcode;
use crate::ir::{FunctionId, GlobalId, InstructionId, Module};
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct NodeRegistry {
    inst_nodes: FxHashMap<InstructionId, NodeId>,
    function_entry_nodes: FxHashMap<FunctionId, NodeId>,
    var_nodes: FxHashMap<GlobalId, NodeId>,
}

impl NodeRegistry {
    pub fn inst_node(&self, id: InstructionId) -> Option<NodeId> {
        self.inst_nodes.get(&id).copied()
    }

    pub fn function_entry_node(&self, id: FunctionId) -> Option<NodeId> {
        self.function_entry_nodes.get(&id).copied()
    }

    pub fn var_node(&self, id: GlobalId) -> Option<NodeId> {
        self.var_nodes.get(&id).copied()
    }
}

fn inst_node_kind(opcode: &Opcode) -> InstNodeKind {
    match opcode {
        Opcode::Call(_) => InstNodeKind::Call,
        Opcode::Ret(_) => InstNodeKind::Ret,
        Opcode::Br | Opcode::CondBr(_) => InstNodeKind::Br,
        _ => InstNodeKind::Other,
    }
}

/// Populates `graph` (must be in the `building` phase) with exactly one
/// `FunctionEntry` per defined function, one `Inst` node per instruction, and
/// one `Var` node per global. Returns the registry mapping IR ids back to
/// the nodes just created.
pub fn populate_base_nodes(graph: &mut Graph, module: &Module) -> NodeRegistry {
    let mut registry = NodeRegistry::default();

    for function in &module.functions {
        if !function.defined {
            continue;
        }
        let node = graph.add_node(NodeKind::FunctionEntry {
            function: function.id,
            annotation: function.annotation.clone(),
        });
        registry.function_entry_nodes.insert(function.id, node);
    }

    for inst in &module.instructions {
        let node = graph.add_node(NodeKind::Inst {
            sub: inst_node_kind(&inst.opcode),
            function: inst.function,
            instruction: inst.id,
        });
        registry.inst_nodes.insert(inst.id, node);
    }

    for global in &module.globals {
        let node = graph.add_node(NodeKind::Var {
            sub: VarNodeKind::StaticGlobal,
            global: Some(global.id),
        });
        registry.var_nodes.insert(global.id, node);
    }

    registry
}
