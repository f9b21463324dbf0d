//! Component E: call-site resolution and PDG call-graph assembly (spec
//! §4.E). Consumes the edges C and D already wrote into the sealed graph and
//! adds the call-invocation, indirect-candidate, and return edges that turn
//! a per-function PDG into one connected whole.

mod signature_index;

pub use signature_index::SignatureIndex;

use crate::features::graph::{ControlDepKind, DataDepKind, EdgeKind, Graph, NodeRegistry};
use crate::ir::instruction::{CallTarget, FunctionId, InstructionId, Opcode, Operand};
use crate::ir::Module;
use crate::shared::models::AnalysisContext;
use std::collections::HashSet;

/// Resolves every call site of `function` against `module`'s call graph and
/// writes:
/// - direct calls: `controlDep.callInv` call -> callee `FunctionEntry`,
///   `dataDep.ret` callee-return -> call;
/// - indirect calls: one `controlDep.indirectCallInv` per exact-signature
///   candidate (optionally narrowed by `allowed_callees`), lexicographically
///   tie-broken, plus `dataDep.ret` from each candidate's returns.
///
/// An indirect call with zero candidates is recorded in `stats` and
/// otherwise left unwired (spec §4 Failure semantics: "no formal/actual
/// wiring; analysis continues with conservative widening").
pub fn resolve_call_sites(
    graph: &mut Graph,
    registry: &NodeRegistry,
    module: &Module,
    function: FunctionId,
    index: &SignatureIndex,
    allowed_callees: Option<&HashSet<String>>,
    stats: &AnalysisContext,
) {
    for inst_id in module.instructions_of(function) {
        let inst = module.inst(inst_id);
        let Opcode::Call(call_site) = &inst.opcode else {
            continue;
        };
        let Some(call_node) = registry.inst_node(inst_id) else {
            continue;
        };

        match &call_site.target {
            CallTarget::Direct(callee) => {
                wire_direct_call(graph, registry, module, call_node, *callee, stats);
            }
            CallTarget::Indirect { signature } => {
                let mut candidates =
                    index.candidates(&module.type_arena, &signature.params, signature.ret);
                if let Some(allowed) = allowed_callees {
                    candidates.retain(|&fid| allowed.contains(&module.function(fid).name));
                }
                candidates.sort_by(|&a, &b| module.function(a).name.cmp(&module.function(b).name));

                if candidates.is_empty() {
                    stats.incr("call_graph.unresolved_indirect_calls");
                    continue;
                }
                for callee in candidates {
                    let Some(callee_entry) = registry.function_entry_node(callee) else {
                        continue;
                    };
                    graph.add_edge(
                        call_node,
                        callee_entry,
                        EdgeKind::ControlDep(ControlDepKind::IndirectCallInv),
                    );
                    stats.incr("call_graph.indirect_call_inv_edges");
                    wire_returns(graph, registry, module, call_node, callee, stats);
                }
            }
        }
    }
}

fn wire_direct_call(
    graph: &mut Graph,
    registry: &NodeRegistry,
    module: &Module,
    call_node: crate::features::graph::NodeId,
    callee: FunctionId,
    stats: &AnalysisContext,
) {
    let Some(callee_entry) = registry.function_entry_node(callee) else {
        return;
    };
    graph.add_edge(call_node, callee_entry, EdgeKind::ControlDep(ControlDepKind::CallInv));
    stats.incr("call_graph.call_inv_edges");
    wire_returns(graph, registry, module, call_node, callee, stats);
}

fn wire_returns(
    graph: &mut Graph,
    registry: &NodeRegistry,
    module: &Module,
    call_node: crate::features::graph::NodeId,
    callee: FunctionId,
    stats: &AnalysisContext,
) {
    if !module.function(callee).defined {
        return;
    }
    for ret_id in return_instructions(module, callee) {
        if let Some(ret_node) = registry.inst_node(ret_id) {
            graph.add_edge(ret_node, call_node, EdgeKind::DataDep(DataDepKind::Ret));
            stats.incr("call_graph.ret_edges");
        }
    }
}

fn return_instructions(module: &Module, function: FunctionId) -> Vec<InstructionId> {
    module
        .instructions_of(function)
        .into_iter()
        .filter(|&id| matches!(module.inst(id).opcode, Opcode::Ret(_)))
        .collect()
}

/// Wires one call site's actual-parameter trees to its callee's formal trees
/// (spec §4.E): `actualIn.root -> formalIn.root` (`parameter.in`),
/// `formalOut.root -> actualOut.root` (`parameter.out`), and per-level
/// `formalIn.node -> formalOut.node` pairing (`parameter.field`). Tree
/// construction itself is component F's job; this takes the already-built
/// roots and level pairing as input so the two components stay decoupled.
pub fn wire_actual_formal_parameters(
    graph: &mut Graph,
    actual_in_root: crate::features::graph::NodeId,
    formal_in_root: crate::features::graph::NodeId,
    formal_out_root: crate::features::graph::NodeId,
    actual_out_root: crate::features::graph::NodeId,
    level_pairs: &[(crate::features::graph::NodeId, crate::features::graph::NodeId)],
    stats: &AnalysisContext,
) {
    use crate::features::graph::ParameterKind;

    graph.add_edge(actual_in_root, formal_in_root, EdgeKind::Parameter(ParameterKind::In));
    stats.incr("call_graph.parameter_in_edges");
    graph.add_edge(formal_out_root, actual_out_root, EdgeKind::Parameter(ParameterKind::Out));
    stats.incr("call_graph.parameter_out_edges");
    for &(formal, actual) in level_pairs {
        graph.add_edge(formal, actual, EdgeKind::Parameter(ParameterKind::Field));
        stats.incr("call_graph.parameter_field_edges");
    }
}

/// Caller instructions that read or write a call's argument operand bind to
/// the corresponding `actualIn`/`actualOut` node via `dataDep.defUse` (spec
/// §4.E, last bullet).
pub fn bind_caller_operand_to_actual_node(
    graph: &mut Graph,
    registry: &NodeRegistry,
    module: &Module,
    function: FunctionId,
    operand: Operand,
    actual_node: crate::features::graph::NodeId,
    stats: &AnalysisContext,
) {
    for user_id in module.users_of(function, operand) {
        if let Some(user_node) = registry.inst_node(user_id) {
            graph.add_edge(user_node, actual_node, EdgeKind::DataDep(DataDepKind::DefUse));
            stats.incr("call_graph.actual_bind_edges");
        }
    }
}
