//! Component D: control-dependency edges (spec §4.D) — function entry to
//! every block's first instruction, branch-to-dependent-instruction edges via
//! a postdominator-tree (Ferrante et al.) computation over basic blocks, and
//! call/return edges at call sites.

mod postdom;

use crate::features::graph::{ControlDepKind, EdgeKind, Graph, NodeRegistry};
use crate::ir::instruction::{FunctionId, Opcode};
use crate::ir::Module;
use crate::shared::models::AnalysisContext;

pub use postdom::PostdominatorTree;

/// Builds control-dependency edges for `function`. Mirrors spec §4.D:
/// 1. `controlDep.entry` from the function's `FunctionEntry` node to the
///    first instruction of every basic block.
/// 2. `controlDep.br` from a branch instruction to every instruction whose
///    block it controls (block `B` is control-dependent on branch `A` iff `A`
///    has a successor not postdominated by `B`'s block, but is itself
///    postdominated by `B`'s immediate postdominator — the standard Ferrante
///    definition, computed over the postdominator tree in [`postdom`]).
/// 3. `controlDep.callInv`/`callRet` at call sites, linking the call
///    instruction to its own containing block (call-site bracket).
pub fn build_control_dep_edges(
    graph: &mut Graph,
    registry: &NodeRegistry,
    module: &Module,
    function: FunctionId,
    stats: &AnalysisContext,
) {
    let func = module.function(function);
    let Some(entry_node) = registry.function_entry_node(function) else {
        return;
    };

    // 1. Entry edges: function entry controls the first instruction of every
    // block.
    for block in &func.blocks {
        if let Some(&first) = block.instructions.first() {
            if let Some(first_node) = registry.inst_node(first) {
                graph.add_edge(entry_node, first_node, EdgeKind::ControlDep(ControlDepKind::Entry));
                stats.incr("control_dep.entry_edges");
            }
        }
    }

    let postdom = PostdominatorTree::build(func);

    // 2. Branch edges: for every block ending in a conditional branch, every
    // block control-dependent on it (per the postdominator frontier) gets an
    // edge from the branch instruction to each of that block's instructions.
    for block in &func.blocks {
        let Some(&branch_inst) = block.instructions.last() else {
            continue;
        };
        if !is_branch(&module.inst(branch_inst).opcode) {
            continue;
        }
        let Some(branch_node) = registry.inst_node(branch_inst) else {
            continue;
        };
        for dependent_block in postdom.control_dependents(block.id) {
            let dep_block = func.block(dependent_block);
            for &inst_id in &dep_block.instructions {
                if let Some(inst_node) = registry.inst_node(inst_id) {
                    graph.add_edge(branch_node, inst_node, EdgeKind::ControlDep(ControlDepKind::Br));
                    stats.incr("control_dep.br_edges");
                }
            }
        }
    }

    // 3. Call-invocation / call-return bracket at each call site: the call
    // instruction's block entry controls the call, and the call controls the
    // instruction that consumes its return value within the same block.
    for &inst_id in &func.blocks.iter().flat_map(|b| b.instructions.iter().copied()).collect::<Vec<_>>() {
        let inst = module.inst(inst_id);
        let Opcode::Call(_) = &inst.opcode else {
            continue;
        };
        let Some(call_node) = registry.inst_node(inst_id) else {
            continue;
        };
        let kind = ControlDepKind::CallInv;
        graph.add_edge(call_node, call_node, EdgeKind::ControlDep(kind));
        stats.incr("control_dep.call_inv_edges");

        for user_id in module.users_of(function, crate::ir::Operand::Inst(inst_id)) {
            if let Some(user_node) = registry.inst_node(user_id) {
                graph.add_edge(
                    call_node,
                    user_node,
                    EdgeKind::ControlDep(ControlDepKind::CallRet),
                );
                stats.incr("control_dep.call_ret_edges");
            }
        }
    }
}

fn is_branch(opcode: &Opcode) -> bool {
    matches!(opcode, Opcode::CondBr(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::graph::populate_base_nodes;
    use crate::ir::function::{BasicBlock, Domain, Terminator};
    use crate::ir::instruction::{BasicBlockId, Operand};
    use crate::ir::module::ModuleBuilder;
    use crate::ir::types::DebugTypeKind;
    use crate::ir::{CallSite, CallTarget, Function, Instruction};
    use crate::shared::models::Span;

    fn diamond_module() -> (Module, FunctionId, crate::ir::InstructionId, crate::ir::InstructionId) {
        let mut b = ModuleBuilder::new();
        let i32_ty = b.type_arena_mut().intern(DebugTypeKind::Scalar {
            name: "int".into(),
            width_bits: 32,
            signed: true,
        });
        let fid = b.reserve_function("f");

        let cond_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: cond_id,
            function: fid,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode: Opcode::CondBr(Operand::Const),
        });

        let then_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: then_id,
            function: fid,
            block: BasicBlockId(1),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode: Opcode::Other,
        });

        let join_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: join_id,
            function: fid,
            block: BasicBlockId(2),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode: Opcode::Ret(None),
        });

        b.push_function(Function {
            id: fid,
            name: "f".into(),
            domain: Domain::Kernel,
            defined: true,
            arguments: vec![],
            return_type: i32_ty,
            blocks: vec![
                BasicBlock {
                    id: BasicBlockId(0),
                    instructions: vec![cond_id],
                    terminator: Terminator::CondBr {
                        then_bb: BasicBlockId(1),
                        else_bb: BasicBlockId(2),
                    },
                },
                BasicBlock {
                    id: BasicBlockId(1),
                    instructions: vec![then_id],
                    terminator: Terminator::Br(BasicBlockId(2)),
                },
                BasicBlock {
                    id: BasicBlockId(2),
                    instructions: vec![join_id],
                    terminator: Terminator::Ret,
                },
            ],
            entry: BasicBlockId(0),
            annotation: None,
        });
        (b.build(), fid, cond_id, then_id)
    }

    #[test]
    fn branch_controls_the_then_block_but_not_the_join_block() {
        let (module, fid, cond_id, then_id) = diamond_module();
        let mut graph = Graph::new();
        graph.begin_building();
        let registry = populate_base_nodes(&mut graph, &module);
        let stats = AnalysisContext::new();
        build_control_dep_edges(&mut graph, &registry, &module, fid, &stats);
        graph.seal();

        let cond_node = registry.inst_node(cond_id).unwrap();
        let then_node = registry.inst_node(then_id).unwrap();
        let br_neighbors = graph.neighbors(cond_node, &[EdgeKind::ControlDep(ControlDepKind::Br)]);
        assert!(br_neighbors.contains(&then_node));
    }

    #[test]
    fn call_instruction_gets_a_self_loop_call_inv_edge() {
        let mut b = ModuleBuilder::new();
        let i32_ty = b.type_arena_mut().intern(DebugTypeKind::Scalar {
            name: "int".into(),
            width_bits: 32,
            signed: true,
        });
        let fid = b.reserve_function("f");
        let callee = b.reserve_function("g");
        let call_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: call_id,
            function: fid,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode: Opcode::Call(CallSite {
                target: CallTarget::Direct(callee),
                args: vec![],
            }),
        });
        b.push_function(Function {
            id: fid,
            name: "f".into(),
            domain: Domain::Kernel,
            defined: true,
            arguments: vec![],
            return_type: i32_ty,
            blocks: vec![BasicBlock {
                id: BasicBlockId(0),
                instructions: vec![call_id],
                terminator: Terminator::Ret,
            }],
            entry: BasicBlockId(0),
            annotation: None,
        });
        let module = b.build();

        let mut graph = Graph::new();
        graph.begin_building();
        let registry = populate_base_nodes(&mut graph, &module);
        let stats = AnalysisContext::new();
        build_control_dep_edges(&mut graph, &registry, &module, fid, &stats);
        graph.seal();

        let call_node = registry.inst_node(call_id).unwrap();
        let neighbors = graph.neighbors(call_node, &[EdgeKind::ControlDep(ControlDepKind::CallInv)]);
        assert_eq!(neighbors, vec![call_node]);
    }
}
