//! Component C: per-instruction def-use, read-after-write, and may-alias
//! edges (spec §4.C).

use crate::features::graph::{DataDepKind, EdgeKind, Graph, NodeKind, NodeRegistry};
use crate::ir::instruction::Opcode;
use crate::ir::ports::{AliasOracle, AliasResult, MemoryDependencyOracle};
use crate::ir::{FunctionId, Module, Operand};
use crate::shared::models::AnalysisContext;

/// Builds data-dependency edges for every instruction of `function`. `graph`
/// must still be in the `building` phase; `registry` must already hold a
/// node for every instruction of `module`.
pub fn build_data_dep_edges(
    graph: &mut Graph,
    registry: &NodeRegistry,
    module: &Module,
    function: FunctionId,
    mem_oracle: &dyn MemoryDependencyOracle,
    alias_oracle: &dyn AliasOracle,
    stats: &AnalysisContext,
) {
    let inst_ids = module.instructions_of(function);

    for &inst_id in &inst_ids {
        let Some(inst_node) = registry.inst_node(inst_id) else {
            continue;
        };

        // 1. Def-use: every instruction in this function that reads `inst`'s
        // result.
        for user_id in module.users_of(function, Operand::Inst(inst_id)) {
            let Some(user_node) = registry.inst_node(user_id) else {
                continue;
            };
            let kind = match &graph.node(user_node).kind {
                NodeKind::Annotation { sub, .. } => EdgeKind::Annotation(annotation_edge_kind(*sub)),
                _ => EdgeKind::DataDep(DataDepKind::DefUse),
            };
            graph.add_edge(inst_node, user_node, kind);
            stats.incr("data_dep.def_use_edges");
        }

        let inst = module.inst(inst_id);

        // 2. Read-after-write.
        if matches!(inst.opcode, Opcode::Load(_)) {
            if let Some(store_id) = mem_oracle.nearest_prior_store(inst_id) {
                if let Some(store_node) = registry.inst_node(store_id) {
                    graph.add_edge(store_node, inst_node, EdgeKind::DataDep(DataDepKind::Raw));
                    stats.incr("data_dep.raw_edges");
                }
            }
        }

        // 3. Alias, widened to MayAlias on oracle failure (spec §4.C, §7).
        if inst.is_pointer_typed() {
            for &other_id in &inst_ids {
                if other_id == inst_id {
                    continue;
                }
                let Some(other_node) = registry.inst_node(other_id) else {
                    continue;
                };
                let result = alias_oracle.may_alias(Operand::Inst(inst_id), Operand::Inst(other_id));
                if result != AliasResult::NoAlias {
                    graph.add_edge(inst_node, other_node, EdgeKind::DataDep(DataDepKind::Alias));
                    stats.incr("data_dep.alias_edges");
                }
            }
        }
    }
}

fn annotation_edge_kind(sub: crate::features::graph::AnnotationNodeKind) -> crate::features::graph::AnnotationEdgeKind {
    use crate::features::graph::{AnnotationEdgeKind, AnnotationNodeKind};
    match sub {
        AnnotationNodeKind::Var => AnnotationEdgeKind::Var,
        AnnotationNodeKind::Global => AnnotationEdgeKind::Global,
        AnnotationNodeKind::Other => AnnotationEdgeKind::Other,
    }
}
