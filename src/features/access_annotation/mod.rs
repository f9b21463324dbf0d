//! Component H: per-argument access inference and annotation derivation
//! (spec §4.H). Runs bottom-up over the call graph (DFS pre-order, visited
//! set breaks cycles); the caller (`pipeline`) is responsible for the
//! traversal order, this module analyzes one function at a time given its
//! callees' already-computed field maps.

use crate::features::access_lattice::{observed_access, observed_access_of, reaches_callee, reaches_callee_of, AccessType};
use crate::features::debug_info::classify;
use crate::features::graph::{EdgeKind, Graph, NodeId, NodeKind};
use crate::features::param_tree::BuiltTree;
use crate::ir::instruction::{CallTarget, FunctionId, Opcode, Operand};
use crate::ir::types::{DebugTypeKind, TypeClass};
use crate::ir::ports::{AliasOracle, AllocationSite};
use crate::ir::Module;
use rustc_hash::FxHashMap;
use std::collections::HashSet;

const ALLOC_CALLEES: &[&str] = &["kmalloc", "malloc", "kzalloc", "zalloc"];
const DEALLOC_CALLEES: &[&str] = &["kfree"];
/// `ioremap`/`iounmap` treated as one allocator/deallocator-like pair (spec
/// supplement grounded on `original_source/src/AccessInfoTracker.cpp`):
/// either direction produces the same `[ioremap(caller)]` annotation.
const IOREMAP_CALLEES: &[&str] = &["ioremap", "iounmap"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    String,
    Out,
    AllocCaller,
    DeallocCaller,
    IoremapCaller,
}

/// What component H produces for one function: per-`fieldId` access (used by
/// callers to recurse into this function when it is itself a callee), the
/// accumulated annotation set, and any inferred array lengths.
#[derive(Debug, Default, Clone)]
pub struct FunctionAccessSummary {
    pub field_access: FxHashMap<String, AccessType>,
    pub annotations: FxHashMap<String, HashSet<AnnotationKind>>,
    pub array_lengths: FxHashMap<String, u64>,
}

impl FunctionAccessSummary {
    fn join_access(&mut self, field_id: &str, access: AccessType) {
        self.field_access
            .entry(field_id.to_string())
            .and_modify(|a| *a = a.join(access))
            .or_insert(access);
    }

    fn annotate(&mut self, field_id: &str, kind: AnnotationKind) {
        self.annotations.entry(field_id.to_string()).or_default().insert(kind);
    }
}

/// Analyzes one `formalIn` tree (one argument of function `f`). `callee_summaries`
/// must already contain an entry for every function `f` calls (bottom-up
/// order is the caller's responsibility); `string_field_ids` is component G's
/// global string-field set.
pub fn analyze_argument(
    graph: &Graph,
    module: &Module,
    alias_oracle: &dyn AliasOracle,
    tree: &BuiltTree,
    callee_summaries: &FxHashMap<FunctionId, FunctionAccessSummary>,
    string_field_ids: &HashSet<String>,
) -> FunctionAccessSummary {
    let mut summary = FunctionAccessSummary::default();

    // 1. Intra-procedural access: join every valDep-bound instruction's
    // access type into this node's field, leaves first (tree.nodes is BFS /
    // creation order, so iterating in reverse visits children before their
    // parent, which is what "parent nodes inherit max of their children"
    // needs).
    for &node in tree.nodes.iter().rev() {
        if node == tree.root {
            continue;
        }
        let Some(field_id) = tree.field_ids.get(&node) else {
            continue;
        };

        let mut access = AccessType::NoAccess;
        for bound in graph.neighbors(node, &[EdgeKind::ValDep]) {
            access = access.join(observed_access(module, graph, bound));
            if stored_value_reaches_callee(module, graph, bound, ALLOC_CALLEES) {
                summary.annotate(field_id, AnnotationKind::AllocCaller);
            }
            if reaches_callee(module, graph, bound, DEALLOC_CALLEES) {
                summary.annotate(field_id, AnnotationKind::DeallocCaller);
            }
            if reaches_callee(module, graph, bound, IOREMAP_CALLEES)
                || stored_value_reaches_callee(module, graph, bound, IOREMAP_CALLEES)
            {
                summary.annotate(field_id, AnnotationKind::IoremapCaller);
            }

            if let NodeKind::Inst { instruction, function, .. } = &graph.node(bound).kind {
                access = access.join(propagate_interprocedural(
                    module,
                    *function,
                    Operand::Inst(*instruction),
                    callee_summaries,
                    field_id,
                ));
            }
        }

        // Bare-pointer argument dereference (no GEP to bind to): the node is
        // bound directly to the argument operand itself.
        if let Some(&(function, operand)) = tree.direct_operands.get(&node) {
            access = access.join(observed_access_of(module, function, operand));
            if stored_value_reaches_callee_of(module, function, operand, ALLOC_CALLEES) {
                summary.annotate(field_id, AnnotationKind::AllocCaller);
            }
            if reaches_callee_of(module, function, operand, DEALLOC_CALLEES) {
                summary.annotate(field_id, AnnotationKind::DeallocCaller);
            }
            if reaches_callee_of(module, function, operand, IOREMAP_CALLEES)
                || stored_value_reaches_callee_of(module, function, operand, IOREMAP_CALLEES)
            {
                summary.annotate(field_id, AnnotationKind::IoremapCaller);
            }
            access = access.join(propagate_interprocedural(module, function, operand, callee_summaries, field_id));
        }

        // Array-length inference via allocation sites attributed to the
        // node's own pointer value.
        if let Some((len, is_char)) = array_length_of(module, alias_oracle, graph, tree, node) {
            summary.array_lengths.insert(field_id.clone(), len);
            if is_char {
                summary.annotate(field_id, AnnotationKind::String);
            }
        }

        if string_field_ids.contains(field_id) {
            summary.annotate(field_id, AnnotationKind::String);
        }
        if access == AccessType::Write {
            summary.annotate(field_id, AnnotationKind::Out);
        }
        summary.join_access(field_id, access);

        // Parents inherit the max of their children (spec §4.H item 1):
        // propagate upward into the parent's own recorded access, if any.
        if let NodeKind::Param { parent: Some(parent), .. } = &graph.node(node).kind {
            if let Some(parent_field_id) = tree.field_ids.get(parent) {
                summary.join_access(parent_field_id, access);
            }
        }
    }

    summary
}

/// The `fieldId` of the field at `arg_index` of `callee`'s own tree, rooted
/// as if at `their_field_id`'s counterpart — approximated here by the
/// callee's own `fieldId` text, since formal trees are keyed on the same
/// debug-type-derived `fieldId` scheme regardless of which function owns
/// them (spec §4.A: `fieldId` is a cross-translation-unit join key).
fn callee_formal_field_id(
    module: &Module,
    callee: FunctionId,
    arg_index: u32,
    caller_field_id: &str,
) -> Option<String> {
    let function = module.function(callee);
    if arg_index as usize >= function.arguments.len() {
        return None;
    }
    // The join key is the same text regardless of which function's tree
    // produced it, so the caller's own fieldId already is the lookup key.
    Some(caller_field_id.to_string())
}

/// Shared tail of intra-procedural access computation: if `operand`'s value
/// is itself passed into a direct call, find the argument index and join in
/// that callee's already-computed access for the corresponding formal field.
fn propagate_interprocedural(
    module: &Module,
    function: FunctionId,
    operand: Operand,
    callee_summaries: &FxHashMap<FunctionId, FunctionAccessSummary>,
    field_id: &str,
) -> AccessType {
    let mut access = AccessType::NoAccess;
    for user_id in module.users_of(function, operand) {
        let Opcode::Call(call) = &module.inst(user_id).opcode else {
            continue;
        };
        let CallTarget::Direct(callee) = &call.target else {
            continue;
        };
        let Some(callee_summary) = callee_summaries.get(callee) else {
            continue;
        };
        for (arg_index, &arg) in call.args.iter().enumerate() {
            if arg != operand {
                continue;
            }
            if let Some(callee_field_id) = callee_formal_field_id(module, *callee, arg_index as u32, field_id) {
                if let Some(&callee_access) = callee_summary.field_access.get(&callee_field_id) {
                    access = access.join(callee_access);
                }
            }
        }
    }
    access
}

/// Spec §4.H: `[alloc(caller)]`/`[ioremap(caller)]` fire when a store into
/// the bound address variable has its *stored value* reaching an allocator
/// call via def-use — unlike `[string]`/`[dealloc(caller)]`, where the
/// pointer itself is passed as the call's argument, here the call produces
/// the value that gets stored (`ptr = kmalloc(...)`, not `kmalloc(ptr)`).
fn stored_value_reaches_callee_of(module: &Module, function: FunctionId, operand: Operand, callee_names: &[&str]) -> bool {
    module.users_of(function, operand).into_iter().any(|user| {
        let Opcode::Store { pointer, value } = &module.inst(user).opcode else {
            return false;
        };
        if pointer != &operand {
            return false;
        }
        let Operand::Inst(value_id) = value else {
            return false;
        };
        matches!(
            &module.inst(*value_id).opcode,
            Opcode::Call(call) if matches!(&call.target, CallTarget::Direct(f)
                if callee_names.contains(&module.function(*f).name.as_str()))
        )
    })
}

/// [`stored_value_reaches_callee_of`] for a `valDep`-bound instruction node.
fn stored_value_reaches_callee(module: &Module, graph: &Graph, bound_inst_node: NodeId, callee_names: &[&str]) -> bool {
    let NodeKind::Inst { instruction, function, .. } = &graph.node(bound_inst_node).kind else {
        return false;
    };
    stored_value_reaches_callee_of(module, *function, Operand::Inst(*instruction), callee_names)
}

fn array_length_of(
    module: &Module,
    alias_oracle: &dyn AliasOracle,
    graph: &Graph,
    tree: &BuiltTree,
    node: NodeId,
) -> Option<(u64, bool)> {
    let debug_type = graph.node(node).debug_type?;
    let is_char_array = matches!(classify(&module.type_arena, debug_type), TypeClass::Array)
        && matches!(module.type_arena.get(debug_type), DebugTypeKind::Array { element, .. }
            if matches!(module.type_arena.get(*element), DebugTypeKind::Scalar { name, .. } if name == "char"));

    for bound in graph.neighbors(node, &[EdgeKind::ValDep]) {
        let NodeKind::Inst { instruction, .. } = &graph.node(bound).kind else {
            continue;
        };
        for site in alias_oracle.allocation_sites_of(Operand::Inst(*instruction)) {
            let count = match site {
                AllocationSite::Stack { element_count } => element_count,
                AllocationSite::Dynamic { element_count, .. } => element_count,
            };
            return Some((count, is_char_array));
        }
    }
    if let Some(&(_, operand)) = tree.direct_operands.get(&node) {
        for site in alias_oracle.allocation_sites_of(operand) {
            let count = match site {
                AllocationSite::Stack { element_count } => element_count,
                AllocationSite::Dynamic { element_count, .. } => element_count,
            };
            return Some((count, is_char_array));
        }
    }
    None
}
