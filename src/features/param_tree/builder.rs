//! BFS tree expansion with the 1-limit recursion guard and `EXPAND_LEVEL`
//! depth bound (spec §4.F).

use super::gep_match::{bitfield_shift, find_matching_geps};
use crate::features::debug_info::{field_id, field_name, strip};
use crate::features::graph::{EdgeKind, Graph, NodeId, NodeKind, NodeRegistry, ParamNodeKind, ParamOwner};
use crate::ir::instruction::{FunctionId, InstructionId, Opcode, Operand};
use crate::ir::types::{DebugTypeId, DebugTypeKind};
use crate::ir::Module;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Which instructions GEP-matching scans: a single function for an
/// argument/return tree, or the whole module for a global (spec §4.F:
/// "global variables... are treated identically, with their own roots", but
/// a global can be dereferenced from any function).
#[derive(Debug, Clone, Copy)]
pub enum TreeScope {
    Function(FunctionId),
    Module,
}

impl TreeScope {
    fn candidate_geps(&self, module: &Module) -> Vec<InstructionId> {
        let ids: Box<dyn Iterator<Item = InstructionId>> = match self {
            TreeScope::Function(f) => Box::new(module.instructions_of(*f).into_iter()),
            TreeScope::Module => Box::new(module.instructions.iter().map(|i| i.id)),
        };
        ids.filter(|&id| matches!(module.inst(id).opcode, Opcode::Gep { .. }))
            .collect()
    }

}

pub struct BuiltTree {
    pub root: NodeId,
    /// Canonical field ID per non-root node (spec §4.A/§4.G join key), keyed
    /// by the node's graph ID.
    pub field_ids: FxHashMap<NodeId, String>,
    /// Bare declared field name per non-root node (`""` for a dereference
    /// child or an anonymous field) — spec §4.G's driver-exported-callback
    /// lookup and the anonymous-union exclusion both key off this, not the
    /// longer `fieldId`.
    pub field_names: FxHashMap<NodeId, String>,
    /// Every node created for this tree, in BFS (creation) order.
    pub nodes: Vec<NodeId>,
    /// Bit-field-bearing GEPs bound while building this tree, and the shift
    /// that makes them so (spec §4.F: "effective offset is the GEP's
    /// struct-layout offset plus the shift").
    pub bitfield_geps: Vec<(InstructionId, u32)>,
    /// Nodes bound directly to an operand rather than to a GEP, keyed by
    /// node. Only ever populated for the immediate pointee of a function
    /// argument's own pointer type: struct-member access is always found by
    /// GEP type-matching (spec §4.F), but a bare pointer argument (`char
    /// *buf`, `int *out`) has no GEP to match against — the instructions
    /// that dereference it operate on the argument operand itself. This is
    /// deliberately one level deep only; chains beyond the first dereference
    /// fall back to the GEP-based mechanism (or go unbound), matching how
    /// far the type-based GEP match already reaches for everything else.
    pub direct_operands: FxHashMap<NodeId, (FunctionId, Operand)>,
}

struct Pending {
    node: NodeId,
    raw_type: DebugTypeId,
    depth: u32,
    ancestor_stripped_types: Vec<DebugTypeId>,
    /// Set only on the root of a function-argument tree: the operand that
    /// `node` itself represents, so the first dereference child can be
    /// bound directly to it (see `BuiltTree::direct_operands`).
    bound_operand: Option<(FunctionId, Operand)>,
}

/// Builds one parameter/object tree rooted at `root_type`, owned by `owner`,
/// tagged `kind` (`formalIn`/`formalOut`; callers use the same function for
/// a return-value or global-variable root too). `registry` supplies the
/// already-created instruction nodes that `valDep` edges point at; `scope`
/// bounds the GEP scan used to find them.
pub fn build_tree(
    graph: &mut Graph,
    registry: &NodeRegistry,
    module: &Module,
    owner: ParamOwner,
    kind: ParamNodeKind,
    root_type: DebugTypeId,
    scope: TreeScope,
    expand_level: u32,
) -> BuiltTree {
    let geps = scope.candidate_geps(module);

    let root = graph.add_node(NodeKind::Param {
        sub: kind,
        owner,
        parent: None,
        child_index: None,
        debug_type: root_type,
    });

    let mut field_ids = FxHashMap::default();
    let mut field_names = FxHashMap::default();
    let mut nodes = vec![root];
    let mut bitfield_geps = Vec::new();
    let mut direct_operands = FxHashMap::default();
    let root_bound_operand = match (owner, scope) {
        (ParamOwner::Argument { function, index }, TreeScope::Function(f)) if f == function => {
            Some((function, Operand::Arg(function, index)))
        }
        _ => None,
    };
    let mut queue = VecDeque::new();
    queue.push_back(Pending {
        node: root,
        raw_type: root_type,
        depth: 0,
        ancestor_stripped_types: Vec::new(),
        bound_operand: root_bound_operand,
    });

    while let Some(item) = queue.pop_front() {
        if item.depth >= expand_level {
            continue;
        }
        let t = strip(&module.type_arena, item.raw_type);
        if item.ancestor_stripped_types.contains(&t) {
            continue; // 1-limit: stop expansion, this node stays a leaf.
        }
        let mut ancestors = item.ancestor_stripped_types.clone();
        ancestors.push(t);

        match module.type_arena.get(t) {
            DebugTypeKind::Pointer(inner) => {
                let child = graph.add_node(NodeKind::Param {
                    sub: kind,
                    owner,
                    parent: Some(item.node),
                    child_index: Some(0),
                    debug_type: *inner,
                });
                nodes.push(child);
                // The "pointer field vs pointee" convention: the field ID of
                // a dereference child is the parent's own field ID with a
                // trailing "*" (spec §4.G tie-break).
                field_ids.insert(
                    child,
                    format!("{}*", field_id(&module.type_arena, item.raw_type, item.raw_type)),
                );
                field_names.insert(child, String::new());
                if let Some((function, operand)) = item.bound_operand {
                    direct_operands.insert(child, (function, operand));
                }
                queue.push_back(Pending {
                    node: child,
                    raw_type: *inner,
                    depth: item.depth + 1,
                    ancestor_stripped_types: ancestors,
                    bound_operand: None,
                });
            }
            DebugTypeKind::Struct { members, .. } | DebugTypeKind::Union { members, .. } => {
                for (i, &member_id) in members.iter().enumerate() {
                    let DebugTypeKind::Member { offset_bytes, inner, .. } = module.type_arena.get(member_id) else {
                        continue;
                    };
                    let (offset_bytes, inner) = (*offset_bytes, *inner);
                    let child = graph.add_node(NodeKind::Param {
                        sub: kind,
                        owner,
                        parent: Some(item.node),
                        child_index: Some(i as u32),
                        debug_type: inner,
                    });
                    nodes.push(child);
                    field_ids.insert(child, field_id(&module.type_arena, t, member_id));
                    field_names.insert(child, field_name(&module.type_arena, strip(&module.type_arena, member_id)));

                    for gep in find_matching_geps(module, &geps, t, inner, offset_bytes) {
                        if let Some(gep_node) = registry.inst_node(gep) {
                            graph.add_edge(child, gep_node, EdgeKind::ValDep);
                        }
                        let owning_function = module.inst(gep).function;
                        if let Some(shift) = bitfield_shift(module, owning_function, gep) {
                            bitfield_geps.push((gep, shift));
                        }
                    }

                    queue.push_back(Pending {
                        node: child,
                        raw_type: inner,
                        depth: item.depth + 1,
                        ancestor_stripped_types: ancestors.clone(),
                        bound_operand: None,
                    });
                }
            }
            _ => {} // scalar, function type, enum, array, void: leaf.
        }
    }

    BuiltTree {
        root,
        field_ids,
        field_names,
        nodes,
        bitfield_geps,
        direct_operands,
    }
}

/// A structural copy of `tree` (spec §4.F: "`formalOut` is a structural copy
/// of `formalIn`"; "actual trees are copied from the callee's formal trees
/// at each call site"). New nodes share the same debug types and shape but
/// get a fresh `owner`/`kind` tag and fresh graph IDs. `valDep` bindings are
/// not copied — a clone represents a different occurrence (a different call
/// site, or the independently-accessed `formalOut` counterpart) and is
/// rebound by the caller if it needs its own GEP bindings.
pub fn clone_tree(graph: &mut Graph, source: &BuiltTree, new_owner: ParamOwner, new_kind: ParamNodeKind) -> BuiltTree {
    let mut remap: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut field_ids = FxHashMap::default();
    let mut field_names = FxHashMap::default();
    let mut nodes = Vec::with_capacity(source.nodes.len());

    for &old_id in &source.nodes {
        let NodeKind::Param {
            parent,
            child_index,
            debug_type,
            ..
        } = graph.node(old_id).kind.clone()
        else {
            continue;
        };
        let new_parent = parent.and_then(|p| remap.get(&p).copied());
        let new_id = graph.add_node(NodeKind::Param {
            sub: new_kind,
            owner: new_owner,
            parent: new_parent,
            child_index,
            debug_type,
        });
        remap.insert(old_id, new_id);
        nodes.push(new_id);
        if let Some(fid) = source.field_ids.get(&old_id) {
            field_ids.insert(new_id, fid.clone());
        }
        if let Some(name) = source.field_names.get(&old_id) {
            field_names.insert(new_id, name.clone());
        }
    }

    let root = remap
        .get(&source.root)
        .copied()
        .expect("tree root must have been cloned");
    BuiltTree {
        root,
        field_ids,
        field_names,
        nodes,
        bitfield_geps: Vec::new(),
        direct_operands: FxHashMap::default(),
    }
}
