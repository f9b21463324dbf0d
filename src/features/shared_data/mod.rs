//! Component G: cross-domain field-sharing classification (spec §4.G).
//!
//! Walks a global type tree, joins the access type seen at each bound
//! instruction (spec §4.A's lattice, shared with component H), and marks a
//! field `shared` iff some access occurs in each of `kernel` and `driver`.

use crate::features::access_lattice::{observed_access, observed_access_of, reaches_callee, reaches_callee_of, AccessType};
use crate::features::debug_info::classify;
use crate::features::graph::{EdgeKind, Graph, NodeId};
use crate::features::param_tree::BuiltTree;
use crate::ir::function::Domain;
use crate::ir::types::TypeClass;
use crate::ir::Module;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::HashSet;

/// Callees whose string-like usage of an argument is recorded as a global
/// "string field" fact (spec §4.G: "nodes bound to string-consuming callees
/// are recorded as string fields globally", consumed later by component H's
/// `[string]` inference).
const STRING_CALLEES: &[&str] = &[
    "strcpy",
    "strncpy",
    "strlen",
    "strlcpy",
    "strcmp",
    "strncmp",
    "kobject_set_name",
];

#[derive(Debug, Default)]
pub struct SharedDataResult {
    /// Canonical `fieldId`s marked shared, across every tree walked so far
    /// (spec §4.G: "record the canonical fieldId in the per-type shared
    /// set").
    pub shared_field_ids: HashSet<String>,
    /// The tree nodes that were marked shared, so downstream callers don't
    /// have to re-derive `fieldId -> NodeId`.
    pub shared_nodes: FxHashSet<NodeId>,
    /// `fieldId`s observed bound to a string-consuming callee.
    pub string_field_ids: HashSet<String>,
}

impl SharedDataResult {
    pub fn merge(&mut self, other: SharedDataResult) {
        self.shared_field_ids.extend(other.shared_field_ids);
        self.shared_nodes.extend(other.shared_nodes);
        self.string_field_ids.extend(other.string_field_ids);
    }
}

/// Anonymous unions are never shared themselves (spec §4.G tie-break: "their
/// parent is shared instead").
fn is_anonymous_union(module: &Module, field_name: &str, debug_type: crate::ir::DebugTypeId) -> bool {
    field_name.is_empty() && matches!(classify(&module.type_arena, debug_type), TypeClass::Union)
}

/// Classifies one global type tree. `callback_field_names` is
/// `static_funcptr.txt` (spec §6): a function-pointer field whose bare name
/// appears there is always shared, regardless of observed access.
pub fn analyze_tree(
    graph: &Graph,
    module: &Module,
    tree: &BuiltTree,
    callback_field_names: &HashSet<String>,
) -> SharedDataResult {
    let mut result = SharedDataResult::default();

    for &node in &tree.nodes {
        if node == tree.root {
            continue;
        }
        let Some(field_id) = tree.field_ids.get(&node) else {
            continue;
        };
        let field_name = tree.field_names.get(&node).map(String::as_str).unwrap_or("");
        let debug_type = match graph.node(node).debug_type {
            Some(t) => t,
            None => continue,
        };

        if is_anonymous_union(module, field_name, debug_type) {
            continue;
        }

        let is_exported_callback = matches!(classify(&module.type_arena, debug_type), TypeClass::FuncPtr)
            && callback_field_names.contains(field_name);

        let mut access_by_domain: FxHashMap<Domain, AccessType> = FxHashMap::default();
        let mut saw_string_use = false;

        for bound in graph.neighbors(node, &[EdgeKind::ValDep]) {
            let crate::features::graph::NodeKind::Inst { function, .. } = &graph.node(bound).kind
            else {
                continue;
            };
            let domain = module.function(*function).domain;
            let acc = observed_access(module, graph, bound);
            access_by_domain
                .entry(domain)
                .and_modify(|a| *a = a.join(acc))
                .or_insert(acc);
            saw_string_use |= reaches_callee(module, graph, bound, STRING_CALLEES);
        }

        // Bare-pointer argument dereference: no GEP to bind to, the node is
        // bound directly to the argument operand itself (mirrors component
        // H's handling of the same gap).
        if let Some(&(function, operand)) = tree.direct_operands.get(&node) {
            let domain = module.function(function).domain;
            let acc = observed_access_of(module, function, operand);
            access_by_domain
                .entry(domain)
                .and_modify(|a| *a = a.join(acc))
                .or_insert(acc);
            saw_string_use |= reaches_callee_of(module, function, operand, STRING_CALLEES);
        }

        let kernel_access = access_by_domain.get(&Domain::Kernel).copied().unwrap_or_default();
        let driver_access = access_by_domain.get(&Domain::Driver).copied().unwrap_or_default();
        let observed_shared = kernel_access != AccessType::NoAccess && driver_access != AccessType::NoAccess;

        if observed_shared || is_exported_callback {
            result.shared_field_ids.insert(field_id.clone());
            result.shared_nodes.insert(node);
        }
        if saw_string_use {
            result.string_field_ids.insert(field_id.clone());
        }
    }

    result
}
