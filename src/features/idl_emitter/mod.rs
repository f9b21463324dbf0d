//! Component J: deterministic textual IDL emission (spec §4.J).
//!
//! Consumes the already-computed outputs of components F (parameter trees),
//! G (shared-data classification) and H (per-field access/annotations) and
//! renders one `rpc` declaration per cross-domain function, with nested
//! `projection` declarations for every reachable, accessed-and-shared
//! struct/union type. Projection bodies are deduplicated module-wide
//! ("first occurrence wins"); parameter and field ordering follow source
//! and debug-info declaration order respectively, so re-running against the
//! same input produces byte-identical output (spec §8 property 5).

use crate::config::BoundarySets;
use crate::features::access_annotation::{AnnotationKind, FunctionAccessSummary};
use crate::features::access_lattice::AccessType;
use crate::features::debug_info::{classify, field_id, printable_name, strip};
use crate::features::graph::Graph;
use crate::features::param_tree::BuiltTree;
use crate::features::shared_data::SharedDataResult;
use crate::ir::function::Function;
use crate::ir::types::{DebugTypeId, DebugTypeKind, TypeArena, TypeClass};
use crate::ir::Module;
use std::collections::HashSet;
use std::fmt::Write as _;

/// One argument's name, declared type, and already-built `formalIn` tree —
/// exactly what [`emit_function_idl`] needs per parameter, in source order.
pub struct ArgumentContext<'a> {
    pub name: String,
    pub debug_type: DebugTypeId,
    pub tree: &'a BuiltTree,
}

/// Which projection type names have already had their body emitted, kept
/// across every call to [`emit_function_idl`] for one run (spec §4.J:
/// "global-ops structs are deduplicated across all functions; first
/// occurrence wins").
#[derive(Debug, Default)]
pub struct EmittedProjections {
    seen: HashSet<String>,
}

impl EmittedProjections {
    pub fn new() -> Self {
        Self::default()
    }
}

const ANNOTATION_ORDER: [AnnotationKind; 5] = [
    AnnotationKind::String,
    AnnotationKind::Out,
    AnnotationKind::AllocCaller,
    AnnotationKind::DeallocCaller,
    AnnotationKind::IoremapCaller,
];

fn annotation_token(kind: AnnotationKind) -> &'static str {
    match kind {
        AnnotationKind::String => "string",
        AnnotationKind::Out => "out",
        AnnotationKind::AllocCaller => "alloc(caller)",
        AnnotationKind::DeallocCaller => "dealloc(caller)",
        AnnotationKind::IoremapCaller => "ioremap(caller)",
    }
}

/// Renders `field_id`'s annotation set in the fixed order above, e.g.
/// `"[out]"` or `"[alloc(caller)] [out]"`. Empty if there are none.
fn render_annotations(summary: &FunctionAccessSummary, field_id: &str) -> String {
    let Some(set) = summary.annotations.get(field_id) else {
        return String::new();
    };
    ANNOTATION_ORDER
        .iter()
        .filter(|k| set.contains(k))
        .map(|k| format!("[{}]", annotation_token(*k)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `printable_name` with the `struct `/`union `/`enum ` tag keyword dropped
/// (spec §4.J: `projection <typeName> { ... }` and a composite-typed field's
/// own rendering both use the bare tag name, not the C declaration form
/// `printable_name` otherwise produces for diagnostics).
fn idl_type_name(arena: &TypeArena, id: DebugTypeId) -> String {
    let name = printable_name(arena, id);
    for prefix in ["struct ", "union ", "enum "] {
        if let Some(rest) = name.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    name
}

/// The field ID of a parameter's own (single, one-level-deep) pointer
/// dereference, i.e. the node [`crate::features::param_tree::build_tree`]'s
/// `Pointer` branch always creates as the tree's second BFS node. `None` if
/// the root never expanded (e.g. `EXPAND_LEVEL` of zero, or a non-pointer
/// root) — annotation/array-length lookups are then simply skipped, per
/// spec §4 failure semantics ("skip... continue").
fn root_deref_field_id<'a>(tree: &'a BuiltTree) -> Option<&'a str> {
    let deref_node = *tree.nodes.get(1)?;
    tree.field_ids.get(&deref_node).map(String::as_str)
}

/// Renders one parameter per spec §4.J's five rendering rules, in priority
/// order: struct/union pointer, function pointer, string, inferred array
/// length, plain scalar.
fn render_parameter(module: &Module, arg: &ArgumentContext, summary: &FunctionAccessSummary) -> String {
    let class = classify(&module.type_arena, arg.debug_type);
    match class {
        TypeClass::StructPtr | TypeClass::UnionPtr | TypeClass::SentinelArray => {
            let stripped = strip(&module.type_arena, arg.debug_type);
            let DebugTypeKind::Pointer(pointee) = module.type_arena.get(stripped) else {
                return format!("{} {}", printable_name(&module.type_arena, arg.debug_type), arg.name);
            };
            let type_name = idl_type_name(&module.type_arena, *pointee);
            let annotations = root_deref_field_id(arg.tree)
                .map(|fid| render_annotations(summary, fid))
                .unwrap_or_default();
            if annotations.is_empty() {
                format!("projection {} *{}", type_name, arg.name)
            } else {
                format!("projection {} {} *{}", type_name, annotations, arg.name)
            }
        }
        TypeClass::FuncPtr => {
            let stripped = strip(&module.type_arena, arg.debug_type);
            let pointee = match module.type_arena.get(stripped) {
                DebugTypeKind::Pointer(p) => strip(&module.type_arena, *p),
                _ => stripped,
            };
            render_funcptr_signature(module, &arg.name, pointee)
        }
        _ => render_scalar_or_inferred_parameter(module, arg, summary),
    }
}

/// Scalar, char-pointer-as-string, and allocator-inferred-array rendering
/// (the last three of spec §4.J's five rules).
fn render_scalar_or_inferred_parameter(module: &Module, arg: &ArgumentContext, summary: &FunctionAccessSummary) -> String {
    if let Some(fid) = root_deref_field_id(arg.tree) {
        let is_string = summary
            .annotations
            .get(fid)
            .is_some_and(|set| set.contains(&AnnotationKind::String));
        if is_string {
            let annotations = render_annotations(summary, fid);
            return format!("char {} *{}", annotations, arg.name);
        }
        if let Some(&len) = summary.array_lengths.get(fid) {
            let stripped = strip(&module.type_arena, arg.debug_type);
            let element_name = match module.type_arena.get(stripped) {
                DebugTypeKind::Pointer(inner) => printable_name(&module.type_arena, *inner),
                _ => printable_name(&module.type_arena, arg.debug_type),
            };
            let annotations = render_annotations(summary, fid);
            return if annotations.is_empty() {
                format!("array<{}, {}> *{}", element_name, len, arg.name)
            } else {
                format!("array<{}, {}> {} *{}", element_name, len, annotations, arg.name)
            };
        }
    }
    format!("{} {}", printable_name(&module.type_arena, arg.debug_type), arg.name)
}

/// A function-pointer-typed field or parameter's nested `rpc` signature,
/// built from the function type's own declared parameter/return types
/// (spec §4.J: "function-pointer typed parameter → nested rpc signature").
fn render_funcptr_signature(module: &Module, name: &str, func_type: DebugTypeId) -> String {
    let DebugTypeKind::FuncPtr { params, ret } = module.type_arena.get(func_type) else {
        return format!("rpc void {}()", name);
    };
    let rendered_params: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(i, &p)| format!("{} arg{}", printable_name(&module.type_arena, p), i))
        .collect();
    format!(
        "rpc {} {}({})",
        printable_name(&module.type_arena, *ret),
        name,
        rendered_params.join(", ")
    )
}

/// Finds the driver-side implementation registered for an exported-callback
/// field (spec §6: `static_funcptr.txt` / `static_func.txt`). `static_func`
/// carries no explicit per-field correlation — only a flat set of symbols —
/// so candidates are narrowed by the naming convention the scenario in spec
/// §8 S3 shows (`do_it` field registered as `driver_do_it`, i.e. an entry
/// ending in `_<field name>`); lexicographically first match wins when more
/// than one qualifies. Falls back to the bare field name when nothing
/// matches, so emission never blocks on an unresolved registration.
fn resolve_callback_name(field_name: &str, boundaries: &BoundarySets) -> String {
    let suffix = format!("_{field_name}");
    let mut candidates: Vec<&String> = boundaries
        .static_func
        .iter()
        .filter(|s| s.ends_with(&suffix))
        .collect();
    candidates.sort();
    match candidates.first() {
        Some(implementor) => format!("{field_name}_{implementor}"),
        None => field_name.to_string(),
    }
}

/// One field line, or nested `rpc` for an exported callback, inside a
/// `projection` body. Recurses into anonymous struct/union members rather
/// than emitting them as their own nested projection (spec §4.J: "anonymous
/// struct/union fields are inlined").
fn collect_projection_fields(
    module: &Module,
    parent_stripped: DebugTypeId,
    summary: &FunctionAccessSummary,
    shared: &SharedDataResult,
    boundaries: &BoundarySets,
    out: &mut Vec<String>,
) {
    let members = match module.type_arena.get(parent_stripped) {
        DebugTypeKind::Struct { members, .. } | DebugTypeKind::Union { members, .. } => members.clone(),
        _ => return,
    };

    for member_id in members {
        let DebugTypeKind::Member { name, inner, .. } = module.type_arena.get(member_id).clone() else {
            continue;
        };
        let member_class = classify(&module.type_arena, inner);
        let is_anonymous_composite = name.is_empty() && matches!(member_class, TypeClass::Struct | TypeClass::Union);
        if is_anonymous_composite {
            let inner_stripped = strip(&module.type_arena, inner);
            collect_projection_fields(module, inner_stripped, summary, shared, boundaries, out);
            continue;
        }

        let fid = field_id(&module.type_arena, parent_stripped, member_id);
        if !shared.shared_field_ids.contains(&fid) {
            continue;
        }
        let is_callback = member_class == TypeClass::FuncPtr && boundaries.static_funcptr.contains(&name);
        let access_ok = summary
            .field_access
            .get(&fid)
            .is_some_and(|a| *a != AccessType::NoAccess);
        if !is_callback && !access_ok {
            continue;
        }

        if is_callback {
            let callback_name = resolve_callback_name(&name, boundaries);
            let inner_stripped = strip(&module.type_arena, inner);
            let func_type = match module.type_arena.get(inner_stripped) {
                DebugTypeKind::Pointer(p) => strip(&module.type_arena, *p),
                _ => inner_stripped,
            };
            out.push(format!("{};", render_funcptr_signature(module, &callback_name, func_type)));
        } else {
            let type_name = idl_type_name(&module.type_arena, inner);
            let annotations = render_annotations(summary, &fid);
            if annotations.is_empty() {
                out.push(format!("{} {};", type_name, name));
            } else {
                out.push(format!("{} {} {};", type_name, annotations, name));
            }
        }
    }
}

/// Every struct/union type reachable in `tree`, in BFS (creation) order,
/// with module-wide first-seen dedup applied as they're walked (spec §4.J:
/// "projections in BFS order from the root"; "deduplicated... first
/// occurrence wins"). Anonymous-composite *member* nodes are skipped here —
/// their fields are inlined into the parent by [`collect_projection_fields`],
/// so they never get their own projection header. A pointer-dereference
/// node (e.g. the struct a top-level `S *s` argument points to, or the
/// pointee of a named `struct Foo *next` field) is never anonymous in this
/// sense even though it also carries an empty `field_names` entry — it's
/// named by its own type, not by a declared field — so it's told apart by
/// `build_tree`'s trailing-`*` `fieldId` convention for such nodes.
fn reachable_struct_types(graph: &Graph, module: &Module, tree: &BuiltTree) -> Vec<DebugTypeId> {
    let mut out = Vec::new();
    for &node in &tree.nodes {
        let Some(debug_type) = graph.node(node).debug_type else {
            continue;
        };
        if !matches!(classify(&module.type_arena, debug_type), TypeClass::Struct | TypeClass::Union) {
            continue;
        }
        if node != tree.root {
            let is_pointer_deref = tree.field_ids.get(&node).is_some_and(|f| f.ends_with('*'));
            let is_anonymous_member =
                !is_pointer_deref && tree.field_names.get(&node).is_some_and(String::is_empty);
            if is_anonymous_member {
                continue;
            }
        }
        out.push(strip(&module.type_arena, debug_type));
    }
    out
}

/// Emits every not-yet-emitted projection reachable from `arg`'s tree, each
/// containing only fields that are both accessed (or an exported callback)
/// and shared (spec §4.J).
fn emit_reachable_projections(
    module: &Module,
    graph: &Graph,
    arg: &ArgumentContext,
    summary: &FunctionAccessSummary,
    shared: &SharedDataResult,
    boundaries: &BoundarySets,
    emitted: &mut EmittedProjections,
    out: &mut String,
) {
    for type_id in reachable_struct_types(graph, module, arg.tree) {
        let type_name = idl_type_name(&module.type_arena, type_id);
        if !emitted.seen.insert(type_name.clone()) {
            continue;
        }
        let mut fields = Vec::new();
        collect_projection_fields(module, type_id, summary, shared, boundaries, &mut fields);
        let _ = writeln!(out, "  projection {} {{", type_name);
        for field in &fields {
            let _ = writeln!(out, "    {field}");
        }
        let _ = writeln!(out, "  }};");
    }
}

/// Emits one `rpc` declaration for `function` (spec §4.J): signature line,
/// then the body's reachable projection declarations, in argument source
/// order.
pub fn emit_function_idl(
    module: &Module,
    graph: &Graph,
    function: &Function,
    args: &[ArgumentContext],
    summary: &FunctionAccessSummary,
    shared: &SharedDataResult,
    boundaries: &BoundarySets,
    emitted: &mut EmittedProjections,
) -> String {
    let params: Vec<String> = args.iter().map(|a| render_parameter(module, a, summary)).collect();
    let ret_name = printable_name(&module.type_arena, function.return_type);

    let mut out = String::new();
    let _ = writeln!(out, "rpc {} {}({}) {{", ret_name, function.name, params.join(", "));
    for arg in args {
        emit_reachable_projections(module, graph, arg, summary, shared, boundaries, emitted, &mut out);
    }
    let _ = write!(out, "}}");
    out
}

/// Wraps every function's `rpc` declaration in the single `module kernel {
/// ... }` block `kernel.idl` is written as (spec §6 grammar sketch).
pub fn render_kernel_idl(rpc_decls: &[String]) -> String {
    let mut out = String::from("module kernel {\n");
    for decl in rpc_decls {
        for line in decl.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push('}');
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::access_annotation::analyze_argument;
    use crate::features::graph::{populate_base_nodes, ParamNodeKind, ParamOwner};
    use crate::features::param_tree::{build_tree, TreeScope};
    use crate::features::shared_data::analyze_tree as analyze_shared_tree;
    use crate::ir::function::{BasicBlock, Domain, Terminator};
    use crate::ir::instruction::{BasicBlockId, FunctionId, Instruction, Operand};
    use crate::ir::module::ModuleBuilder;
    use crate::ir::ports::ConservativeAliasOracle;
    use crate::shared::models::Span;
    use rustc_hash::FxHashMap;
    use std::collections::HashSet as StdHashSet;

    /// Builds the S1/S2 fixture: `struct S { int x; }`, a kernel function
    /// `set_x(struct S *s)` that optionally stores to `x`, and a driver
    /// function that always reads `x` (so the field is always shared; the
    /// kernel side's write-or-not decides `[out]`).
    fn build_s1_s2_module(kernel_writes: bool) -> (Module, FunctionId, DebugTypeId) {
        let mut b = ModuleBuilder::new();
        let i32_ty = b.type_arena_mut().intern(DebugTypeKind::Scalar {
            name: "int".into(),
            width_bits: 32,
            signed: true,
        });
        let s = b.type_arena_mut().reserve_struct("S");
        let x_member = b.type_arena_mut().intern(DebugTypeKind::Member {
            name: "x".into(),
            offset_bytes: 0,
            inner: i32_ty,
        });
        b.type_arena_mut().finalize_composite(s, vec![x_member]);
        let s_ptr = b.type_arena_mut().intern(DebugTypeKind::Pointer(s));

        let kernel_fn = b.reserve_function("set_x");
        let gep_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: gep_id,
            function: kernel_fn,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode: crate::ir::instruction::Opcode::Gep {
                base: Operand::Arg(kernel_fn, 0),
                source_type: s,
                result_type: i32_ty,
                const_index: Some(0),
            },
        });
        let access_id = b.next_instruction_id();
        let opcode = if kernel_writes {
            crate::ir::instruction::Opcode::Store {
                pointer: Operand::Inst(gep_id),
                value: Operand::Const,
            }
        } else {
            crate::ir::instruction::Opcode::Load(Operand::Inst(gep_id))
        };
        b.push_instruction(Instruction {
            id: access_id,
            function: kernel_fn,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode,
        });
        let ret_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: ret_id,
            function: kernel_fn,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: None,
            span: Span::zero(),
            opcode: crate::ir::instruction::Opcode::Ret(None),
        });
        b.push_function(crate::ir::Function {
            id: kernel_fn,
            name: "set_x".into(),
            domain: Domain::Kernel,
            defined: true,
            arguments: vec![crate::ir::function::Argument {
                index: 0,
                name: "s".into(),
                debug_type: s_ptr,
            }],
            return_type: i32_ty,
            blocks: vec![BasicBlock {
                id: BasicBlockId(0),
                instructions: vec![gep_id, access_id, ret_id],
                terminator: Terminator::Ret,
            }],
            entry: BasicBlockId(0),
            annotation: None,
        });

        let driver_fn = b.reserve_function("driver_read_x");
        let d_gep_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: d_gep_id,
            function: driver_fn,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode: crate::ir::instruction::Opcode::Gep {
                base: Operand::Arg(driver_fn, 0),
                source_type: s,
                result_type: i32_ty,
                const_index: Some(0),
            },
        });
        let d_load_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: d_load_id,
            function: driver_fn,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode: crate::ir::instruction::Opcode::Load(Operand::Inst(d_gep_id)),
        });
        let d_ret_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: d_ret_id,
            function: driver_fn,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: None,
            span: Span::zero(),
            opcode: crate::ir::instruction::Opcode::Ret(None),
        });
        b.push_function(crate::ir::Function {
            id: driver_fn,
            name: "driver_read_x".into(),
            domain: Domain::Driver,
            defined: true,
            arguments: vec![crate::ir::function::Argument {
                index: 0,
                name: "s".into(),
                debug_type: s_ptr,
            }],
            return_type: i32_ty,
            blocks: vec![BasicBlock {
                id: BasicBlockId(0),
                instructions: vec![d_gep_id, d_load_id, d_ret_id],
                terminator: Terminator::Ret,
            }],
            entry: BasicBlockId(0),
            annotation: None,
        });

        (b.build(), kernel_fn, s_ptr)
    }

    fn analyze(module: &Module, kernel_fn: FunctionId, s_ptr: DebugTypeId) -> (Graph, BuiltTree, FunctionAccessSummary, SharedDataResult) {
        let mut graph = Graph::new();
        graph.begin_building();
        let registry = populate_base_nodes(&mut graph, module);
        let owner = ParamOwner::Argument {
            function: kernel_fn,
            index: 0,
        };
        let tree = build_tree(
            &mut graph,
            &registry,
            module,
            owner,
            ParamNodeKind::FormalIn,
            s_ptr,
            TreeScope::Function(kernel_fn),
            crate::config::DEFAULT_EXPAND_LEVEL,
        );
        graph.seal();

        let shared = analyze_shared_tree(&graph, module, &tree, &StdHashSet::new());
        let oracle = ConservativeAliasOracle;
        let callee_summaries = FxHashMap::default();
        let summary = analyze_argument(&graph, module, &oracle, &tree, &callee_summaries, &shared.string_field_ids);
        (graph, tree, summary, shared)
    }

    #[test]
    fn s1_shared_read_only_field_has_no_out_annotation() {
        let (module, kernel_fn, s_ptr) = build_s1_s2_module(false);
        let (graph, tree, summary, shared) = analyze(&module, kernel_fn, s_ptr);
        let boundaries = BoundarySets::default();
        let mut emitted = EmittedProjections::new();

        let args = vec![ArgumentContext {
            name: "s".into(),
            debug_type: s_ptr,
            tree: &tree,
        }];
        let rendered = emit_function_idl(
            &module,
            &graph,
            module.function(kernel_fn),
            &args,
            &summary,
            &shared,
            &boundaries,
            &mut emitted,
        );

        assert!(rendered.contains("projection S *s"), "{rendered}");
        assert!(rendered.contains("u32 x;"), "{rendered}");
        assert!(!rendered.contains("[out]"), "{rendered}");
    }

    #[test]
    fn s2_kernel_write_yields_out_annotation() {
        let (module, kernel_fn, s_ptr) = build_s1_s2_module(true);
        let (graph, tree, summary, shared) = analyze(&module, kernel_fn, s_ptr);
        let boundaries = BoundarySets::default();
        let mut emitted = EmittedProjections::new();

        let args = vec![ArgumentContext {
            name: "s".into(),
            debug_type: s_ptr,
            tree: &tree,
        }];
        let rendered = emit_function_idl(
            &module,
            &graph,
            module.function(kernel_fn),
            &args,
            &summary,
            &shared,
            &boundaries,
            &mut emitted,
        );

        assert!(rendered.contains("[out]"), "{rendered}");
        assert!(rendered.contains("x;"), "{rendered}");
    }

    #[test]
    fn second_function_referencing_same_struct_does_not_reemit_projection() {
        let (module, kernel_fn, s_ptr) = build_s1_s2_module(false);
        let (graph, tree, summary, shared) = analyze(&module, kernel_fn, s_ptr);
        let boundaries = BoundarySets::default();
        let mut emitted = EmittedProjections::new();

        let args = vec![ArgumentContext {
            name: "s".into(),
            debug_type: s_ptr,
            tree: &tree,
        }];
        let first = emit_function_idl(
            &module,
            &graph,
            module.function(kernel_fn),
            &args,
            &summary,
            &shared,
            &boundaries,
            &mut emitted,
        );
        assert!(first.contains("projection S {"));

        let args_again = vec![ArgumentContext {
            name: "s2".into(),
            debug_type: s_ptr,
            tree: &tree,
        }];
        let second = emit_function_idl(
            &module,
            &graph,
            module.function(kernel_fn),
            &args_again,
            &summary,
            &shared,
            &boundaries,
            &mut emitted,
        );
        assert!(!second.contains("projection S {"), "{second}");
        assert!(second.contains("projection S *s2"));
    }

    #[test]
    fn render_kernel_idl_wraps_every_decl_in_one_module_block() {
        let wrapped = render_kernel_idl(&["rpc void f() {\n}".to_string()]);
        assert!(wrapped.starts_with("module kernel {\n"));
        assert!(wrapped.trim_end().ends_with('}'));
        assert!(wrapped.contains("rpc void f()"));
    }
}
