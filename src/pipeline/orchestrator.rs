//! Orchestration: wires components A (debug-info adapter, used implicitly
//! through every feature module) through J (IDL emitter) together over one
//! [`Module`], in the phase order the graph's `empty -> building -> sealed`
//! lifecycle and component H's bottom-up call-graph requirement both impose.

use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::features::access_annotation::{analyze_argument, FunctionAccessSummary};
use crate::features::atomic_region::{find_critical_sections, is_atomic_op, mark_shared, LockPairs};
use crate::features::call_graph::{resolve_call_sites, SignatureIndex};
use crate::features::control_dep::build_control_dep_edges;
use crate::features::data_dep::build_data_dep_edges;
use crate::features::graph::{populate_base_nodes, Graph, ParamNodeKind, ParamOwner};
use crate::features::idl_emitter::{emit_function_idl, render_kernel_idl, ArgumentContext, EmittedProjections};
use crate::features::param_tree::{build_tree, BuiltTree, TreeScope};
use crate::features::shared_data::{analyze_tree as analyze_shared_tree, SharedDataResult};
use crate::ir::instruction::{CallTarget, FunctionId, Opcode};
use crate::ir::ports::{ConservativeAliasOracle, ConservativeMemoryDependencyOracle};
use crate::ir::Module;
use crate::shared::models::AnalysisContext;
use rustc_hash::FxHashMap;
use std::collections::{HashMap, HashSet};

/// Everything one run produces, ready for [`output`] to write to disk.
pub struct PipelineOutputs {
    pub kernel_idl: String,
    /// One block per finding (spec §6: "blank-line separated").
    pub cs_warnings: Vec<String>,
    pub atomic_warnings: Vec<String>,
    pub stats: AnalysisContext,
}

/// Runs the full analysis over `module` and returns everything [`output`]
/// needs to write. Per-function analysis (components G/H/I) does not abort
/// the whole run on a single function's failure (spec §7 "local recovery
/// policy"); that boundary is enforced in the component loops below by
/// simply skipping a function whose tree or summary could not be built,
/// rather than by `catch_unwind` (component failures here are `Result`, not
/// panics — a panic is reserved for the fatal invariant-violation class).
pub fn run(config: &AnalysisConfig, module: &Module) -> Result<PipelineOutputs> {
    let stats = AnalysisContext::new();
    let alias_oracle = ConservativeAliasOracle;
    let mem_oracle = ConservativeMemoryDependencyOracle;

    let mut graph = Graph::new();
    graph.begin_building();
    let registry = populate_base_nodes(&mut graph, module);

    for function in &module.functions {
        if !function.defined {
            continue;
        }
        build_control_dep_edges(&mut graph, &registry, module, function.id, &stats);
        build_data_dep_edges(&mut graph, &registry, module, function.id, &mem_oracle, &alias_oracle, &stats);
    }

    let signature_index = SignatureIndex::build(module);
    for function in &module.functions {
        if !function.defined {
            continue;
        }
        resolve_call_sites(&mut graph, &registry, module, function.id, &signature_index, None, &stats);
    }

    // Component F: one `formalIn` tree per argument of every defined
    // function, built while the graph is still mutable.
    let mut trees: HashMap<(FunctionId, u32), BuiltTree> = HashMap::new();
    for function in &module.functions {
        if !function.defined {
            continue;
        }
        for arg in &function.arguments {
            let owner = ParamOwner::Argument {
                function: function.id,
                index: arg.index,
            };
            let tree = build_tree(
                &mut graph,
                &registry,
                module,
                owner,
                ParamNodeKind::FormalIn,
                arg.debug_type,
                TreeScope::Function(function.id),
                config.expand_level,
            );
            trees.insert((function.id, arg.index), tree);
        }
    }

    // Component G's own input: one whole-module-scoped tree per distinct
    // root type (not component F's per-argument, function-scoped trees —
    // analyze_shared_tree only sees "both domains accessed" within a
    // single tree's own bound GEPs, so it needs a tree whose GEP scan
    // spans every function, the way its own module doc describes ("walks
    // a global type tree"); deduped by root type since several arguments
    // across the module commonly share one struct pointer type.
    let mut shared_roots: HashSet<crate::ir::types::DebugTypeId> = HashSet::new();
    let mut shared_trees = Vec::new();
    for function in &module.functions {
        if !function.defined {
            continue;
        }
        for arg in &function.arguments {
            if !shared_roots.insert(arg.debug_type) {
                continue;
            }
            let owner = ParamOwner::Argument {
                function: function.id,
                index: arg.index,
            };
            shared_trees.push(build_tree(
                &mut graph,
                &registry,
                module,
                owner,
                ParamNodeKind::FormalIn,
                arg.debug_type,
                TreeScope::Module,
                config.expand_level,
            ));
        }
    }

    graph.seal();

    // Component G: shared-data classification, merged across every
    // whole-module tree above.
    let mut shared = SharedDataResult::default();
    for tree in &shared_trees {
        shared.merge(analyze_shared_tree(&graph, module, tree, &config.boundaries.static_funcptr));
    }

    // Component H: bottom-up over the direct call graph (spec §9
    // "coroutine-like propagation" design note); indirect callees are left
    // out of the worklist order and simply see an empty `callee_summaries`
    // entry, matching the conservative-widening failure mode spec §4/§7
    // prescribe for unresolved calls.
    let mut function_summaries: FxHashMap<FunctionId, FunctionAccessSummary> = FxHashMap::default();
    for function_id in bottom_up_order(module) {
        if !module.function(function_id).defined {
            continue;
        }
        if let Some(summary) = analyze_function_guarded(&graph, module, &alias_oracle, function_id, &trees, &function_summaries, &shared) {
            function_summaries.insert(function_id, summary);
        }
    }

    // Component I: critical sections per function, widened and marked
    // shared against component G's output.
    let lock_pairs = LockPairs::new().with_extra(parse_lock_pairs(&config.boundaries.lock_func));
    let mut cs_warnings = Vec::new();
    let mut atomic_warnings = Vec::new();
    for function in &module.functions {
        if !function.defined {
            continue;
        }
        let mut sections = find_critical_sections(module, function.id, &lock_pairs);
        for section in &mut sections {
            mark_shared(&graph, module, section, &shared);
            if section.shared {
                cs_warnings.push(format!(
                    "function: {}\nlock: {:?}\nunlock: {:?}",
                    function.name, section.lock, section.unlock
                ));
                stats.incr("critical_sections.shared");
            }
        }
        for inst_id in module.instructions_of(function.id) {
            if is_atomic_op(&module.inst(inst_id).opcode) {
                atomic_warnings.push(format!("function: {}\ninstruction: {:?}", function.name, inst_id));
                stats.incr("atomic_region.atomic_ops");
            }
        }
    }

    // Component J: one `rpc` per cross-domain function, in a deterministic
    // (sorted-by-name) order so re-running produces byte-identical output
    // regardless of the module's own function ordering.
    let mut cross_domain = cross_domain_functions(module, &config.boundaries.liblcd_funcs);
    cross_domain.sort_by_key(|&f| module.function(f).name.clone());
    let mut emitted = EmittedProjections::new();
    let mut decls = Vec::new();
    let empty_summary = FunctionAccessSummary::default();
    for function_id in cross_domain {
        let function = module.function(function_id);
        let summary = function_summaries.get(&function_id).unwrap_or(&empty_summary);
        let args: Vec<ArgumentContext> = function
            .arguments
            .iter()
            .filter_map(|arg| {
                trees.get(&(function_id, arg.index)).map(|tree| ArgumentContext {
                    name: arg.name.clone(),
                    debug_type: arg.debug_type,
                    tree,
                })
            })
            .collect();
        decls.push(emit_function_idl(
            module,
            &graph,
            function,
            &args,
            summary,
            &shared,
            &config.boundaries,
            &mut emitted,
        ));
    }

    stats.add("shared_data.shared_fields", shared.shared_field_ids.len() as u64);
    stats.add("idl.emitted_functions", decls.len() as u64);

    Ok(PipelineOutputs {
        kernel_idl: render_kernel_idl(&decls),
        cs_warnings,
        atomic_warnings,
        stats,
    })
}

/// DFS post-order over the module's direct call edges (callee before
/// caller), a visited set breaking cycles. Indirect call targets are
/// deliberately excluded from this ordering — component H treats an
/// indirect callee's summary as simply absent, the same conservative
/// widening an unresolved call gets elsewhere in the pipeline.
fn bottom_up_order(module: &Module) -> Vec<FunctionId> {
    let mut direct_callees: HashMap<FunctionId, Vec<FunctionId>> = HashMap::new();
    for inst_id in module.call_sites() {
        let inst = module.inst(inst_id);
        if let Opcode::Call(call) = &inst.opcode {
            if let CallTarget::Direct(callee) = &call.target {
                direct_callees.entry(inst.function).or_default().push(*callee);
            }
        }
    }

    let mut order = Vec::new();
    let mut visited = HashSet::new();
    for function in &module.functions {
        visit(function.id, &direct_callees, &mut visited, &mut order);
    }
    order
}

/// Component H's per-function error boundary (spec §7 "local recovery
/// policy"): analyzes every argument of `function_id` and merges their
/// per-field summaries, or returns `None` (logging why) if the function has
/// no built trees to analyze at all. This is the only failure mode
/// available at this layer — a genuine internal invariant violation (e.g. a
/// query against an unsealed graph) is `errors::invariant_violation`'s job
/// and panics past this wrapper on purpose, per spec §7's "crash early"
/// rule for that one fatal class; this function only ever discards a
/// function's *partial* results, never suppresses a fatal one.
fn analyze_function_guarded(
    graph: &Graph,
    module: &Module,
    alias_oracle: &ConservativeAliasOracle,
    function_id: FunctionId,
    trees: &HashMap<(FunctionId, u32), BuiltTree>,
    callee_summaries: &FxHashMap<FunctionId, FunctionAccessSummary>,
    shared: &SharedDataResult,
) -> Option<FunctionAccessSummary> {
    let function = module.function(function_id);
    if function.arguments.is_empty() {
        return Some(FunctionAccessSummary::default());
    }

    let mut merged = FunctionAccessSummary::default();
    let mut analyzed_any = false;
    for arg in &function.arguments {
        let Some(tree) = trees.get(&(function_id, arg.index)) else {
            tracing::warn!(function = %function.name, arg = arg.index, "no parameter tree built, skipping argument");
            continue;
        };
        let per_arg = analyze_argument(graph, module, alias_oracle, tree, callee_summaries, &shared.string_field_ids);
        merged.field_access.extend(per_arg.field_access);
        merged.annotations.extend(per_arg.annotations);
        merged.array_lengths.extend(per_arg.array_lengths);
        analyzed_any = true;
    }

    if !analyzed_any {
        tracing::warn!(function = %function.name, "no arguments analyzed, discarding partial summary");
        return None;
    }
    Some(merged)
}

fn visit(
    f: FunctionId,
    callees: &HashMap<FunctionId, Vec<FunctionId>>,
    visited: &mut HashSet<FunctionId>,
    order: &mut Vec<FunctionId>,
) {
    if !visited.insert(f) {
        return;
    }
    if let Some(cs) = callees.get(&f) {
        for &c in cs {
            visit(c, callees, visited, order);
        }
    }
    order.push(f);
}

/// A function is cross-domain (glossary: "a function whose call graph
/// straddles the kernel/driver boundary") iff some direct call edge touching
/// it crosses `Domain::Kernel` <-> `Domain::Driver`; both the caller and the
/// callee of that edge qualify. `liblcd_funcs.txt` names are excluded (spec
/// §6: "blacklist — excluded from cross-domain analysis").
fn cross_domain_functions(module: &Module, liblcd_funcs: &HashSet<String>) -> Vec<FunctionId> {
    let mut set = HashSet::new();
    for inst_id in module.call_sites() {
        let inst = module.inst(inst_id);
        let Opcode::Call(call) = &inst.opcode else {
            continue;
        };
        let CallTarget::Direct(callee) = &call.target else {
            continue;
        };
        let caller_domain = module.function(inst.function).domain;
        let callee_domain = module.function(*callee).domain;
        if caller_domain != callee_domain {
            set.insert(inst.function);
            set.insert(*callee);
        }
    }
    set.into_iter()
        .filter(|&f| module.function(f).defined && !liblcd_funcs.contains(&module.function(f).name))
        .collect()
}

/// `lock_func.txt` lines are `lock_name:unlock_name` pairs (spec §6).
/// Malformed lines (no `:`) are skipped rather than treated as fatal.
fn parse_lock_pairs(lines: &HashSet<String>) -> Vec<(String, String)> {
    lines
        .iter()
        .filter_map(|line| line.split_once(':'))
        .map(|(l, u)| (l.to_string(), u.to_string()))
        .collect()
}
