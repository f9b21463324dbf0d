//! Component I: critical-section detection (spec §4.I). Deliberately
//! oversimplified same-lock correlation — see the module doc on
//! [`CriticalSection`] and spec §9's design note; this is an explicit Open
//! Question, not a bug to silently fix.

use crate::features::graph::{EdgeKind, Graph, NodeId, NodeKind};
use crate::features::shared_data::SharedDataResult;
use crate::ir::instruction::{CallTarget, FunctionId, InstructionId, Opcode, Operand};
use crate::ir::Module;
use rustc_hash::FxHashSet;

/// One `[lock..unlock)` instruction range in program order, within a single
/// function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalSection {
    pub function: FunctionId,
    pub lock: InstructionId,
    pub unlock: InstructionId,
    pub body: Vec<InstructionId>,
    /// spec §4.I: "shared iff any instruction inside it is bound ... to a
    /// shared-data pointer". Computed by [`mark_shared`], defaults to
    /// `false` until then.
    pub shared: bool,
}

/// Built-in lock/unlock symbol pairs (spec §4.I), extensible via
/// `lock_func.txt` (spec §6) through [`LockPairs::with_extra`].
const BUILTIN_LOCK_PAIRS: &[(&str, &str)] = &[
    ("mutex_lock", "mutex_unlock"),
    ("_raw_spin_lock", "_raw_spin_unlock"),
    ("_raw_spin_lock_irq", "_raw_spin_unlock_irq"),
];

#[derive(Debug, Clone, Default)]
pub struct LockPairs {
    pairs: Vec<(String, String)>,
}

impl LockPairs {
    pub fn new() -> Self {
        LockPairs {
            pairs: BUILTIN_LOCK_PAIRS
                .iter()
                .map(|&(l, u)| (l.to_string(), u.to_string()))
                .collect(),
        }
    }

    /// `lock_func.txt` entries are `lock_name:unlock_name` pairs, one per
    /// line (spec §6: "extensible" lock-pair list).
    pub fn with_extra(mut self, extra: impl IntoIterator<Item = (String, String)>) -> Self {
        self.pairs.extend(extra);
        self
    }

    fn unlock_for(&self, lock_name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(l, _)| l == lock_name)
            .map(|(_, u)| u.as_str())
    }

    fn is_lock(&self, name: &str) -> bool {
        self.pairs.iter().any(|(l, _)| l == name)
    }
}

fn call_target_name(module: &Module, opcode: &Opcode) -> Option<&str> {
    let Opcode::Call(call) = opcode else {
        return None;
    };
    let CallTarget::Direct(callee) = &call.target else {
        return None;
    };
    Some(module.function(*callee).name.as_str())
}

/// Scans every instruction of `function` in program order; on a lock-entry
/// call, collects every syntactically later call to the matching unlock in
/// the same function as a separate critical section (spec §4.I: "all
/// syntactic pairings in the same function" — same-lock aliasing is *not*
/// checked here, by design).
pub fn find_critical_sections(module: &Module, function: FunctionId, pairs: &LockPairs) -> Vec<CriticalSection> {
    let instructions = module.instructions_of(function);
    let mut sections = Vec::new();

    for (i, &lock_id) in instructions.iter().enumerate() {
        let Some(name) = call_target_name(module, &module.inst(lock_id).opcode) else {
            continue;
        };
        if !pairs.is_lock(name) {
            continue;
        }
        let Some(unlock_name) = pairs.unlock_for(name) else {
            continue;
        };
        for &unlock_id in &instructions[i + 1..] {
            if call_target_name(module, &module.inst(unlock_id).opcode) == Some(unlock_name) {
                let body: Vec<InstructionId> = instructions[i..]
                    .iter()
                    .copied()
                    .take_while(|&id| id != unlock_id)
                    .collect();
                sections.push(CriticalSection {
                    function,
                    lock: lock_id,
                    unlock: unlock_id,
                    body,
                    shared: false,
                });
            }
        }
    }

    sections
}

/// An inline-asm instruction whose asm string contains `"lock"` is an atomic
/// op (spec §4.I).
pub fn is_atomic_op(inst_opcode: &Opcode) -> bool {
    matches!(inst_opcode, Opcode::InlineAsm { asm, .. } if asm.contains("lock"))
}

/// Marks `section.shared` when any instruction in its body is `valDep`-bound
/// to a node component G marked shared, widened by one step of alias-closure
/// and def-use-closure (spec §4.I: "derived-pointer closure"). Interprocedural
/// argument propagation is handled by the caller re-invoking this per callee
/// frame; this function only widens within one function body.
pub fn mark_shared(
    graph: &Graph,
    module: &Module,
    section: &mut CriticalSection,
    shared: &SharedDataResult,
) {
    let mut frontier: FxHashSet<InstructionId> = section.body.iter().copied().collect();

    // def-use closure: anything derived from a body instruction via a direct
    // data-dependency edge is in scope too.
    let mut changed = true;
    while changed {
        changed = false;
        let current: Vec<InstructionId> = frontier.iter().copied().collect();
        for inst_id in current {
            for operand in module.inst(inst_id).operands() {
                if let Operand::Inst(src) = operand {
                    if frontier.insert(src) {
                        changed = true;
                    }
                }
            }
        }
    }

    for inst_id in &frontier {
        let Some(node) = find_inst_node(graph, *inst_id) else {
            continue;
        };
        for bound in graph.neighbors(node, &[EdgeKind::ValDep]) {
            if shared.shared_nodes.contains(&bound) {
                section.shared = true;
                return;
            }
        }
        if shared.shared_nodes.contains(&node) {
            section.shared = true;
            return;
        }
    }
}

fn find_inst_node(graph: &Graph, target: InstructionId) -> Option<NodeId> {
    graph.nodes().find_map(|n| match &n.kind {
        NodeKind::Inst { instruction, .. } if *instruction == target => Some(n.id),
        _ => None,
    })
}
