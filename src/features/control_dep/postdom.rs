//! Postdominator tree over one function's basic blocks (Ferrante, Ottenstein
//! & Warren, "The Program Dependence Graph and Its Use in Optimization",
//! 1987) — block `A` is control-dependent on branch block `B` iff `A`
//! postdominates one successor of `B` but not `B` itself. Computed as the
//! ordinary dominator-tree fixpoint over the *reverse* CFG, rooted at a
//! synthetic exit merging every `Ret`/`Unreachable` block, mirroring the
//! standard textbook treatment rather than any one compiler's internal API.

use crate::ir::function::{Function, Terminator};
use crate::ir::instruction::BasicBlockId;
use rustc_hash::FxHashMap;

const EXIT: BasicBlockId = BasicBlockId(u32::MAX);

pub struct PostdominatorTree {
    /// block -> its successors, control-dependents precomputed once at
    /// build time (spec §4.D only ever asks "who is dependent on this
    /// branch", never the other direction).
    control_dependents: FxHashMap<BasicBlockId, Vec<BasicBlockId>>,
}

impl PostdominatorTree {
    pub fn build(func: &Function) -> Self {
        let ids: Vec<BasicBlockId> = func.blocks.iter().map(|b| b.id).collect();
        let successors = successor_map(func);
        let predecessors = reverse(&successors, &ids);

        let ipdom = compute_ipdom(&ids, &predecessors);

        let mut control_dependents: FxHashMap<BasicBlockId, Vec<BasicBlockId>> = FxHashMap::default();
        for &branch in &ids {
            let succs = successors.get(&branch).cloned().unwrap_or_default();
            if succs.len() < 2 {
                continue;
            }
            for &succ in &succs {
                // Walk from `succ` up the postdominator tree until hitting
                // `ipdom[branch]` (exclusive): every block on that walk,
                // including `succ`, is control-dependent on `branch`.
                let stop = ipdom.get(&branch).copied();
                let mut cur = succ;
                loop {
                    control_dependents.entry(branch).or_default().push(cur);
                    if Some(cur) == stop || cur == EXIT {
                        break;
                    }
                    match ipdom.get(&cur) {
                        Some(&next) => cur = next,
                        None => break,
                    }
                }
            }
            if let Some(deps) = control_dependents.get_mut(&branch) {
                deps.sort_by_key(|b| b.0);
                deps.dedup();
            }
        }

        PostdominatorTree { control_dependents }
    }

    pub fn control_dependents(&self, branch: BasicBlockId) -> Vec<BasicBlockId> {
        self.control_dependents.get(&branch).cloned().unwrap_or_default()
    }
}

fn successor_map(func: &Function) -> FxHashMap<BasicBlockId, Vec<BasicBlockId>> {
    let mut map = FxHashMap::default();
    for block in &func.blocks {
        let succs = match &block.terminator {
            Terminator::Br(target) => vec![*target],
            Terminator::CondBr { then_bb, else_bb } => vec![*then_bb, *else_bb],
            Terminator::Ret | Terminator::Unreachable => vec![EXIT],
        };
        map.insert(block.id, succs);
    }
    map
}

fn reverse(
    successors: &FxHashMap<BasicBlockId, Vec<BasicBlockId>>,
    ids: &[BasicBlockId],
) -> FxHashMap<BasicBlockId, Vec<BasicBlockId>> {
    let mut preds: FxHashMap<BasicBlockId, Vec<BasicBlockId>> = FxHashMap::default();
    for &id in ids {
        preds.entry(id).or_default();
    }
    preds.entry(EXIT).or_default();
    for (&block, succs) in successors {
        for &succ in succs {
            preds.entry(succ).or_default().push(block);
        }
    }
    preds
}

/// Cooper-Harvey-Kennedy iterative dominator algorithm, run over the reverse
/// CFG (predecessors here are the forward-CFG successors) to get immediate
/// *post*dominators. `EXIT` is its own root and has no immediate
/// postdominator.
fn compute_ipdom(
    ids: &[BasicBlockId],
    predecessors: &FxHashMap<BasicBlockId, Vec<BasicBlockId>>,
) -> FxHashMap<BasicBlockId, BasicBlockId> {
    // Reverse postorder of the reverse CFG starting at EXIT, which is what
    // Cooper-Harvey-Kennedy needs for fast convergence; for the small,
    // non-performance-critical graphs this crate processes, a stable
    // id-descending order converges just as well and is simpler to audit.
    let mut order: Vec<BasicBlockId> = ids.to_vec();
    order.sort_by_key(|b| std::cmp::Reverse(b.0));

    let mut idom: FxHashMap<BasicBlockId, BasicBlockId> = FxHashMap::default();
    idom.insert(EXIT, EXIT);

    let index_of = |id: BasicBlockId| -> i64 {
        if id == EXIT {
            i64::MAX
        } else {
            order.iter().position(|&x| x == id).map(|p| p as i64).unwrap_or(-1)
        }
    };

    let mut changed = true;
    while changed {
        changed = false;
        for &node in &order {
            let preds = predecessors.get(&node).cloned().unwrap_or_default();
            let mut new_idom: Option<BasicBlockId> = None;
            for pred in preds {
                if pred != node && (idom.contains_key(&pred) || pred == EXIT) {
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(existing) => intersect(existing, pred, &idom, &index_of),
                    });
                }
            }
            if let Some(new_idom) = new_idom {
                if idom.get(&node) != Some(&new_idom) {
                    idom.insert(node, new_idom);
                    changed = true;
                }
            }
        }
    }

    idom.remove(&EXIT);
    idom
}

fn intersect(
    a: BasicBlockId,
    b: BasicBlockId,
    idom: &FxHashMap<BasicBlockId, BasicBlockId>,
    index_of: &impl Fn(BasicBlockId) -> i64,
) -> BasicBlockId {
    let mut finger1 = a;
    let mut finger2 = b;
    while finger1 != finger2 {
        while index_of(finger1) < index_of(finger2) {
            finger1 = match idom.get(&finger1) {
                Some(&p) => p,
                None => return finger2,
            };
        }
        while index_of(finger2) < index_of(finger1) {
            finger2 = match idom.get(&finger2) {
                Some(&p) => p,
                None => return finger1,
            };
        }
    }
    finger1
}
