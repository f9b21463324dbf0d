//! The `NOACCESS ⊑ READ ⊑ WRITE` access-type lattice shared by components G
//! and H (spec §3, "State machines: Tree-node access"), plus the single
//! "what does this bound instruction actually do" rule (spec §4.G) both
//! components evaluate identically.

use crate::features::graph::{Graph, NodeId, NodeKind};
use crate::ir::instruction::{CallTarget, FunctionId, Opcode, Operand};
use crate::ir::Module;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AccessType {
    #[default]
    NoAccess,
    Read,
    Write,
}

impl AccessType {
    /// Monotone join: never demotes (spec §8 property 4).
    pub fn join(self, other: AccessType) -> AccessType {
        self.max(other)
    }
}

/// The access type contributed by direct users of `operand` within
/// `function` (spec §4.G): `WRITE` for a store to it (unless it's an initial
/// spill of the argument itself), `READ` for a load/GEP off it, else
/// `NOACCESS`. This is the core rule both the GEP-bound and the bare-pointer-
/// argument binding evaluate identically.
pub fn observed_access_of(module: &Module, function: FunctionId, operand: Operand) -> AccessType {
    let mut acc = AccessType::NoAccess;
    for user in module.users_of(function, operand) {
        match &module.inst(user).opcode {
            Opcode::Store { pointer, value } if *pointer == operand => {
                if matches!(value, Operand::Arg(..)) {
                    continue; // initial spill, not a write of the pointee.
                }
                acc = acc.join(AccessType::Write);
            }
            Opcode::Load(p) if *p == operand => acc = acc.join(AccessType::Read),
            Opcode::Gep { base, .. } if *base == operand => acc = acc.join(AccessType::Read),
            _ => {}
        }
    }
    acc
}

/// Whether `operand` is ever passed directly to one of `callee_names` (spec
/// §4.G: "nodes bound to string-consuming callees are recorded as string
/// fields globally"; spec §4.H reuses this shape for `[alloc(caller)]`/
/// `[dealloc(caller)]`/`[ioremap(caller)]`).
pub fn reaches_callee_of(module: &Module, function: FunctionId, operand: Operand, callee_names: &[&str]) -> bool {
    module.users_of(function, operand).into_iter().any(|user| {
        matches!(
            &module.inst(user).opcode,
            Opcode::Call(call) if matches!(&call.target, CallTarget::Direct(f)
                if callee_names.contains(&module.function(*f).name.as_str()))
        )
    })
}

/// [`observed_access_of`] for a `valDep`-bound instruction node: the bound
/// node's own value is the operand under inspection.
pub fn observed_access(module: &Module, graph: &Graph, bound_inst_node: NodeId) -> AccessType {
    let NodeKind::Inst { instruction, function, .. } = &graph.node(bound_inst_node).kind else {
        return AccessType::NoAccess;
    };
    observed_access_of(module, *function, Operand::Inst(*instruction))
}

/// [`reaches_callee_of`] for a `valDep`-bound instruction node.
pub fn reaches_callee(module: &Module, graph: &Graph, bound_inst_node: NodeId, callee_names: &[&str]) -> bool {
    let NodeKind::Inst { instruction, function, .. } = &graph.node(bound_inst_node).kind else {
        return false;
    };
    reaches_callee_of(module, *function, Operand::Inst(*instruction), callee_names)
}
