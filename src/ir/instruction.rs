//! The Instruction Handle (IH) of spec §3: "an opaque reference to an
//! instruction in the external IR together with its enclosing function, type,
//! and optional debug type binding."

use crate::ir::types::DebugTypeId;
use crate::shared::models::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstructionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BasicBlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobalId(pub u32);

/// A value operand: either another instruction's result, a function
/// argument, or a module-level global. LLVM's `Value` hierarchy collapsed to
/// the three shapes the analysis actually needs to distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Inst(InstructionId),
    Arg(FunctionId, u32),
    Global(GlobalId),
    /// A constant; analyses that don't care about the exact value (e.g.
    /// def-use edges) just skip these.
    Const,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub params: Vec<DebugTypeId>,
    pub ret: DebugTypeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallTarget {
    Direct(FunctionId),
    /// Callee unknown at this call site; candidates are resolved by
    /// component E (spec §4.E) via exact signature match.
    Indirect { signature: FunctionSignature },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub target: CallTarget,
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Load(Operand),
    Store {
        pointer: Operand,
        value: Operand,
    },
    /// `source_type`/`result_type` and `const_index` are exactly the GEP
    /// fields spec §4.F matches against a struct's field offset.
    Gep {
        base: Operand,
        source_type: DebugTypeId,
        result_type: DebugTypeId,
        const_index: Option<i64>,
    },
    /// Logical shift right by a constant — the bit-field marker of spec
    /// §4.F ("a GEP is considered bit-field-bearing iff one of its
    /// transitive users is a logical-shift-right with a constant shift").
    Lshr {
        value: Operand,
        shift_const: Option<u32>,
    },
    Call(CallSite),
    Ret(Option<Operand>),
    Br,
    CondBr(Operand),
    /// Inline assembly; `asm` is scanned for the substring `"lock"` by the
    /// atomic-region analyzer (spec §4.I).
    InlineAsm {
        asm: String,
        operands: Vec<Operand>,
    },
    Phi(Vec<Operand>),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstructionId,
    pub function: FunctionId,
    pub block: BasicBlockId,
    /// The instruction's type as carried by the IR itself (always present).
    pub ir_type: DebugTypeId,
    /// The debug-info-bound type, if the frontend could resolve one (spec
    /// §7: "Debug-info gap... treated as void/unknown" when absent).
    pub debug_type: Option<DebugTypeId>,
    pub span: Span,
    pub opcode: Opcode,
}

impl Instruction {
    /// Operands this instruction reads, used to build def-use edges
    /// (component C) without a separate "uses" index.
    pub fn operands(&self) -> Vec<Operand> {
        match &self.opcode {
            Opcode::Load(p) => vec![*p],
            Opcode::Store { pointer, value } => vec![*pointer, *value],
            Opcode::Gep { base, .. } => vec![*base],
            Opcode::Lshr { value, .. } => vec![*value],
            Opcode::Call(call) => call.args.clone(),
            Opcode::Ret(Some(v)) => vec![*v],
            Opcode::Ret(None) => vec![],
            Opcode::Br => vec![],
            Opcode::CondBr(c) => vec![*c],
            Opcode::InlineAsm { operands, .. } => operands.clone(),
            Opcode::Phi(vals) => vals.clone(),
            Opcode::Other => vec![],
        }
    }

    pub fn is_pointer_typed(&self) -> bool {
        matches!(
            self.opcode,
            Opcode::Gep { .. } | Opcode::Load(_) | Opcode::Call(_)
        )
    }
}
