//! Function identity, basic blocks, and the trust-domain tag that makes a
//! function "cross-domain" meaningful (spec §3, §6).

use crate::ir::instruction::{BasicBlockId, FunctionId, InstructionId};
use crate::ir::types::DebugTypeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Kernel,
    Driver,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub index: u32,
    pub name: String,
    pub debug_type: DebugTypeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminator {
    Br(BasicBlockId),
    CondBr {
        then_bb: BasicBlockId,
        else_bb: BasicBlockId,
    },
    Ret,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BasicBlockId,
    pub instructions: Vec<InstructionId>,
    pub terminator: Terminator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    pub domain: Domain,
    /// `false` for a function only declared in this translation unit (spec
    /// §6's `imported_func.txt`).
    pub defined: bool,
    pub arguments: Vec<Argument>,
    pub return_type: DebugTypeId,
    pub blocks: Vec<BasicBlock>,
    pub entry: BasicBlockId,
    /// User-supplied taint/trust annotation carried by the `FunctionEntry`
    /// node (spec §3).
    pub annotation: Option<String>,
}

impl Function {
    pub fn signature_key(&self, params: &[DebugTypeId], ret: DebugTypeId) -> bool {
        self.arguments.len() == params.len()
            && self
                .arguments
                .iter()
                .zip(params.iter())
                .all(|(a, p)| a.debug_type == *p)
            && self.return_type == ret
    }

    pub fn block(&self, id: BasicBlockId) -> &BasicBlock {
        self.blocks
            .iter()
            .find(|b| b.id == id)
            .expect("basic block id must belong to this function")
    }
}
