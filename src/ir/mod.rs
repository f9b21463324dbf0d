//! The external intermediate representation this crate analyzes.
//!
//! Parsing/loading this representation from a real compiler is explicitly
//! out of scope (spec §1): this module only models the shapes the rest of
//! the pipeline needs — instructions, debug types, functions, the call
//! graph, and the two oracle ports (`mayAlias`, `allocationSitesOf`,
//! nearest-prior-store) the analyses query.

pub mod function;
pub mod instruction;
pub mod module;
pub mod ports;
pub mod types;

pub use function::{Argument, BasicBlock, Domain, Function, Terminator};
pub use instruction::{
    BasicBlockId, CallSite, CallTarget, FunctionId, FunctionSignature, GlobalId, Instruction,
    InstructionId, Opcode, Operand,
};
pub use module::{Global, Module, ModuleBuilder};
pub use ports::{
    AliasOracle, AliasResult, AllocationSite, ConservativeAliasOracle, ConservativeMemoryDependencyOracle,
    MemoryDependencyOracle,
};
pub use types::{DebugTypeId, DebugTypeKind, TypeArena, TypeClass};
