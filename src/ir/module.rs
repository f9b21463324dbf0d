//! The whole translation unit: the "library that yields instructions, types,
//! debug types, call graph" spec §1 assumes as an external collaborator,
//! modelled concretely so the rest of the pipeline has something to run
//! against.

use crate::ir::function::{Domain, Function};
use crate::ir::instruction::{FunctionId, GlobalId, Instruction, InstructionId, Operand};
use crate::ir::types::{DebugTypeId, TypeArena};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Global {
    pub id: GlobalId,
    pub name: String,
    pub debug_type: DebugTypeId,
    /// Set when the global appears in `driver_globalvars.txt` (spec §6).
    pub domain: Option<Domain>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Module {
    pub functions: Vec<Function>,
    pub globals: Vec<Global>,
    pub instructions: Vec<Instruction>,
    pub type_arena: TypeArena,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    pub fn inst(&self, id: InstructionId) -> &Instruction {
        &self.instructions[id.0 as usize]
    }

    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id.0 as usize]
    }

    pub fn find_function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.functions.iter().find(|f| f.name == name).map(|f| f.id)
    }

    pub fn find_global_by_name(&self, name: &str) -> Option<GlobalId> {
        self.globals.iter().find(|g| g.name == name).map(|g| g.id)
    }

    /// All instructions belonging to `function`, in block/program order.
    pub fn instructions_of(&self, function: FunctionId) -> Vec<InstructionId> {
        self.function(function)
            .blocks
            .iter()
            .flat_map(|b| b.instructions.iter().copied())
            .collect()
    }

    /// Def-use: every instruction in `function` whose operand list mentions
    /// `target` (spec §4.C def-use edges). Scans linearly — the crate favors
    /// a small, auditable model over a maintained use-list, matching the
    /// scale spec §1 targets (per-translation-unit batch analysis, not an
    /// IDE-grade incremental index).
    pub fn users_of(&self, function: FunctionId, target: Operand) -> Vec<InstructionId> {
        self.instructions_of(function)
            .into_iter()
            .filter(|&id| self.inst(id).operands().contains(&target))
            .collect()
    }

    /// Direct and indirect call sites across the whole module, used by
    /// component E to assemble the call graph.
    pub fn call_sites(&self) -> Vec<InstructionId> {
        self.instructions
            .iter()
            .filter(|i| matches!(i.opcode, crate::ir::instruction::Opcode::Call(_)))
            .map(|i| i.id)
            .collect()
    }

    pub fn functions_by_domain(&self, domain: Domain) -> Vec<FunctionId> {
        self.functions
            .iter()
            .filter(|f| f.domain == domain)
            .map(|f| f.id)
            .collect()
    }
}

/// Incrementally constructs a [`Module`]. Intended for test fixtures and for
/// the CLI's JSON loader (spec §6's `--module` stand-in input).
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    module: Module,
    by_name: HashMap<String, FunctionId>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_arena_mut(&mut self) -> &mut TypeArena {
        &mut self.module.type_arena
    }

    pub fn add_global(&mut self, name: &str, debug_type: DebugTypeId, domain: Option<Domain>) -> GlobalId {
        let id = GlobalId(self.module.globals.len() as u32);
        self.module.globals.push(Global {
            id,
            name: name.to_string(),
            debug_type,
            domain,
        });
        id
    }

    pub fn reserve_function(&mut self, name: &str) -> FunctionId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = FunctionId(self.module.functions.len() as u32);
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn push_function(&mut self, function: Function) {
        let idx = function.id.0 as usize;
        if idx == self.module.functions.len() {
            self.module.functions.push(function);
        } else {
            self.module.functions[idx] = function;
        }
    }

    pub fn push_instruction(&mut self, instruction: Instruction) -> InstructionId {
        let id = instruction.id;
        let idx = id.0 as usize;
        if idx == self.module.instructions.len() {
            self.module.instructions.push(instruction);
        } else {
            self.module.instructions[idx] = instruction;
        }
        id
    }

    pub fn next_instruction_id(&self) -> InstructionId {
        InstructionId(self.module.instructions.len() as u32)
    }

    pub fn build(self) -> Module {
        self.module
    }
}
