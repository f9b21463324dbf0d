//! GEP-to-field matching and bit-field detection (spec §4.F).

use crate::ir::instruction::{InstructionId, Opcode, Operand};
use crate::ir::types::DebugTypeId;
use crate::ir::Module;

/// Finds every GEP (within `candidates`) whose source element type is
/// `parent_type`, whose result element type is `field_type`, and whose
/// constant index equals `offset_bytes` — the bindings a parameter-tree field
/// child records as its `valDep` edges. A field can be dereferenced from many
/// call sites (or, for a global's tree, many functions entirely), so every
/// match is bound, not just the first.
pub fn find_matching_geps(
    module: &Module,
    candidates: &[InstructionId],
    parent_type: DebugTypeId,
    field_type: DebugTypeId,
    offset_bytes: u64,
) -> Vec<InstructionId> {
    candidates
        .iter()
        .copied()
        .filter(|&id| match &module.inst(id).opcode {
            Opcode::Gep {
                source_type,
                result_type,
                const_index,
                ..
            } => {
                *source_type == parent_type
                    && *result_type == field_type
                    && *const_index == Some(offset_bytes as i64)
            }
            _ => false,
        })
        .collect()
}

/// A GEP is bit-field-bearing iff one of its transitive def-use successors is
/// a logical-shift-right with a constant shift amount (spec §4.F). Returns
/// that shift so the caller can compute the field's effective offset
/// (`gep_offset + shift`).
pub fn bitfield_shift(module: &Module, function: crate::ir::FunctionId, gep: InstructionId) -> Option<u32> {
    let mut frontier = vec![gep];
    let mut visited = std::collections::HashSet::new();
    visited.insert(gep);

    // Bounded BFS over the def-use graph; function bodies are finite so this
    // always terminates, but the visited set also guards against any
    // accidental cycle in a malformed fixture.
    while let Some(inst_id) = frontier.pop() {
        for user_id in module.users_of(function, Operand::Inst(inst_id)) {
            if let Opcode::Lshr { shift_const: Some(shift), .. } = &module.inst(user_id).opcode {
                return Some(*shift);
            }
            if visited.insert(user_id) {
                frontier.push(user_id);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::function::{BasicBlock, Domain, Terminator};
    use crate::ir::instruction::BasicBlockId;
    use crate::ir::module::ModuleBuilder;
    use crate::ir::types::DebugTypeKind;
    use crate::ir::{Function, Instruction};
    use crate::shared::models::Span;

    #[test]
    fn gep_followed_by_lshr_is_bitfield_bearing() {
        let mut b = ModuleBuilder::new();
        let i32_ty = b.type_arena_mut().intern(DebugTypeKind::Scalar {
            name: "int".into(),
            width_bits: 32,
            signed: true,
        });
        let fid = b.reserve_function("f");

        let gep_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: gep_id,
            function: fid,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode: Opcode::Gep {
                base: Operand::Arg(fid, 0),
                source_type: i32_ty,
                result_type: i32_ty,
                const_index: Some(4),
            },
        });
        let lshr_id = b.next_instruction_id();
        b.push_instruction(Instruction {
            id: lshr_id,
            function: fid,
            block: BasicBlockId(0),
            ir_type: i32_ty,
            debug_type: Some(i32_ty),
            span: Span::zero(),
            opcode: Opcode::Lshr {
                value: Operand::Inst(gep_id),
                shift_const: Some(3),
            },
        });
        b.push_function(Function {
            id: fid,
            name: "f".into(),
            domain: Domain::Kernel,
            defined: true,
            arguments: vec![],
            return_type: i32_ty,
            blocks: vec![BasicBlock {
                id: BasicBlockId(0),
                instructions: vec![gep_id, lshr_id],
                terminator: Terminator::Ret,
            }],
            entry: BasicBlockId(0),
            annotation: None,
        });
        let module = b.build();

        assert_eq!(bitfield_shift(&module, fid, gep_id), Some(3));
    }
}
