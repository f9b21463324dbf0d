//! End-to-end scenario coverage (spec §8 S3-S6). S1/S2 (shared read-only
//! field, kernel-write `[out]`) are covered in `idl_emitter`'s own unit
//! tests and by `pipeline::orchestrator`'s `end_to_end_emits_shared_field_with_out_annotation`.

use boundary_pdg::config::{AnalysisConfig, BoundarySets};
use boundary_pdg::features::access_annotation::analyze_argument;
use boundary_pdg::features::graph::{populate_base_nodes, Graph, ParamNodeKind, ParamOwner};
use boundary_pdg::features::idl_emitter::{emit_function_idl, ArgumentContext, EmittedProjections};
use boundary_pdg::features::param_tree::{build_tree, TreeScope};
use boundary_pdg::features::shared_data::SharedDataResult;
use boundary_pdg::ir::function::{Argument, BasicBlock, Domain, Terminator};
use boundary_pdg::ir::instruction::{BasicBlockId, CallSite, FunctionId, Instruction, Operand};
use boundary_pdg::ir::module::ModuleBuilder;
use boundary_pdg::ir::ports::{AliasOracle, AliasResult, AllocationSite};
use boundary_pdg::ir::types::DebugTypeKind;
use boundary_pdg::ir::{Function, Module, Opcode};
use boundary_pdg::pipeline;
use boundary_pdg::shared::models::Span;
use rustc_hash::FxHashMap;
use std::collections::HashSet;

fn test_config(boundaries: BoundarySets) -> AnalysisConfig {
    AnalysisConfig {
        module_path: "scenario.json".into(),
        out_dir: "out".into(),
        shared_data_opt: false,
        expand_level: boundary_pdg::config::DEFAULT_EXPAND_LEVEL,
        boundaries,
    }
}

/// S3: a driver-registered callback field is always shared and renders as
/// a nested `rpc` named after the registering implementation, regardless
/// of whether the field is ever dereferenced.
#[test]
fn s3_exported_callback_gets_a_nested_rpc_named_after_its_driver_registration() {
    let mut b = ModuleBuilder::new();
    let void = b.type_arena_mut().void();
    let callback_ty = b.type_arena_mut().intern(DebugTypeKind::FuncPtr {
        params: vec![],
        ret: void,
    });
    let callback_ptr = b.type_arena_mut().intern(DebugTypeKind::Pointer(callback_ty));
    let ops = b.type_arena_mut().reserve_struct("Ops");
    let do_it_member = b.type_arena_mut().intern(DebugTypeKind::Member {
        name: "do_it".into(),
        offset_bytes: 0,
        inner: callback_ptr,
    });
    b.type_arena_mut().finalize_composite(ops, vec![do_it_member]);
    let ops_ptr = b.type_arena_mut().intern(DebugTypeKind::Pointer(ops));

    let driver_fn = b.reserve_function("driver_touch_ops");
    let d_ret = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: d_ret,
        function: driver_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Ret(None),
    });
    b.push_function(Function {
        id: driver_fn,
        name: "driver_touch_ops".into(),
        domain: Domain::Driver,
        defined: true,
        arguments: vec![Argument {
            index: 0,
            name: "ops".into(),
            debug_type: ops_ptr,
        }],
        return_type: void,
        blocks: vec![BasicBlock {
            id: BasicBlockId(0),
            instructions: vec![d_ret],
            terminator: Terminator::Ret,
        }],
        entry: BasicBlockId(0),
        annotation: None,
    });

    let kernel_fn = b.reserve_function("use_ops");
    let k_call = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_call,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Call(CallSite {
            target: boundary_pdg::ir::instruction::CallTarget::Direct(driver_fn),
            args: vec![Operand::Arg(kernel_fn, 0)],
        }),
    });
    let k_ret = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_ret,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Ret(None),
    });
    b.push_function(Function {
        id: kernel_fn,
        name: "use_ops".into(),
        domain: Domain::Kernel,
        defined: true,
        arguments: vec![Argument {
            index: 0,
            name: "ops".into(),
            debug_type: ops_ptr,
        }],
        return_type: void,
        blocks: vec![BasicBlock {
            id: BasicBlockId(0),
            instructions: vec![k_call, k_ret],
            terminator: Terminator::Ret,
        }],
        entry: BasicBlockId(0),
        annotation: None,
    });

    let module = b.build();
    let mut boundaries = BoundarySets::default();
    boundaries.static_funcptr.insert("do_it".into());
    boundaries.static_func.insert("driver_do_it".into());

    let outputs = pipeline::run(&test_config(boundaries), &module).expect("pipeline run");

    assert!(outputs.kernel_idl.contains("use_ops"), "{}", outputs.kernel_idl);
    assert!(outputs.kernel_idl.contains("driver_touch_ops"), "{}", outputs.kernel_idl);
    assert!(outputs.kernel_idl.contains("projection Ops {"), "{}", outputs.kernel_idl);
    assert!(outputs.kernel_idl.contains("rpc void do_it_driver_do_it();"), "{}", outputs.kernel_idl);
}

/// S5: a field bound to a string-consuming callee (`strcpy`) renders
/// `char [string]` instead of its declared `char *` type.
#[test]
fn s5_string_consuming_callee_yields_string_annotation() {
    let mut b = ModuleBuilder::new();
    let void = b.type_arena_mut().void();
    let char_ty = b.type_arena_mut().intern(DebugTypeKind::Scalar {
        name: "char".into(),
        width_bits: 8,
        signed: true,
    });
    let char_ptr = b.type_arena_mut().intern(DebugTypeKind::Pointer(char_ty));
    let str_ty = b.type_arena_mut().reserve_struct("Str");
    let name_member = b.type_arena_mut().intern(DebugTypeKind::Member {
        name: "name".into(),
        offset_bytes: 0,
        inner: char_ptr,
    });
    b.type_arena_mut().finalize_composite(str_ty, vec![name_member]);
    let str_ptr = b.type_arena_mut().intern(DebugTypeKind::Pointer(str_ty));

    let strcpy_fn = b.reserve_function("strcpy");
    b.push_function(Function {
        id: strcpy_fn,
        name: "strcpy".into(),
        domain: Domain::Kernel,
        defined: false,
        arguments: vec![],
        return_type: char_ptr,
        blocks: vec![],
        entry: BasicBlockId(0),
        annotation: None,
    });

    let driver_fn = b.reserve_function("driver_read_name");
    let d_gep = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: d_gep,
        function: driver_fn,
        block: BasicBlockId(0),
        ir_type: char_ptr,
        debug_type: Some(char_ptr),
        span: Span::zero(),
        opcode: Opcode::Gep {
            base: Operand::Arg(driver_fn, 0),
            source_type: str_ty,
            result_type: char_ptr,
            const_index: Some(0),
        },
    });
    let d_load = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: d_load,
        function: driver_fn,
        block: BasicBlockId(0),
        ir_type: char_ptr,
        debug_type: Some(char_ptr),
        span: Span::zero(),
        opcode: Opcode::Load(Operand::Inst(d_gep)),
    });
    let d_ret = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: d_ret,
        function: driver_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Ret(None),
    });
    b.push_function(Function {
        id: driver_fn,
        name: "driver_read_name".into(),
        domain: Domain::Driver,
        defined: true,
        arguments: vec![Argument {
            index: 0,
            name: "s".into(),
            debug_type: str_ptr,
        }],
        return_type: void,
        blocks: vec![BasicBlock {
            id: BasicBlockId(0),
            instructions: vec![d_gep, d_load, d_ret],
            terminator: Terminator::Ret,
        }],
        entry: BasicBlockId(0),
        annotation: None,
    });

    let kernel_fn = b.reserve_function("kernel_set_name");
    let k_gep = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_gep,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: char_ptr,
        debug_type: Some(char_ptr),
        span: Span::zero(),
        opcode: Opcode::Gep {
            base: Operand::Arg(kernel_fn, 0),
            source_type: str_ty,
            result_type: char_ptr,
            const_index: Some(0),
        },
    });
    let k_load = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_load,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: char_ptr,
        debug_type: Some(char_ptr),
        span: Span::zero(),
        opcode: Opcode::Load(Operand::Inst(k_gep)),
    });
    let k_strcpy = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_strcpy,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: char_ptr,
        debug_type: Some(char_ptr),
        span: Span::zero(),
        opcode: Opcode::Call(CallSite {
            target: boundary_pdg::ir::instruction::CallTarget::Direct(strcpy_fn),
            args: vec![Operand::Inst(k_gep), Operand::Const],
        }),
    });
    let k_call_driver = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_call_driver,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Call(CallSite {
            target: boundary_pdg::ir::instruction::CallTarget::Direct(driver_fn),
            args: vec![Operand::Arg(kernel_fn, 0)],
        }),
    });
    let k_ret = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_ret,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Ret(None),
    });
    b.push_function(Function {
        id: kernel_fn,
        name: "kernel_set_name".into(),
        domain: Domain::Kernel,
        defined: true,
        arguments: vec![Argument {
            index: 0,
            name: "s".into(),
            debug_type: str_ptr,
        }],
        return_type: void,
        blocks: vec![BasicBlock {
            id: BasicBlockId(0),
            instructions: vec![k_gep, k_load, k_strcpy, k_call_driver, k_ret],
            terminator: Terminator::Ret,
        }],
        entry: BasicBlockId(0),
        annotation: None,
    });

    let module = b.build();
    let outputs = pipeline::run(&test_config(BoundarySets::default()), &module).expect("pipeline run");

    assert!(outputs.kernel_idl.contains("u8* [string] name;"), "{}", outputs.kernel_idl);
}

/// S6: a critical section whose body touches a cross-domain-shared field
/// is flagged in `CSWarning.txt` (here: `PipelineOutputs::cs_warnings`).
#[test]
fn s6_critical_section_touching_a_shared_field_is_flagged() {
    let mut b = ModuleBuilder::new();
    let i32_ty = b.type_arena_mut().intern(DebugTypeKind::Scalar {
        name: "int".into(),
        width_bits: 32,
        signed: true,
    });
    let void = b.type_arena_mut().void();
    let s = b.type_arena_mut().reserve_struct("Counter");
    let x_member = b.type_arena_mut().intern(DebugTypeKind::Member {
        name: "x".into(),
        offset_bytes: 0,
        inner: i32_ty,
    });
    b.type_arena_mut().finalize_composite(s, vec![x_member]);
    let s_ptr = b.type_arena_mut().intern(DebugTypeKind::Pointer(s));

    let lock_fn = b.reserve_function("mutex_lock");
    b.push_function(Function {
        id: lock_fn,
        name: "mutex_lock".into(),
        domain: Domain::Kernel,
        defined: false,
        arguments: vec![],
        return_type: void,
        blocks: vec![],
        entry: BasicBlockId(0),
        annotation: None,
    });
    let unlock_fn = b.reserve_function("mutex_unlock");
    b.push_function(Function {
        id: unlock_fn,
        name: "mutex_unlock".into(),
        domain: Domain::Kernel,
        defined: false,
        arguments: vec![],
        return_type: void,
        blocks: vec![],
        entry: BasicBlockId(0),
        annotation: None,
    });

    let driver_fn = b.reserve_function("driver_read_x");
    let d_gep = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: d_gep,
        function: driver_fn,
        block: BasicBlockId(0),
        ir_type: i32_ty,
        debug_type: Some(i32_ty),
        span: Span::zero(),
        opcode: Opcode::Gep {
            base: Operand::Arg(driver_fn, 0),
            source_type: s,
            result_type: i32_ty,
            const_index: Some(0),
        },
    });
    let d_load = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: d_load,
        function: driver_fn,
        block: BasicBlockId(0),
        ir_type: i32_ty,
        debug_type: Some(i32_ty),
        span: Span::zero(),
        opcode: Opcode::Load(Operand::Inst(d_gep)),
    });
    let d_ret = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: d_ret,
        function: driver_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Ret(None),
    });
    b.push_function(Function {
        id: driver_fn,
        name: "driver_read_x".into(),
        domain: Domain::Driver,
        defined: true,
        arguments: vec![Argument {
            index: 0,
            name: "c".into(),
            debug_type: s_ptr,
        }],
        return_type: void,
        blocks: vec![BasicBlock {
            id: BasicBlockId(0),
            instructions: vec![d_gep, d_load, d_ret],
            terminator: Terminator::Ret,
        }],
        entry: BasicBlockId(0),
        annotation: None,
    });

    let kernel_fn = b.reserve_function("bump_x");
    let lock_call = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: lock_call,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Call(CallSite {
            target: boundary_pdg::ir::instruction::CallTarget::Direct(lock_fn),
            args: vec![],
        }),
    });
    let k_gep = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_gep,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: i32_ty,
        debug_type: Some(i32_ty),
        span: Span::zero(),
        opcode: Opcode::Gep {
            base: Operand::Arg(kernel_fn, 0),
            source_type: s,
            result_type: i32_ty,
            const_index: Some(0),
        },
    });
    let k_store = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_store,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: i32_ty,
        debug_type: Some(i32_ty),
        span: Span::zero(),
        opcode: Opcode::Store {
            pointer: Operand::Inst(k_gep),
            value: Operand::Const,
        },
    });
    let unlock_call = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: unlock_call,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Call(CallSite {
            target: boundary_pdg::ir::instruction::CallTarget::Direct(unlock_fn),
            args: vec![],
        }),
    });
    let k_call_driver = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_call_driver,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Call(CallSite {
            target: boundary_pdg::ir::instruction::CallTarget::Direct(driver_fn),
            args: vec![Operand::Arg(kernel_fn, 0)],
        }),
    });
    let k_ret = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: k_ret,
        function: kernel_fn,
        block: BasicBlockId(0),
        ir_type: void,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Ret(None),
    });
    b.push_function(Function {
        id: kernel_fn,
        name: "bump_x".into(),
        domain: Domain::Kernel,
        defined: true,
        arguments: vec![Argument {
            index: 0,
            name: "c".into(),
            debug_type: s_ptr,
        }],
        return_type: void,
        blocks: vec![BasicBlock {
            id: BasicBlockId(0),
            instructions: vec![lock_call, k_gep, k_store, unlock_call, k_call_driver, k_ret],
            terminator: Terminator::Ret,
        }],
        entry: BasicBlockId(0),
        annotation: None,
    });

    let module = b.build();
    let outputs = pipeline::run(&test_config(BoundarySets::default()), &module).expect("pipeline run");

    assert_eq!(outputs.cs_warnings.len(), 1, "{:?}", outputs.cs_warnings);
    assert!(outputs.cs_warnings[0].contains("bump_x"));
}

/// S4: array-length inference needs a real points-to oracle, which the
/// pipeline's default `ConservativeAliasOracle` deliberately never
/// supplies (spec §1 Non-goals: "sound whole-program points-to"); this
/// drives components F/H/J directly with a test oracle standing in for
/// one, the way `idl_emitter`'s own unit tests do for S1/S2.
struct FixedSizeAllocOracle {
    target: Operand,
    element_count: u64,
}

impl AliasOracle for FixedSizeAllocOracle {
    fn may_alias(&self, a: Operand, b: Operand) -> AliasResult {
        if a == b {
            AliasResult::MustAlias
        } else {
            AliasResult::MayAlias
        }
    }

    fn allocation_sites_of(&self, v: Operand) -> Vec<AllocationSite> {
        if v == self.target {
            vec![AllocationSite::Dynamic {
                allocator: "kmalloc".into(),
                element_count: self.element_count,
            }]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn s4_allocation_site_on_a_bare_pointer_argument_infers_array_length() {
    let mut b = ModuleBuilder::new();
    let i32_ty = b.type_arena_mut().intern(DebugTypeKind::Scalar {
        name: "int".into(),
        width_bits: 32,
        signed: true,
    });
    let items_ptr = b.type_arena_mut().intern(DebugTypeKind::Pointer(i32_ty));

    let fid: FunctionId = b.reserve_function("fill_buf");
    let ret_id = b.next_instruction_id();
    b.push_instruction(Instruction {
        id: ret_id,
        function: fid,
        block: BasicBlockId(0),
        ir_type: i32_ty,
        debug_type: None,
        span: Span::zero(),
        opcode: Opcode::Ret(None),
    });
    b.push_function(Function {
        id: fid,
        name: "fill_buf".into(),
        domain: Domain::Kernel,
        defined: true,
        arguments: vec![Argument {
            index: 0,
            name: "items".into(),
            debug_type: items_ptr,
        }],
        return_type: i32_ty,
        blocks: vec![BasicBlock {
            id: BasicBlockId(0),
            instructions: vec![ret_id],
            terminator: Terminator::Ret,
        }],
        entry: BasicBlockId(0),
        annotation: None,
    });
    let module = b.build();

    let mut graph = Graph::new();
    graph.begin_building();
    let registry = populate_base_nodes(&mut graph, &module);
    let owner = ParamOwner::Argument { function: fid, index: 0 };
    let tree = build_tree(
        &mut graph,
        &registry,
        &module,
        owner,
        ParamNodeKind::FormalIn,
        items_ptr,
        TreeScope::Function(fid),
        boundary_pdg::config::DEFAULT_EXPAND_LEVEL,
    );
    graph.seal();

    let oracle = FixedSizeAllocOracle {
        target: Operand::Arg(fid, 0),
        element_count: 10,
    };
    let callee_summaries = FxHashMap::default();
    let summary = analyze_argument(&graph, &module, &oracle, &tree, &callee_summaries, &HashSet::new());

    let boundaries = BoundarySets::default();
    let mut emitted = EmittedProjections::new();
    let args = vec![ArgumentContext {
        name: "items".into(),
        debug_type: items_ptr,
        tree: &tree,
    }];
    let rendered = emit_function_idl(
        &module,
        &graph,
        module.function(fid),
        &args,
        &summary,
        &SharedDataResult::default(),
        &boundaries,
        &mut emitted,
    );

    assert!(rendered.contains("array<u32, 10> *items"), "{rendered}");
}
