//! The two external query surfaces spec §1 assumes as a black box: an
//! underapproximating points-to oracle and a memory-dependency oracle.
//! Neither is implemented soundly here — that is explicitly out of scope
//! (spec §1 Non-goals: "sound whole-program points-to") — but the crate
//! needs trait boundaries to depend on and one conservative, always-correct
//! (if useless) implementation of each so the pipeline runs end-to-end.

use crate::ir::instruction::{InstructionId, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasResult {
    NoAlias,
    MayAlias,
    MustAlias,
}

/// `mayAlias`/`allocationSitesOf` of spec §1.
pub trait AliasOracle {
    fn may_alias(&self, a: Operand, b: Operand) -> AliasResult;

    /// Allocation sites the points-to analysis attributes to `v`, if any.
    fn allocation_sites_of(&self, v: Operand) -> Vec<AllocationSite>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationSite {
    /// A fixed-size stack allocation of array type (spec §4.H array-length
    /// inference).
    Stack { element_count: u64 },
    /// A dynamic allocator call whose result is cast to array type.
    Dynamic {
        allocator: String,
        element_count: u64,
    },
}

/// The memory-dependency oracle spec §4.C's read-after-write rule queries:
/// "the nearest prior store" reaching a given load.
pub trait MemoryDependencyOracle {
    fn nearest_prior_store(&self, load: InstructionId) -> Option<InstructionId>;
}

/// Always answers `MayAlias` and reports no allocation sites — the safe
/// widening spec §4.C and §7 require on oracle failure, turned into the
/// default so the pipeline is runnable without a real points-to analysis
/// wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConservativeAliasOracle;

impl AliasOracle for ConservativeAliasOracle {
    fn may_alias(&self, a: Operand, b: Operand) -> AliasResult {
        if a == b {
            AliasResult::MustAlias
        } else {
            AliasResult::MayAlias
        }
    }

    fn allocation_sites_of(&self, _v: Operand) -> Vec<AllocationSite> {
        Vec::new()
    }
}

/// Always reports no prior store, i.e. every load looks fresh. Lets the
/// pipeline run end-to-end without a real reaching-definitions analysis
/// wired in; component C simply adds no `dataDep.raw` edge in that case.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConservativeMemoryDependencyOracle;

impl MemoryDependencyOracle for ConservativeMemoryDependencyOracle {
    fn nearest_prior_store(&self, _load: InstructionId) -> Option<InstructionId> {
        None
    }
}
