//! `signatureHash -> list<function>` index (spec §9 design note: "require an
//! indexed map... built once when the call-graph component initializes" to
//! keep indirect-candidate enumeration out of the quadratic functions ×
//! call-sites worst case).

use crate::features::debug_info::strip;
use crate::ir::instruction::FunctionId;
use crate::ir::types::DebugTypeId;
use crate::ir::Module;
use rustc_hash::FxHashMap;

type SignatureKey = (Vec<DebugTypeId>, DebugTypeId);

#[derive(Debug, Default)]
pub struct SignatureIndex {
    by_signature: FxHashMap<SignatureKey, Vec<FunctionId>>,
}

impl SignatureIndex {
    /// Indexes every function in `module` by its *stripped* parameter and
    /// return debug types (spec §4.E: "same number of parameters, same
    /// stripped parameter debug types, same return debug type").
    pub fn build(module: &Module) -> Self {
        let mut by_signature: FxHashMap<SignatureKey, Vec<FunctionId>> = FxHashMap::default();
        for function in &module.functions {
            let key = signature_key(module, &function.arguments, function.return_type);
            by_signature.entry(key).or_default().push(function.id);
        }
        SignatureIndex { by_signature }
    }

    /// Candidates for an indirect call whose debug signature is `params` ->
    /// `ret`. Both are stripped before lookup, matching the canonicalization
    /// the index was built with.
    pub fn candidates(
        &self,
        arena: &crate::ir::types::TypeArena,
        params: &[DebugTypeId],
        ret: DebugTypeId,
    ) -> Vec<FunctionId> {
        let key = (
            params.iter().map(|&p| strip(arena, p)).collect(),
            strip(arena, ret),
        );
        self.by_signature.get(&key).cloned().unwrap_or_default()
    }
}

fn signature_key(
    module: &Module,
    arguments: &[crate::ir::function::Argument],
    ret: DebugTypeId,
) -> SignatureKey {
    let params = arguments
        .iter()
        .map(|a| strip(&module.type_arena, a.debug_type))
        .collect();
    (params, strip(&module.type_arena, ret))
}
