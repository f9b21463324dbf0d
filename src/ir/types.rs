//! Debug-type model and the interning arena that backs the "canonicalized
//! debug-type interner" spec §4.F's 1-limit recursion guard relies on.
//!
//! Mirrors the shape of an LLVM `DIType` hierarchy closely enough to drive
//! the debug-info adapter (component A) without depending on an actual
//! bitcode/DWARF parser, which spec §1 places out of scope. Struct/union
//! types are *nominal*: two lookups of the same name return the same
//! [`DebugTypeId`], which is what makes a self-referential struct
//! representable (and is what the sentinel-array classification in §4.A
//! depends on). All other type shapes (pointers, arrays, typedefs,
//! qualifiers, scalars, function types) are *structurally* interned: the
//! arena deduplicates by content.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Stable index into a [`TypeArena`]. Two debug types compare equal iff they
/// have the same ID — the arena guarantees that, never the derived
/// `PartialEq` on the underlying structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DebugTypeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebugTypeKind {
    Void,
    /// A base scalar, e.g. `int`, `unsigned long long`, `char`.
    Scalar {
        name: String,
        width_bits: u32,
        signed: bool,
    },
    Pointer(DebugTypeId),
    Typedef {
        name: String,
        inner: DebugTypeId,
    },
    Const(DebugTypeId),
    Volatile(DebugTypeId),
    /// A `DW_TAG_member`-like wrapper: one field's declared name, byte
    /// offset within its parent, and the field's own type. Struct/union
    /// members are always stored as `Member` nodes so `strip` can peel them
    /// the same way it peels `typedef`/`const`/`volatile` (spec §4.A).
    Member {
        name: String,
        offset_bytes: u64,
        inner: DebugTypeId,
    },
    Struct {
        name: String,
        /// `Member` ids, in debug-info declaration order (spec §4.J).
        members: Vec<DebugTypeId>,
    },
    Union {
        name: String,
        members: Vec<DebugTypeId>,
    },
    Array {
        element: DebugTypeId,
        length: Option<u64>,
    },
    /// A function *type*, not a function pointer; `Pointer(FuncPtr)` is how
    /// a callback field is represented.
    FuncPtr {
        params: Vec<DebugTypeId>,
        ret: DebugTypeId,
    },
    Enum {
        name: String,
        underlying: DebugTypeId,
    },
}

/// One classification bucket per spec §4.A `classify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeClass {
    VoidPtr,
    FuncPtr,
    Struct,
    StructPtr,
    Union,
    UnionPtr,
    Array,
    SentinelArray,
    Scalar,
    Enum,
    Other,
}

/// Arena owning every [`DebugTypeKind`] seen during one run.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TypeArena {
    kinds: Vec<DebugTypeKind>,
    structural_index: FxHashMap<DebugTypeKind, DebugTypeId>,
    named_composites: FxHashMap<String, DebugTypeId>,
    void_id: Option<DebugTypeId>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: DebugTypeId) -> &DebugTypeKind {
        &self.kinds[id.0 as usize]
    }

    /// The canonical `void` type. Null/unresolvable debug types fall back to
    /// this (spec §4.A: "Failures are non-fatal: null inputs yield `void`").
    pub fn void(&mut self) -> DebugTypeId {
        if let Some(id) = self.void_id {
            return id;
        }
        let id = self.push_raw(DebugTypeKind::Void);
        self.void_id = Some(id);
        id
    }

    /// Structurally intern a non-composite type, deduplicating by content.
    pub fn intern(&mut self, kind: DebugTypeKind) -> DebugTypeId {
        if let Some(&id) = self.structural_index.get(&kind) {
            return id;
        }
        let id = self.push_raw(kind.clone());
        self.structural_index.insert(kind, id);
        id
    }

    /// Look up or reserve a nominal struct by name. Returns the same ID on
    /// every call for a given name, so a self-referential struct can be
    /// declared by reserving the ID, building member types that point back
    /// at it, then finalizing with [`TypeArena::finalize_composite`].
    pub fn reserve_struct(&mut self, name: &str) -> DebugTypeId {
        self.reserve_composite(name, false)
    }

    pub fn reserve_union(&mut self, name: &str) -> DebugTypeId {
        self.reserve_composite(name, true)
    }

    fn reserve_composite(&mut self, name: &str, is_union: bool) -> DebugTypeId {
        if let Some(&id) = self.named_composites.get(name) {
            return id;
        }
        let placeholder = if is_union {
            DebugTypeKind::Union {
                name: name.to_string(),
                members: Vec::new(),
            }
        } else {
            DebugTypeKind::Struct {
                name: name.to_string(),
                members: Vec::new(),
            }
        };
        let id = self.push_raw(placeholder);
        self.named_composites.insert(name.to_string(), id);
        id
    }

    pub fn finalize_composite(&mut self, id: DebugTypeId, members: Vec<DebugTypeId>) {
        match &mut self.kinds[id.0 as usize] {
            DebugTypeKind::Struct { members: m, .. } | DebugTypeKind::Union { members: m, .. } => {
                *m = members;
            }
            other => invariant_violation(format_args!(
                "finalize_composite called on non-composite {other:?}"
            )),
        }
    }

    fn push_raw(&mut self, kind: DebugTypeKind) -> DebugTypeId {
        let id = DebugTypeId(self.kinds.len() as u32);
        self.kinds.push(kind);
        id
    }
}

use crate::errors::invariant_violation;
