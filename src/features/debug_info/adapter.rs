//! `strip`/`base`/`lowest`/`classify`/`fieldId`/`fieldName`/`printableName`
//! (spec §4.A), modelled directly on `DIUtils::stripAttributes`,
//! `getBaseDIType`, `getLowestDIType`, `computeFieldID` and the
//! `isStructPointerTy`/`isFuncPointerTy`/`isUnionPointerTy`/`isVoidPointer`
//! family from the original debug-info adapter. Every helper here takes an
//! explicit `&TypeArena` instead of walking a `DIType*`, since the arena is
//! this crate's stand-in for LLVM debug metadata (spec §1 Non-goals: no
//! bitcode/DWARF parser).

use crate::ir::types::{DebugTypeId, DebugTypeKind, TypeArena, TypeClass};
use std::collections::HashSet;

/// Peels `typedef`/`const`/`volatile` wrappers, repeatedly, stopping at the
/// first layer that is none of those. Null inputs have already become
/// `void` by construction (the arena has no null type), so this never
/// fails.
pub fn strip(arena: &TypeArena, mut id: DebugTypeId) -> DebugTypeId {
    loop {
        match arena.get(id) {
            DebugTypeKind::Typedef { inner, .. }
            | DebugTypeKind::Const(inner)
            | DebugTypeKind::Volatile(inner) => id = *inner,
            _ => return id,
        }
    }
}

/// One step towards the pointee/underlying type: pointers, members,
/// typedefs, consts and volatiles each unwrap by exactly one layer;
/// anything else is returned unchanged.
pub fn base(arena: &TypeArena, id: DebugTypeId) -> DebugTypeId {
    match arena.get(id) {
        DebugTypeKind::Pointer(inner)
        | DebugTypeKind::Member { inner, .. }
        | DebugTypeKind::Typedef { inner, .. }
        | DebugTypeKind::Const(inner)
        | DebugTypeKind::Volatile(inner) => *inner,
        _ => id,
    }
}

/// Repeatedly applies [`base`] through pointer/member/typedef/const layers
/// (volatile is deliberately excluded, matching `getLowestDIType`) until a
/// struct, union, array, enum, scalar, function type or void is reached.
pub fn lowest(arena: &TypeArena, mut id: DebugTypeId) -> DebugTypeId {
    loop {
        match arena.get(id) {
            DebugTypeKind::Pointer(inner)
            | DebugTypeKind::Member { inner, .. }
            | DebugTypeKind::Typedef { inner, .. }
            | DebugTypeKind::Const(inner) => id = *inner,
            _ => return id,
        }
    }
}

/// A struct is a sentinel (null-terminated-sequence) type when its
/// transitive member graph reaches itself again, e.g. `struct node { struct
/// node *next; }`. Traversal is cycle-safe: once a type id has been visited
/// it is never expanded a second time, so this terminates on any acyclic-
/// except-for-the-target graph.
pub fn is_sentinel_struct(arena: &TypeArena, struct_id: DebugTypeId) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![struct_id];
    let mut first = true;
    while let Some(cur) = stack.pop() {
        if !first && cur == struct_id {
            return true;
        }
        first = false;
        if !visited.insert(cur) {
            continue;
        }
        match arena.get(cur) {
            DebugTypeKind::Struct { members, .. } | DebugTypeKind::Union { members, .. } => {
                for &m in members {
                    if let DebugTypeKind::Member { inner, .. } = arena.get(m) {
                        stack.push(*inner);
                    }
                }
            }
            DebugTypeKind::Pointer(p) => stack.push(*p),
            DebugTypeKind::Typedef { inner, .. }
            | DebugTypeKind::Const(inner)
            | DebugTypeKind::Volatile(inner) => stack.push(*inner),
            DebugTypeKind::Array { element, .. } => stack.push(*element),
            _ => {}
        }
    }
    false
}

/// `classify(t)` of spec §4.A. Pointer classification order follows the
/// original adapter: struct pointer, then function pointer, then union
/// pointer, then void pointer, else `other`.
pub fn classify(arena: &TypeArena, id: DebugTypeId) -> TypeClass {
    let stripped = strip(arena, id);
    match arena.get(stripped) {
        DebugTypeKind::Pointer(inner) => {
            let low = lowest(arena, *inner);
            match arena.get(low) {
                DebugTypeKind::Struct { .. } => {
                    if is_sentinel_struct(arena, low) {
                        TypeClass::SentinelArray
                    } else {
                        TypeClass::StructPtr
                    }
                }
                DebugTypeKind::FuncPtr { .. } => TypeClass::FuncPtr,
                DebugTypeKind::Union { .. } => TypeClass::UnionPtr,
                DebugTypeKind::Void => TypeClass::VoidPtr,
                _ => TypeClass::Other,
            }
        }
        DebugTypeKind::Struct { .. } => TypeClass::Struct,
        DebugTypeKind::Union { .. } => TypeClass::Union,
        DebugTypeKind::Array { .. } => TypeClass::Array,
        DebugTypeKind::Enum { .. } => TypeClass::Enum,
        DebugTypeKind::Scalar { .. } => TypeClass::Scalar,
        DebugTypeKind::FuncPtr { .. } => TypeClass::FuncPtr,
        _ => TypeClass::Other,
    }
}

/// A field's own declared name, `""` for anonymous fields and for anything
/// that isn't a `Member` (mirrors `getDIFieldName`'s fallback branches).
pub fn field_name(arena: &TypeArena, id: DebugTypeId) -> String {
    match arena.get(id) {
        DebugTypeKind::Member { name, .. } => name.clone(),
        _ => String::new(),
    }
}

/// Normalizes a C scalar name to its fixed-width IDL spelling (spec §4.A:
/// "integer widths normalized (`int→u32`, `long long→u64`, etc.)"). Falls
/// back to `u{width_bits}` for anything not in the common-name table, and to
/// the raw name for non-integer scalars (`float`, `double`, `bool`, ...).
fn normalize_scalar_name(name: &str, width_bits: u32, signed: bool) -> String {
    let _ = signed; // the original normalizes every integer width to unsigned.
    match name {
        "char" | "signed char" | "unsigned char" => "u8".to_string(),
        "short" | "short int" | "unsigned short" => "u16".to_string(),
        "int" | "unsigned int" | "unsigned" => "u32".to_string(),
        "long" | "long int" | "unsigned long" => "u64".to_string(),
        "long long" | "long long int" | "unsigned long long" => "u64".to_string(),
        "float" => "f32".to_string(),
        "double" => "f64".to_string(),
        "bool" | "_Bool" => "bool".to_string(),
        "void" => "void".to_string(),
        _ if width_bits > 0 => format!("u{width_bits}"),
        _ => name.to_string(),
    }
}

/// The display name used in diagnostics and IDL emission (spec §4.J). Not
/// the same string as `fieldId` — this one is meant for humans, not as a
/// cross-translation-unit join key.
pub fn printable_name(arena: &TypeArena, id: DebugTypeId) -> String {
    match arena.get(id) {
        DebugTypeKind::Void => "void".to_string(),
        DebugTypeKind::Scalar { name, width_bits, signed } => normalize_scalar_name(name, *width_bits, *signed),
        DebugTypeKind::Pointer(inner) => format!("{}*", printable_name(arena, *inner)),
        DebugTypeKind::Typedef { inner, .. } => printable_name(arena, *inner),
        DebugTypeKind::Const(inner) => format!("const {}", printable_name(arena, *inner)),
        DebugTypeKind::Volatile(inner) => format!("volatile {}", printable_name(arena, *inner)),
        DebugTypeKind::Member { inner, .. } => printable_name(arena, *inner),
        DebugTypeKind::Struct { name, .. } if !name.is_empty() => format!("struct {name}"),
        DebugTypeKind::Struct { .. } => "struct".to_string(),
        DebugTypeKind::Union { .. } => "union".to_string(),
        DebugTypeKind::Array { element, length } => match length {
            Some(n) => format!("array<{}, {}>", printable_name(arena, *element), n),
            None => format!("array<{}, var_len>", printable_name(arena, *element)),
        },
        DebugTypeKind::FuncPtr { ret, .. } => format!("fn(...)->{}", printable_name(arena, *ret)),
        DebugTypeKind::Enum { name, .. } if !name.is_empty() => format!("enum {name}"),
        DebugTypeKind::Enum { .. } => "enum".to_string(),
    }
}

/// `structTypeName(parent) + fieldName(field)`, both computed from stripped
/// types — the cross-translation-unit join key spec §4.G's shared-data map
/// uses. Grounded directly on `computeFieldID`: the parent and the field are
/// both stripped independently, then concatenated with no separator.
pub fn field_id(arena: &TypeArena, parent: DebugTypeId, field: DebugTypeId) -> String {
    let parent_name = printable_name(arena, strip(arena, parent));
    let child_name = field_name(arena, strip(arena, field));
    format!("{parent_name}{child_name}")
}
