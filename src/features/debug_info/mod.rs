//! Component A: the debug-info adapter. Everything downstream (the param
//! tree, shared-data classification, annotation inference) asks this module
//! "what kind of type is this, really" instead of matching on
//! [`DebugTypeKind`] directly.

mod adapter;

pub use adapter::{
    base, classify, field_id, field_name, is_sentinel_struct, lowest, printable_name, strip,
};
