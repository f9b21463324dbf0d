//! Component F: field-sensitive parameter/object trees (spec §4.F). Builds
//! the rooted, depth- and recursion-bounded trees for arguments, globals,
//! and return values as `Param` nodes in the shared [`crate::features::graph::Graph`],
//! binding tree nodes to the GEPs that select them via `valDep` edges.

mod builder;
mod gep_match;

pub use builder::{build_tree, clone_tree, BuiltTree, TreeScope};
pub use gep_match::bitfield_shift;
