//! Analysis components, lettered A-J per the component table: each module
//! is one component, in roughly dependency order (leaves first).

pub mod access_annotation;
pub mod access_lattice;
pub mod atomic_region;
pub mod call_graph;
pub mod control_dep;
pub mod data_dep;
pub mod debug_info;
pub mod graph;
pub mod idl_emitter;
pub mod param_tree;
pub mod shared_data;
