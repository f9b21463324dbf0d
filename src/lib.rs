/*
 * boundary-pdg - cross-domain PDG and IDL extraction
 *
 * Feature-First Architecture:
 * - ir/        : the external IR surface (instructions, debug types, module)
 * - features/  : one module per lettered component (A debug-info adapter
 *                through J IDL emitter)
 * - pipeline/  : orchestration, wiring components A-J together
 * - shared/    : models used across every feature slice
 * - config/    : boundary-file loading and CLI configuration
 */

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod config;
pub mod errors;
pub mod features;
pub mod ir;
pub mod pipeline;
pub mod shared;

use std::sync::Once;

/// Initialize the Rayon thread pool at 75% of available cores. Called once
/// by the CLI entry point before [`pipeline::run`]; reserved for the
/// per-function analysis passes (spec §5: single-threaded within one
/// function's analysis) to run concurrently once the shared [`ir::Module`]
/// graph that those passes accumulate into supports it.
pub fn init_rayon() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let num_cpus = num_cpus::get();
        let threads = std::cmp::max(1, (num_cpus * 3) / 4);
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .expect("failed to init rayon thread pool");
        tracing::debug!(threads, num_cpus, "rayon pool initialized");
    });
}
