//! Boundary-file loading and the CLI surface (spec §6). Deliberately much
//! smaller than a general-purpose pipeline config: this crate has one
//! pipeline, one set of inputs, and one output shape, so there is no preset
//! tier to build.

mod boundary;
mod cli;

pub use boundary::{BoundaryPaths, BoundarySets};
pub use cli::Cli;

use crate::errors::Result;
use std::path::PathBuf;

/// Tree expansion depth bound (spec §3, §4.F). Matches the original
/// analysis's default.
pub const DEFAULT_EXPAND_LEVEL: u32 = 7;

/// Everything a pipeline run needs besides the module itself.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub module_path: PathBuf,
    pub out_dir: PathBuf,
    pub shared_data_opt: bool,
    pub expand_level: u32,
    pub boundaries: BoundarySets,
}

impl AnalysisConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(AnalysisConfig {
            module_path: cli.module.clone(),
            out_dir: cli.out_dir.clone(),
            shared_data_opt: cli.sd,
            expand_level: cli.expand_level,
            boundaries: BoundarySets::load(&cli.boundary_paths())?,
        })
    }
}
