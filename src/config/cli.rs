//! Command-line surface (spec §6): `--module`, `--out-dir`, `--sd`, plus one
//! optional flag per boundary file.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "boundary-pdg", version, about = "Cross-domain PDG and IDL extraction")]
pub struct Cli {
    /// Path to the analyzed module (a JSON-serialized [`crate::ir::Module`]).
    #[arg(long)]
    pub module: PathBuf,

    /// Directory IDL and stat outputs are written into.
    #[arg(long = "out-dir")]
    pub out_dir: PathBuf,

    /// Enable shared-data optimization (default: off).
    #[arg(long)]
    pub sd: bool,

    /// Tree expansion depth bound.
    #[arg(long = "expand-level", default_value_t = crate::config::DEFAULT_EXPAND_LEVEL)]
    pub expand_level: u32,

    #[arg(long)]
    pub imported_func: Option<PathBuf>,
    #[arg(long)]
    pub defined_func: Option<PathBuf>,
    #[arg(long)]
    pub static_funcptr: Option<PathBuf>,
    #[arg(long)]
    pub static_func: Option<PathBuf>,
    #[arg(long)]
    pub lock_func: Option<PathBuf>,
    #[arg(long)]
    pub driver_globalvars: Option<PathBuf>,
    #[arg(long)]
    pub liblcd_funcs: Option<PathBuf>,
    #[arg(long)]
    pub whitelistfuncs: Option<PathBuf>,
}

impl Cli {
    pub fn boundary_paths(&self) -> super::boundary::BoundaryPaths {
        super::boundary::BoundaryPaths {
            imported_func: self.imported_func.clone(),
            defined_func: self.defined_func.clone(),
            static_funcptr: self.static_funcptr.clone(),
            static_func: self.static_func.clone(),
            lock_func: self.lock_func.clone(),
            driver_globalvars: self.driver_globalvars.clone(),
            liblcd_funcs: self.liblcd_funcs.clone(),
            whitelistfuncs: self.whitelistfuncs.clone(),
        }
    }
}
