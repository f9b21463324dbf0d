//! Loads the eight boundary files of spec §6: one symbol (or field name) per
//! line, comments and blank lines skipped. A missing file is never fatal by
//! itself — spec §7: "Input missing: warn and proceed with empty set when
//! semantically safe."

use crate::errors::Result;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

fn load_lines(path: &Path) -> Result<HashSet<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "boundary file missing, proceeding with empty set");
            Ok(HashSet::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// `Some(path)` loads and returns the set; `None` is the same as "not
/// configured" and yields an empty set without touching the filesystem.
fn load_optional(path: Option<&Path>) -> Result<HashSet<String>> {
    match path {
        Some(p) => load_lines(p),
        None => Ok(HashSet::new()),
    }
}

/// The eight boundary-file-derived sets of spec §6, parsed once at startup.
#[derive(Debug, Clone, Default)]
pub struct BoundarySets {
    /// `imported_func.txt`: declared but not defined; kernel-to-driver
    /// interface candidates.
    pub imported_func: HashSet<String>,
    /// `defined_func.txt`: driver-domain functions.
    pub defined_func: HashSet<String>,
    /// `static_funcptr.txt`: driver-exported callback field names.
    pub static_funcptr: HashSet<String>,
    /// `static_func.txt`: bodies registered through the above pointers.
    pub static_func: HashSet<String>,
    /// `lock_func.txt`: extra lock-entry symbols.
    pub lock_func: HashSet<String>,
    /// `driver_globalvars.txt`: globals to treat as driver-owned.
    pub driver_globalvars: HashSet<String>,
    /// `liblcd_funcs.txt`: blacklist, excluded from cross-domain analysis.
    pub liblcd_funcs: HashSet<String>,
    /// `whitelistfuncs.txt`: whitelist for seq-pointer analysis.
    pub whitelistfuncs: HashSet<String>,
}

/// Paths to the eight boundary files. Every field is optional — an absent
/// path is treated the same as a missing file.
#[derive(Debug, Clone, Default)]
pub struct BoundaryPaths {
    pub imported_func: Option<std::path::PathBuf>,
    pub defined_func: Option<std::path::PathBuf>,
    pub static_funcptr: Option<std::path::PathBuf>,
    pub static_func: Option<std::path::PathBuf>,
    pub lock_func: Option<std::path::PathBuf>,
    pub driver_globalvars: Option<std::path::PathBuf>,
    pub liblcd_funcs: Option<std::path::PathBuf>,
    pub whitelistfuncs: Option<std::path::PathBuf>,
}

impl BoundarySets {
    pub fn load(paths: &BoundaryPaths) -> Result<Self> {
        Ok(BoundarySets {
            imported_func: load_optional(paths.imported_func.as_deref())?,
            defined_func: load_optional(paths.defined_func.as_deref())?,
            static_funcptr: load_optional(paths.static_funcptr.as_deref())?,
            static_func: load_optional(paths.static_func.as_deref())?,
            lock_func: load_optional(paths.lock_func.as_deref())?,
            driver_globalvars: load_optional(paths.driver_globalvars.as_deref())?,
            liblcd_funcs: load_optional(paths.liblcd_funcs.as_deref())?,
            whitelistfuncs: load_optional(paths.whitelistfuncs.as_deref())?,
        })
    }
}
