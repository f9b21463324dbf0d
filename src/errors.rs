//! Crate-wide error type.
//!
//! Spec §7 groups failures into five kinds. Four are recoverable and modelled
//! as `BoundaryPdgError` variants; the fifth — an internal invariant
//! violation, such as mutating a sealed PDG — is not representable as a
//! `Result` because the spec requires it to "crash early with identifying
//! context" (§7, §4's PDG-construction lifecycle). [`invariant_violation`]
//! is the single place that happens.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoundaryPdgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// A required boundary file (spec §6) was missing and the caller needs
    /// the domain split to proceed.
    #[error("required boundary file missing: {path}")]
    BoundaryFileMissing { path: PathBuf },

    /// Structural mismatch between the IR and its debug-info companion
    /// (spec §7: "number of struct elements in IR != debug info").
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("analysis error: {0}")]
    Analysis(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),
}

impl BoundaryPdgError {
    pub fn config(msg: impl Into<String>) -> Self {
        BoundaryPdgError::Config(msg.into())
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        BoundaryPdgError::Analysis(msg.into())
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        BoundaryPdgError::Pipeline(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BoundaryPdgError>;

/// Panic with identifying context for an internal invariant violation
/// (spec §7: "fatal; crash early with identifying context").
///
/// Used only for programmer errors that the type system cannot prevent,
/// e.g. adding an edge to a sealed [`crate::features::graph::Graph`].
#[track_caller]
pub fn invariant_violation(context: impl std::fmt::Display) -> ! {
    panic!("internal invariant violation: {context}");
}
