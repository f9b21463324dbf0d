//! Shared models used across every feature slice.

mod span;
mod stats;

pub use span::Span;
pub use stats::AnalysisContext;
