//! Shared types used across every feature slice.

pub mod models;

pub use models::{AnalysisContext, Span};
