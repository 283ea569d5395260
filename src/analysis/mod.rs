//! Command analysis: orchestration, per-segment dispatch and fallback scan.

mod command;
mod context;
mod fallback;
pub mod kind;
mod segment;

pub use command::{AnalysisResult, analyze_command};
pub use context::{AnalysisContext, CwdState, MAX_RECURSION_DEPTH};
pub use kind::CommandKind;
pub use segment::SegmentAnalyzer;
