//! Top-level command analysis.

use serde::Serialize;
use tracing::debug;

use super::context::{AnalysisContext, CwdState, MAX_RECURSION_DEPTH};
use super::fallback::scan_fallback;
use super::segment::{REASON_RECURSION_LIMIT, SegmentAnalyzer};
use crate::decision::Decision;
use crate::shell::{CommandSegment, split_commands};

const REASON_STRICT_UNPARSEABLE: &str =
    "Command could not be safely analyzed (strict mode). Verify manually.";

/// A denied command: which rule fired, why, and on which segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub rule: String,
    pub reason: String,
    pub segment: String,
}

impl AnalysisResult {
    fn from_decision(decision: Decision, segment: &str) -> Option<Self> {
        let Decision::Block(info) = decision else {
            return None;
        };
        Some(Self {
            rule: info.rule,
            reason: info.reason,
            segment: segment.to_string(),
        })
    }
}

/// Analyze a full command line. Returns `None` when it may run.
pub fn analyze_command(command: &str, ctx: &AnalysisContext) -> Option<AnalysisResult> {
    analyze_at_depth(command, ctx, 0, CwdState::from_context(ctx))
}

pub(crate) fn analyze_at_depth(
    command: &str,
    ctx: &AnalysisContext,
    depth: usize,
    cwd: CwdState,
) -> Option<AnalysisResult> {
    if depth >= MAX_RECURSION_DEPTH {
        return AnalysisResult::from_decision(
            Decision::block("recursion_limit", REASON_RECURSION_LIMIT),
            command,
        );
    }

    let segments = split_commands(command);

    if ctx.strict && !is_parseable(&segments) {
        debug!(command, "strict mode: command not parseable");
        return AnalysisResult::from_decision(
            Decision::block("strict.unparseable", REASON_STRICT_UNPARSEABLE),
            command,
        );
    }

    let mut analyzer = SegmentAnalyzer::with_cwd(ctx, depth, cwd);
    let mut visited = Vec::with_capacity(segments.len());

    for segment in &segments {
        analyzer.enter_scopes(&segment.scopes);
        let cwd_before = analyzer.cwd().clone();
        let decision = analyzer.analyze_segment(segment);
        if let Some(result) = AnalysisResult::from_decision(decision, &segment.command) {
            debug!(rule = %result.rule, segment = %result.segment, depth, "segment blocked");
            return Some(result);
        }
        visited.push((segment, cwd_before));
    }

    let (segment, decision) = scan_fallback(&visited, ctx, depth)?;
    let result = AnalysisResult::from_decision(decision, &segment.command)?;
    debug!(rule = %result.rule, segment = %result.segment, depth, "fallback blocked");
    Some(result)
}

fn is_parseable(segments: &[CommandSegment]) -> bool {
    !segments.iter().any(|s| s.unterminated)
        && segments
            .iter()
            .any(|s| s.head().is_some_and(|head| !head.is_empty()))
}
