//! Re-scan of allowed segments for destructive commands hidden as arguments
//! of programs the dispatcher does not model (`tool rm -rf /`).

use super::context::{AnalysisContext, CwdState};
use super::segment::SegmentAnalyzer;
use crate::decision::Decision;
use crate::rules::{analyze_find, analyze_git, analyze_rm, scan_shell_text};
use crate::shell::{
    CommandSegment, WrapperStripping, normalize_command_token, strip_wrappers_with_info,
};

/// GNU parallel argument separators end an embedded command.
fn is_parallel_separator(token: &str) -> bool {
    matches!(token, ":::" | "::::" | ":::+" | "::::+")
}

/// Scan segments that already passed structured analysis, each with the cwd
/// it was analyzed under. Returns the first blocking segment.
pub(crate) fn scan_fallback<'s>(
    segments: &[(&'s CommandSegment, CwdState)],
    ctx: &AnalysisContext,
    depth: usize,
) -> Option<(&'s CommandSegment, Decision)> {
    segments.iter().find_map(|(segment, cwd)| {
        let analyzer = SegmentAnalyzer::with_cwd(ctx, depth, cwd.clone());
        let decision = scan_segment(segment, &analyzer);
        decision.is_blocked().then_some((*segment, decision))
    })
}

fn scan_segment(segment: &CommandSegment, analyzer: &SegmentAnalyzer<'_>) -> Decision {
    let WrapperStripping {
        tokens,
        env_assignments,
    } = strip_wrappers_with_info(&segment.tokens);

    let structural = (0..tokens.len())
        .map(|start| {
            let end = tokens[start..]
                .iter()
                .position(|t| is_parallel_separator(t))
                .map_or(tokens.len(), |offset| start + offset);
            let embedded = &tokens[start..end];

            match normalize_command_token(&tokens[start]).as_str() {
                "rm" => analyze_rm(embedded, &analyzer.rm_options(&env_assignments)),
                "git" => analyze_git(embedded),
                "find" => analyze_find(embedded),
                _ => Decision::allow(),
            }
        })
        .find(Decision::is_blocked)
        .unwrap_or_else(Decision::allow);

    if segment.unterminated {
        structural.or_else(|| scan_shell_text(&segment.command))
    } else {
        structural
    }
}
