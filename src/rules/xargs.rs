//! xargs command analysis.

use crate::analysis::SegmentAnalyzer;
use crate::analysis::kind::is_shell;
use crate::decision::Decision;
use crate::rules::rm::has_recursive_force;
use crate::shell::{normalize_command_token, strip_wrappers};

const REASON_XARGS_SHELL: &str =
    "xargs with shell -c can execute arbitrary commands from dynamic input.";
const REASON_XARGS_RM_RF: &str =
    "xargs rm -rf with dynamic input is dangerous. Use explicit file list instead.";

/// Options that consume the following token.
const VALUE_OPTIONS: &[&str] = &[
    "-I",
    "-L",
    "-n",
    "-P",
    "-s",
    "-a",
    "-E",
    "-d",
    "--delimiter",
    "--max-args",
    "--max-procs",
    "--max-lines",
    "--arg-file",
    "--eof",
    "--max-chars",
    "--process-slot-var",
];

/// The command xargs runs, plus its replacement string if `-I` was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XargsChild {
    pub command: Vec<String>,
    pub replacement: Option<String>,
}

/// Split an xargs invocation into its own options and the child command.
pub fn extract_xargs_child_command_with_info(tokens: &[String]) -> XargsChild {
    let mut replacement = None;
    let mut i = 1;

    while i < tokens.len() {
        let token = tokens[i].as_str();
        if token == "--" {
            i += 1;
            break;
        }
        if !token.starts_with('-') || token == "-" {
            break;
        }

        if token == "-I" {
            replacement = tokens.get(i + 1).cloned();
            i += 2;
            continue;
        }
        if let Some(value) = token.strip_prefix("-I") {
            replacement = Some(value.to_string());
        } else if token == "-i" || token == "--replace" {
            replacement = Some("{}".to_string());
        } else if let Some(value) = token
            .strip_prefix("--replace=")
            .or_else(|| token.strip_prefix("-i"))
        {
            replacement = Some(if value.is_empty() { "{}" } else { value }.to_string());
        } else if VALUE_OPTIONS.contains(&token) {
            i += 2;
            continue;
        }
        i += 1;
    }

    XargsChild {
        command: tokens.get(i..).map(<[String]>::to_vec).unwrap_or_default(),
        replacement,
    }
}

/// The child command xargs runs.
pub fn extract_xargs_child_command(tokens: &[String]) -> Vec<String> {
    extract_xargs_child_command_with_info(tokens).command
}

/// Analyze the command xargs will run against its dynamic input.
pub fn analyze_xargs(tokens: &[String], analyzer: &SegmentAnalyzer<'_>) -> Decision {
    let child = strip_wrappers(&extract_xargs_child_command(tokens));
    let child = match child.first().map(|h| normalize_command_token(h)) {
        Some(head) if head == "busybox" => strip_wrappers(&child[1..]),
        Some(_) => child,
        None => return Decision::allow(),
    };
    let Some(head) = child.first().map(|h| normalize_command_token(h)) else {
        return Decision::allow();
    };

    if is_shell(&head) && child.iter().skip(1).any(|t| is_script_flag(t)) {
        return Decision::block("xargs.shell", REASON_XARGS_SHELL);
    }

    analyzer.analyze_child(&child).or_else(|| {
        if head == "rm" && has_recursive_force(&child) {
            Decision::block("xargs.rm_rf", REASON_XARGS_RM_RF)
        } else {
            Decision::allow()
        }
    })
}

fn is_script_flag(token: &str) -> bool {
    token.starts_with('-') && !token.starts_with("--") && token.contains('c')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisContext;
    use crate::shell::tokenize;

    fn analyze(command: &str) -> Decision {
        let ctx = AnalysisContext::new("/home/user/project").with_home_dir("/home/user");
        let analyzer = SegmentAnalyzer::new(&ctx);
        analyze_xargs(&tokenize(command), &analyzer)
    }

    #[test]
    fn test_xargs_rm_rf() {
        assert_eq!(analyze("xargs rm -rf").reason(), Some(REASON_XARGS_RM_RF));
        assert_eq!(analyze("xargs -0 rm -fr").reason(), Some(REASON_XARGS_RM_RF));
        assert!(analyze("xargs -I {} rm -rf {}").is_blocked());
        assert!(analyze("xargs -n 1 sudo rm -rf").is_blocked());
        assert!(analyze("xargs busybox rm -rf").is_blocked());
    }

    #[test]
    fn test_xargs_rm_without_force_allowed() {
        assert!(!analyze("xargs rm -f").is_blocked());
        assert!(!analyze("xargs rm").is_blocked());
    }

    #[test]
    fn test_xargs_shell() {
        assert_eq!(
            analyze("xargs sh -c 'echo $1'").reason(),
            Some(REASON_XARGS_SHELL)
        );
        assert!(analyze("xargs -I{} bash -lc 'cat {}'").is_blocked());
        assert!(!analyze("xargs bash script.sh").is_blocked());
    }

    #[test]
    fn test_xargs_nested_detectors() {
        let decision = analyze("xargs git reset --hard");
        assert_eq!(decision.block_info().unwrap().rule, "git.reset.hard");
        assert!(analyze("xargs find . -delete").is_blocked());
        assert!(!analyze("xargs git status").is_blocked());
    }

    #[test]
    fn test_xargs_safe_children() {
        assert!(!analyze("xargs cat").is_blocked());
        assert!(!analyze("xargs -I {} echo {}").is_blocked());
        assert!(!analyze("xargs").is_blocked());
    }

    #[test]
    fn test_value_options_skipped() {
        let child = extract_xargs_child_command_with_info(&tokenize("xargs -P 4 -n 2 -- ls -la"));
        assert_eq!(child.command, vec!["ls", "-la"]);
        assert_eq!(child.replacement, None);

        let child = extract_xargs_child_command_with_info(&tokenize("xargs -I % mv % dest"));
        assert_eq!(child.command, vec!["mv", "%", "dest"]);
        assert_eq!(child.replacement.as_deref(), Some("%"));

        let child = extract_xargs_child_command_with_info(&tokenize("xargs -i echo {}"));
        assert_eq!(child.replacement.as_deref(), Some("{}"));
    }

    #[test]
    fn test_nested_xargs() {
        assert!(analyze("xargs xargs rm -rf").is_blocked());
    }
}
