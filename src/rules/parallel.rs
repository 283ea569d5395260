//! GNU parallel command analysis.

use crate::analysis::SegmentAnalyzer;
use crate::analysis::kind::{ShellScript, find_shell_script, is_shell};
use crate::decision::Decision;
use crate::rules::rm::has_recursive_force;
use crate::shell::{normalize_command_token, split_commands, strip_wrappers};

const REASON_PARALLEL_SHELL: &str =
    "parallel with shell -c can execute arbitrary commands from dynamic input.";
const REASON_PARALLEL_RM_RF: &str =
    "parallel rm -rf with dynamic input is dangerous. Use explicit file list instead.";

const DEFAULT_PLACEHOLDER: &str = "{}";

/// Options that consume the following token.
const VALUE_OPTIONS: &[&str] = &[
    "-j",
    "--jobs",
    "-P",
    "--max-procs",
    "-S",
    "--sshlogin",
    "--sshloginfile",
    "-a",
    "--arg-file",
    "-d",
    "--delimiter",
    "-I",
    "-C",
    "--colsep",
    "--results",
    "--joblog",
    "--tmpdir",
    "--workdir",
    "--wd",
    "--timeout",
    "-n",
    "--max-args",
    "-N",
    "--max-replace-args",
    "-L",
    "--max-lines",
    "-E",
    "--eof",
    "-s",
    "--max-chars",
    "--retries",
    "--delay",
    "--tagstring",
    "--env",
    "--basefile",
    "--transferfile",
    "--return",
    "--load",
    "--memfree",
    "--nice",
    "--halt",
    "--termseq",
];

fn is_separator(token: &str) -> bool {
    matches!(token, ":::" | "::::" | ":::+" | "::::+")
}

/// A parallel invocation split into its command template and inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelCommand {
    pub template: Vec<String>,
    /// Literal arguments given after `:::`.
    pub args: Vec<String>,
    /// Inputs come from stdin or files, so they are unknown here.
    pub dynamic_input: bool,
    /// Inputs were named explicitly with `-a` or `::::`.
    pub file_input: bool,
    pub replacement: String,
}

impl ParallelCommand {
    fn has_placeholder(&self, token: &str) -> bool {
        token.contains(self.replacement.as_str())
    }

    /// The template with one input substituted, or appended when no
    /// placeholder is present.
    fn expand(&self, arg: &str) -> Vec<String> {
        let mut substituted = false;
        let mut expanded: Vec<String> = self
            .template
            .iter()
            .map(|token| {
                if self.has_placeholder(token) {
                    substituted = true;
                    token.replace(self.replacement.as_str(), arg)
                } else {
                    token.clone()
                }
            })
            .collect();
        if !substituted {
            expanded.push(arg.to_string());
        }
        expanded
    }
}

pub fn parse_parallel_command(tokens: &[String]) -> ParallelCommand {
    let mut replacement = DEFAULT_PLACEHOLDER.to_string();
    let mut dynamic_input = false;
    let mut file_input = false;
    let mut i = 1;

    while i < tokens.len() {
        let token = tokens[i].as_str();
        if token == "--" {
            i += 1;
            break;
        }
        if !token.starts_with('-') || is_separator(token) {
            break;
        }
        if token == "-a" || token == "--arg-file" || token.starts_with("--arg-file=") {
            file_input = true;
        }
        if token == "-I" {
            if let Some(value) = tokens.get(i + 1) {
                replacement = value.clone();
            }
        } else if let Some(value) = token.strip_prefix("-I").filter(|v| !v.is_empty()) {
            replacement = value.to_string();
        }
        i += if VALUE_OPTIONS.contains(&token) { 2 } else { 1 };
    }

    let rest = tokens.get(i..).unwrap_or_default();
    let split = rest.iter().position(|t| is_separator(t)).unwrap_or(rest.len());
    let template = rest[..split].to_vec();

    let mut args = Vec::new();
    let mut saw_separator = false;
    let mut from_files = false;
    for token in &rest[split..] {
        if is_separator(token) {
            saw_separator = true;
            from_files = token.starts_with("::::");
            continue;
        }
        if from_files {
            file_input = true;
        } else {
            args.push(token.clone());
        }
    }
    if file_input || !saw_separator {
        dynamic_input = true;
    }

    ParallelCommand {
        template,
        args,
        dynamic_input,
        file_input,
        replacement,
    }
}

/// The command template parallel runs for each input.
pub fn extract_parallel_child_command(tokens: &[String]) -> Vec<String> {
    parse_parallel_command(tokens).template
}

/// Analyze the commands parallel will run.
pub fn analyze_parallel(tokens: &[String], analyzer: &SegmentAnalyzer<'_>) -> Decision {
    let parsed = parse_parallel_command(tokens);
    let template = strip_wrappers(&parsed.template);
    let parsed = ParallelCommand { template, ..parsed };

    let Some(head) = parsed.template.first().map(|h| normalize_command_token(h)) else {
        // Each argument is itself a command line.
        return parsed
            .args
            .iter()
            .map(|arg| analyzer.analyze_script(arg))
            .find(Decision::is_blocked)
            .unwrap_or_else(Decision::allow);
    };

    if is_shell(&head) {
        return analyze_shell_template(&parsed, analyzer);
    }

    if head == "rm" && has_recursive_force(&parsed.template) {
        if parsed.dynamic_input || parsed.args.is_empty() {
            return Decision::block("parallel.rm_rf", REASON_PARALLEL_RM_RF);
        }
        return analyze_expansions(&parsed, analyzer);
    }

    if parsed.args.is_empty() {
        analyzer.analyze_child(&parsed.template)
    } else {
        analyze_expansions(&parsed, analyzer)
    }
}

fn analyze_expansions(parsed: &ParallelCommand, analyzer: &SegmentAnalyzer<'_>) -> Decision {
    parsed
        .args
        .iter()
        .map(|arg| analyzer.analyze_child(&parsed.expand(arg)))
        .find(Decision::is_blocked)
        .unwrap_or_else(Decision::allow)
}

fn analyze_shell_template(parsed: &ParallelCommand, analyzer: &SegmentAnalyzer<'_>) -> Decision {
    let shell_block = || Decision::block("parallel.shell", REASON_PARALLEL_SHELL);

    let script_index = match find_shell_script(&parsed.template) {
        ShellScript::At(i) => i,
        ShellScript::NoFlag | ShellScript::Missing => {
            let has_input = parsed.file_input || !parsed.args.is_empty();
            let has_placeholder = parsed.template.iter().any(|t| parsed.has_placeholder(t));
            return if has_input || has_placeholder {
                shell_block()
            } else {
                Decision::allow()
            };
        }
    };

    let outside_placeholder = parsed
        .template
        .iter()
        .enumerate()
        .any(|(i, t)| i != script_index && parsed.has_placeholder(t));
    if outside_placeholder || parsed.template.len() > script_index + 1 {
        return shell_block();
    }

    let script = &parsed.template[script_index];
    if !parsed.has_placeholder(script) || parsed.args.is_empty() {
        return analyzer.analyze_script(script).or_else(|| {
            if parsed.dynamic_input && removes_placeholder(script, &parsed.replacement) {
                Decision::block("parallel.rm_rf", REASON_PARALLEL_RM_RF)
            } else {
                Decision::allow()
            }
        });
    }

    parsed
        .args
        .iter()
        .map(|arg| analyzer.analyze_script(&script.replace(parsed.replacement.as_str(), arg)))
        .find(Decision::is_blocked)
        .unwrap_or_else(Decision::allow)
}

/// Whether the script runs `rm -rf` on the input placeholder.
fn removes_placeholder(script: &str, placeholder: &str) -> bool {
    split_commands(script).iter().any(|segment| {
        let tokens = strip_wrappers(&segment.tokens);
        tokens
            .first()
            .is_some_and(|head| normalize_command_token(head) == "rm")
            && has_recursive_force(&tokens)
            && tokens.iter().skip(1).any(|t| t.contains(placeholder))
    })
}
