//! Pattern scans over raw text that could not be tokenized reliably.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::decision::Decision;

pub const REASON_INTERPRETER_CODE: &str =
    "Detected potentially dangerous command in interpreter code.";

struct TextPattern {
    regex: Regex,
    rule: &'static str,
    reason: &'static str,
}

fn compile(table: &[(&str, &'static str, &'static str)]) -> Vec<TextPattern> {
    table
        .iter()
        .map(|&(pattern, rule, reason)| TextPattern {
            regex: Regex::new(pattern).expect("valid regex"),
            rule,
            reason,
        })
        .collect()
}

/// Destructive shell commands, matched anywhere in the text.
static SHELL_PATTERNS: Lazy<Vec<TextPattern>> = Lazy::new(|| {
    compile(&[
        (
            r"\brm\s+(-[a-zA-Z]*[rR][a-zA-Z]*f|-[a-zA-Z]*f[a-zA-Z]*[rR]|-[rR]\s+-f|-f\s+-[rR]|--recursive\s+--force|--force\s+--recursive)\b",
            "text.rm_rf",
            "rm -rf detected in a command that could not be fully parsed. Verify manually.",
        ),
        (
            r"\bgit\s+reset\s+--(hard|merge)\b",
            "text.git_reset",
            "git reset --hard detected in a command that could not be fully parsed. Verify manually.",
        ),
        (
            r"\bgit\s+clean\s+(-[a-zA-Z]*f|--force)",
            "text.git_clean",
            "git clean -f detected in a command that could not be fully parsed. Verify manually.",
        ),
        (
            r"\bgit\s+push\s+(.*\s)?(--force(\s|$)|-[a-zA-Z]*f\b)",
            "text.git_push_force",
            "git push --force detected in a command that could not be fully parsed. Verify manually.",
        ),
        (
            r"\bgit\s+(checkout\s+(.*\s)?--\s|stash\s+(drop|clear)\b|branch\s+(.*\s)?-D\b)",
            "text.git_discard",
            "Destructive git command detected in a command that could not be fully parsed. Verify manually.",
        ),
        (
            r"\bfind\b.*\s-delete\b",
            "text.find_delete",
            "find -delete detected in a command that could not be fully parsed. Verify manually.",
        ),
    ])
});

/// Recursive deletes through language runtimes.
static INTERPRETER_PATTERNS: Lazy<Vec<TextPattern>> = Lazy::new(|| {
    compile(&[
        (r"\bshutil\s*\.\s*rmtree\b", "interpreter.rmtree", REASON_INTERPRETER_CODE),
        (r"\bos\s*\.\s*removedirs\b", "interpreter.rmtree", REASON_INTERPRETER_CODE),
        (
            r"\.\s*(rm|rmSync|rmdir|rmdirSync)\s*\([^)]*recursive\s*:\s*true",
            "interpreter.fs_rm",
            REASON_INTERPRETER_CODE,
        ),
        (
            r"\bFileUtils\s*\.\s*(rm_rf|rm_r|remove_dir|remove_entry)\b",
            "interpreter.fileutils",
            REASON_INTERPRETER_CODE,
        ),
        (r"\b(rmtree|remove_tree)\s*\(", "interpreter.rmtree", REASON_INTERPRETER_CODE),
        (r"\brimraf\b", "interpreter.rimraf", REASON_INTERPRETER_CODE),
        (
            r"\brm\s+-[a-zA-Z]*([rR][a-zA-Z]*f|f[a-zA-Z]*[rR])\b",
            "interpreter.rm_rf",
            REASON_INTERPRETER_CODE,
        ),
        (r"\bgit\s+reset\s+--hard\b", "interpreter.git_reset", REASON_INTERPRETER_CODE),
    ])
});

fn scan(patterns: &[TextPattern], text: &str) -> Decision {
    patterns
        .iter()
        .find(|p| p.regex.is_match(text))
        .map(|p| Decision::block(p.rule, p.reason))
        .unwrap_or_else(Decision::allow)
}

/// Scan shell text whose quoting was left open.
pub fn scan_shell_text(text: &str) -> Decision {
    scan(&SHELL_PATTERNS, text)
}

/// Scan an interpreter one-liner (`python -c`, `node -e`, ...).
pub fn scan_interpreter_code(code: &str) -> Decision {
    scan(&INTERPRETER_PATTERNS, code)
}
