//! Strip env assignments and wrapper commands (sudo, env, timeout, etc.).

use std::collections::{HashMap, HashSet};

use super::tokenizer::tokenize;

/// Variables assigned in front of a command, name to verbatim value.
pub type EnvAssignments = HashMap<String, String>;

/// Commands that run another command given as their trailing arguments.
const WRAPPER_COMMANDS: &[&str] = &[
    "sudo", "doas", "env", "command", "builtin", "exec", "nohup", "nice", "ionice", "timeout",
    "time", "stdbuf", "strace", "ltrace", "watch",
];

/// Reserved words that can prefix a simple command.
const SHELL_KEYWORDS: &[&str] = &[
    "{", "}", "!", "if", "then", "else", "elif", "fi", "do", "done", "while", "until",
];

/// Maximum number of wrapper layers stripped from one command.
const MAX_STRIP_DEPTH: usize = 16;

/// Tokens left after stripping, plus every assignment seen on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapperStripping {
    pub tokens: Vec<String>,
    pub env_assignments: EnvAssignments,
}

/// Split `NAME=value` into its parts when `NAME` is a valid identifier.
pub fn parse_env_assignment(token: &str) -> Option<(&str, &str)> {
    let (name, value) = token.split_once('=')?;
    is_valid_var_name(name).then_some((name, value))
}

fn is_valid_var_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Remove leading `KEY=value` tokens.
pub fn strip_env_assignments(tokens: &[String]) -> (Vec<String>, EnvAssignments) {
    let mut env = EnvAssignments::new();
    let mut idx = 0;
    while let Some((name, value)) = tokens.get(idx).and_then(|t| parse_env_assignment(t)) {
        env.insert(name.to_string(), value.to_string());
        idx += 1;
    }
    (tokens[idx..].to_vec(), env)
}

/// Strip wrapper commands to get the actual command.
///
/// Examples:
/// - `sudo ls` -> `ls`
/// - `env FOO=bar ls` -> `ls`
/// - `timeout 5 nice -n 10 rm -rf x` -> `rm -rf x`
pub fn strip_wrappers(tokens: &[String]) -> Vec<String> {
    strip_wrappers_with_info(tokens).tokens
}

/// Like [`strip_wrappers`], also reporting env assignments made by the
/// stripped layers (`FOO=1 sudo BAR=2 env BAZ=3 cmd`).
pub fn strip_wrappers_with_info(tokens: &[String]) -> WrapperStripping {
    let mut current = tokens.to_vec();
    let mut env_assignments = EnvAssignments::new();

    for _ in 0..MAX_STRIP_DEPTH {
        let (rest, env) = strip_env_assignments(&current);
        env_assignments.extend(env);
        current = rest;

        let Some(head) = current.first() else {
            break;
        };
        let head = normalize_command_token(head);

        if SHELL_KEYWORDS.contains(&head.as_str()) {
            current.remove(0);
            continue;
        }

        if !WRAPPER_COMMANDS.contains(&head.as_str()) {
            break;
        }

        current = match head.as_str() {
            "sudo" | "doas" => skip_sudo(&current, &mut env_assignments),
            "env" => skip_env(&current, &mut env_assignments),
            "timeout" => skip_timeout(&current),
            _ => {
                let start = skip_options(&current, 1, wrapper_value_options(&head));
                current[start..].to_vec()
            }
        };
    }

    WrapperStripping {
        tokens: current,
        env_assignments,
    }
}

fn wrapper_value_options(wrapper: &str) -> &'static [&'static str] {
    match wrapper {
        "command" | "builtin" => &[],
        "exec" => &["-a"],
        "nice" => &["-n", "--adjustment"],
        "ionice" => &["-c", "-n", "-p", "-P", "-u", "--class", "--classdata"],
        "time" => &["-f", "-o", "--format", "--output"],
        "stdbuf" => &["-i", "-o", "-e", "--input", "--output", "--error"],
        "strace" => &["-e", "-o", "-p", "-s", "-u", "-E", "-P", "-I", "-b", "-a", "-X", "-O", "-S"],
        "ltrace" => &["-e", "-o", "-p", "-s", "-u", "-a", "-n", "-D", "-F", "-A", "-l", "-x"],
        "watch" => &["-n", "--interval", "-q", "--equexit", "--errexit"],
        _ => &[],
    }
}

/// Index of the first token after the options starting at `start`.
///
/// Tokens in `value_options` consume the following token too, and `--`
/// ends option parsing.
fn skip_options(tokens: &[String], start: usize, value_options: &[&str]) -> usize {
    let mut i = start;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        if token == "--" {
            return i + 1;
        }
        if !token.starts_with('-') || token == "-" {
            break;
        }
        if value_options.contains(&token) {
            i += 2;
        } else {
            i += 1;
        }
    }
    i.min(tokens.len())
}

fn skip_sudo(tokens: &[String], env: &mut EnvAssignments) -> Vec<String> {
    const SUDO_VALUE_OPTIONS: &[&str] = &[
        "-u", "-g", "-h", "-p", "-C", "-r", "-U", "-D", "-t", "-a", "-T", "--user", "--group",
        "--host", "--prompt", "--close-from", "--role", "--type", "--other-user", "--chdir",
        "--command-timeout", "--auth-type",
    ];
    let mut i = skip_options(tokens, 1, SUDO_VALUE_OPTIONS);
    while let Some((name, value)) = tokens.get(i).and_then(|t| parse_env_assignment(t)) {
        env.insert(name.to_string(), value.to_string());
        i += 1;
    }
    tokens[i..].to_vec()
}

fn skip_env(tokens: &[String], env: &mut EnvAssignments) -> Vec<String> {
    let mut i = 1;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        if token == "--" {
            i += 1;
            break;
        }
        if let Some((name, value)) = parse_env_assignment(token) {
            env.insert(name.to_string(), value.to_string());
            i += 1;
            continue;
        }
        if !token.starts_with('-') || token == "-" {
            break;
        }

        // -S / --split-string: the string holds the command line itself.
        let split = if token == "-S" || token == "--split-string" {
            tokens.get(i + 1).map(|s| (s.as_str(), i + 2))
        } else if let Some(s) = token.strip_prefix("--split-string=") {
            Some((s, i + 1))
        } else if let Some(s) = token.strip_prefix("-S") {
            Some((s, i + 1))
        } else {
            None
        };
        if let Some((string, next)) = split {
            let mut spliced = vec![tokens[0].clone()];
            spliced.extend(tokenize(string));
            spliced.extend_from_slice(&tokens[next.min(tokens.len())..]);
            return skip_env(&spliced, env);
        }

        if matches!(token, "-u" | "--unset" | "-C" | "--chdir") {
            i += 2;
        } else {
            i += 1;
        }
    }
    tokens[i.min(tokens.len())..].to_vec()
}

fn skip_timeout(tokens: &[String]) -> Vec<String> {
    let i = skip_options(tokens, 1, &["-s", "--signal", "-k", "--kill-after"]);
    // First operand is the duration.
    tokens[(i + 1).min(tokens.len())..].to_vec()
}

/// Collect bundled short options (`-rf` -> `-r`, `-f`) before `--`.
pub fn extract_short_opts(tokens: &[String]) -> HashSet<String> {
    let mut opts = HashSet::new();
    for token in tokens {
        if token == "--" {
            break;
        }
        if token.starts_with('-') && !token.starts_with("--") {
            for c in token.chars().skip(1) {
                opts.insert(format!("-{c}"));
            }
        }
    }
    opts
}

/// Final path component of a command token.
pub fn get_basename(token: &str) -> &str {
    token.rsplit(['/', '\\']).next().unwrap_or(token)
}

/// Canonical command name: basename, lowercased, `.exe` removed.
pub fn normalize_command_token(token: &str) -> String {
    let base = get_basename(token).to_ascii_lowercase();
    match base.strip_suffix(".exe") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(input: &str) -> Vec<String> {
        tokenize(input)
    }

    fn stripped(input: &str) -> String {
        strip_wrappers(&toks(input)).join(" ")
    }

    #[test]
    fn test_strip_env_assignments() {
        let (rest, env) = strip_env_assignments(&toks("FOO=bar TMPDIR=/x rm -rf a"));
        assert_eq!(rest, vec!["rm", "-rf", "a"]);
        assert_eq!(env.get("FOO").map(String::as_str), Some("bar"));
        assert_eq!(env.get("TMPDIR").map(String::as_str), Some("/x"));
    }

    #[test]
    fn test_assignment_needs_identifier() {
        assert!(parse_env_assignment("1X=y").is_none());
        assert!(parse_env_assignment("=y").is_none());
        assert_eq!(parse_env_assignment("A_1=b=c"), Some(("A_1", "b=c")));
    }

    #[test]
    fn test_strip_sudo() {
        assert_eq!(stripped("sudo ls -la"), "ls -la");
    }

    #[test]
    fn test_strip_sudo_with_user() {
        assert_eq!(stripped("sudo -u root ls -la"), "ls -la");
        assert_eq!(stripped("sudo -E -H rm -rf /"), "rm -rf /");
    }

    #[test]
    fn test_strip_env() {
        assert_eq!(stripped("env FOO=bar ls"), "ls");
        assert_eq!(stripped("env -i -u HOME ls"), "ls");
    }

    #[test]
    fn test_env_split_string() {
        assert_eq!(stripped("env -S 'rm -rf /' extra"), "rm -rf / extra");
    }

    #[test]
    fn test_strip_timeout() {
        assert_eq!(stripped("timeout 5 ls"), "ls");
        assert_eq!(stripped("timeout -s KILL 5s rm -rf x"), "rm -rf x");
    }

    #[test]
    fn test_strip_misc_wrappers() {
        assert_eq!(stripped("nohup nice -n 10 git push"), "git push");
        assert_eq!(stripped("command rm -rf x"), "rm -rf x");
        assert_eq!(stripped("stdbuf -o L time -p ls"), "ls");
        assert_eq!(stripped("/usr/bin/sudo ls"), "ls");
    }

    #[test]
    fn test_strip_nested() {
        assert_eq!(stripped("sudo env FOO=bar ls"), "ls");
        assert_eq!(stripped("sudo sudo sudo sudo sudo sudo ls"), "ls");
    }

    #[test]
    fn test_strip_keywords() {
        assert_eq!(stripped("if rm -rf x"), "rm -rf x");
        assert_eq!(stripped("! git reset --hard"), "git reset --hard");
    }

    #[test]
    fn test_strip_with_info_collects_env() {
        let info = strip_wrappers_with_info(&toks("A=1 sudo B=2 env C=3 rm -rf x"));
        assert_eq!(info.tokens, vec!["rm", "-rf", "x"]);
        assert_eq!(info.env_assignments.len(), 3);
        assert_eq!(info.env_assignments.get("C").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_no_wrapper() {
        assert_eq!(stripped("ls -la"), "ls -la");
    }

    #[test]
    fn test_wrapper_only() {
        assert!(strip_wrappers(&toks("sudo")).is_empty());
        assert!(strip_wrappers(&toks("timeout")).is_empty());
    }

    #[test]
    fn test_extract_short_opts() {
        let opts = extract_short_opts(&toks("rm -rf --verbose -- -x"));
        assert!(opts.contains("-r"));
        assert!(opts.contains("-f"));
        assert!(!opts.contains("-x"));
        assert!(!opts.contains("--verbose"));
    }

    #[test]
    fn test_normalize_command_token() {
        assert_eq!(normalize_command_token("/usr/bin/rm"), "rm");
        assert_eq!(normalize_command_token("GIT.EXE"), "git");
        assert_eq!(normalize_command_token("C:\\tools\\find.exe"), "find");
        assert_eq!(get_basename("a/b/c"), "c");
    }
}
