//! cc-safety-net - pre-execution hook that blocks destructive shell commands.

use cc_safety_net::config::{
    Config, ConfigError, EffectiveRuleSet, Scope, custom_rules_doc, load_config,
    project_config_path, user_config_path,
};
use cc_safety_net::hook::{Agent, HookSettings, run_hook};

use clap::{ArgGroup, Parser};
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cc-safety-net")]
#[command(about = "Blocks destructive shell commands before coding agents run them")]
#[command(version)]
#[command(group(ArgGroup::new("mode").required(true)))]
struct Cli {
    /// Run as a Claude Code PreToolUse hook
    #[arg(long, group = "mode")]
    claude_code: bool,

    /// Run as a Gemini CLI BeforeTool hook
    #[arg(long, group = "mode")]
    gemini_cli: bool,

    /// Run as a Copilot CLI preToolUse hook
    #[arg(long, group = "mode")]
    copilot_cli: bool,

    /// Validate the user and project config files
    #[arg(long, group = "mode")]
    verify_config: bool,

    /// Print the custom rule format and limits
    #[arg(long, group = "mode")]
    custom_rules_doc: bool,
}

/// Two-letter mode flags that existing hook configs pass with one dash.
const MODE_ALIASES: &[(&str, &str)] = &[
    ("-cc", "--claude-code"),
    ("-gc", "--gemini-cli"),
    ("-pc", "--copilot-cli"),
    ("-vc", "--verify-config"),
];

fn expand_mode_aliases(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            MODE_ALIASES
                .iter()
                .find(|(alias, _)| *alias == arg)
                .map_or(arg, |(_, long)| long.to_string())
        })
        .collect()
}

/// Logs go to stderr; stdout is reserved for hook responses.
fn initialize_tracing() {
    let filter =
        EnvFilter::try_from_env("SAFETY_NET_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(expand_mode_aliases(std::env::args()));
    initialize_tracing();

    if cli.custom_rules_doc {
        print!("{}", custom_rules_doc());
        return ExitCode::SUCCESS;
    }

    let agent = if cli.claude_code {
        Agent::ClaudeCode
    } else if cli.gemini_cli {
        Agent::GeminiCli
    } else if cli.copilot_cli {
        Agent::CopilotCli
    } else {
        return verify_config();
    };

    let mut raw = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut raw) {
        tracing::warn!(error = %e, "failed to read hook input");
        return ExitCode::SUCCESS; // Fail-open on read error
    }

    if let Some(response) = run_hook(agent, &raw, &HookSettings::from_env()) {
        println!("{response}");
    }
    ExitCode::SUCCESS
}

fn verify_config() -> ExitCode {
    let cwd = std::env::current_dir().ok();
    let files = [
        (Scope::User, user_config_path()),
        (Scope::Project, cwd.as_deref().and_then(project_config_path)),
    ];

    let mut found = false;
    let mut valid = true;
    for (scope, path) in files {
        let Some(path) = path else { continue };
        found = true;
        valid &= report_file(scope, &path);
    }

    if !found {
        println!("No config files found. Built-in rules only.");
        return ExitCode::SUCCESS;
    }

    if valid {
        report_effective(&load_config(cwd.as_deref()));
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn report_file(scope: Scope, path: &Path) -> bool {
    match Config::load_file(path) {
        Ok(config) => {
            println!("OK {scope:?} config {} ({} rules)", path.display(), config.rules.len());
            true
        }
        Err(ConfigError::Invalid(errors)) => {
            eprintln!("INVALID {scope:?} config {}:", path.display());
            for error in errors {
                eprintln!("  - {error}");
            }
            false
        }
        Err(e) => {
            eprintln!("INVALID {scope:?} config {}: {e}", path.display());
            false
        }
    }
}

fn report_effective(rules: &EffectiveRuleSet) {
    println!("{} effective custom rules", rules.len());
    for scoped in rules.scoped() {
        let note = if scoped.shadows_user_rule {
            " (overrides user rule)"
        } else {
            ""
        };
        println!("  [{:?}] {}{note}", scoped.scope, scoped.rule.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mode_aliases_expand() {
        let expanded = expand_mode_aliases(args(&["cc-safety-net", "-cc"]));
        assert_eq!(expanded, args(&["cc-safety-net", "--claude-code"]));
        let cli = Cli::parse_from(expand_mode_aliases(args(&["cc-safety-net", "-vc"])));
        assert!(cli.verify_config);
    }

    #[test]
    fn test_modes_are_exclusive() {
        let both = args(&["cc-safety-net", "--claude-code", "--gemini-cli"]);
        assert!(Cli::try_parse_from(both).is_err());
    }
}
