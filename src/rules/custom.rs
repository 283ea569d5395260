//! Custom user-defined rules.

use crate::config::{CustomRule, EffectiveRuleSet};
use crate::decision::Decision;
use crate::shell::{extract_short_opts, normalize_command_token};

/// Check custom rules against a command whose wrappers are already stripped.
///
/// The first matching rule wins.
pub fn check_custom_rules(tokens: &[String], rules: &EffectiveRuleSet) -> Decision {
    let Some(head) = tokens.first() else {
        return Decision::allow();
    };
    let command = normalize_command_token(head);

    rules
        .iter()
        .find(|rule| rule_matches(rule, &command, tokens))
        .map(|rule| {
            Decision::block(
                format!("custom.{}", rule.name),
                format!("[{}] {}", rule.name, rule.reason),
            )
        })
        .unwrap_or_else(Decision::allow)
}

fn rule_matches(rule: &CustomRule, command: &str, tokens: &[String]) -> bool {
    if !rule.command.eq_ignore_ascii_case(command) {
        return false;
    }

    let args = &tokens[1..];
    if let Some(expected) = &rule.subcommand {
        let subcommand = args.iter().find(|a| !a.starts_with('-'));
        if subcommand.is_none_or(|s| s != expected) {
            return false;
        }
    }

    let short_opts = extract_short_opts(args);
    rule.block_args
        .iter()
        .any(|blocked| args.iter().any(|a| a == blocked) || short_opts.contains(blocked))
}
