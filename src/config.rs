//! Custom rule configuration: loading, validation and scope merging.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// The only supported config schema version.
pub const CONFIG_VERSION: u32 = 1;

pub const MAX_REASON_LEN: usize = 256;
pub const MAX_RULE_NAME_LEN: usize = 64;

static RULE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"^[A-Za-z][A-Za-z0-9_-]{{0,{}}}$", MAX_RULE_NAME_LEN - 1);
    Regex::new(&pattern).expect("valid regex")
});
static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.-]*$").expect("valid regex"));

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// One config file: `{ "version": 1, "rules": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub rules: Vec<CustomRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            rules: Vec::new(),
        }
    }
}

/// User-defined rule blocking a command when it carries certain arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRule {
    /// Unique name, shown in the block reason as `[name]`.
    pub name: String,
    /// Command basename to match, e.g. `git`.
    pub command: String,
    /// First non-flag argument to match, e.g. `push`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<String>,
    /// Any of these arguments triggers the rule.
    pub block_args: Vec<String>,
    /// Explanation shown to the agent.
    pub reason: String,
}

/// Where a rule was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Project,
}

/// A rule in the effective set, with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedRule {
    pub rule: CustomRule,
    pub scope: Scope,
    /// A user rule with the same name was dropped in favor of this one.
    pub shadows_user_rule: bool,
}

/// User rules followed by project rules, with project rules shadowing
/// same-named user rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveRuleSet {
    rules: Vec<ScopedRule>,
    shadowed: Vec<CustomRule>,
}

impl EffectiveRuleSet {
    /// Merge the two scopes. Names compare case-insensitively.
    pub fn merge(user: Vec<CustomRule>, project: Vec<CustomRule>) -> Self {
        let project_names: HashSet<String> =
            project.iter().map(|r| r.name.to_ascii_lowercase()).collect();

        let mut rules = Vec::with_capacity(user.len() + project.len());
        let mut shadowed = Vec::new();
        let mut shadowed_names = HashSet::new();

        for rule in user {
            let key = rule.name.to_ascii_lowercase();
            if project_names.contains(&key) {
                debug!(rule = %rule.name, "user rule shadowed by project rule");
                shadowed_names.insert(key);
                shadowed.push(rule);
            } else {
                rules.push(ScopedRule {
                    rule,
                    scope: Scope::User,
                    shadows_user_rule: false,
                });
            }
        }

        for rule in project {
            let shadows_user_rule = shadowed_names.contains(&rule.name.to_ascii_lowercase());
            rules.push(ScopedRule {
                rule,
                scope: Scope::Project,
                shadows_user_rule,
            });
        }

        Self { rules, shadowed }
    }

    /// A set holding only project-scope rules.
    pub fn from_rules(rules: Vec<CustomRule>) -> Self {
        Self::merge(Vec::new(), rules)
    }

    /// Rules in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &CustomRule> {
        self.rules.iter().map(|scoped| &scoped.rule)
    }

    pub fn scoped(&self) -> &[ScopedRule] {
        &self.rules
    }

    /// User rules removed because a project rule has the same name.
    pub fn shadowed(&self) -> &[CustomRule] {
        &self.shadowed
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Config {
    /// Parse JSON config text. `//` and `/* */` comments and trailing
    /// commas are accepted.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(&strip_json_comments(content))?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read, parse and validate a config file. `.toml` files are TOML,
    /// anything else is JSON.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml(&content)?
        } else {
            Self::from_json(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the schema rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.version != CONFIG_VERSION {
            errors.push(format!(
                "unsupported version {} (expected {CONFIG_VERSION})",
                self.version
            ));
        }

        let mut seen = HashSet::new();
        for (i, rule) in self.rules.iter().enumerate() {
            let at = format!("rules[{i}]");
            if !RULE_NAME_RE.is_match(&rule.name) {
                errors.push(format!("{at}.name '{}' is invalid", rule.name));
            } else if !seen.insert(rule.name.to_ascii_lowercase()) {
                errors.push(format!("{at}.name '{}' is duplicated", rule.name));
            }
            if !COMMAND_RE.is_match(&rule.command) {
                errors.push(format!("{at}.command '{}' is invalid", rule.command));
            }
            if let Some(sub) = &rule.subcommand {
                if !COMMAND_RE.is_match(sub) {
                    errors.push(format!("{at}.subcommand '{sub}' is invalid"));
                }
            }
            if rule.block_args.is_empty() {
                errors.push(format!("{at}.block_args must not be empty"));
            } else if rule.block_args.iter().any(|a| a.trim().is_empty()) {
                errors.push(format!("{at}.block_args must not contain empty strings"));
            }
            if rule.reason.trim().is_empty() {
                errors.push(format!("{at}.reason must not be empty"));
            } else if rule.reason.chars().count() > MAX_REASON_LEN {
                errors.push(format!("{at}.reason exceeds {MAX_REASON_LEN} characters"));
            }
        }
        errors
    }
}

/// Reference text for writing custom rules, printed by `--custom-rules-doc`.
pub fn custom_rules_doc() -> String {
    format!(
        r#"Custom rules
============

Custom rules block a command when it is run with certain arguments. They
apply after the built-in checks and can only add blocks, never allow.

Files
-----
  User scope:     ~/.cc-safety-net/config.json (or config.toml)
  Project scope:  .safety-net.json (or .safety-net.toml) in the working directory

JSON files may contain // and /* */ comments and trailing commas. A project
rule with the same name as a user rule (case-insensitive) replaces it.

Schema
------
  {{
    "version": {CONFIG_VERSION},
    "rules": [
      {{
        "name": "no-force-publish",
        "command": "npm",
        "subcommand": "publish",
        "block_args": ["--force"],
        "reason": "Publishing is done by CI."
      }}
    ]
  }}

Fields
------
  version     must be {CONFIG_VERSION}
  name        letter first, then letters, digits, '-' or '_';
              at most {MAX_RULE_NAME_LEN} characters; unique per file
  command     command basename to match, e.g. git (path and .exe are ignored)
  subcommand  optional first non-option argument, e.g. push
  block_args  non-empty list; the rule fires when any of them is present.
              Single-letter flags also match inside bundles (-f in -xfd).
  reason      non-empty, at most {MAX_REASON_LEN} characters

Blocked commands report "[name] reason".

Run `cc-safety-net --verify-config` to check your files.
"#
    )
}

/// Load the user and project configs for `cwd` and merge them.
///
/// A file that fails to load is skipped with a warning; the other scope
/// still applies.
pub fn load_config(cwd: Option<&Path>) -> EffectiveRuleSet {
    let user = user_config_path().and_then(|path| load_scope(&path, Scope::User));
    let project = cwd
        .and_then(project_config_path)
        .and_then(|path| load_scope(&path, Scope::Project));

    EffectiveRuleSet::merge(
        user.map(|c| c.rules).unwrap_or_default(),
        project.map(|c| c.rules).unwrap_or_default(),
    )
}

fn load_scope(path: &Path, scope: Scope) -> Option<Config> {
    match Config::load_file(path) {
        Ok(config) => {
            debug!(?scope, path = %path.display(), rules = config.rules.len(), "loaded config");
            Some(config)
        }
        Err(e) => {
            warn!(?scope, path = %path.display(), error = %e, "ignoring config file");
            None
        }
    }
}

/// Directory holding user-level state (`~/.cc-safety-net`).
pub fn user_state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".cc-safety-net"))
}

/// Existing user config file, if any.
/// Respects SAFETY_NET_USER_CONFIG for testing.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SAFETY_NET_USER_CONFIG") {
        return Some(PathBuf::from(path)).filter(|p| p.exists());
    }
    let dir = user_state_dir()?;
    ["config.json", "config.toml"]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Existing project config file in `cwd`, if any.
pub fn project_config_path(cwd: &Path) -> Option<PathBuf> {
    [".safety-net.json", ".safety-net.toml"]
        .into_iter()
        .map(|name| cwd.join(name))
        .find(|p| p.exists())
}

/// Remove `//` and `/* */` comments and trailing commas outside strings.
pub fn strip_json_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            (',', _) => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}
