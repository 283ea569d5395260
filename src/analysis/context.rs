//! Per-invocation analysis settings.

use std::path::{Path, PathBuf};

use crate::config::EffectiveRuleSet;

/// Nesting limit for scripts, substitutions, xargs and parallel children.
pub const MAX_RECURSION_DEPTH: usize = 10;

/// Everything the analyzer needs to know about the environment.
///
/// The analyzer never reads environment variables itself; callers fill
/// this in once per command.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Directory the command is issued from.
    pub cwd: Option<PathBuf>,
    pub home_dir: Option<PathBuf>,
    /// Platform temp directory, trusted like `/tmp`.
    pub temp_dir: Option<PathBuf>,
    pub rules: EffectiveRuleSet,
    /// Deny commands that cannot be parsed instead of allowing them.
    pub strict: bool,
    /// Deny rm -rf even inside the cwd.
    pub paranoid_rm: bool,
    /// Deny interpreter one-liners such as `python -c`.
    pub paranoid_interpreters: bool,
    /// Trust `$TMPDIR` as a temp location.
    pub allow_tmpdir_var: bool,
    /// The caller's `TMPDIR` does not point at a temp location.
    pub tmpdir_overridden: bool,
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self {
            cwd: None,
            home_dir: None,
            temp_dir: None,
            rules: EffectiveRuleSet::default(),
            strict: false,
            paranoid_rm: false,
            paranoid_interpreters: false,
            allow_tmpdir_var: true,
            tmpdir_overridden: false,
        }
    }
}

impl AnalysisContext {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }

    pub fn with_home_dir(mut self, home: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    pub fn with_temp_dir(mut self, temp: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp.into());
        self
    }

    pub fn with_rules(mut self, rules: EffectiveRuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets both paranoid flags.
    pub fn paranoid(mut self, paranoid: bool) -> Self {
        self.paranoid_rm = paranoid;
        self.paranoid_interpreters = paranoid;
        self
    }

    pub fn paranoid_rm(mut self, paranoid: bool) -> Self {
        self.paranoid_rm = paranoid;
        self
    }

    pub fn paranoid_interpreters(mut self, paranoid: bool) -> Self {
        self.paranoid_interpreters = paranoid;
        self
    }

    pub fn tmpdir_overridden(mut self, overridden: bool) -> Self {
        self.tmpdir_overridden = overridden;
        self
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }
}

/// What the analyzer knows about the working directory at a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CwdState {
    Known(PathBuf),
    /// A `cd` could not be resolved statically. Never treated as safe.
    Unknown,
}

impl CwdState {
    pub fn from_context(ctx: &AnalysisContext) -> Self {
        match &ctx.cwd {
            Some(cwd) => CwdState::Known(cwd.clone()),
            None => CwdState::Unknown,
        }
    }

    pub fn known(&self) -> Option<&Path> {
        match self {
            CwdState::Known(path) => Some(path),
            CwdState::Unknown => None,
        }
    }
}
