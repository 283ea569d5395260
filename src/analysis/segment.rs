//! Per-segment dispatch with cwd tracking.

use std::path::PathBuf;

use tracing::debug;

use super::command::{AnalysisResult, analyze_at_depth};
use super::context::{AnalysisContext, CwdState, MAX_RECURSION_DEPTH};
use super::kind::{CommandKind, Interpreter, ShellScript, find_shell_script};
use crate::decision::Decision;
use crate::paths;
use crate::rules::{
    RmOptions, analyze_find, analyze_git, analyze_parallel, analyze_rm, analyze_xargs,
    check_custom_rules, has_recursive_force, is_home_directory, is_temp_value,
    scan_interpreter_code,
};
use crate::shell::{
    CommandSegment, EnvAssignments, WrapperStripping, normalize_command_token, strip_wrappers,
    strip_wrappers_with_info,
};

pub const REASON_RECURSION_LIMIT: &str =
    "Command exceeds maximum recursion depth, cannot safely analyze.";
const REASON_HOME_CWD: &str =
    "rm -rf in home directory is dangerous. Change to a project directory first.";
const REASON_INTERPRETER_PARANOID: &str =
    "Interpreter one-liners are blocked (SAFETY_NET_PARANOID_INTERPRETERS enabled). Write the code to a file and review it first.";

/// Walks the segments of one command, tracking the effective cwd.
#[derive(Debug, Clone)]
pub struct SegmentAnalyzer<'a> {
    ctx: &'a AnalysisContext,
    depth: usize,
    cwd: CwdState,
    /// Open child shells with the cwd to restore when each one exits.
    scopes: Vec<(usize, CwdState)>,
}

impl<'a> SegmentAnalyzer<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self::with_cwd(ctx, 0, CwdState::from_context(ctx))
    }

    pub fn with_cwd(ctx: &'a AnalysisContext, depth: usize, cwd: CwdState) -> Self {
        Self {
            ctx,
            depth,
            cwd,
            scopes: Vec::new(),
        }
    }

    /// The effective cwd for the next segment.
    pub fn cwd(&self) -> &CwdState {
        &self.cwd
    }

    /// Analyze a segment, then apply any `cd` it performs to later segments.
    pub fn analyze_segment(&mut self, segment: &CommandSegment) -> Decision {
        self.enter_scopes(&segment.scopes);
        let decision = self.analyze_tokens(&segment.tokens);
        if !decision.is_blocked() && !segment.forked {
            self.track_cwd(segment);
        }
        decision
    }

    /// Move to the child shells enclosing the next segment. Leaving a
    /// child shell restores the cwd it started with.
    pub fn enter_scopes(&mut self, scopes: &[usize]) {
        let shared = self
            .scopes
            .iter()
            .zip(scopes)
            .take_while(|((open, _), id)| open == *id)
            .count();
        let left = self.scopes.drain(shared..).next();
        if let Some((_, cwd)) = left {
            self.cwd = cwd;
        }
        for &id in &scopes[shared..] {
            self.scopes.push((id, self.cwd.clone()));
        }
    }

    /// Analyze one simple command with the current cwd.
    pub fn analyze_tokens(&self, tokens: &[String]) -> Decision {
        let WrapperStripping {
            tokens,
            env_assignments,
        } = strip_wrappers_with_info(tokens);

        let Some(head) = tokens.first() else {
            return Decision::allow();
        };
        let name = normalize_command_token(head);
        if name.is_empty() {
            return Decision::allow();
        }

        let decision = match CommandKind::classify(&name) {
            CommandKind::Cd | CommandKind::Other => Decision::allow(),
            CommandKind::Shell => match find_shell_script(&tokens) {
                ShellScript::At(i) => self.analyze_script(&tokens[i]),
                ShellScript::NoFlag | ShellScript::Missing => Decision::allow(),
            },
            CommandKind::Eval => self.analyze_script(&tokens[1..].join(" ")),
            CommandKind::Interpreter(interpreter) => self.analyze_interpreter(interpreter, &tokens),
            CommandKind::Busybox => self.analyze_child(&tokens[1..]),
            CommandKind::Git => analyze_git(&tokens),
            CommandKind::Rm => self.analyze_rm_segment(&tokens, &env_assignments),
            CommandKind::Find => analyze_find(&tokens),
            CommandKind::Xargs => analyze_xargs(&tokens, self),
            CommandKind::Parallel => analyze_parallel(&tokens, self),
        };

        decision.or_else(|| check_custom_rules(&tokens, &self.ctx.rules))
    }

    /// Analyze a command nested inside this one (xargs/parallel child).
    pub fn analyze_child(&self, tokens: &[String]) -> Decision {
        if self.depth + 1 >= MAX_RECURSION_DEPTH {
            debug!(depth = self.depth, "recursion limit reached");
            return Decision::block("recursion_limit", REASON_RECURSION_LIMIT);
        }
        let child = Self::with_cwd(self.ctx, self.depth + 1, self.cwd.clone());
        child.analyze_tokens(tokens)
    }

    /// Analyze a full command line nested inside this one (`sh -c`, eval).
    pub fn analyze_script(&self, script: &str) -> Decision {
        match analyze_at_depth(script, self.ctx, self.depth + 1, self.cwd.clone()) {
            Some(AnalysisResult { rule, reason, .. }) => Decision::block(rule, reason),
            None => Decision::allow(),
        }
    }

    /// rm options for the current cwd and the segment's env assignments.
    pub fn rm_options(&self, env: &EnvAssignments) -> RmOptions {
        let temp_dir = self.ctx.temp_dir.clone();
        let tmpdir_overridden = self.ctx.tmpdir_overridden
            || env
                .get("TMPDIR")
                .is_some_and(|value| !is_temp_value(value, temp_dir.as_deref()));

        let (cwd, original_cwd) = match &self.cwd {
            CwdState::Known(cwd) => (Some(cwd.clone()), self.ctx.cwd.clone()),
            CwdState::Unknown => (None, None),
        };

        RmOptions {
            cwd,
            original_cwd,
            home_dir: self.ctx.home_dir.clone(),
            temp_dir,
            paranoid: self.ctx.paranoid_rm,
            allow_tmpdir_var: self.ctx.allow_tmpdir_var,
            tmpdir_overridden,
        }
    }

    fn analyze_rm_segment(&self, tokens: &[String], env: &EnvAssignments) -> Decision {
        let in_home = match (self.cwd.known(), self.ctx.home_dir.as_deref()) {
            (Some(cwd), Some(home)) => is_home_directory(cwd, home),
            _ => false,
        };
        if in_home && has_recursive_force(tokens) {
            return Decision::block("rm.home_cwd", REASON_HOME_CWD);
        }
        analyze_rm(tokens, &self.rm_options(env))
    }

    fn analyze_interpreter(&self, interpreter: Interpreter, tokens: &[String]) -> Decision {
        let Some(code) = interpreter.inline_code(tokens) else {
            return Decision::allow();
        };
        if self.ctx.paranoid_interpreters {
            return Decision::block("interpreter.paranoid", REASON_INTERPRETER_PARANOID);
        }
        self.analyze_script(code).or_else(|| scan_interpreter_code(code))
    }

    fn track_cwd(&mut self, segment: &CommandSegment) {
        let tokens = strip_wrappers(&segment.tokens);
        let Some(head) = tokens.first() else {
            return;
        };
        let name = normalize_command_token(head);
        let next = match name.as_str() {
            "cd" | "pushd" if segment.unterminated => CwdState::Unknown,
            "cd" => self.resolve_cd(&tokens[1..], false),
            "pushd" => self.resolve_cd(&tokens[1..], true),
            "popd" => CwdState::Unknown,
            _ => return,
        };

        if next == CwdState::Unknown && self.cwd != CwdState::Unknown {
            debug!(segment = %segment.command, "cwd tracking lost");
        }
        self.cwd = next;
    }

    fn resolve_cd(&self, args: &[String], pushd: bool) -> CwdState {
        let mut operands = args.iter().map(String::as_str).skip_while(|a| {
            a.starts_with('-') && *a != "-" && *a != "--" && a.len() > 1
        });
        let target = match operands.next() {
            Some("--") => operands.next(),
            other => other,
        };

        let home = self.ctx.home_dir.as_deref();
        let resolved: Option<PathBuf> = match target {
            None if pushd => None,
            None => home.map(paths::normalize),
            Some(t) if t == "-" || t.starts_with('+') => None,
            Some(t) if t.contains(['$', '`', '*', '?', '[']) => None,
            Some("~") => home.map(paths::normalize),
            Some(t) if t.starts_with("~/") => home.map(|h| paths::resolve(h, &t[2..])),
            Some(t) if t.starts_with('~') => None,
            Some(t) if t.starts_with('/') => Some(paths::normalize(std::path::Path::new(t))),
            Some(t) => self.cwd.known().map(|cwd| paths::resolve(cwd, t)),
        };

        match resolved {
            Some(path) => CwdState::Known(path),
            None => CwdState::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::split_commands;
    use std::path::Path;

    fn ctx() -> AnalysisContext {
        AnalysisContext::new("/home/user/project").with_home_dir("/home/user")
    }

    fn cwd_after(command: &str) -> CwdState {
        let ctx = ctx();
        let mut analyzer = SegmentAnalyzer::new(&ctx);
        for segment in split_commands(command) {
            analyzer.analyze_segment(&segment);
        }
        analyzer.cwd().clone()
    }

    fn known(path: &str) -> CwdState {
        CwdState::Known(PathBuf::from(path))
    }

    #[test]
    fn test_cd_tracking() {
        assert_eq!(cwd_after("cd src"), known("/home/user/project/src"));
        assert_eq!(cwd_after("cd /var/log && ls"), known("/var/log"));
        assert_eq!(cwd_after("cd .."), known("/home/user"));
        assert_eq!(cwd_after("cd"), known("/home/user"));
        assert_eq!(cwd_after("cd ~/other"), known("/home/user/other"));
        assert_eq!(cwd_after("cd -P -- sub"), known("/home/user/project/sub"));
        assert_eq!(cwd_after("pushd /opt"), known("/opt"));
    }

    #[test]
    fn test_cd_unresolvable() {
        assert_eq!(cwd_after("cd $DIR"), CwdState::Unknown);
        assert_eq!(cwd_after("cd -"), CwdState::Unknown);
        assert_eq!(cwd_after("cd ~bob"), CwdState::Unknown);
        assert_eq!(cwd_after("cd `mktemp -d`"), CwdState::Unknown);
        assert_eq!(cwd_after("pushd /opt; popd"), CwdState::Unknown);
        assert_eq!(cwd_after("cd \"unterminated"), CwdState::Unknown);
    }

    #[test]
    fn test_subshell_cd_does_not_leak() {
        assert_eq!(cwd_after("(cd a/b)"), known("/home/user/project"));
        assert_eq!(cwd_after("(cd a/b) && ls"), known("/home/user/project"));
        assert_eq!(cwd_after("(cd a && cd b) ; (cd c)"), known("/home/user/project"));
        assert_eq!(cwd_after("echo $(cd /etc) && ls"), known("/home/user/project"));
        assert_eq!(cwd_after("cd a && (cd b) && ls"), known("/home/user/project/a"));
    }

    #[test]
    fn test_forked_cd_ignored() {
        assert_eq!(cwd_after("cd a/b | true"), known("/home/user/project"));
        assert_eq!(cwd_after("true | cd a/b"), known("/home/user/project"));
        assert_eq!(cwd_after("cd a/b & ls"), known("/home/user/project"));
    }

    #[test]
    fn test_cd_inside_subshell_applies_within() {
        let ctx = ctx();
        let mut analyzer = SegmentAnalyzer::new(&ctx);
        let segments = split_commands("(cd /var/log && ls)");
        analyzer.analyze_segment(&segments[0]);
        analyzer.analyze_segment(&segments[1]);
        assert_eq!(analyzer.cwd(), &known("/var/log"));
    }

    #[test]
    fn test_unknown_stays_unknown() {
        assert_eq!(cwd_after("cd $X && cd sub"), CwdState::Unknown);
        assert_eq!(cwd_after("cd $X && cd /abs"), known("/abs"));
    }

    #[test]
    fn test_rm_options_follow_cwd() {
        let ctx = ctx();
        let analyzer = SegmentAnalyzer::with_cwd(&ctx, 0, known("/tmp/build"));
        let options = analyzer.rm_options(&EnvAssignments::new());
        assert_eq!(options.cwd.as_deref(), Some(Path::new("/tmp/build")));
        assert_eq!(options.original_cwd.as_deref(), Some(Path::new("/home/user/project")));

        let lost = SegmentAnalyzer::with_cwd(&ctx, 0, CwdState::Unknown);
        let options = lost.rm_options(&EnvAssignments::new());
        assert!(options.cwd.is_none());
        assert!(options.original_cwd.is_none());
    }

    #[test]
    fn test_tmpdir_override_detected() {
        let ctx = ctx();
        let analyzer = SegmentAnalyzer::new(&ctx);
        let mut env = EnvAssignments::new();
        env.insert("TMPDIR".to_string(), "/tmp".to_string());
        assert!(!analyzer.rm_options(&env).tmpdir_overridden);
        env.insert("TMPDIR".to_string(), "/home/user".to_string());
        assert!(analyzer.rm_options(&env).tmpdir_overridden);
    }

    #[test]
    fn test_home_cwd_guard() {
        let ctx = AnalysisContext::new("/home/user").with_home_dir("/home/user");
        let analyzer = SegmentAnalyzer::new(&ctx);
        let decision = analyzer.analyze_tokens(&crate::shell::tokenize("rm -rf build"));
        assert!(decision.reason().unwrap().contains("rm -rf in home directory"));
        let decision = analyzer.analyze_tokens(&crate::shell::tokenize("rm -f file.txt"));
        assert!(!decision.is_blocked());
    }

    #[test]
    fn test_child_depth_limit() {
        let ctx = ctx();
        let analyzer = SegmentAnalyzer::with_cwd(&ctx, MAX_RECURSION_DEPTH - 1, known("/x"));
        let decision = analyzer.analyze_child(&crate::shell::tokenize("ls"));
        assert_eq!(decision.reason(), Some(REASON_RECURSION_LIMIT));
    }

    #[test]
    fn test_paranoid_interpreters() {
        let ctx = ctx().paranoid_interpreters(true);
        let analyzer = SegmentAnalyzer::new(&ctx);
        let decision = analyzer.analyze_tokens(&crate::shell::tokenize("python -c 'print(1)'"));
        assert_eq!(decision.block_info().unwrap().rule, "interpreter.paranoid");
        let decision = analyzer.analyze_tokens(&crate::shell::tokenize("python script.py"));
        assert!(!decision.is_blocked());
    }
}
