//! rm command analysis.

use std::path::{Path, PathBuf};

use crate::decision::Decision;
use crate::paths;

pub const REASON_RM_RF: &str =
    "rm -rf outside cwd is blocked. Use explicit paths within the current directory, or delete manually.";
pub const REASON_RM_RF_ROOT_HOME: &str =
    "rm -rf targeting root or home directory is extremely dangerous and always blocked.";
const REASON_RM_RF_CWD: &str =
    "rm -rf targeting the current directory itself is blocked. Delete specific paths inside it instead.";

/// Context the rm rules need about where the command runs.
#[derive(Debug, Clone)]
pub struct RmOptions {
    /// Effective cwd after any `cd` earlier in the command. `None` if unknown.
    pub cwd: Option<PathBuf>,
    /// Directory the command was issued from. `None` if tracking was lost.
    pub original_cwd: Option<PathBuf>,
    pub home_dir: Option<PathBuf>,
    /// Platform temp directory, in addition to `/tmp` and `/var/tmp`.
    pub temp_dir: Option<PathBuf>,
    /// Block rm -rf even inside the cwd.
    pub paranoid: bool,
    /// Trust `$TMPDIR` as a temp location.
    pub allow_tmpdir_var: bool,
    /// `TMPDIR` was assigned a non-temp value for this command.
    pub tmpdir_overridden: bool,
}

impl Default for RmOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            original_cwd: None,
            home_dir: None,
            temp_dir: None,
            paranoid: false,
            allow_tmpdir_var: true,
            tmpdir_overridden: false,
        }
    }
}

impl RmOptions {
    fn check_cwd(&self) -> Option<&Path> {
        self.original_cwd.as_deref().or(self.cwd.as_deref())
    }
}

/// Analyze rm command for dangerous operations.
pub fn analyze_rm(tokens: &[String], options: &RmOptions) -> Decision {
    if !has_recursive_force(tokens) {
        return Decision::allow();
    }

    for target in extract_rm_targets(tokens) {
        if let Some(decision) = check_rm_target(target, options) {
            return decision;
        }
    }

    Decision::allow()
}

fn check_rm_target(target: &str, options: &RmOptions) -> Option<Decision> {
    if is_root_or_home_path(target) {
        return Some(Decision::block("rm.root_home", REASON_RM_RF_ROOT_HOME));
    }

    let check_cwd = options.check_cwd();

    if let Some(check_cwd) = check_cwd {
        let base = options.cwd.as_deref().unwrap_or(check_cwd);
        if is_cwd_itself(target, base, check_cwd) {
            return Some(Decision::block("rm.cwd", REASON_RM_RF_CWD));
        }
    }

    // Running from home overrides the temp exemption.
    if let (Some(cwd), Some(home)) = (options.cwd.as_deref(), options.home_dir.as_deref()) {
        if is_home_directory(cwd, home) {
            return Some(Decision::block("rm.home_cwd", REASON_RM_RF_ROOT_HOME));
        }
    }

    let trust_tmpdir = options.allow_tmpdir_var && !options.tmpdir_overridden;
    if is_temp_path(target, options.temp_dir.as_deref(), trust_tmpdir) {
        return None;
    }

    if let Some(check_cwd) = check_cwd {
        if options
            .home_dir
            .as_deref()
            .is_some_and(|home| is_home_directory(check_cwd, home))
        {
            return Some(Decision::block("rm.home_cwd", REASON_RM_RF_ROOT_HOME));
        }

        let effective = options.cwd.as_deref().unwrap_or(check_cwd);
        if is_path_within_cwd(target, check_cwd, effective) {
            if options.paranoid {
                return Some(Decision::block(
                    "rm.paranoid",
                    format!("{REASON_RM_RF} (SAFETY_NET_PARANOID_RM enabled)"),
                ));
            }
            return None;
        }
    }

    Some(Decision::block("rm.outside_cwd", REASON_RM_RF))
}

/// True when both a recursive and a force flag appear before `--`.
pub fn has_recursive_force(tokens: &[String]) -> bool {
    let mut recursive = false;
    let mut force = false;

    for token in tokens {
        let token = token.as_str();
        if token == "--" {
            break;
        }
        match token {
            "-r" | "-R" | "--recursive" => recursive = true,
            "-f" | "--force" => force = true,
            _ if token.starts_with('-') && !token.starts_with("--") => {
                recursive |= token.contains(['r', 'R']);
                force |= token.contains('f');
            }
            _ => {}
        }
    }

    recursive && force
}

fn extract_rm_targets(tokens: &[String]) -> Vec<&str> {
    let mut targets = Vec::new();
    let mut past_double_dash = false;

    for token in tokens.iter().skip(1) {
        let token = token.as_str();
        if token.is_empty() {
            continue;
        }
        if !past_double_dash && token == "--" {
            past_double_dash = true;
            continue;
        }
        if past_double_dash || !token.starts_with('-') {
            targets.push(token);
        }
    }

    targets
}

fn is_root_or_home_path(target: &str) -> bool {
    matches!(
        target.trim(),
        "/" | "/*"
            | "~"
            | "~/"
            | "~/*"
            | "$HOME"
            | "$HOME/"
            | "$HOME/*"
            | "${HOME}"
            | "${HOME}/"
            | "${HOME}/*"
    )
}

fn is_temp_path(target: &str, temp_dir: Option<&Path>, trust_tmpdir: bool) -> bool {
    let target = target.trim();
    if paths::has_parent_segment(target) {
        return false;
    }

    let under = |root: &str| target == root || target.starts_with(&format!("{root}/"));

    if under("/tmp") || under("/var/tmp") {
        return true;
    }

    if let Some(temp) = temp_dir.and_then(Path::to_str) {
        let temp = temp.trim_end_matches('/');
        if !temp.is_empty() && under(temp) {
            return true;
        }
    }

    trust_tmpdir && (under("$TMPDIR") || under("${TMPDIR}"))
}

/// Whether a `TMPDIR` value points at a real temp location.
pub fn is_temp_value(value: &str, temp_dir: Option<&Path>) -> bool {
    is_temp_path(value, temp_dir, false)
}

/// Whether `cwd` is the user's home directory.
pub fn is_home_directory(cwd: &Path, home: &Path) -> bool {
    paths::normalize(cwd) == paths::normalize(home)
}

fn is_cwd_itself(target: &str, base: &Path, check_cwd: &Path) -> bool {
    if target == "." || target == "./" {
        return true;
    }
    if target.contains('$') || target.contains('`') || target.starts_with('~') {
        return false;
    }
    paths::same_location(&paths::resolve(base, target), check_cwd)
}

fn is_path_within_cwd(target: &str, original_cwd: &Path, effective_cwd: &Path) -> bool {
    if target.starts_with('~') || target.contains('$') || target.contains('`') {
        return false;
    }

    if target.starts_with('/') {
        return paths::is_strictly_within(Path::new(target), original_cwd);
    }

    if target.starts_with("../") || target == ".." {
        return false;
    }

    // ./x, bare names and deeper relative paths resolve against the cwd
    // the command will actually run in.
    paths::is_within_or_equal(&paths::resolve(effective_cwd, target), original_cwd)
}
