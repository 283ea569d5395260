//! Git command analysis.

use crate::decision::Decision;
use crate::shell::extract_short_opts;

const REASON_CHECKOUT_DOUBLE_DASH: &str =
    "git checkout -- discards uncommitted changes permanently. Use 'git stash' first.";
const REASON_CHECKOUT_REF_PATH: &str =
    "git checkout <ref> -- <path> overwrites working tree with ref version. Use 'git stash' first.";
const REASON_CHECKOUT_PATHSPEC_FILE: &str =
    "git checkout --pathspec-from-file can overwrite multiple files. Use 'git stash' first.";
const REASON_CHECKOUT_AMBIGUOUS: &str =
    "git checkout with multiple positional args may overwrite files. Use 'git switch' for branches or 'git restore' for files.";
const REASON_CHECKOUT_FORCE: &str =
    "git checkout --force discards uncommitted changes. Use 'git stash' first.";
const REASON_RESTORE: &str =
    "git restore discards uncommitted changes. Use 'git stash' or 'git diff' first.";
const REASON_RESTORE_WORKTREE: &str =
    "git restore --worktree discards uncommitted changes permanently.";
const REASON_RESET_HARD: &str =
    "git reset --hard destroys all uncommitted changes permanently. Use 'git stash' first.";
const REASON_RESET_MERGE: &str = "git reset --merge can lose uncommitted changes.";
const REASON_CLEAN: &str =
    "git clean -f removes untracked files permanently. Review with 'git clean -n' first.";
const REASON_PUSH_FORCE: &str =
    "Force push can destroy remote history. Use --force-with-lease if necessary.";
const REASON_BRANCH_DELETE: &str =
    "git branch -D force-deletes without merge check. Use -d for safety.";
const REASON_STASH_DROP: &str =
    "git stash drop permanently deletes stashed changes. List stashes first with 'git stash list'.";
const REASON_STASH_CLEAR: &str = "git stash clear permanently deletes ALL stashed changes.";
const REASON_WORKTREE_REMOVE_FORCE: &str =
    "git worktree remove --force can delete uncommitted changes. Remove --force flag.";

/// Global options of `git` itself that take a separate value.
const GIT_GLOBAL_VALUE_OPTIONS: &[&str] = &[
    "-C",
    "-c",
    "--git-dir",
    "--work-tree",
    "--namespace",
    "--exec-path",
    "--config-env",
    "--super-prefix",
    "--list-cmds",
    "--attr-source",
];

/// `git checkout` options that take a separate value.
const CHECKOUT_VALUE_OPTIONS: &[&str] = &[
    "-b",
    "-B",
    "--orphan",
    "--conflict",
    "--pathspec-from-file",
    "--track",
    "--recurse-submodules",
    "-t",
];

/// Analyze a git command for dangerous operations.
pub fn analyze_git(tokens: &[String]) -> Decision {
    let Some((subcommand, args)) = extract_git_subcommand_and_rest(tokens) else {
        return Decision::allow();
    };

    match subcommand.to_ascii_lowercase().as_str() {
        "checkout" => analyze_git_checkout(args),
        "restore" => analyze_git_restore(args),
        "reset" => analyze_git_reset(args),
        "clean" => analyze_git_clean(args),
        "push" => analyze_git_push(args),
        "branch" => analyze_git_branch(args),
        "stash" => analyze_git_stash(args),
        "worktree" => analyze_git_worktree(args),
        _ => Decision::allow(),
    }
}

/// Find the subcommand after `git` and its global options.
///
/// Returns the subcommand and the arguments that follow it.
pub fn extract_git_subcommand_and_rest(tokens: &[String]) -> Option<(&str, &[String])> {
    let mut i = 1;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        if token == "--" {
            i += 1;
            break;
        }
        if !token.starts_with('-') {
            break;
        }
        if GIT_GLOBAL_VALUE_OPTIONS.contains(&token) {
            i += 2;
        } else {
            i += 1;
        }
    }
    let subcommand = tokens.get(i)?;
    Some((subcommand.as_str(), &tokens[i + 1..]))
}

/// Positional (non-option) arguments of `git checkout`, before any `--`.
pub fn checkout_positional_args(args: &[String]) -> Vec<&str> {
    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            break;
        }
        if arg.starts_with('-') {
            i += if CHECKOUT_VALUE_OPTIONS.contains(&arg) { 2 } else { 1 };
            continue;
        }
        positional.push(arg);
        i += 1;
    }
    positional
}

fn has_flag(args: &[String], flags: &[&str]) -> bool {
    args.iter()
        .take_while(|a| a.as_str() != "--")
        .any(|a| flags.contains(&a.as_str()))
}

fn has_short_opt(args: &[String], opt: &str) -> bool {
    extract_short_opts(args).contains(opt)
}

fn analyze_git_checkout(args: &[String]) -> Decision {
    if let Some(dash) = args.iter().position(|a| a == "--") {
        let has_ref = !checkout_positional_args(&args[..dash]).is_empty();
        return if has_ref {
            Decision::block("git.checkout.ref_path", REASON_CHECKOUT_REF_PATH)
        } else {
            Decision::block("git.checkout.discard", REASON_CHECKOUT_DOUBLE_DASH)
        };
    }

    if args
        .iter()
        .any(|a| a == "--pathspec-from-file" || a.starts_with("--pathspec-from-file="))
    {
        return Decision::block("git.checkout.pathspec_file", REASON_CHECKOUT_PATHSPEC_FILE);
    }

    if has_flag(args, &["-f", "--force"]) {
        return Decision::block("git.checkout.force", REASON_CHECKOUT_FORCE);
    }

    let positional = checkout_positional_args(args);
    if positional.contains(&".") {
        return Decision::block("git.checkout.discard", REASON_CHECKOUT_DOUBLE_DASH);
    }
    if positional.len() >= 2 {
        return Decision::block("git.checkout.ambiguous", REASON_CHECKOUT_AMBIGUOUS);
    }

    Decision::allow()
}

fn analyze_git_restore(args: &[String]) -> Decision {
    if has_flag(args, &["-h", "--help"]) {
        return Decision::allow();
    }
    if has_flag(args, &["--worktree", "-W"]) {
        return Decision::block("git.restore.worktree", REASON_RESTORE_WORKTREE);
    }
    if has_flag(args, &["--staged", "-S"]) {
        return Decision::allow();
    }
    Decision::block("git.restore", REASON_RESTORE)
}

fn analyze_git_reset(args: &[String]) -> Decision {
    if has_flag(args, &["--hard"]) {
        return Decision::block("git.reset.hard", REASON_RESET_HARD);
    }
    if has_flag(args, &["--merge"]) {
        return Decision::block("git.reset.merge", REASON_RESET_MERGE);
    }
    Decision::allow()
}

fn analyze_git_clean(args: &[String]) -> Decision {
    let dry_run = has_flag(args, &["--dry-run"]) || has_short_opt(args, "-n");
    if dry_run {
        return Decision::allow();
    }
    if has_flag(args, &["--force"]) || has_short_opt(args, "-f") {
        return Decision::block("git.clean.force", REASON_CLEAN);
    }
    Decision::allow()
}

fn analyze_git_push(args: &[String]) -> Decision {
    let mut force = false;
    let mut past_double_dash = false;

    for arg in args {
        let arg = arg.as_str();
        if past_double_dash {
            force |= arg.starts_with('+');
            continue;
        }
        match arg {
            "--" => past_double_dash = true,
            "--force" => force = true,
            // --force-with-lease and --force-if-includes check the remote first.
            _ if arg.starts_with("--") => {}
            _ if arg.starts_with('-') => force |= arg.contains('f'),
            // +refspec forces that one ref
            _ => force |= arg.starts_with('+') && arg.len() > 1,
        }
    }

    if force {
        Decision::block("git.push.force", REASON_PUSH_FORCE)
    } else {
        Decision::allow()
    }
}

fn analyze_git_branch(args: &[String]) -> Decision {
    let force_delete = has_short_opt(args, "-D")
        || ((has_flag(args, &["--delete"]) || has_short_opt(args, "-d"))
            && (has_flag(args, &["--force"]) || has_short_opt(args, "-f")));
    if force_delete {
        return Decision::block("git.branch.force_delete", REASON_BRANCH_DELETE);
    }
    Decision::allow()
}

fn analyze_git_stash(args: &[String]) -> Decision {
    match args.first().map(String::as_str) {
        Some("drop") => Decision::block("git.stash.drop", REASON_STASH_DROP),
        Some("clear") => Decision::block("git.stash.clear", REASON_STASH_CLEAR),
        _ => Decision::allow(),
    }
}

fn analyze_git_worktree(args: &[String]) -> Decision {
    let Some(action) = args.first() else {
        return Decision::allow();
    };
    if action != "remove" {
        return Decision::allow();
    }
    let rest = &args[1..];
    if has_flag(rest, &["--force"]) || has_short_opt(rest, "-f") {
        return Decision::block("git.worktree.remove_force", REASON_WORKTREE_REMOVE_FORCE);
    }
    Decision::allow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::tokenize;

    fn rule(command: &str) -> Option<String> {
        analyze_git(&tokenize(command))
            .block_info()
            .map(|info| info.rule.clone())
    }

    fn blocked(command: &str) -> bool {
        analyze_git(&tokenize(command)).is_blocked()
    }

    #[test]
    fn test_reset_hard() {
        let decision = analyze_git(&tokenize("git reset --hard"));
        assert!(decision.reason().unwrap().contains("git reset --hard"));
        assert_eq!(rule("git reset --hard HEAD~1").as_deref(), Some("git.reset.hard"));
        assert_eq!(rule("git reset --merge").as_deref(), Some("git.reset.merge"));
        assert!(!blocked("git reset --soft HEAD~1"));
        assert!(!blocked("git reset HEAD file.txt"));
    }

    #[test]
    fn test_global_options_skipped() {
        assert!(blocked("git -C /repo reset --hard"));
        assert!(blocked("git -c core.pager=cat --no-pager reset --hard"));
        assert!(blocked("git --git-dir=.git reset --hard"));
        assert!(!blocked("git -C reset status"));
    }

    #[test]
    fn test_extract_subcommand() {
        let tokens = tokenize("git -C dir --bare push origin main");
        let (sub, rest) = extract_git_subcommand_and_rest(&tokens).unwrap();
        assert_eq!(sub, "push");
        assert_eq!(rest, ["origin", "main"]);
        assert!(extract_git_subcommand_and_rest(&tokenize("git")).is_none());
    }

    #[test]
    fn test_checkout() {
        assert_eq!(rule("git checkout -- file.txt").as_deref(), Some("git.checkout.discard"));
        assert_eq!(
            rule("git checkout HEAD~2 -- src/").as_deref(),
            Some("git.checkout.ref_path")
        );
        assert_eq!(rule("git checkout .").as_deref(), Some("git.checkout.discard"));
        assert_eq!(rule("git checkout -f main").as_deref(), Some("git.checkout.force"));
        assert_eq!(
            rule("git checkout --pathspec-from-file=list.txt").as_deref(),
            Some("git.checkout.pathspec_file")
        );
        assert_eq!(
            rule("git checkout main src/lib.rs").as_deref(),
            Some("git.checkout.ambiguous")
        );
    }

    #[test]
    fn test_checkout_safe() {
        assert!(!blocked("git checkout main"));
        assert!(!blocked("git checkout -b feature"));
        assert!(!blocked("git checkout -b feature origin/feature"));
        assert!(!blocked("git checkout --orphan gh-pages"));
    }

    #[test]
    fn test_checkout_positional_args() {
        let args = tokenize("-b new base --conflict merge path");
        assert_eq!(checkout_positional_args(&args), vec!["base", "path"]);
    }

    #[test]
    fn test_restore() {
        assert_eq!(rule("git restore file.txt").as_deref(), Some("git.restore"));
        assert_eq!(
            rule("git restore --staged --worktree f").as_deref(),
            Some("git.restore.worktree")
        );
        assert!(!blocked("git restore --staged file.txt"));
        assert!(!blocked("git restore --help"));
    }

    #[test]
    fn test_clean() {
        assert!(blocked("git clean -f"));
        assert!(blocked("git clean -fd"));
        assert!(blocked("git clean -xdf"));
        assert!(blocked("git clean --force"));
        assert!(!blocked("git clean -n"));
        assert!(!blocked("git clean -fdn"));
        assert!(!blocked("git clean --dry-run -f"));
        assert!(!blocked("git clean"));
    }

    #[test]
    fn test_push_force() {
        assert!(blocked("git push --force"));
        assert!(blocked("git push -f origin main"));
        assert!(blocked("git push -uf origin main"));
        assert!(blocked("git push origin +main"));
        assert!(blocked("git push origin -- +main"));
        assert!(!blocked("git push --force-with-lease origin main"));
        assert!(!blocked("git push --force-with-lease=main:abc origin main"));
        assert!(!blocked("git push origin main"));
        assert!(!blocked("git push -u origin feature"));
    }

    #[test]
    fn test_branch_delete() {
        assert!(blocked("git branch -D feature"));
        assert!(blocked("git branch --delete --force feature"));
        assert!(blocked("git branch -df feature"));
        assert!(!blocked("git branch -d feature"));
        assert!(!blocked("git branch new-feature"));
    }

    #[test]
    fn test_stash() {
        assert_eq!(rule("git stash drop").as_deref(), Some("git.stash.drop"));
        assert_eq!(rule("git stash clear").as_deref(), Some("git.stash.clear"));
        assert!(!blocked("git stash"));
        assert!(!blocked("git stash list"));
        assert!(!blocked("git stash pop"));
    }

    #[test]
    fn test_worktree_remove() {
        assert!(blocked("git worktree remove --force ../wt"));
        assert!(blocked("git worktree remove -f ../wt"));
        assert!(!blocked("git worktree remove ../wt"));
        assert!(!blocked("git worktree add ../wt"));
    }

    #[test]
    fn test_safe_commands() {
        for command in ["git status", "git log --oneline", "git diff", "git commit -m 'x'", "git"] {
            assert!(!blocked(command), "{command}");
        }
    }
}
