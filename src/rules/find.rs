//! find command analysis.

use crate::decision::Decision;
use crate::shell::{normalize_command_token, strip_wrappers};

use super::rm::has_recursive_force;

const REASON_FIND_DELETE: &str =
    "find -delete permanently removes files. Use -print first to preview.";
const REASON_FIND_EXEC_RM: &str = "find -exec rm -rf is dangerous. Use explicit file list instead.";

/// Tests and actions whose next token is a value, not an expression.
const VALUE_PRIMARIES: &[&str] = &[
    "-name", "-iname", "-path", "-ipath", "-wholename", "-iwholename", "-regex", "-iregex",
    "-lname", "-ilname", "-type", "-xtype", "-newer", "-anewer", "-cnewer", "-perm", "-size",
    "-user", "-group", "-uid", "-gid", "-mtime", "-atime", "-ctime", "-mmin", "-amin", "-cmin",
    "-maxdepth", "-mindepth", "-links", "-inum", "-samefile", "-used", "-fstype", "-context",
    "-printf", "-fprintf", "-fprint", "-fprint0", "-fls", "-regextype", "-files0-from",
];

const EXEC_PRIMARIES: &[&str] = &["-exec", "-execdir", "-ok", "-okdir"];

/// Analyze find command for dangerous operations.
pub fn analyze_find(tokens: &[String]) -> Decision {
    let args = tokens.get(1..).unwrap_or_default();

    if find_has_delete(args) {
        return Decision::block("find.delete", REASON_FIND_DELETE);
    }

    for command in exec_commands(args) {
        let stripped = strip_wrappers(command);
        let is_rm = stripped
            .first()
            .is_some_and(|head| normalize_command_token(head) == "rm");
        if is_rm && has_recursive_force(&stripped) {
            return Decision::block("find.exec_rm", REASON_FIND_EXEC_RM);
        }
    }

    Decision::allow()
}

/// True when `-delete` appears as an action of the find expression.
///
/// Values of options such as `-name -delete` and arguments of `-exec`
/// are skipped.
pub fn find_has_delete(args: &[String]) -> bool {
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "-delete" {
            return true;
        }
        if VALUE_PRIMARIES.contains(&arg) {
            i += 2;
            continue;
        }
        if EXEC_PRIMARIES.contains(&arg) {
            i = exec_end(args, i + 1) + 1;
            continue;
        }
        i += 1;
    }
    false
}

/// Index of the `;` or `+` terminating an exec command starting at `from`.
fn exec_end(args: &[String], from: usize) -> usize {
    (from..args.len())
        .find(|&j| matches!(args[j].as_str(), ";" | "\\;" | "+"))
        .unwrap_or(args.len())
}

/// Commands run by -exec/-execdir/-ok/-okdir.
fn exec_commands(args: &[String]) -> Vec<&[String]> {
    let mut commands = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if VALUE_PRIMARIES.contains(&arg) {
            i += 2;
            continue;
        }
        if EXEC_PRIMARIES.contains(&arg) {
            let end = exec_end(args, i + 1);
            commands.push(&args[(i + 1).min(end)..end]);
            i = end + 1;
            continue;
        }
        i += 1;
    }
    commands
}
