//! Classification of a command head into the family that handles it.

/// Shells that run a script passed with `-c`.
const SHELLS: &[&str] = &[
    "sh", "bash", "zsh", "dash", "ksh", "mksh", "ash", "fish", "csh", "tcsh", "busybox-sh",
];

/// Which analysis a command gets, keyed by its normalized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Cd,
    Shell,
    Eval,
    Interpreter(Interpreter),
    Busybox,
    Git,
    Rm,
    Find,
    Xargs,
    Parallel,
    Other,
}

/// Language runtimes that accept inline code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    Python,
    Node,
    Ruby,
    Perl,
    Php,
}

impl Interpreter {
    /// Flags whose value is inline code.
    fn code_flags(self) -> &'static [&'static str] {
        match self {
            Interpreter::Python => &["-c"],
            Interpreter::Node => &["-e", "--eval", "-p", "--print"],
            Interpreter::Ruby => &["-e"],
            Interpreter::Perl => &["-e", "-E"],
            Interpreter::Php => &["-r"],
        }
    }

    /// Inline code passed to the interpreter, if any.
    pub fn inline_code(self, tokens: &[String]) -> Option<&str> {
        let flags = self.code_flags();
        let pos = tokens.iter().skip(1).position(|t| flags.contains(&t.as_str()))?;
        tokens.get(pos + 2).map(String::as_str)
    }
}

impl CommandKind {
    pub fn classify(name: &str) -> Self {
        match name {
            "cd" | "pushd" | "popd" => CommandKind::Cd,
            "eval" => CommandKind::Eval,
            "busybox" => CommandKind::Busybox,
            "git" => CommandKind::Git,
            "rm" => CommandKind::Rm,
            "find" => CommandKind::Find,
            "xargs" => CommandKind::Xargs,
            "parallel" => CommandKind::Parallel,
            "node" | "nodejs" | "bun" | "deno" => CommandKind::Interpreter(Interpreter::Node),
            "ruby" => CommandKind::Interpreter(Interpreter::Ruby),
            "perl" => CommandKind::Interpreter(Interpreter::Perl),
            "php" => CommandKind::Interpreter(Interpreter::Php),
            _ if is_shell(name) => CommandKind::Shell,
            _ if is_python(name) => CommandKind::Interpreter(Interpreter::Python),
            _ => CommandKind::Other,
        }
    }
}

pub fn is_shell(name: &str) -> bool {
    SHELLS.contains(&name)
}

fn is_python(name: &str) -> bool {
    name.strip_prefix("python")
        .is_some_and(|version| version.chars().all(|c| c.is_ascii_digit() || c == '.'))
}

/// Where the `-c` script sits in a shell invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellScript {
    /// No `-c` flag before the first operand.
    NoFlag,
    /// `-c` given as the last token.
    Missing,
    /// Index of the script token.
    At(usize),
}

/// Locate the script of `sh -c SCRIPT`, also in clusters like `-lc`.
pub fn find_shell_script(tokens: &[String]) -> ShellScript {
    for (i, token) in tokens.iter().enumerate().skip(1) {
        if token == "--" || !token.starts_with('-') {
            break;
        }
        if token.starts_with("--") {
            continue;
        }
        if token.chars().skip(1).any(|c| c == 'c') {
            return if i + 1 < tokens.len() {
                ShellScript::At(i + 1)
            } else {
                ShellScript::Missing
            };
        }
    }
    ShellScript::NoFlag
}
