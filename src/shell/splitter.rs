//! Split shell commands on operators (&&, ||, |, ;, &, newlines, subshells).

use super::tokenizer::{find_closing_backtick, find_closing_paren, tokenize_with_status};

/// Maximum nesting of `$(...)` / backtick bodies that get split out.
const MAX_SUBSTITUTION_DEPTH: usize = 8;

/// Shell operators that separate commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// && - run next if previous succeeds
    And,
    /// || - run next if previous fails
    Or,
    /// | or |& - pipe output to next command
    Pipe,
    /// ; or newline - run sequentially
    Semicolon,
    /// & - run in background
    Background,
    /// ( or ) - subshell boundary
    Subshell,
}

/// A segment of a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSegment {
    /// The raw command text.
    pub command: String,
    /// Tokens of the command text.
    pub tokens: Vec<String>,
    /// The operator that follows this segment (None for last segment).
    pub operator: Option<Operator>,
    /// Quoting or a substitution was left open in this segment.
    pub unterminated: bool,
    /// Child shells enclosing this segment, outermost first. Ids are unique
    /// within one split: `(...)` groups and substitution bodies.
    pub scopes: Vec<usize>,
    /// Runs as its own process: a pipeline member or a background job.
    pub forked: bool,
}

impl CommandSegment {
    fn new(command: &str, operator: Option<Operator>, unterminated: bool) -> Self {
        let tokenized = tokenize_with_status(command);
        Self {
            command: command.to_string(),
            tokens: tokenized.tokens,
            operator,
            unterminated: unterminated || tokenized.unterminated,
            scopes: Vec::new(),
            forked: false,
        }
    }

    /// First token, if the segment has any.
    pub fn head(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }
}

/// Split a command line into segments on shell operators.
///
/// Respects quoting (', ", $'...') and escapes. Bodies of command and
/// process substitutions are split as well and emitted before the segment
/// that contains them, since the shell runs them first.
pub fn split_commands(input: &str) -> Vec<CommandSegment> {
    let chars: Vec<char> = input.chars().collect();
    split_chars(&chars, 0, Vec::new(), 0).0
}

/// Returns the segments and the next unused scope id.
fn split_chars(
    chars: &[char],
    depth: usize,
    scope: Vec<usize>,
    next_scope: usize,
) -> (Vec<CommandSegment>, usize) {
    let base_scopes = scope.len();
    let mut splitter = Splitter {
        segments: Vec::new(),
        nested: Vec::new(),
        current: String::new(),
        depth,
        scope,
        next_scope,
        after_pipe: false,
    };
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut unterminated = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_single_quote {
            if c == '\'' {
                in_single_quote = false;
            }
            splitter.current.push(c);
            i += 1;
            continue;
        }

        if c == '\\' {
            splitter.current.push(c);
            if let Some(next) = chars.get(i + 1) {
                splitter.current.push(*next);
            }
            i += 2;
            continue;
        }

        if c == '"' {
            in_double_quote = !in_double_quote;
            splitter.current.push(c);
            i += 1;
            continue;
        }

        if c == '$' && chars.get(i + 1) == Some(&'(') {
            let (next, closed) = splitter.substitution(chars, i, i + 2);
            unterminated |= !closed;
            i = next;
            continue;
        }

        if c == '`' {
            let (next, closed) = splitter.backticks(chars, i);
            unterminated |= !closed;
            i = next;
            continue;
        }

        if in_double_quote {
            splitter.current.push(c);
            i += 1;
            continue;
        }

        if c == '\'' {
            // $'...' is handled the same way as '...'.
            in_single_quote = true;
            splitter.current.push(c);
            i += 1;
            continue;
        }

        if (c == '<' || c == '>') && chars.get(i + 1) == Some(&'(') {
            let (next, closed) = splitter.substitution(chars, i, i + 2);
            unterminated |= !closed;
            i = next;
            continue;
        }

        if c == '#' && splitter.at_word_start() {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        let next = chars.get(i + 1).copied();
        let prev = splitter.current.chars().last();
        match c {
            '&' => {
                if next == Some('&') {
                    splitter.flush(Some(Operator::And), false);
                    i += 2;
                } else if next == Some('>') || matches!(prev, Some('>') | Some('<')) {
                    // &> and >& are redirections
                    splitter.current.push(c);
                    i += 1;
                } else {
                    splitter.flush(Some(Operator::Background), false);
                    i += 1;
                }
            }
            '|' => {
                if next == Some('|') {
                    splitter.flush(Some(Operator::Or), false);
                    i += 2;
                } else if prev == Some('>') {
                    // >| clobber redirection
                    splitter.current.push(c);
                    i += 1;
                } else if next == Some('&') {
                    splitter.flush(Some(Operator::Pipe), false);
                    i += 2;
                } else {
                    splitter.flush(Some(Operator::Pipe), false);
                    i += 1;
                }
            }
            ';' => {
                splitter.flush(Some(Operator::Semicolon), false);
                i += if next == Some(';') { 2 } else { 1 };
            }
            '\n' => {
                splitter.flush(Some(Operator::Semicolon), false);
                i += 1;
            }
            '(' => {
                splitter.flush(Some(Operator::Subshell), false);
                splitter.open_scope();
                i += 1;
            }
            ')' => {
                splitter.flush(Some(Operator::Subshell), false);
                if splitter.scope.len() > base_scopes {
                    splitter.scope.pop();
                }
                i += 1;
            }
            _ => {
                splitter.current.push(c);
                i += 1;
            }
        }
    }

    unterminated |= in_single_quote || in_double_quote;
    splitter.flush(None, unterminated);
    (splitter.segments, splitter.next_scope)
}

struct Splitter {
    segments: Vec<CommandSegment>,
    /// Segments from substitutions inside the current segment.
    nested: Vec<CommandSegment>,
    current: String,
    depth: usize,
    /// Open child shells at the current position.
    scope: Vec<usize>,
    next_scope: usize,
    /// The previous segment piped into the current one.
    after_pipe: bool,
}

impl Splitter {
    fn at_word_start(&self) -> bool {
        self.current.chars().last().is_none_or(char::is_whitespace)
    }

    fn open_scope(&mut self) {
        self.scope.push(self.next_scope);
        self.next_scope += 1;
    }

    fn flush(&mut self, operator: Option<Operator>, unterminated: bool) {
        self.segments.append(&mut self.nested);
        let forks = matches!(operator, Some(Operator::Pipe | Operator::Background));
        let trimmed = self.current.trim();
        if !trimmed.is_empty() {
            let mut segment = CommandSegment::new(trimmed, operator, unterminated);
            segment.scopes = self.scope.clone();
            segment.forked = forks || self.after_pipe;
            self.segments.push(segment);
            self.after_pipe = operator == Some(Operator::Pipe);
        } else {
            if let Some(last) = self.segments.last_mut() {
                // `a && (b)`: keep the strongest following operator on `a`.
                if last.operator.is_none() || last.operator == Some(Operator::Subshell) {
                    last.operator = operator.or(last.operator);
                }
                last.unterminated |= unterminated;
            }
            self.after_pipe |= operator == Some(Operator::Pipe);
        }
        self.current.clear();
    }

    /// Copy `$(...)`/`<(...)` into the current text and split its body.
    fn substitution(&mut self, chars: &[char], start: usize, body: usize) -> (usize, bool) {
        let (end, closed) = match find_closing_paren(chars, body) {
            Some(end) => (end, true),
            None => (chars.len(), false),
        };
        self.split_nested(&chars[body..end]);
        let next = if closed { end + 1 } else { end };
        self.current.extend(&chars[start..next]);
        (next, closed)
    }

    fn backticks(&mut self, chars: &[char], start: usize) -> (usize, bool) {
        let (end, closed) = match find_closing_backtick(chars, start + 1) {
            Some(end) => (end, true),
            None => (chars.len(), false),
        };
        self.split_nested(&chars[start + 1..end]);
        let next = if closed { end + 1 } else { end };
        self.current.extend(&chars[start..next]);
        (next, closed)
    }

    fn split_nested(&mut self, body: &[char]) {
        if self.depth < MAX_SUBSTITUTION_DEPTH {
            let mut scope = self.scope.clone();
            scope.push(self.next_scope);
            let (segments, next_scope) =
                split_chars(body, self.depth + 1, scope, self.next_scope + 1);
            self.next_scope = next_scope;
            self.nested.extend(segments);
        }
    }
}
