//! Shell-style tokenization (shlex-like).
//!
//! Produces plain string tokens. Quotes are removed, escapes are resolved,
//! redirections are dropped together with their targets, and command
//! substitutions are kept verbatim inside the word that contains them.

/// Result of tokenizing a piece of shell text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    /// The words, in order.
    pub tokens: Vec<String>,
    /// True when a quote or substitution was still open at end of input.
    pub unterminated: bool,
}

/// Tokenize a shell command into words, respecting quotes and escapes.
pub fn tokenize(input: &str) -> Vec<String> {
    tokenize_with_status(input).tokens
}

/// Tokenize and report whether the input ended inside an open quote.
pub fn tokenize_with_status(input: &str) -> Tokenized {
    let chars: Vec<char> = input.chars().collect();
    let mut lexer = Lexer::default();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            lexer.flush();
            i += 1;
            continue;
        }

        match c {
            '\\' => {
                match chars.get(i + 1) {
                    Some('\n') => {}
                    Some(next) => lexer.push(*next),
                    None => lexer.push('\\'),
                }
                i += 2;
            }
            '\'' => {
                lexer.started = true;
                match find_char(&chars, i + 1, '\'') {
                    Some(end) => {
                        lexer.push_slice(&chars[i + 1..end]);
                        i = end + 1;
                    }
                    None => {
                        lexer.push_slice(&chars[i + 1..]);
                        lexer.unterminated = true;
                        i = chars.len();
                    }
                }
            }
            '$' if chars.get(i + 1) == Some(&'\'') => {
                lexer.started = true;
                lexer.digits_only = false;
                i = read_ansi_c(&chars, i + 2, &mut lexer);
            }
            '"' => {
                lexer.started = true;
                i = read_double_quoted(&chars, i + 1, &mut lexer);
            }
            '$' if chars.get(i + 1) == Some(&'(') => {
                i = copy_substitution(&chars, i, i + 2, &mut lexer);
            }
            '`' => {
                i = copy_backticks(&chars, i, &mut lexer);
            }
            '<' | '>' if chars.get(i + 1) == Some(&'(') => {
                i = copy_substitution(&chars, i, i + 2, &mut lexer);
            }
            '<' | '>' => {
                i = read_redirect(&chars, i, &mut lexer);
            }
            '&' if chars.get(i + 1) == Some(&'>') => {
                i = read_redirect(&chars, i, &mut lexer);
            }
            '#' if !lexer.started => {
                // Comment runs to end of line.
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            _ => {
                lexer.push(c);
                i += 1;
            }
        }
    }

    lexer.flush();
    Tokenized {
        tokens: lexer.tokens,
        unterminated: lexer.unterminated,
    }
}

#[derive(Default)]
struct Lexer {
    tokens: Vec<String>,
    current: String,
    /// A word has begun, even if it is still empty (e.g. `""`).
    started: bool,
    /// Current word only holds characters that came from unquoted digits.
    digits_only: bool,
    /// Next completed word is a redirection target and must be discarded.
    skip_next: bool,
    unterminated: bool,
}

impl Lexer {
    fn push(&mut self, c: char) {
        if !self.started {
            self.digits_only = true;
        }
        self.digits_only &= c.is_ascii_digit();
        self.started = true;
        self.current.push(c);
    }

    fn push_slice(&mut self, chars: &[char]) {
        self.started = true;
        self.digits_only = false;
        self.current.extend(chars.iter());
    }

    fn flush(&mut self) {
        if self.started {
            let word = std::mem::take(&mut self.current);
            if self.skip_next {
                self.skip_next = false;
            } else {
                self.tokens.push(word);
            }
        }
        self.current.clear();
        self.started = false;
        self.digits_only = false;
    }
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    (from..chars.len()).find(|&j| chars[j] == target)
}

fn read_ansi_c(chars: &[char], mut i: usize, lexer: &mut Lexer) -> usize {
    while i < chars.len() {
        match chars[i] {
            '\'' => return i + 1,
            '\\' if i + 1 < chars.len() => {
                let decoded = match chars[i + 1] {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    'e' | 'E' => '\u{1b}',
                    other => other,
                };
                lexer.current.push(decoded);
                i += 2;
            }
            c => {
                lexer.current.push(c);
                i += 1;
            }
        }
    }
    lexer.unterminated = true;
    i
}

fn read_double_quoted(chars: &[char], mut i: usize, lexer: &mut Lexer) -> usize {
    lexer.digits_only = false;
    while i < chars.len() {
        match chars[i] {
            '"' => return i + 1,
            '\\' if i + 1 < chars.len() => {
                match chars[i + 1] {
                    '\n' => {}
                    c @ ('$' | '`' | '"' | '\\') => lexer.current.push(c),
                    c => {
                        lexer.current.push('\\');
                        lexer.current.push(c);
                    }
                }
                i += 2;
            }
            '$' if chars.get(i + 1) == Some(&'(') => {
                i = copy_substitution(chars, i, i + 2, lexer);
            }
            '`' => {
                i = copy_backticks(chars, i, lexer);
            }
            c => {
                lexer.current.push(c);
                i += 1;
            }
        }
    }
    lexer.unterminated = true;
    i
}

/// Copy `$(...)` (or `<(...)`) verbatim into the current word.
fn copy_substitution(chars: &[char], start: usize, body: usize, lexer: &mut Lexer) -> usize {
    let end = match find_closing_paren(chars, body) {
        Some(end) => end + 1,
        None => {
            lexer.unterminated = true;
            chars.len()
        }
    };
    lexer.push_slice(&chars[start..end]);
    end
}

fn copy_backticks(chars: &[char], start: usize, lexer: &mut Lexer) -> usize {
    let end = match find_closing_backtick(chars, start + 1) {
        Some(end) => end + 1,
        None => {
            lexer.unterminated = true;
            chars.len()
        }
    };
    lexer.push_slice(&chars[start..end]);
    end
}

/// Consume a redirection operator. Its target word is dropped.
fn read_redirect(chars: &[char], mut i: usize, lexer: &mut Lexer) -> usize {
    // A word made only of digits directly before the operator is an fd number.
    if lexer.started && lexer.digits_only {
        lexer.current.clear();
        lexer.started = false;
    } else {
        lexer.flush();
    }

    let first = chars[i];
    i += 1;
    let mut dup = first == '&';
    match first {
        '&' => {
            // &> and &>>
            i += 1;
            if chars.get(i) == Some(&'>') {
                i += 1;
            }
        }
        '>' => match chars.get(i) {
            Some('>') | Some('|') => i += 1,
            Some('&') => {
                dup = true;
                i += 1;
            }
            _ => {}
        },
        _ => match chars.get(i) {
            Some('<') => {
                i += 1;
                if matches!(chars.get(i), Some('<') | Some('-')) {
                    i += 1;
                }
            }
            Some('>') => i += 1,
            Some('&') => {
                dup = true;
                i += 1;
            }
            _ => {}
        },
    }

    if dup {
        // `2>&1`, `>&-`: the target is glued to the operator.
        let mut consumed = false;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '-') {
            i += 1;
            consumed = true;
        }
        if consumed {
            return i;
        }
    }

    lexer.skip_next = true;
    i
}

/// Index of the `)` closing a group whose body starts at `from`.
pub(crate) fn find_closing_paren(chars: &[char], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '\'' => i = find_char(chars, i + 1, '\'')?,
            '"' => i = find_closing_double_quote(chars, i + 1)?,
            '`' => i = find_closing_backtick(chars, i + 1)?,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

pub(crate) fn find_closing_backtick(chars: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '`' => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn find_closing_double_quote(chars: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '"' => return Some(i),
            '$' if chars.get(i + 1) == Some(&'(') => i = find_closing_paren(chars, i + 2)?,
            _ => {}
        }
        i += 1;
    }
    None
}
