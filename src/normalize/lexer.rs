//! Line-oriented Python lexer.
//!
//! Produces just enough structure to strip comments without gluing
//! neighbouring tokens together: every token is tagged with a coarse
//! [`TokenKind`]. Whitespace between tokens and backslash continuations are
//! consumed silently; newlines, indentation and string literals come out as
//! [`TokenKind::Other`].

// ── Token types ──────────────────────────────────────────────────

/// Coarse lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier or keyword.
    Name,
    /// Numeric literal (int, float, imaginary, any radix).
    Number,
    /// Operator or delimiter.
    Op,
    /// `#` comment up to (not including) the line break.
    Comment,
    /// Strings, newlines, indentation and anything unrecognised.
    Other,
}

impl TokenKind {
    /// Kinds that need a separating space when emitted back to back.
    pub fn is_spaced(self) -> bool {
        matches!(self, Self::Name | Self::Number | Self::Op)
    }
}

/// A single lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based physical line the token starts on.
    pub line: usize,
}

/// Input the lexer cannot make sense of.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
    #[error("line {line}: EOF in triple-quoted string")]
    UnterminatedTripleString { line: usize },
    #[error("line {line}: unindent does not match any outer indentation level")]
    InconsistentDedent { line: usize },
    #[error("EOF in multi-line statement (bracket opened on line {line})")]
    UnclosedBracket { line: usize },
}

const TAB_SIZE: usize = 8;

/// Longest operators first so the greedy match picks `**=` over `**`.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", ">>", "<<", "<=", ">=", "==",
    "!=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@",
    "&", "|", "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ";", ".", "=",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

// ── Lexer state machine ──────────────────────────────────────────

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    /// Open bracket depth; newlines inside brackets do not end a logical line.
    depth: usize,
    /// Line of the outermost currently open bracket.
    bracket_line: usize,
    indents: Vec<usize>,
    at_line_start: bool,
    line_has_code: bool,
    line_has_comment: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            depth: 0,
            bracket_line: 0,
            indents: vec![0],
            at_line_start: true,
            line_has_code: false,
            line_has_comment: false,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize) {
        if kind != TokenKind::Comment {
            self.line_has_code = true;
        }
        self.tokens.push(Token {
            kind,
            text: self.src[start..self.pos].to_string(),
            line,
        });
    }

    fn push_text(&mut self, kind: TokenKind, text: &str) {
        self.tokens.push(Token {
            kind,
            text: text.to_string(),
            line: self.line,
        });
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            if self.at_line_start && self.depth == 0 && !self.indentation()? {
                continue;
            }

            self.eat_while(|c| matches!(c, ' ' | '\t' | '\x0c'));

            let Some(c) = self.peek() else { break };
            let start = self.pos;
            let line = self.line;

            match c {
                '#' => {
                    self.eat_while(|c| c != '\n' && c != '\r');
                    self.line_has_comment = true;
                    self.push(TokenKind::Comment, start, line);
                }
                '\n' | '\r' => self.newline(),
                '\\' if matches!(self.peek_nth(1), Some('\n' | '\r')) => {
                    self.bump();
                    self.consume_line_break();
                }
                '"' | '\'' => self.string(start)?,
                c if c.is_ascii_digit() => self.number(start),
                '.' if self.peek_nth(1).is_some_and(|n| n.is_ascii_digit()) => self.number(start),
                c if c.is_alphabetic() || c == '_' => {
                    self.eat_while(|c| c.is_alphanumeric() || c == '_');
                    let src = self.src;
                    let word = &src[start..self.pos];
                    let is_prefix = STRING_PREFIXES
                        .iter()
                        .any(|p| p.eq_ignore_ascii_case(word));
                    if is_prefix && matches!(self.peek(), Some('"' | '\'')) {
                        self.string(start)?;
                    } else {
                        self.push(TokenKind::Name, start, line);
                    }
                }
                _ => self.operator(start),
            }
        }

        if self.depth > 0 {
            return Err(LexError::UnclosedBracket {
                line: self.bracket_line,
            });
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push_text(TokenKind::Other, "");
        }
        Ok(self.tokens)
    }

    /// Handle the start of a logical line. Returns `false` when the whole
    /// physical line was consumed (blank or comment-only) and the caller
    /// should restart at the next line.
    fn indentation(&mut self) -> Result<bool, LexError> {
        let start = self.pos;
        let mut column = 0usize;
        while let Some(c) = self.peek() {
            match c {
                ' ' => column += 1,
                '\t' => column = (column / TAB_SIZE + 1) * TAB_SIZE,
                '\x0c' => column = 0,
                _ => break,
            }
            self.bump();
        }

        match self.peek() {
            None => {
                self.at_line_start = false;
                return Ok(true);
            }
            Some('#') => {
                let comment_start = self.pos;
                self.eat_while(|c| c != '\n' && c != '\r');
                self.push(TokenKind::Comment, comment_start, self.line);
                self.consume_line_break();
                return Ok(false);
            }
            Some('\n' | '\r') => {
                self.newline();
                return Ok(false);
            }
            _ => {}
        }

        let top = self.indents.last().copied().unwrap_or(0);
        if column > top {
            self.indents.push(column);
            let src = self.src;
            self.push_text(TokenKind::Other, &src[start..self.pos]);
        } else {
            while column < self.indents.last().copied().unwrap_or(0) {
                self.indents.pop();
                self.push_text(TokenKind::Other, "");
            }
            if self.indents.last().copied().unwrap_or(0) != column {
                return Err(LexError::InconsistentDedent { line: self.line });
            }
        }
        self.at_line_start = false;
        Ok(true)
    }

    /// Consume one line break without emitting anything.
    fn consume_line_break(&mut self) {
        if self.peek() == Some('\r') {
            self.bump();
        }
        if self.peek() == Some('\n') {
            self.bump();
        }
        self.line += 1;
        self.line_has_code = false;
        self.line_has_comment = false;
    }

    /// A line break outside a string. Comment-only lines leave no trace.
    fn newline(&mut self) {
        let start = self.pos;
        let line = self.line;
        let drop_break = self.line_has_comment && !self.line_has_code;
        self.consume_line_break();
        if !drop_break {
            self.tokens.push(Token {
                kind: TokenKind::Other,
                text: self.src[start..self.pos].to_string(),
                line,
            });
        }
        if self.depth == 0 {
            self.at_line_start = true;
        }
    }

    fn number(&mut self, start: usize) {
        let line = self.line;
        let radix = self.rest().get(..2).map(|p| p.to_ascii_lowercase());
        match radix.as_deref() {
            Some("0x") => {
                self.pos += 2;
                self.eat_while(|c| c.is_ascii_hexdigit() || c == '_');
            }
            Some("0o") | Some("0b") => {
                self.pos += 2;
                self.eat_while(|c| c.is_ascii_digit() || c == '_');
            }
            _ => {
                self.eat_while(|c| c.is_ascii_digit() || c == '_');
                if self.peek() == Some('.') {
                    self.bump();
                    self.eat_while(|c| c.is_ascii_digit() || c == '_');
                }
                if matches!(self.peek(), Some('e' | 'E')) {
                    let exp_digit = match self.peek_nth(1) {
                        Some('+' | '-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                        Some(c) => c.is_ascii_digit(),
                        None => false,
                    };
                    if exp_digit {
                        self.bump();
                        if matches!(self.peek(), Some('+' | '-')) {
                            self.bump();
                        }
                        self.eat_while(|c| c.is_ascii_digit() || c == '_');
                    }
                }
                if matches!(self.peek(), Some('j' | 'J')) {
                    self.bump();
                }
            }
        }
        self.push(TokenKind::Number, start, line);
    }

    /// Lex a string literal; `start` points at the prefix (if any) and the
    /// cursor at the opening quote.
    fn string(&mut self, start: usize) -> Result<(), LexError> {
        let line = self.line;
        let Some(quote) = self.bump() else {
            return Err(LexError::UnterminatedString { line });
        };
        let triple = quote.to_string().repeat(3);

        if self.rest().starts_with(&triple[1..]) {
            self.pos += 2;
            loop {
                if self.rest().starts_with(triple.as_str()) {
                    self.pos += 3;
                    break;
                }
                match self.bump() {
                    None => return Err(LexError::UnterminatedTripleString { line }),
                    Some('\\') => {
                        if self.bump() == Some('\n') {
                            self.line += 1;
                        }
                    }
                    Some('\n') => self.line += 1,
                    Some(_) => {}
                }
            }
        } else {
            loop {
                match self.bump() {
                    None | Some('\n') | Some('\r') => {
                        return Err(LexError::UnterminatedString { line })
                    }
                    Some('\\') => match self.bump() {
                        Some('\r') => {
                            if self.peek() == Some('\n') {
                                self.bump();
                            }
                            self.line += 1;
                        }
                        Some('\n') => self.line += 1,
                        _ => {}
                    },
                    Some(c) if c == quote => break,
                    Some(_) => {}
                }
            }
        }

        self.push(TokenKind::Other, start, line);
        Ok(())
    }

    fn operator(&mut self, start: usize) {
        let line = self.line;
        let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(**op)) else {
            // Stray characters (`$`, `?`, `!`, a lone backslash) pass through.
            self.bump();
            self.push(TokenKind::Other, start, line);
            return;
        };

        self.pos += op.len();
        match *op {
            "(" | "[" | "{" => {
                if self.depth == 0 {
                    self.bracket_line = line;
                }
                self.depth += 1;
            }
            ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.push(TokenKind::Op, start, line);
    }
}

// ── Tests ────────────────────────────────────────────────────────
