//! Lexer for the fragment language.
//!
//! Produces a flat token stream with explicit `Indent`/`Dedent` tokens so
//! the parser never sees raw whitespace. Newlines inside brackets are
//! suppressed (implicit line joining); `;` separates statements on one line.

use super::fault::Fault;

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    Newline,
    Semi,
    Indent,
    Dedent,
    EndOfInput,

    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Keywords
    True,
    False,
    None,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Not,
    And,
    Or,
    Break,
    Continue,
    Pass,

    // Operators and punctuation
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    DoubleSlashAssign,
    PercentAssign,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tok {
    pub kind: TokKind,
    pub line: usize,
}

enum Word {
    Kw(TokKind),
    /// A reserved word from the unsupported statement set.
    Reserved,
    Name(String),
}

fn classify_word(word: String) -> Word {
    let kind = match word.as_str() {
        "True" => TokKind::True,
        "False" => TokKind::False,
        "None" => TokKind::None,
        "if" => TokKind::If,
        "elif" => TokKind::Elif,
        "else" => TokKind::Else,
        "while" => TokKind::While,
        "for" => TokKind::For,
        "in" => TokKind::In,
        "not" => TokKind::Not,
        "and" => TokKind::And,
        "or" => TokKind::Or,
        "break" => TokKind::Break,
        "continue" => TokKind::Continue,
        "pass" => TokKind::Pass,
        "def" | "class" | "import" | "from" | "try" | "except" | "finally" | "raise" | "del"
        | "lambda" | "with" | "return" | "yield" | "global" | "nonlocal" | "assert" | "is"
        | "async" | "await" => return Word::Reserved,
        _ => return Word::Name(word),
    };
    Word::Kw(kind)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    toks: Vec<Tok>,
    indents: Vec<usize>,
    depth: usize,
}

/// Tokenize a source fragment. Any lexical problem is a contained
/// `SyntaxError` fault, like every other evaluation failure.
pub fn tokenize(source: &str) -> Result<Vec<Tok>, Fault> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        toks: Vec::new(),
        indents: vec![0],
        depth: 0,
    };
    lexer.run()?;
    Ok(lexer.toks)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokKind) {
        self.toks.push(Tok {
            kind,
            line: self.line,
        });
    }

    fn run(&mut self) -> Result<(), Fault> {
        let mut at_line_start = true;
        while self.pos < self.chars.len() {
            if at_line_start && self.depth == 0 {
                if self.handle_indentation()? {
                    continue; // blank or comment-only line consumed
                }
                at_line_start = false;
                continue;
            }
            let c = self.chars[self.pos];
            match c {
                ' ' | '\t' => self.pos += 1,
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                '\n' => {
                    self.pos += 1;
                    if self.depth == 0 {
                        if !matches!(
                            self.toks.last().map(|t| &t.kind),
                            Some(TokKind::Newline) | Some(TokKind::Semi) | Option::None
                        ) {
                            self.push(TokKind::Newline);
                        }
                        at_line_start = true;
                    }
                    self.line += 1;
                }
                '\\' if self.peek_at(1) == Some('\n') => {
                    // Explicit line joining.
                    self.pos += 2;
                    self.line += 1;
                }
                ';' => {
                    self.push(TokKind::Semi);
                    self.pos += 1;
                }
                '\'' | '"' => self.string(c)?,
                '0'..='9' => self.number()?,
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.ident()?,
                _ => self.operator()?,
            }
        }
        // Close out the final line and any open blocks.
        if !matches!(
            self.toks.last().map(|t| &t.kind),
            Some(TokKind::Newline) | Some(TokKind::Semi) | Some(TokKind::Dedent) | Option::None
        ) {
            self.push(TokKind::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokKind::Dedent);
        }
        self.push(TokKind::EndOfInput);
        Ok(())
    }

    /// Measure leading whitespace and emit Indent/Dedent tokens. Returns
    /// true when the line held nothing worth tokenizing.
    fn handle_indentation(&mut self) -> Result<bool, Fault> {
        let mut col = 0usize;
        while let Some(c) = self.peek() {
            match c {
                ' ' => col += 1,
                '\t' => col += 8 - col % 8,
                _ => break,
            }
            self.pos += 1;
        }
        match self.peek() {
            Option::None => return Ok(true),
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                return Ok(true);
            }
            Some('#') => {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
                return Ok(true);
            }
            _ => {}
        }
        let current = *self.indents.last().unwrap_or(&0);
        if col > current {
            self.indents.push(col);
            self.push(TokKind::Indent);
        } else if col < current {
            while col < *self.indents.last().unwrap_or(&0) {
                self.indents.pop();
                self.push(TokKind::Dedent);
            }
            if col != *self.indents.last().unwrap_or(&0) {
                return Err(Fault::syntax(format!(
                    "unindent does not match any outer indentation level (line {})",
                    self.line
                )));
            }
        }
        Ok(false)
    }

    fn string(&mut self, quote: char) -> Result<(), Fault> {
        let start_line = self.line;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                Option::None | Some('\n') => {
                    return Err(Fault::syntax(format!(
                        "unterminated string literal (line {start_line})"
                    )));
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    let Some(esc) = self.peek() else {
                        return Err(Fault::syntax(format!(
                            "unterminated string literal (line {start_line})"
                        )));
                    };
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' => out.push('\\'),
                        '\'' => out.push('\''),
                        '"' => out.push('"'),
                        // Unknown escapes keep the backslash, as the
                        // reference language does.
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
        self.push(TokKind::Str(out));
        Ok(())
    }

    fn number(&mut self) -> Result<(), Fault> {
        let start = self.pos;
        let mut is_float = false;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '_')
        {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') {
            is_float = true;
            self.pos += 1;
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_digit() || c == '_')
            {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut ahead = 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                ahead = 2;
            }
            if self.peek_at(ahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += ahead;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| Fault::syntax(format!("invalid number literal '{text}'")))?;
            self.push(TokKind::Float(value));
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| Fault::overflow(format!("integer literal too large: '{text}'")))?;
            self.push(TokKind::Int(value));
        }
        Ok(())
    }

    fn ident(&mut self) -> Result<(), Fault> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match classify_word(word) {
            Word::Kw(kind) => self.push(kind),
            Word::Reserved => {
                let word: String = self.chars[start..self.pos].iter().collect();
                return Err(Fault::syntax(format!(
                    "'{word}' is not supported in fragments"
                )));
            }
            Word::Name(name) => self.push(TokKind::Ident(name)),
        }
        Ok(())
    }

    fn operator(&mut self) -> Result<(), Fault> {
        let c = self.chars[self.pos];
        let next = self.peek_at(1);
        let (kind, width) = match (c, next) {
            ('*', Some('*')) => (TokKind::DoubleStar, 2),
            ('/', Some('/')) => {
                if self.peek_at(2) == Some('=') {
                    (TokKind::DoubleSlashAssign, 3)
                } else {
                    (TokKind::DoubleSlash, 2)
                }
            }
            ('+', Some('=')) => (TokKind::PlusAssign, 2),
            ('-', Some('=')) => (TokKind::MinusAssign, 2),
            ('*', Some('=')) => (TokKind::StarAssign, 2),
            ('/', Some('=')) => (TokKind::SlashAssign, 2),
            ('%', Some('=')) => (TokKind::PercentAssign, 2),
            ('=', Some('=')) => (TokKind::EqEq, 2),
            ('!', Some('=')) => (TokKind::NotEq, 2),
            ('<', Some('=')) => (TokKind::LtEq, 2),
            ('>', Some('=')) => (TokKind::GtEq, 2),
            ('+', _) => (TokKind::Plus, 1),
            ('-', _) => (TokKind::Minus, 1),
            ('*', _) => (TokKind::Star, 1),
            ('/', _) => (TokKind::Slash, 1),
            ('%', _) => (TokKind::Percent, 1),
            ('=', _) => (TokKind::Assign, 1),
            ('<', _) => (TokKind::Lt, 1),
            ('>', _) => (TokKind::Gt, 1),
            ('(', _) => {
                self.depth += 1;
                (TokKind::LParen, 1)
            }
            (')', _) => {
                self.depth = self.depth.saturating_sub(1);
                (TokKind::RParen, 1)
            }
            ('[', _) => {
                self.depth += 1;
                (TokKind::LBracket, 1)
            }
            (']', _) => {
                self.depth = self.depth.saturating_sub(1);
                (TokKind::RBracket, 1)
            }
            ('{', _) => {
                self.depth += 1;
                (TokKind::LBrace, 1)
            }
            ('}', _) => {
                self.depth = self.depth.saturating_sub(1);
                (TokKind::RBrace, 1)
            }
            (',', _) => (TokKind::Comma, 1),
            (':', _) => (TokKind::Colon, 1),
            _ => {
                return Err(Fault::syntax(format!(
                    "invalid character {c:?} (line {})",
                    self.line
                )));
            }
        };
        // Handle '**=' which the two-char match above cannot see.
        if kind == TokKind::DoubleStar && self.peek_at(2) == Some('=') {
            return Err(Fault::syntax("'**=' is not supported in fragments".to_string()));
        }
        self.pos += width;
        self.push(kind);
        Ok(())
    }
}
