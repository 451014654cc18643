//! Tokenizer for the Lua table-constructor dialect.
//!
//! [`Lexer`] turns source text into [`Spanned`] tokens, skipping whitespace
//! and comments. [`split_outside_strings`] cuts raw text at a separator
//! without looking inside string literals or comments, so entry fragments can
//! be located before they are tokenized.

use std::fmt;

/// Kind of a [`LuaSyntaxError`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SyntaxErrorKind {
    #[display("unterminated string")]
    UnterminatedString,
    #[display("unterminated comment")]
    UnterminatedComment,
    #[display("unexpected character {_0:?}")]
    UnexpectedChar(char),
    #[display("invalid number literal {_0:?}")]
    InvalidNumber(String),
    #[display("unexpected {_0}")]
    UnexpectedToken(String),
    #[display("unexpected end of input")]
    UnexpectedEof,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("{kind} at byte {offset}")]
pub struct LuaSyntaxError {
    pub offset: usize,
    pub kind: SyntaxErrorKind,
}

impl LuaSyntaxError {
    #[must_use]
    pub fn new(offset: usize, kind: SyntaxErrorKind) -> Self {
        Self { offset, kind }
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.kind == SyntaxErrorKind::UnexpectedEof
    }
}

/// A lexical token. Names borrow from the source, strings are unescaped.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Assign,
    Comma,
    Semicolon,
    Str(String),
    Int(i64),
    Float(f64),
    Ident(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LBrace => f.write_str("'{'"),
            Token::RBrace => f.write_str("'}'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Assign => f.write_str("'='"),
            Token::Comma => f.write_str("','"),
            Token::Semicolon => f.write_str("';'"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Int(i) => write!(f, "number {i}"),
            Token::Float(x) => write!(f, "number {x}"),
            Token::Ident(name) => write!(f, "name '{name}'"),
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub offset: usize,
}

/// Tokenizer for Lua table constructors.
///
/// Whitespace and comments (`-- line` and `--[[ block ]]`) are skipped.
/// The iterator stops after the first error.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer positioned at the start of `src`.
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Tokenizes the whole input.
    pub fn tokenize(src: &'a str) -> Result<Vec<Spanned<'a>>, LuaSyntaxError> {
        Self::new(src).collect()
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.bytes().get(self.pos + ahead).copied()
    }

    fn skip_trivia(&mut self) -> Result<(), LuaSyntaxError> {
        loop {
            match self.peek_byte(0) {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'-') if self.peek_byte(1) == Some(b'-') => {
                    let start = self.pos;
                    self.pos += 2;
                    if let Some(level) = self.long_bracket_level() {
                        self.skip_long_bracket(level)
                            .ok_or_else(|| {
                                LuaSyntaxError::new(start, SyntaxErrorKind::UnterminatedComment)
                            })?;
                    } else {
                        let rest = &self.src[self.pos..];
                        self.pos += rest.find('\n').unwrap_or(rest.len());
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Level of a `[==[` opener at the cursor, if any.
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek_byte(0) != Some(b'[') {
            return None;
        }
        let level = self.bytes()[self.pos + 1..]
            .iter()
            .take_while(|b| **b == b'=')
            .count();
        (self.peek_byte(level + 1) == Some(b'[')).then_some(level)
    }

    fn skip_long_bracket(&mut self, level: usize) -> Option<()> {
        let close = format!("]{}]", "=".repeat(level));
        let body_start = self.pos + level + 2;
        let end = self.src[body_start..].find(&close)?;
        self.pos = body_start + end + close.len();
        Some(())
    }

    fn lex_string(&mut self, quote: u8) -> Result<Token<'a>, LuaSyntaxError> {
        let start = self.pos;
        self.pos += 1;
        let mut buf = Vec::new();
        loop {
            let Some(b) = self.peek_byte(0) else {
                return Err(LuaSyntaxError::new(start, SyntaxErrorKind::UnterminatedString));
            };
            self.pos += 1;
            match b {
                b'\n' => {
                    return Err(LuaSyntaxError::new(start, SyntaxErrorKind::UnterminatedString));
                }
                b'\\' => {
                    let Some(esc) = self.peek_byte(0) else {
                        return Err(LuaSyntaxError::new(start, SyntaxErrorKind::UnterminatedString));
                    };
                    self.pos += 1;
                    match esc {
                        b'n' => buf.push(b'\n'),
                        b't' => buf.push(b'\t'),
                        b'r' => buf.push(b'\r'),
                        b'a' => buf.push(0x07),
                        b'b' => buf.push(0x08),
                        b'f' => buf.push(0x0c),
                        b'v' => buf.push(0x0b),
                        b'0'..=b'9' => {
                            let mut code = u32::from(esc - b'0');
                            for _ in 0..2 {
                                match self.peek_byte(0) {
                                    Some(d @ b'0'..=b'9') => {
                                        code = code * 10 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            buf.push(u8::try_from(code).unwrap_or(b'?'));
                        }
                        other => buf.push(other),
                    }
                }
                b if b == quote => break,
                b => buf.push(b),
            }
        }
        Ok(Token::Str(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn lex_number(&mut self) -> Result<Token<'a>, LuaSyntaxError> {
        let start = self.pos;
        if self.peek_byte(0) == Some(b'-') {
            self.pos += 1;
        }
        while let Some(b) = self.peek_byte(0) {
            let exponent_sign = (b == b'+' || b == b'-')
                && matches!(self.bytes()[self.pos - 1], b'e' | b'E');
            if b.is_ascii_alphanumeric() || b == b'.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.src[start..self.pos];
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Token::Int(i));
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Token::Float)
            .ok_or_else(|| {
                LuaSyntaxError::new(start, SyntaxErrorKind::InvalidNumber(text.to_owned()))
            })
    }

    fn lex_ident(&mut self) -> Token<'a> {
        let start = self.pos;
        while self
            .peek_byte(0)
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        Token::Ident(&self.src[start..self.pos])
    }

    fn next_token(&mut self) -> Result<Option<Spanned<'a>>, LuaSyntaxError> {
        self.skip_trivia()?;
        let offset = self.pos;
        let Some(b) = self.peek_byte(0) else {
            return Ok(None);
        };
        let token = match b {
            b'"' | b'\'' => self.lex_string(b)?,
            b'0'..=b'9' | b'.' => self.lex_number()?,
            b'-' if self.peek_byte(1).is_some_and(|n| n.is_ascii_digit() || n == b'.') => {
                self.lex_number()?
            }
            b if b.is_ascii_alphabetic() || b == b'_' => self.lex_ident(),
            _ => {
                let token = match b {
                    b'{' => Token::LBrace,
                    b'}' => Token::RBrace,
                    b'[' => Token::LBracket,
                    b']' => Token::RBracket,
                    b'=' => Token::Assign,
                    b',' => Token::Comma,
                    b';' => Token::Semicolon,
                    _ => {
                        let ch = self.src[offset..].chars().next().unwrap_or('\u{fffd}');
                        return Err(LuaSyntaxError::new(
                            offset,
                            SyntaxErrorKind::UnexpectedChar(ch),
                        ));
                    }
                };
                self.pos += 1;
                token
            }
        };
        Ok(Some(Spanned { token, offset }))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Spanned<'a>, LuaSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.next_token();
        if result.is_err() {
            self.pos = self.src.len();
        }
        result.transpose()
    }
}

/// Splits `text` at every occurrence of `separator` that lies outside string
/// literals and comments.
///
/// Behaves like [`str::split`] on well-formed input. A separator at the start
/// of a comment (such as `-- [`) still counts. An unterminated string ends at
/// the end of its line.
#[must_use]
pub fn split_outside_strings<'a>(text: &'a str, separator: &'a str) -> SplitOutsideStrings<'a> {
    SplitOutsideStrings {
        rest: Some(text),
        separator,
    }
}

/// Iterator returned by [`split_outside_strings`].
#[derive(Debug, Clone)]
pub struct SplitOutsideStrings<'a> {
    rest: Option<&'a str>,
    separator: &'a str,
}

impl<'a> Iterator for SplitOutsideStrings<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        let bytes = rest.as_bytes();
        let separator = self.separator.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() && !separator.is_empty() {
            if bytes[pos..].starts_with(separator) {
                self.rest = Some(&rest[pos + separator.len()..]);
                return Some(&rest[..pos]);
            }
            pos = match bytes[pos] {
                quote @ (b'"' | b'\'') => skip_string(bytes, pos, quote),
                b'-' if bytes.get(pos + 1) == Some(&b'-') => skip_comment(bytes, pos),
                _ => pos + 1,
            };
        }
        self.rest = None;
        Some(rest)
    }
}

/// Position after the string literal opened at `start`, or of the newline
/// that leaves it unterminated.
fn skip_string(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut pos = start + 1;
    while let Some(&b) = bytes.get(pos) {
        match b {
            b'\\' => pos += 2,
            b'\n' => return pos,
            b if b == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

/// Position after the comment opened at `start`. Line comments stop before
/// their newline.
fn skip_comment(bytes: &[u8], start: usize) -> usize {
    let body = start + 2;
    if bytes.get(body) == Some(&b'[') {
        let level = bytes[body + 1..].iter().take_while(|b| **b == b'=').count();
        if bytes.get(body + 1 + level) == Some(&b'[') {
            let mut close = vec![b'='; level + 2];
            close[0] = b']';
            close[level + 1] = b']';
            let open_end = body + level + 2;
            return bytes[open_end..]
                .windows(close.len())
                .position(|w| w == close.as_slice())
                .map_or(bytes.len(), |i| open_end + i + close.len());
        }
    }
    bytes[body..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |i| body + i)
}
