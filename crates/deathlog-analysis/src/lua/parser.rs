//! Recursive-descent parser for the table-constructor dialect.
//!
//! [`parse_assignments`] reads whole files. [`scan_fields`] reads fragments
//! cut out of a larger table and tolerates whatever debris surrounds the
//! fields.

use super::{
    lexer::{Lexer, LuaSyntaxError, Spanned, SyntaxErrorKind, Token},
    value::{Key, Table, Value},
};

/// Recursive-descent parser over a token slice.
#[derive(Debug)]
struct Parser<'t, 'a> {
    tokens: &'t [Spanned<'a>],
    pos: usize,
    end_offset: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn new(tokens: &'t [Spanned<'a>], end_offset: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end_offset,
        }
    }

    fn peek(&self, ahead: usize) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn eof(&self) -> LuaSyntaxError {
        LuaSyntaxError::new(self.end_offset, SyntaxErrorKind::UnexpectedEof)
    }

    fn unexpected(&self, spanned: &Spanned<'_>) -> LuaSyntaxError {
        LuaSyntaxError::new(
            spanned.offset,
            SyntaxErrorKind::UnexpectedToken(spanned.token.to_string()),
        )
    }

    fn bump(&mut self) -> Result<&'t Spanned<'a>, LuaSyntaxError> {
        let spanned = self.tokens.get(self.pos).ok_or_else(|| self.eof())?;
        self.pos += 1;
        Ok(spanned)
    }

    fn expect(&mut self, expected: &Token<'_>) -> Result<(), LuaSyntaxError> {
        let spanned = self.bump()?;
        if spanned.token == *expected {
            Ok(())
        } else {
            Err(self.unexpected(spanned))
        }
    }

    fn parse_value(&mut self) -> Result<Value, LuaSyntaxError> {
        let spanned = self.bump()?;
        let value = match &spanned.token {
            Token::Str(s) => Value::Str(s.clone()),
            Token::Int(i) => Value::Int(*i),
            Token::Float(f) => Value::Float(*f),
            Token::Ident("true") => Value::Bool(true),
            Token::Ident("false") => Value::Bool(false),
            Token::Ident("nil") => Value::Nil,
            Token::LBrace => Value::Table(self.parse_table_body()?),
            _ => return Err(self.unexpected(spanned)),
        };
        Ok(value)
    }

    /// Parses fields up to and including the closing brace.
    fn parse_table_body(&mut self) -> Result<Table, LuaSyntaxError> {
        let mut table = Table::new();
        loop {
            match self.peek(0) {
                None => return Err(self.eof()),
                Some(Token::RBrace) => {
                    self.pos += 1;
                    return Ok(table);
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let key_token = self.bump()?;
                    let key = match &key_token.token {
                        Token::Str(s) => Key::Str(s.clone()),
                        Token::Int(i) => Key::Int(*i),
                        _ => return Err(self.unexpected(key_token)),
                    };
                    self.expect(&Token::RBracket)?;
                    self.expect(&Token::Assign)?;
                    let value = self.parse_value()?;
                    table.insert(key, value);
                }
                Some(Token::Ident(name)) if self.peek(1) == Some(&Token::Assign) => {
                    self.pos += 2;
                    let value = self.parse_value()?;
                    table.insert(*name, value);
                }
                Some(_) => {
                    let value = self.parse_value()?;
                    table.push(value);
                }
            }
            match self.peek(0) {
                Some(Token::Comma | Token::Semicolon) => self.pos += 1,
                Some(Token::RBrace) => {}
                None => return Err(self.eof()),
                Some(_) => return Err(self.unexpected(&self.tokens[self.pos])),
            }
        }
    }

    /// Whether the cursor sits on `["name"] =`.
    fn at_string_key(&self) -> Option<&'t str> {
        match (self.peek(0), self.peek(1), self.peek(2), self.peek(3)) {
            (
                Some(Token::LBracket),
                Some(Token::Str(key)),
                Some(Token::RBracket),
                Some(Token::Assign),
            ) => Some(key),
            _ => None,
        }
    }
}

/// Parses a sequence of `name = value` statements, such as a saved-variables
/// file or a precomputed artifact.
pub fn parse_assignments(src: &str) -> Result<Vec<(String, Value)>, LuaSyntaxError> {
    let tokens = Lexer::tokenize(src)?;
    let mut parser = Parser::new(&tokens, src.len());
    let mut assignments = vec![];
    while parser.pos < tokens.len() {
        let spanned = parser.bump()?;
        let Token::Ident(name) = spanned.token else {
            return Err(parser.unexpected(spanned));
        };
        parser.expect(&Token::Assign)?;
        let value = parser.parse_value()?;
        assignments.push((name.to_owned(), value));
    }
    Ok(assignments)
}

/// Collects the `["key"] = value` fields of a fragment of a larger table.
///
/// The fragment does not need to be balanced: stray brackets, braces and
/// comment remnants around the fields are skipped. A field whose value runs
/// past the end of the fragment ends the scan; fields collected so far are
/// kept. Values that are tables are parsed whole, so their inner fields never
/// surface as fields of the fragment.
pub fn scan_fields(fragment: &str) -> Result<Table, LuaSyntaxError> {
    let tokens = Lexer::tokenize(fragment)?;
    let mut parser = Parser::new(&tokens, fragment.len());
    let mut fields = Table::new();
    while parser.pos < tokens.len() {
        let Some(key) = parser.at_string_key() else {
            parser.pos += 1;
            continue;
        };
        parser.pos += 4;
        match parser.parse_value() {
            Ok(value) => fields.insert(key, value),
            Err(err) if err.is_eof() => break,
            Err(err) => return Err(err),
        }
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_value(src: &str) -> Result<Value, LuaSyntaxError> {
        let mut assignments = parse_assignments(&format!("x = {src}"))?;
        assert_eq!(assignments.len(), 1);
        Ok(assignments.remove(0).1)
    }

    #[test]
    fn test_nested_table() {
        let value = parse_value(r#"{ ["a"] = { 1, 2.5, "x" }, b = true, [3] = nil; }"#).unwrap();
        let table = value.as_table().unwrap();
        let inner = table.field("a").unwrap().as_table().unwrap();
        assert!(inner.is_sequence());
        assert_eq!(inner.len(), 3);
        assert_eq!(inner.get(&Key::Int(2)), Some(&Value::Float(2.5)));
        assert_eq!(table.field("b"), Some(&Value::Bool(true)));
        assert_eq!(table.get(&Key::Int(3)), Some(&Value::Nil));
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_value("{ 1 2 }").unwrap_err();
        assert!(matches!(err.kind, SyntaxErrorKind::UnexpectedToken(_)));
    }

    #[test]
    fn test_unbalanced_table() {
        assert!(parse_value("{ 1, 2").unwrap_err().is_eof());
    }

    #[test]
    fn test_assignments() {
        let parsed = parse_assignments("a = { 1 }\nb = \"x\"").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0, "a");
        assert_eq!(parsed[1].1, Value::Str("x".to_owned()));
    }

    #[test]
    fn test_scan_fields_skips_fragment_noise() {
        let fragment = r#"1]
	{
		["name"] = "Foo",
		["extra"] = { ["level"] = 99 },
		["level"] = 30,
	}, "#;
        let fields = scan_fields(fragment).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.field("level"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_scan_fields_stops_at_open_table() {
        let fragment = r#""Foo-1"] = {
			["name"] = "Foo",
		},
	},
	["OtherRealm"] = {"#;
        let fields = scan_fields(fragment).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.field("name"), Some(&Value::Str("Foo".to_owned())));
    }

    #[test]
    fn test_scan_fields_keeps_first_duplicate() {
        let fields = scan_fields(r#"["level"] = 1, ["level"] = 2"#).unwrap();
        assert_eq!(fields.field("level"), Some(&Value::Int(1)));
    }
}
