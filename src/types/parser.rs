//! Type descriptor parser
//!
//! Recursive descent over a small token stream:
//!
//! ```text
//! type    := [field] NAME ['(' segment (',' segment)* ')']
//! segment := type | literal | NAME '=' literal | literal '=' literal
//! literal := quoted-string | number
//! ```
//!
//! `field` is the element name of `Nested(a UInt8)` and named tuples.
//! Quoted strings use `'` and backslash escapes; backquoted identifiers are
//! accepted for field names. The parser produces a [`TypeAst`]; turning it
//! into a [`Type`](super::Type) is the registry's job.

use crate::{
    Error,
    Result,
};

/// Nesting depth at which parsing is abandoned.
pub(crate) const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenType {
    Name,
    /// `` `identifier` ``
    BackQuoted,
    Number,
    QuotedString,
    LPar,
    RPar,
    Comma,
    Assign,
    Eos,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    token_type: TokenType,
    value: &'a str,
    start: usize,
}

/// Kind of a syntax tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstKind {
    /// A type, possibly with arguments.
    Type,
    /// Numeric literal; `name` holds its text.
    Number,
    /// Quoted string literal; `name` holds the unescaped content.
    String,
    /// `key = value` pair; the two sides are the children.
    Assign,
}

/// Abstract syntax tree for a type descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAst {
    pub kind: AstKind,
    /// Type name, or the literal content for literal nodes.
    pub name: String,
    /// Element name preceding the type, as in `Nested(id UInt64)`.
    pub field: Option<String>,
    pub children: Vec<TypeAst>,
    /// Source text of this node.
    pub raw_value: String,
}

impl TypeAst {
    fn literal(kind: AstKind, name: String, raw_value: &str) -> Self {
        Self {
            kind,
            name,
            field: None,
            children: Vec::new(),
            raw_value: raw_value.to_string(),
        }
    }
}

struct TypeParser<'a> {
    input: &'a str,
    cur: usize,
    peeked: Option<Token<'a>>,
}

impl<'a> TypeParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, cur: 0, peeked: None }
    }

    fn parse(mut self) -> Result<TypeAst> {
        let ast = self.parse_segment(0)?;
        if ast.kind != AstKind::Type {
            return Err(Error::grammar("Expected a type name", self.input));
        }
        let token = self.next_token()?;
        if token.token_type != TokenType::Eos {
            return Err(Error::grammar(
                "Unexpected trailing input",
                &self.input[token.start..],
            ));
        }
        Ok(ast)
    }

    fn parse_segment(&mut self, depth: usize) -> Result<TypeAst> {
        if depth > MAX_DEPTH {
            return Err(Error::grammar("Type is nested too deeply", self.input));
        }

        let token = self.next_token()?;
        match token.token_type {
            TokenType::QuotedString | TokenType::Number => {
                let left = self.literal_node(token)?;
                self.maybe_assign(left, token.start)
            }
            TokenType::Name | TokenType::BackQuoted => {
                let first = self.identifier(token)?;
                let next = self.peek_token()?;
                match next.token_type {
                    TokenType::Name | TokenType::BackQuoted => {
                        let name_token = self.next_token()?;
                        if name_token.token_type != TokenType::Name {
                            return Err(Error::grammar(
                                "Expected a type name",
                                &self.input[name_token.start..],
                            ));
                        }
                        let mut node = self.type_node(name_token, depth)?;
                        node.field = Some(first);
                        node.raw_value = self.slice_from(token.start);
                        Ok(node)
                    }
                    TokenType::Assign => {
                        let left =
                            TypeAst::literal(AstKind::String, first, token.value);
                        self.maybe_assign(left, token.start)
                    }
                    _ if token.token_type == TokenType::BackQuoted => {
                        Err(Error::grammar(
                            "Expected a type after field name",
                            &self.input[token.start..],
                        ))
                    }
                    _ => self.type_node(token, depth),
                }
            }
            TokenType::LPar
            | TokenType::RPar
            | TokenType::Comma
            | TokenType::Assign
            | TokenType::Eos => Err(Error::grammar(
                "Expected a type or literal",
                self.fragment_at(token.start),
            )),
        }
    }

    /// A type name with optional parenthesised arguments.
    fn type_node(&mut self, name: Token<'a>, depth: usize) -> Result<TypeAst> {
        let mut node = TypeAst {
            kind: AstKind::Type,
            name: name.value.to_string(),
            field: None,
            children: Vec::new(),
            raw_value: String::new(),
        };

        if self.peek_token()?.token_type == TokenType::LPar {
            let open = self.next_token()?;
            if self.peek_token()?.token_type == TokenType::RPar {
                self.next_token()?;
            } else {
                loop {
                    node.children.push(self.parse_segment(depth + 1)?);
                    let token = self.next_token()?;
                    match token.token_type {
                        TokenType::Comma => continue,
                        TokenType::RPar => break,
                        TokenType::Eos => {
                            return Err(Error::grammar(
                                "Unbalanced parentheses",
                                &self.input[open.start..],
                            ))
                        }
                        _ => {
                            return Err(Error::grammar(
                                "Expected ',' or ')'",
                                &self.input[token.start..],
                            ))
                        }
                    }
                }
            }
        }

        node.raw_value = self.slice_from(name.start);
        Ok(node)
    }

    /// Turn `left` into `left = literal` if an assignment follows.
    fn maybe_assign(&mut self, left: TypeAst, start: usize) -> Result<TypeAst> {
        if self.peek_token()?.token_type != TokenType::Assign {
            return Ok(left);
        }
        self.next_token()?;

        let token = self.next_token()?;
        let right = match token.token_type {
            TokenType::Number | TokenType::QuotedString => self.literal_node(token)?,
            _ => {
                return Err(Error::grammar(
                    "Expected a literal after '='",
                    self.fragment_at(token.start),
                ))
            }
        };

        let raw_value = self.slice_from(start);
        Ok(TypeAst {
            kind: AstKind::Assign,
            name: left.name.clone(),
            field: None,
            children: vec![left, right],
            raw_value,
        })
    }

    fn literal_node(&self, token: Token<'a>) -> Result<TypeAst> {
        match token.token_type {
            TokenType::Number => Ok(TypeAst::literal(
                AstKind::Number,
                token.value.to_string(),
                token.value,
            )),
            _ => Ok(TypeAst::literal(
                AstKind::String,
                unescape(token.value, '\'')?,
                token.value,
            )),
        }
    }

    fn identifier(&self, token: Token<'a>) -> Result<String> {
        match token.token_type {
            TokenType::BackQuoted => unescape(token.value, '`'),
            _ => Ok(token.value.to_string()),
        }
    }

    fn slice_from(&self, start: usize) -> String {
        self.input[start..self.cur].trim().to_string()
    }

    fn fragment_at(&self, start: usize) -> &'a str {
        if start >= self.input.len() {
            self.input
        } else {
            &self.input[start..]
        }
    }

    fn peek_token(&mut self) -> Result<Token<'a>> {
        if let Some(token) = self.peeked {
            return Ok(token);
        }
        let token = self.scan_token()?;
        self.peeked = Some(token);
        Ok(token)
    }

    fn next_token(&mut self) -> Result<Token<'a>> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.scan_token(),
        }
    }

    fn scan_token(&mut self) -> Result<Token<'a>> {
        let bytes = self.input.as_bytes();

        while self.cur < bytes.len() && bytes[self.cur].is_ascii_whitespace() {
            self.cur += 1;
        }

        let start = self.cur;
        if start >= bytes.len() {
            return Ok(Token { token_type: TokenType::Eos, value: "", start });
        }

        let single = |token_type| Token {
            token_type,
            value: &self.input[start..start + 1],
            start,
        };

        let token = match bytes[start] {
            b'(' => single(TokenType::LPar),
            b')' => single(TokenType::RPar),
            b',' => single(TokenType::Comma),
            b'=' => single(TokenType::Assign),
            quote @ (b'\'' | b'`') => {
                let mut pos = start + 1;
                loop {
                    match bytes.get(pos) {
                        None => {
                            return Err(Error::grammar(
                                "Unterminated quoted literal",
                                &self.input[start..],
                            ))
                        }
                        Some(b'\\') => pos += 2,
                        Some(&c) if c == quote => break,
                        Some(_) => pos += 1,
                    }
                }
                let token_type = if quote == b'\'' {
                    TokenType::QuotedString
                } else {
                    TokenType::BackQuoted
                };
                Token { token_type, value: &self.input[start..pos + 1], start }
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut pos = start + 1;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric()
                        || bytes[pos] == b'_'
                        || bytes[pos] == b'.')
                {
                    pos += 1;
                }
                Token { token_type: TokenType::Name, value: &self.input[start..pos], start }
            }
            c if c.is_ascii_digit() || c == b'-' || c == b'+' => {
                let mut pos = start + 1;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.')
                {
                    pos += 1;
                }
                let value = &self.input[start..pos];
                if !value.bytes().any(|b| b.is_ascii_digit()) {
                    return Err(Error::grammar("Invalid number", &self.input[start..]));
                }
                Token { token_type: TokenType::Number, value, start }
            }
            _ => {
                return Err(Error::grammar(
                    "Unexpected character",
                    &self.input[start..],
                ))
            }
        };

        self.cur = token.start + token.value.len();
        Ok(token)
    }
}

/// Strip the surrounding quotes and resolve backslash escapes.
fn unescape(quoted: &str, quote: char) -> Result<String> {
    let inner = quoted
        .strip_prefix(quote)
        .and_then(|s| s.strip_suffix(quote))
        .ok_or_else(|| Error::grammar("Malformed quoted literal", quoted))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('b') => out.push('\u{8}'),
            Some(other) => out.push(other),
            None => return Err(Error::grammar("Dangling escape", quoted)),
        }
    }
    Ok(out)
}

/// Parse a type descriptor into a syntax tree.
pub fn parse_type_ast(type_name: &str) -> Result<TypeAst> {
    TypeParser::new(type_name).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_type() {
        let ast = parse_type_ast("Int32").unwrap();
        assert_eq!(ast.kind, AstKind::Type);
        assert_eq!(ast.name, "Int32");
        assert!(ast.children.is_empty());
    }

    #[test]
    fn test_nested_types() {
        let ast = parse_type_ast("Array(Nullable(String))").unwrap();
        assert_eq!(ast.name, "Array");
        assert_eq!(ast.children[0].name, "Nullable");
        assert_eq!(ast.children[0].children[0].name, "String");
        assert_eq!(ast.children[0].raw_value, "Nullable(String)");
    }

    #[test]
    fn test_tuple_of_tuples() {
        let ast =
            parse_type_ast("Tuple(Int32, Tuple(UInt8, String, Nullable(Int32)))").unwrap();
        assert_eq!(ast.children.len(), 2);
        assert_eq!(ast.children[1].children.len(), 3);
    }

    #[test]
    fn test_enum_pairs() {
        let ast = parse_type_ast("Enum8('a' = -1, 'b, c' = 127)").unwrap();
        assert_eq!(ast.children.len(), 2);
        let pair = &ast.children[1];
        assert_eq!(pair.kind, AstKind::Assign);
        assert_eq!(pair.children[0].name, "b, c");
        assert_eq!(pair.children[1].kind, AstKind::Number);
        assert_eq!(pair.children[1].name, "127");
        assert_eq!(ast.children[0].children[1].name, "-1");
    }

    #[test]
    fn test_escaped_quote() {
        let ast = parse_type_ast(r"Enum8('it\'s' = 1, 'a(b' = 2)").unwrap();
        assert_eq!(ast.children[0].children[0].name, "it's");
        assert_eq!(ast.children[1].children[0].name, "a(b");
    }

    #[test]
    fn test_field_names() {
        let ast = parse_type_ast("Nested(id UInt64, `full name` Nullable(String))").unwrap();
        assert_eq!(ast.children[0].field.as_deref(), Some("id"));
        assert_eq!(ast.children[0].name, "UInt64");
        assert_eq!(ast.children[1].field.as_deref(), Some("full name"));
        assert_eq!(ast.children[1].name, "Nullable");
    }

    #[test]
    fn test_timezone_literal() {
        let ast = parse_type_ast("DateTime64(3, 'Europe/Moscow')").unwrap();
        assert_eq!(ast.children[0].kind, AstKind::Number);
        assert_eq!(ast.children[1].kind, AstKind::String);
        assert_eq!(ast.children[1].name, "Europe/Moscow");
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = parse_type_ast("Array(Nullable(Int32)").unwrap_err();
        match err {
            Error::TypeGrammar { fragment, .. } => {
                assert!(fragment.starts_with("(Nullable"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(parse_type_ast("Int32)").is_err());
    }

    #[test]
    fn test_empty_segment() {
        let err = parse_type_ast("Tuple(Int32,,String)").unwrap_err();
        match err {
            Error::TypeGrammar { fragment, .. } => assert_eq!(fragment, ",String)"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_input() {
        assert!(parse_type_ast("").is_err());
        assert!(parse_type_ast("   ").is_err());
        assert!(parse_type_ast("Enum8('a = 1)").is_err());
        assert!(parse_type_ast("Int32 $").is_err());
        assert!(parse_type_ast("'literal'").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}Int32{}", "Array(".repeat(200), ")".repeat(200));
        assert!(parse_type_ast(&deep).is_err());
    }
}
