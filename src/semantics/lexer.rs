//! Tokenizer for semantic lines.

use super::error::SemanticError;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    If,
    Elif,
    Else,
    Reserved,
    Colon,
    Semicolon,
    Newline,
    Comma,
    Dot,
    LParen,
    RParen,
    Equals,
    DoubleEquals,
    BangEquals,
    Plus,
    Dash,
    Pipe,
    Ampersand,
    Caret,
    Star,
    ShiftLeft,
    ShiftRight,
    AugAssign,
    EOF,
}

/// Python keywords with no counterpart in the semantic DSL.
const RESERVED: &[&str] = &[
    "and", "break", "class", "continue", "def", "del", "for", "global", "import", "in",
    "is", "lambda", "not", "or", "pass", "return", "while", "with", "yield",
];

#[derive(Clone, Copy)]
enum Radix {
    Binary,
    Octal,
    Decimal,
    Hex,
}

impl Radix {
    fn accepts(self, ch: char) -> bool {
        match self {
            Radix::Binary => matches!(ch, '0' | '1'),
            Radix::Octal => matches!(ch, '0'..='7'),
            Radix::Decimal => ch.is_ascii_digit(),
            Radix::Hex => ch.is_ascii_hexdigit(),
        }
    }
}

pub struct Lexer<'src> {
    src: &'src str,
    offset: usize,
    line: usize,
    column: usize,
    depth: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            column: 0,
            depth: 0,
        }
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Result<Token, SemanticError> {
        self.skip_ignorable();
        let Some(ch) = self.peek_char() else {
            let (line, column) = self.position();
            return Ok(self.make_token(TokenKind::EOF, "", line, column));
        };

        match ch {
            '\n' => Ok(self.consume_single(TokenKind::Newline)),
            ':' => Ok(self.consume_single(TokenKind::Colon)),
            ';' => Ok(self.consume_single(TokenKind::Semicolon)),
            ',' => Ok(self.consume_single(TokenKind::Comma)),
            '.' => Ok(self.consume_single(TokenKind::Dot)),
            '(' => {
                self.depth += 1;
                Ok(self.consume_single(TokenKind::LParen))
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                Ok(self.consume_single(TokenKind::RParen))
            }
            '=' => Ok(self.consume_with_equals(TokenKind::Equals, TokenKind::DoubleEquals)),
            '!' => {
                if self.peek_next_char() == Some('=') {
                    Ok(self.consume_fixed(TokenKind::BangEquals, 2))
                } else {
                    Err(self.unsupported_operator("!"))
                }
            }
            '+' => Ok(self.consume_with_equals(TokenKind::Plus, TokenKind::AugAssign)),
            '-' => Ok(self.consume_with_equals(TokenKind::Dash, TokenKind::AugAssign)),
            '|' => Ok(self.consume_with_equals(TokenKind::Pipe, TokenKind::AugAssign)),
            '&' => Ok(self.consume_with_equals(TokenKind::Ampersand, TokenKind::AugAssign)),
            '^' => Ok(self.consume_with_equals(TokenKind::Caret, TokenKind::AugAssign)),
            '*' => {
                if self.peek_next_char() == Some('*') {
                    Err(self.unsupported_operator("**"))
                } else {
                    Ok(self.consume_with_equals(TokenKind::Star, TokenKind::AugAssign))
                }
            }
            '<' | '>' => self.consume_shift(ch),
            '"' | '\'' => self.consume_string(ch),
            ch if ch.is_ascii_digit() => self.consume_number(),
            ch if is_ident_start(ch) => Ok(self.consume_identifier()),
            '/' | '%' | '~' | '@' => Err(self.unsupported_operator(&ch.to_string())),
            _ => Err(SemanticError::parse(format!(
                "unexpected character '{}', line {}, column {}",
                ch,
                self.line,
                self.column + 1
            ))),
        }
    }

    /// Drains the remaining input, including the trailing `EOF` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SemanticError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::EOF;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn consume_identifier(&mut self) -> Token {
        let start = self.offset;
        let (line, column) = self.position();
        self.advance_char();
        while let Some(ch) = self.peek_char() {
            if is_ident_part(ch) {
                self.advance_char();
            } else {
                break;
            }
        }
        let kind = match &self.src[start..self.offset] {
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            word if RESERVED.contains(&word) => TokenKind::Reserved,
            _ => TokenKind::Identifier,
        };
        self.make_token_from_span(kind, start, self.offset, line, column)
    }

    fn consume_number(&mut self) -> Result<Token, SemanticError> {
        let start = self.offset;
        let (line, column) = self.position();
        let mut radix = Radix::Decimal;

        self.advance_char();
        if &self.src[start..self.offset] == "0" {
            match self.peek_char() {
                Some('x' | 'X') => radix = Radix::Hex,
                Some('b' | 'B') => radix = Radix::Binary,
                Some('o' | 'O') => radix = Radix::Octal,
                _ => {}
            }
            if !matches!(radix, Radix::Decimal) {
                self.advance_char();
            }
        }

        while let Some(ch) = self.peek_char() {
            if ch == '_' || radix.accepts(ch) {
                self.advance_char();
            } else {
                break;
            }
        }

        if let Some(ch) = self.peek_char() {
            if is_ident_part(ch) {
                return Err(SemanticError::parse(format!(
                    "invalid numeric literal '{}{}', line {}, column {}",
                    &self.src[start..self.offset],
                    ch,
                    line,
                    column
                )));
            }
        }

        Ok(self.make_token_from_span(TokenKind::Number, start, self.offset, line, column))
    }

    fn consume_string(&mut self, quote: char) -> Result<Token, SemanticError> {
        let (line, column) = self.position();
        self.advance_char(); // opening quote
        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                '\\' => {
                    self.advance_char();
                    let Some(escaped) = self.peek_char() else {
                        break;
                    };
                    let actual = match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    };
                    value.push(actual);
                    self.advance_char();
                }
                '\n' => break,
                ch if ch == quote => {
                    self.advance_char();
                    return Ok(Token {
                        kind: TokenKind::String,
                        lexeme: value,
                        line,
                        column,
                    });
                }
                other => {
                    value.push(other);
                    self.advance_char();
                }
            }
        }
        Err(SemanticError::parse(format!(
            "unterminated string literal, line {line}, column {column}"
        )))
    }

    fn consume_shift(&mut self, ch: char) -> Result<Token, SemanticError> {
        if self.peek_next_char() != Some(ch) {
            let mut op = ch.to_string();
            if self.peek_next_char() == Some('=') {
                op.push('=');
            }
            return Err(self.unsupported_operator(&op));
        }
        let kind = if ch == '<' {
            TokenKind::ShiftLeft
        } else {
            TokenKind::ShiftRight
        };
        let rest = &self.src[self.offset..];
        if rest.chars().nth(2) == Some('=') {
            Ok(self.consume_fixed(TokenKind::AugAssign, 3))
        } else {
            Ok(self.consume_fixed(kind, 2))
        }
    }

    fn consume_with_equals(&mut self, single: TokenKind, with_equals: TokenKind) -> Token {
        if self.peek_next_char() == Some('=') {
            self.consume_fixed(with_equals, 2)
        } else {
            self.consume_single(single)
        }
    }

    fn consume_fixed(&mut self, kind: TokenKind, chars: usize) -> Token {
        let start = self.offset;
        let (line, column) = self.position();
        for _ in 0..chars {
            self.advance_char();
        }
        self.make_token_from_span(kind, start, self.offset, line, column)
    }

    fn consume_single(&mut self, kind: TokenKind) -> Token {
        self.consume_fixed(kind, 1)
    }

    fn consume_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn skip_ignorable(&mut self) {
        loop {
            self.skip_whitespace();
            if let Some('#') = self.peek_char() {
                self.consume_line_comment();
            } else {
                break;
            }
        }
    }

    /// Newlines are significant at depth zero; inside parentheses they are plain whitespace.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() && (ch != '\n' || self.depth > 0) {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn unsupported_operator(&self, op: &str) -> SemanticError {
        SemanticError::parse(format!(
            "unsupported operator '{}', line {}, column {}",
            op,
            self.line,
            self.column + 1
        ))
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.src[self.offset..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    fn position(&self) -> (usize, usize) {
        (self.line, self.column + 1)
    }

    fn make_token(&self, kind: TokenKind, lexeme: &str, line: usize, column: usize) -> Token {
        Token {
            kind,
            lexeme: lexeme.to_string(),
            line,
            column,
        }
    }

    fn make_token_from_span(
        &self,
        kind: TokenKind,
        start: usize,
        end: usize,
        line: usize,
        column: usize,
    ) -> Token {
        let slice = &self.src[start..end];
        self.make_token(kind, slice, line, column)
    }
}

/// Parses an unsigned integer literal (`42`, `0x2A`, `0o52`, `0b101010`, `_` separators).
pub fn parse_integer_literal(lexeme: &str) -> Result<u64, SemanticError> {
    let digits = lexeme.replace('_', "");
    let (body, radix) = match digits.get(..2) {
        Some("0x" | "0X") => (&digits[2..], 16),
        Some("0o" | "0O") => (&digits[2..], 8),
        Some("0b" | "0B") => (&digits[2..], 2),
        _ => (digits.as_str(), 10),
    };
    if body.is_empty() {
        return Err(SemanticError::parse(format!(
            "numeric literal '{lexeme}' requires digits after prefix"
        )));
    }
    u64::from_str_radix(body, radix).map_err(|err| {
        SemanticError::parse(format!("invalid numeric literal '{lexeme}': {err}"))
    })
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_part(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::{Lexer, TokenKind, parse_integer_literal};

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .expect("tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_assignment_with_attributes() {
        let stream = kinds("op0.id = op0.val + 0x1");
        assert_eq!(
            stream,
            vec![
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::EOF
            ]
        );
    }

    #[test]
    fn distinguishes_compound_operators() {
        let stream = kinds("a == b != c <<= d >> e += f");
        assert_eq!(
            stream,
            vec![
                TokenKind::Identifier,
                TokenKind::DoubleEquals,
                TokenKind::Identifier,
                TokenKind::BangEquals,
                TokenKind::Identifier,
                TokenKind::AugAssign,
                TokenKind::Identifier,
                TokenKind::ShiftRight,
                TokenKind::Identifier,
                TokenKind::AugAssign,
                TokenKind::Identifier,
                TokenKind::EOF
            ]
        );
    }

    #[test]
    fn keywords_and_reserved_words() {
        let stream = kinds("if x elif y else while");
        assert_eq!(
            stream,
            vec![
                TokenKind::If,
                TokenKind::Identifier,
                TokenKind::Elif,
                TokenKind::Identifier,
                TokenKind::Else,
                TokenKind::Reserved,
                TokenKind::EOF
            ]
        );
    }

    #[test]
    fn newlines_inside_parentheses_are_ignored() {
        let stream = kinds("f(a,\n  b)\n# trailing comment\nc");
        assert_eq!(
            stream,
            vec![
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::Identifier,
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::EOF
            ]
        );
    }

    #[test]
    fn strings_accept_both_quotes() {
        let tokens = Lexer::new(r#"expr('a = "b"')"#).tokenize().expect("tokenize");
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].lexeme, r#"a = "b""#);
    }

    #[test]
    fn rejects_operators_outside_the_grammar() {
        for src in ["a / b", "a < b", "a >= b", "a ** b", "~a", "a % b", "!a"] {
            let err = Lexer::new(src).tokenize().unwrap_err();
            assert!(
                err.to_string().contains("unsupported operator"),
                "{src}: unexpected error {err:?}"
            );
        }
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = Lexer::new("expr('abc").tokenize().unwrap_err();
        assert!(err.to_string().contains("unterminated string"), "{err:?}");
    }

    #[test]
    fn rejects_malformed_number() {
        let err = Lexer::new("0x1g").tokenize().unwrap_err();
        assert!(err.to_string().contains("invalid numeric literal"), "{err:?}");
    }

    #[test]
    fn parses_integer_literal_radixes() {
        assert_eq!(parse_integer_literal("42").unwrap(), 42);
        assert_eq!(parse_integer_literal("0X1F").unwrap(), 31);
        assert_eq!(parse_integer_literal("0o17").unwrap(), 15);
        assert_eq!(parse_integer_literal("0b1010_1010").unwrap(), 0xAA);
        assert_eq!(parse_integer_literal("0xffff_ffff_ffff_ffff").unwrap(), u64::MAX);
        assert!(parse_integer_literal("0x").is_err());
        assert!(parse_integer_literal("0x1_0000_0000_0000_0000").is_err());
    }
}
