//! Lexical analysis for layout source

use crate::error::{CompilerError, Result, SourcePos};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Integer,
    /// Decimal literal such as `1.5`
    Number,
    /// Integer or decimal directly followed by `%`
    Percentage,
    String,
    OpenBrace,
    CloseBrace,
    OpenParens,
    CloseParens,
    Colon,
    Semicolon,
    Comma,
    Eof,
    Invalid,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Integer => "integer",
            TokenKind::Number => "number",
            TokenKind::Percentage => "percentage",
            TokenKind::String => "string",
            TokenKind::OpenBrace => "opening brace",
            TokenKind::CloseBrace => "closing brace",
            TokenKind::OpenParens => "opening parens",
            TokenKind::CloseParens => "closing parens",
            TokenKind::Colon => "colon",
            TokenKind::Semicolon => "semicolon",
            TokenKind::Comma => "comma",
            TokenKind::Eof => "<end of file>",
            TokenKind::Invalid => "<invalid token>",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text; string literals carry their unescaped contents
    pub text: String,
    pub pos: SourcePos,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: SourcePos) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    pub fn is_identifier(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == text
    }
}

/// A stream of tokens with one token of lookahead
pub trait TokenSource {
    /// Next token without consuming it; `None` at end of input
    fn peek(&mut self) -> Option<&Token>;

    /// Consumes the next token; `None` at end of input
    fn lex(&mut self) -> Option<Token>;

    /// Where the stream currently stands, for end-of-input errors
    fn position(&self) -> SourcePos;
}

/// Checked token consumption shared by the tree compiler and value encoder
pub trait TokenSourceExt: TokenSource {
    /// Consumes the next token, failing at end of input
    fn expect_token(&mut self) -> Result<Token> {
        let pos = self.position();
        self.lex().ok_or(CompilerError::UnexpectedEndOfInput { pos })
    }

    /// Consumes the next token and requires it to be of `kind`
    fn accept(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.expect_token()?;
        if token.kind != kind {
            return Err(CompilerError::syntax(token.pos, kind.to_string(), token.text));
        }
        Ok(token)
    }
}

impl<T: TokenSource + ?Sized> TokenSourceExt for T {}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    peeked: Option<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            peeked: None,
        }
    }

    /// Scans the whole input; the last token is always `Eof`
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.peeked.take() {
            return token;
        }
        self.scan_token()
    }

    fn scan_token(&mut self) -> Token {
        if let Some(invalid) = self.skip_trivia() {
            return invalid;
        }

        let start = self.current_pos();
        let Some(ch) = self.peek_char() else {
            return Token::new(TokenKind::Eof, "", start);
        };

        let punct = match ch {
            '{' => Some(TokenKind::OpenBrace),
            '}' => Some(TokenKind::CloseBrace),
            '(' => Some(TokenKind::OpenParens),
            ')' => Some(TokenKind::CloseParens),
            ':' => Some(TokenKind::Colon),
            ';' => Some(TokenKind::Semicolon),
            ',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = punct {
            self.advance();
            return Token::new(kind, ch.to_string(), start);
        }

        match ch {
            '"' => self.read_string(start),
            c if c.is_ascii_digit()
                || (c == '-' && self.peek_next().map_or(false, |n| n.is_ascii_digit())) =>
            {
                self.read_number(start)
            }
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(start),
            _ => {
                self.advance();
                Token::new(TokenKind::Invalid, ch.to_string(), start)
            }
        }
    }

    /// Skips whitespace and comments. An unterminated block comment comes back
    /// as an invalid token.
    fn skip_trivia(&mut self) -> Option<Token> {
        loop {
            match (self.peek_char(), self.peek_next()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.current_pos();
                    self.advance();
                    self.advance();
                    loop {
                        match (self.peek_char(), self.peek_next()) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (Some(_), _) => {
                                self.advance();
                            }
                            (None, _) => return Some(Token::new(TokenKind::Invalid, "/*", start)),
                        }
                    }
                }
                _ => return None,
            }
        }
    }

    fn read_string(&mut self, start: SourcePos) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        let mut raw = String::from("\"");

        while let Some(ch) = self.peek_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Token::new(TokenKind::String, value, start);
                }
                '\n' | '\r' => break,
                '\\' => {
                    self.advance();
                    raw.push('\\');
                    let Some(escaped) = self.peek_char() else {
                        break;
                    };
                    self.advance();
                    raw.push(escaped);
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        '\'' => value.push('\''),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                _ => {
                    self.advance();
                    raw.push(ch);
                    value.push(ch);
                }
            }
        }

        // unterminated
        Token::new(TokenKind::Invalid, raw, start)
    }

    fn read_number(&mut self, start: SourcePos) -> Token {
        let mut text = String::new();
        if self.peek_char() == Some('-') {
            text.push(self.advance());
        }
        self.read_digits(&mut text);

        let mut kind = TokenKind::Integer;
        if self.peek_char() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            text.push(self.advance());
            self.read_digits(&mut text);
            kind = TokenKind::Number;
        }

        if self.peek_char() == Some('%') {
            text.push(self.advance());
            kind = TokenKind::Percentage;
        }

        Token::new(kind, text, start)
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek_char() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(self.advance());
        }
    }

    fn read_identifier(&mut self, start: SourcePos) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            text.push(self.advance());
        }
        Token::new(TokenKind::Identifier, text, start)
    }

    fn advance(&mut self) -> char {
        let ch = self.input[self.position];
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn current_pos(&self) -> SourcePos {
        SourcePos::new(self.line, self.column)
    }
}

impl TokenSource for Lexer {
    fn peek(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scan_token());
        }
        self.peeked.as_ref().filter(|t| t.kind != TokenKind::Eof)
    }

    fn lex(&mut self) -> Option<Token> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            // keep reporting end of input on every further call
            self.peeked = Some(token);
            return None;
        }
        log::trace!("token {} '{}' at {}", token.kind, token.text, token.pos);
        Some(token)
    }

    fn position(&self) -> SourcePos {
        match &self.peeked {
            Some(token) => token.pos,
            None => self.current_pos(),
        }
    }
}
