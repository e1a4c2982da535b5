//! monke-lex — source text to token stream.
//!
//! Single-pass, one-character lookahead lexer, split the way the teacher
//! crate (`faxc-lex`) splits its own lexer: a `cursor` for raw character
//! access and a `token` module for the tag type, with `Lexer` dispatching
//! on the current character.

mod cursor;
mod token;

pub use token::{Token, TokenKind};

use cursor::Cursor;

/// Converts source text into a stream of [`Token`]s.
///
/// Call [`Lexer::next_token`] repeatedly; the lexer yields `TokenKind::Eof`
/// forever once the input is exhausted (it never panics on overrun).
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            cursor: Cursor::new(source),
        }
    }

    /// Returns the next token, advancing past it.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let ch = self.cursor.current();
        if ch == '\0' {
            return Token::new(TokenKind::Eof, String::new());
        }

        match ch {
            '=' => self.lex_one_or_two('=', TokenKind::Assign, TokenKind::Eq),
            '!' => self.lex_one_or_two('=', TokenKind::Bang, TokenKind::NotEq),
            '+' => self.lex_single(TokenKind::Plus),
            '-' => self.lex_single(TokenKind::Minus),
            '*' => self.lex_single(TokenKind::Asterisk),
            '/' => self.lex_single(TokenKind::Slash),
            '<' => self.lex_single(TokenKind::Lt),
            '>' => self.lex_single(TokenKind::Gt),
            ',' => self.lex_single(TokenKind::Comma),
            ';' => self.lex_single(TokenKind::Semicolon),
            ':' => self.lex_single(TokenKind::Colon),
            '(' => self.lex_single(TokenKind::LParen),
            ')' => self.lex_single(TokenKind::RParen),
            '{' => self.lex_single(TokenKind::LBrace),
            '}' => self.lex_single(TokenKind::RBrace),
            '[' => self.lex_single(TokenKind::LBracket),
            ']' => self.lex_single(TokenKind::RBracket),
            '"' => self.lex_string(),
            c if is_ident_start(c) => self.lex_identifier(),
            c if c.is_ascii_digit() => self.lex_integer(),
            c => {
                self.cursor.advance();
                Token::new(TokenKind::Illegal, c.to_string())
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.cursor.current(), ' ' | '\t' | '\n' | '\r') {
            self.cursor.advance();
        }
    }

    fn lex_single(&mut self, kind: TokenKind) -> Token {
        let ch = self.cursor.current();
        self.cursor.advance();
        Token::new(kind, ch.to_string())
    }

    /// Commits to `two` if the next character is `expect`, else `one`.
    fn lex_one_or_two(&mut self, expect: char, one: TokenKind, two: TokenKind) -> Token {
        let first = self.cursor.current();
        if self.cursor.peek() == expect {
            self.cursor.advance();
            self.cursor.advance();
            let mut literal = String::with_capacity(2);
            literal.push(first);
            literal.push(expect);
            Token::new(two, literal)
        } else {
            self.cursor.advance();
            Token::new(one, first.to_string())
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.cursor.position();
        while is_ident_continue(self.cursor.current()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice(start, self.cursor.position());
        Token::from_ident(text)
    }

    fn lex_integer(&mut self) -> Token {
        let start = self.cursor.position();
        while self.cursor.current().is_ascii_digit() {
            self.cursor.advance();
        }
        let text = self.cursor.slice(start, self.cursor.position());
        Token::new(TokenKind::Int, text.to_string())
    }

    fn lex_string(&mut self) -> Token {
        self.cursor.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.cursor.current() {
                '\0' => break,
                '"' => {
                    self.cursor.advance();
                    break;
                }
                '\\' => {
                    self.cursor.advance();
                    let escaped = match self.cursor.current() {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' => '\\',
                        '"' => '"',
                        other => other,
                    };
                    value.push(escaped);
                    self.cursor.advance();
                }
                c => {
                    value.push(c);
                    self.cursor.advance();
                }
            }
        }
        Token::new(TokenKind::Str, value)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let tok = self.next_token();
        if tok.kind == TokenKind::Eof {
            None
        } else {
            Some(tok)
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    // Identifiers exclude digits by design; see spec §4.1.
    is_ident_start(c)
}
