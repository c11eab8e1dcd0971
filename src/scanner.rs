pub mod token;

use crate::scanner::token::{Token, TokenType};
use crate::span::Span;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ScanError {
    pub span: Span,
    pub message: String,
}

/// Convenience wrapper around [`Scanner::scan_tokens`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScanError> {
    Scanner::new(source).scan_tokens()
}

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    line_start: usize,
    // position of the first char of the token being scanned; strings and block comments can
    // run over several lines, so this can't be recomputed from `line_start` afterwards
    start_line: usize,
    start_col: usize,
}

impl Scanner {
    pub fn new(source: impl Into<String>) -> Self {
        Scanner {
            source: source.into().chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            line_start: 0,
            start_line: 1,
            start_col: 1,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    pub fn scan_tokens(mut self) -> Result<Vec<Token>, ScanError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_col = self.current - self.line_start + 1;
            self.scan_token()?;
        }

        let eof_span = Span {
            line: self.line,
            col: self.current - self.line_start + 1,
            length: 0,
        };
        self.tokens.push(Token::new(TokenType::Eof, "", eof_span));
        tracing::trace!(count = self.tokens.len(), "scanned tokens");
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), ScanError> {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            ';' => self.add_token(TokenType::Semicolon),
            '+' => self.add_token(TokenType::Plus),
            '*' => self.add_token(TokenType::Star),

            // A minus glued to a digit is a signed literal; the parser turns it back into a
            // subtraction when it shows up after an operand.
            '-' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return self.handle_number();
                }
                self.add_token(TokenType::Minus)
            }

            // One or two character tokens
            '!' => {
                if self.match_char('=') {
                    self.add_token(TokenType::NotEqual)
                } else {
                    return Err(self.error("Unexpected character: '!'"));
                }
            }

            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::Equal
                } else {
                    TokenType::Assign
                };
                self.add_token(token_type);
            }

            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }

            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }

            '/' => {
                if self.match_char('/') {
                    // Comment goes until end of line
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                } else if self.match_char('*') {
                    self.block_comment()?;
                } else {
                    self.add_token(TokenType::Slash);
                }
            }

            ' ' | '\r' | '\t' => {}

            '\n' => self.newline(),

            '"' => return self.handle_string(),

            c if c.is_ascii_digit() => return self.handle_number(),

            c if c.is_ascii_alphabetic() || c == '_' => self.handle_identifier(),

            _ => return Err(self.error(format!("Unexpected character: '{}'", c))),
        }
        Ok(())
    }

    fn advance(&mut self) -> char {
        let ch = self.source[self.current];
        self.current += 1;
        ch
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    fn match_char(&mut self, expected: char) -> bool {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.current += 1;
                true
            }
            _ => false,
        }
    }

    // call right after consuming a '\n'
    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.current;
    }

    fn block_comment(&mut self) -> Result<(), ScanError> {
        loop {
            match self.peek() {
                None => return Err(self.error("Unterminated block comment")),
                Some('*') if self.peek_next() == Some('/') => {
                    self.advance(); // consume '*'
                    self.advance(); // consume '/'
                    return Ok(());
                }
                Some('\n') => {
                    self.advance();
                    self.newline();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn handle_string(&mut self) -> Result<(), ScanError> {
        let mut value = String::new();

        loop {
            match self.peek() {
                None => return Err(self.error("Unterminated string")),
                Some('"') => break,
                // \" is the only escape; every other backslash stays as written
                Some('\\') if self.peek_next() == Some('"') => {
                    self.advance();
                    self.advance();
                    value.push('"');
                }
                Some('\n') => {
                    self.advance();
                    self.newline();
                    value.push('\n');
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        self.advance(); // closing quote
        self.add_token(TokenType::String(value));
        Ok(())
    }

    fn handle_number(&mut self) -> Result<(), ScanError> {
        // First character (digit or '-') is already consumed
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(); // consume '.'

            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        match text.parse::<f64>() {
            Ok(num) => {
                self.add_token(TokenType::Number(num));
                Ok(())
            }
            Err(_) => Err(self.error(format!("Invalid number: '{}'", text))),
        }
    }

    fn handle_identifier(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let token_type = TokenType::keyword(&text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.start_line,
            col: self.start_col,
            length: (self.current - self.start).max(1),
        }
    }

    fn add_token(&mut self, t: TokenType) {
        let text = self.source[self.start..self.current]
            .iter()
            .collect::<String>();
        let span = self.current_span();
        self.tokens.push(Token::new(t, text, span));
    }

    fn error(&self, message: impl Into<String>) -> ScanError {
        ScanError {
            span: self.current_span(),
            message: message.into(),
        }
    }
}
