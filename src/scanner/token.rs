use crate::span::Span;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, span: Span) -> Self {
        Token {
            token_type,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// Human-readable form used in parse errors ("found ...").
    pub fn describe(&self) -> String {
        match &self.token_type {
            TokenType::Eof => "end of input".to_string(),
            TokenType::String(_) => format!("string {}", self.lexeme),
            TokenType::Number(_) => format!("number '{}'", self.lexeme),
            TokenType::Identifier => format!("identifier '{}'", self.lexeme),
            t if t.kind() == TokenKind::Keyword => format!("keyword '{}'", self.lexeme),
            _ => format!("'{}'", self.lexeme),
        }
    }
}

/// Coarse token classes, as seen by callers that only care about the category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Number,
    String,
    Operator,
    Punctuation,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenType {
    // Punctuation
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    Semicolon,    // ;

    // Operators
    Minus,        // -
    Plus,         // +
    Slash,        // /
    Star,         // *
    Assign,       // =
    Equal,        // ==
    NotEqual,     // !=
    Greater,      // >
    GreaterEqual, // >=
    Less,         // <
    LessEqual,    // <=

    // Literals
    Identifier,     // variable names, function names
    String(String), // "hello world", escapes already removed
    Number(f64),    // 123, 45.67, -3

    // Keywords
    Else,   // else
    False,  // false
    Func,   // func
    For,    // for
    If,     // if
    Return, // return
    True,   // true
    Var,    // var
    While,  // while

    Eof,
}

impl TokenType {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenType::LeftParen
            | TokenType::RightParen
            | TokenType::LeftBrace
            | TokenType::RightBrace
            | TokenType::LeftBracket
            | TokenType::RightBracket
            | TokenType::Comma
            | TokenType::Semicolon => TokenKind::Punctuation,
            TokenType::Minus
            | TokenType::Plus
            | TokenType::Slash
            | TokenType::Star
            | TokenType::Assign
            | TokenType::Equal
            | TokenType::NotEqual
            | TokenType::Greater
            | TokenType::GreaterEqual
            | TokenType::Less
            | TokenType::LessEqual => TokenKind::Operator,
            TokenType::Identifier => TokenKind::Identifier,
            TokenType::String(_) => TokenKind::String,
            TokenType::Number(_) => TokenKind::Number,
            TokenType::Else
            | TokenType::False
            | TokenType::Func
            | TokenType::For
            | TokenType::If
            | TokenType::Return
            | TokenType::True
            | TokenType::Var
            | TokenType::While => TokenKind::Keyword,
            TokenType::Eof => TokenKind::Eof,
        }
    }

    pub fn keyword(text: &str) -> Option<TokenType> {
        match text {
            "else" => Some(TokenType::Else),
            "false" => Some(TokenType::False),
            "func" => Some(TokenType::Func),
            "for" => Some(TokenType::For),
            "if" => Some(TokenType::If),
            "return" => Some(TokenType::Return),
            "true" => Some(TokenType::True),
            "var" => Some(TokenType::Var),
            "while" => Some(TokenType::While),
            _ => None,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenType::LeftParen => "(",
            TokenType::RightParen => ")",
            TokenType::LeftBrace => "{",
            TokenType::RightBrace => "}",
            TokenType::LeftBracket => "[",
            TokenType::RightBracket => "]",
            TokenType::Comma => ",",
            TokenType::Semicolon => ";",
            TokenType::Minus => "-",
            TokenType::Plus => "+",
            TokenType::Slash => "/",
            TokenType::Star => "*",
            TokenType::Assign => "=",
            TokenType::Equal => "==",
            TokenType::NotEqual => "!=",
            TokenType::Greater => ">",
            TokenType::GreaterEqual => ">=",
            TokenType::Less => "<",
            TokenType::LessEqual => "<=",
            TokenType::Identifier => "identifier",
            TokenType::String(_) => "string",
            TokenType::Number(_) => "number",
            TokenType::Else => "else",
            TokenType::False => "false",
            TokenType::Func => "func",
            TokenType::For => "for",
            TokenType::If => "if",
            TokenType::Return => "return",
            TokenType::True => "true",
            TokenType::Var => "var",
            TokenType::While => "while",
            TokenType::Eof => "end of input",
        };
        write!(f, "{}", text)
    }
}
