pub mod ast;

use crate::interpreter::native_function::is_builtin;
use crate::parser::ast::{BinaryOp, Expr, ExprKind, Function, Item, Program, Stmt, StmtKind, UnaryOp};
use crate::scanner::token::{Token, TokenType};
use crate::span::Span;
use crate::stack::ensure_sufficient_stack;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected}, found {found}")]
pub struct ParseError {
    pub span: Span,
    pub expected: String,
    pub found: String,
}

/// Convenience wrapper around [`Parser::parse`].
pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    // utility methods
    fn peek(&self) -> &Token {
        // the scanner always terminates the stream with Eof, but an empty vector must not panic
        self.tokens
            .get(self.current)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn advance(&mut self) -> &Token {
        if self.is_at_end() {
            return self.peek();
        }
        self.current += 1;
        self.previous()
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn match_any(&mut self, types: &[TokenType]) -> bool {
        for t in types {
            if self.check(t.clone()) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn error_expected(&self, expected: &str) -> ParseError {
        let current = self.peek();
        ParseError {
            span: current.span,
            expected: expected.to_string(),
            found: current.describe(),
        }
    }

    fn consume(&mut self, token_type: TokenType, expected: &str) -> Result<&Token, ParseError> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(expected))
        }
    }

    fn identifier(&mut self, expected: &str) -> Result<(String, Span), ParseError> {
        let token = self.consume(TokenType::Identifier, expected)?;
        Ok((token.lexeme.clone(), token.span))
    }

    fn skip_semicolons(&mut self) {
        while self.check(TokenType::Semicolon) {
            self.advance();
        }
    }

    pub fn parse(mut self) -> Result<Program, ParseError> {
        let program = self.program()?;
        tracing::debug!(items = program.items.len(), "parsed program");
        Ok(program)
    }

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();

        loop {
            self.skip_semicolons();
            if self.is_at_end() {
                break;
            }

            if self.check(TokenType::Func) {
                items.push(Item::Function(self.fn_decl()?));
            } else {
                items.push(Item::Statement(self.statement()?));
            }
        }

        Ok(Program { items })
    }

    fn fn_decl(&mut self) -> Result<Function, ParseError> {
        let span = self.peek().span;
        self.advance(); // consume func

        let (name, name_span) = self.identifier("function name")?;
        if is_builtin(&name) {
            return Err(ParseError {
                span: name_span,
                expected: "a function name that is not a built-in".to_string(),
                found: format!("built-in '{}'", name),
            });
        }

        self.consume(TokenType::LeftParen, "'(' after function name")?;
        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            params.push(self.identifier("parameter name")?.0);
            while self.match_any(&[TokenType::Comma]) {
                params.push(self.identifier("parameter name")?.0);
            }
        }
        self.consume(TokenType::RightParen, "')' after parameters")?;

        let body = self.block()?;

        Ok(Function {
            name,
            params,
            body,
            span,
        })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let token_type = self.peek().token_type.clone();
        let stmt = ensure_sufficient_stack(|| match token_type {
            TokenType::Var => self.var_decl(),
            TokenType::If => self.if_stmt(),
            TokenType::For => self.for_stmt(),
            TokenType::While => self.while_stmt(),
            TokenType::Return => self.return_stmt(),
            TokenType::LeftBrace => {
                let span = self.peek().span;
                let statements = self.block()?;
                Ok(Stmt {
                    kind: StmtKind::Block(statements),
                    span,
                })
            }
            TokenType::Func => Err(self.error_expected("a statement (functions are only allowed at top level)")),
            _ => self.simple_stmt(),
        })?;

        // optional terminator
        self.match_any(&[TokenType::Semicolon]);
        Ok(stmt)
    }

    fn var_decl(&mut self) -> Result<Stmt, ParseError> {
        let span = self.peek().span;
        self.advance(); // consume var
        let (name, _) = self.identifier("variable name after 'var'")?;

        let initializer = if self.match_any(&[TokenType::Assign]) {
            Some(self.expression()?)
        } else {
            None
        };

        Ok(Stmt {
            kind: StmtKind::Var { name, initializer },
            span,
        })
    }

    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let span = self.peek().span;
        self.advance(); // consume if

        self.consume(TokenType::LeftParen, "'(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "')' after if condition")?;

        let then_branch = self.block()?;

        let else_branch = if self.match_any(&[TokenType::Else]) {
            if self.check(TokenType::If) {
                Some(Box::new(self.if_stmt()?))
            } else {
                let else_span = self.peek().span;
                let statements = self.block()?;
                Some(Box::new(Stmt {
                    kind: StmtKind::Block(statements),
                    span: else_span,
                }))
            }
        } else {
            None
        };

        Ok(Stmt {
            kind: StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span,
        })
    }

    fn for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let span = self.peek().span;
        self.advance(); // consume for
        self.consume(TokenType::LeftParen, "'(' after 'for'")?;

        if self.check(TokenType::Semicolon) {
            return Err(self.error_expected("for-loop initializer"));
        }
        let init = Box::new(self.for_clause()?);
        self.consume(TokenType::Semicolon, "';' after for-loop initializer")?;

        if self.check(TokenType::Semicolon) {
            return Err(self.error_expected("for-loop condition"));
        }
        let condition = self.expression()?;
        self.consume(TokenType::Semicolon, "';' after for-loop condition")?;

        if self.check(TokenType::RightParen) {
            return Err(self.error_expected("for-loop step"));
        }
        let step = Box::new(self.for_clause()?);
        self.consume(TokenType::RightParen, "')' after for-loop clauses")?;

        let body = self.block()?;

        Ok(Stmt {
            kind: StmtKind::For {
                init,
                condition,
                step,
                body,
            },
            span,
        })
    }

    fn for_clause(&mut self) -> Result<Stmt, ParseError> {
        if self.check(TokenType::Var) {
            self.var_decl()
        } else {
            self.simple_stmt()
        }
    }

    fn while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let span = self.peek().span;
        self.advance(); // consume while
        self.consume(TokenType::LeftParen, "'(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "')' after while condition")?;
        let body = self.block()?;

        Ok(Stmt {
            kind: StmtKind::While { condition, body },
            span,
        })
    }

    fn return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let span = self.peek().span;
        self.advance(); // consume return
        let value = if self.check(TokenType::Semicolon)
            || self.check(TokenType::RightBrace)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.expression()?)
        };

        Ok(Stmt {
            kind: StmtKind::Return(value),
            span,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.consume(TokenType::LeftBrace, "'{'")?;

        let mut statements = Vec::new();
        loop {
            self.skip_semicolons();
            if self.check(TokenType::RightBrace) || self.is_at_end() {
                break;
            }
            statements.push(self.statement()?);
        }

        self.consume(TokenType::RightBrace, "'}'")?;
        Ok(statements)
    }

    // expression statement, or assignment when followed by '='
    fn simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        let span = self.peek().span;
        let expr = self.expression()?;

        if self.check(TokenType::Assign) {
            match &expr.kind {
                ExprKind::Identifier(_) | ExprKind::Index { .. } => {}
                _ => {
                    return Err(ParseError {
                        span: self.peek().span,
                        expected: "a variable or index expression before '='".to_string(),
                        found: "'='".to_string(),
                    });
                }
            }
            self.advance(); // consume '='
            let value = self.expression()?;
            return Ok(Stmt {
                kind: StmtKind::Assign {
                    target: expr,
                    value,
                },
                span,
            });
        }

        Ok(Stmt {
            kind: StmtKind::Expr(expr),
            span,
        })
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| self.equality())
    }

    // This method is created because pretty much all binary levels share the same loop
    fn binary_expression<F>(
        &mut self,
        operators: &[(TokenType, BinaryOp)],
        mut next_precedence: F, // We pass a closure here
    ) -> Result<Expr, ParseError>
    where
        F: FnMut(&mut Self) -> Result<Expr, ParseError>,
    {
        // Parse the left side -- remember we are left associative
        let mut left = next_precedence(self)?;

        while let Some(operator) = operators
            .iter()
            .find(|(token_type, _)| self.check(token_type.clone()))
            .map(|(_, op)| *op)
        {
            let span = self.advance().span;
            let right = next_precedence(self)?;

            left = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                },
                span,
            };
        }

        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_expression(
            &[
                (TokenType::Equal, BinaryOp::Equal),
                (TokenType::NotEqual, BinaryOp::NotEqual),
            ],
            |p| p.comparison(),
        )
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.binary_expression(
            &[
                (TokenType::Less, BinaryOp::Less),
                (TokenType::LessEqual, BinaryOp::LessEqual),
                (TokenType::Greater, BinaryOp::Greater),
                (TokenType::GreaterEqual, BinaryOp::GreaterEqual),
            ],
            |p| p.term(),
        )
    }

    // Not routed through binary_expression: a signed literal right after an operand
    // (`n-1` scans as `n`, `-1`) is a subtraction.
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.factor()?;

        loop {
            let (operator, span) = if self.check(TokenType::Plus) {
                (BinaryOp::Add, self.advance().span)
            } else if self.check(TokenType::Minus) {
                (BinaryOp::Subtract, self.advance().span)
            } else if let Some(span) = self.split_signed_number() {
                (BinaryOp::Subtract, span)
            } else {
                break;
            };

            let right = self.factor()?;
            left = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                },
                span,
            };
        }

        Ok(left)
    }

    /// If the current token is a signed number literal, strip its sign in place and return the
    /// span the '-' occupied.
    fn split_signed_number(&mut self) -> Option<Span> {
        let token = self.tokens.get_mut(self.current)?;
        let TokenType::Number(n) = token.token_type else {
            return None;
        };
        let digits = token.lexeme.strip_prefix('-')?.to_string();

        let minus_span = Span {
            length: 1,
            ..token.span
        };
        token.token_type = TokenType::Number(-n);
        token.lexeme = digits;
        token.span.col += 1;
        token.span.length = token.span.length.saturating_sub(1);
        Some(minus_span)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        self.binary_expression(
            &[
                (TokenType::Star, BinaryOp::Multiply),
                (TokenType::Slash, BinaryOp::Divide),
            ],
            |p| p.unary(),
        )
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenType::Minus) {
            let span = self.advance().span;
            let operand = ensure_sufficient_stack(|| self.unary())?; // chained unary: --x
            Ok(Expr {
                kind: ExprKind::Unary {
                    operator: UnaryOp::Negate,
                    operand: Box::new(operand),
                },
                span,
            })
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        while self.check(TokenType::LeftBracket) {
            let span = self.advance().span;
            let index = self.expression()?;
            self.consume(TokenType::RightBracket, "']' after index")?;

            expr = Expr {
                kind: ExprKind::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                },
                span,
            };
        }

        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        let span = token.span;

        let kind = match token.token_type {
            TokenType::Number(n) => {
                self.advance();
                ExprKind::Num(n)
            }
            TokenType::String(s) => {
                self.advance();
                ExprKind::Str(s)
            }
            TokenType::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenType::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenType::Identifier => {
                self.advance();
                if self.match_any(&[TokenType::LeftParen]) {
                    let arguments = self.arguments(TokenType::RightParen, "')' after arguments")?;
                    ExprKind::Call {
                        callee: token.lexeme,
                        arguments,
                    }
                } else {
                    ExprKind::Identifier(token.lexeme)
                }
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "')' after expression")?;
                return Ok(expr);
            }
            TokenType::LeftBracket => {
                self.advance();
                let elements = self.arguments(TokenType::RightBracket, "']' after array elements")?;
                ExprKind::Array { elements }
            }
            _ => return Err(self.error_expected("expression")),
        };

        Ok(Expr { kind, span })
    }

    // comma-separated expressions up to and including `close`; a trailing comma is allowed
    fn arguments(&mut self, close: TokenType, expected: &str) -> Result<Vec<Expr>, ParseError> {
        let mut elements = Vec::new();
        while !self.check(close.clone()) {
            elements.push(self.expression()?);
            if !self.match_any(&[TokenType::Comma]) {
                break;
            }
        }
        self.consume(close, expected)?;
        Ok(elements)
    }
}

static EOF: Token = Token {
    token_type: TokenType::Eof,
    lexeme: String::new(),
    span: Span {
        line: 1,
        col: 1,
        length: 0,
    },
};
