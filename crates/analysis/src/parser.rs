//! Recursive-descent parser over the token stream.
//!
//! Grammar (loosest binding first):
//!
//! ```text
//! program    := stmt*
//! stmt       := IDENT ":=" expr ";"
//!             | "if" "(" cond ")" block ("else" (block | if-stmt))? ";"?
//!             | "while" "(" cond ")" block ";"?
//!             | "for" "(" assign? ";" cond ";" assign? ")" block ";"?
//!             | "assert" "(" cond ")" ";"
//! cond       := and ("||" and)*
//! and        := unary ("&&" unary)*
//! unary      := "!" unary | "(" cond ")" | comparison
//! comparison := expr (cmp-op expr)?
//! expr       := term (("+" | "-") term)*
//! term       := factor (("*" | "/") factor)*
//! factor     := INT | IDENT | "(" expr ")"
//! ```
//!
//! A parenthesised condition and a parenthesised expression start the same
//! way; the parser tries the condition first and falls back to the
//! expression when the closing parenthesis is followed by an arithmetic or
//! comparison operator.

use std::ops::Range;

use crate::ast::{Assign, BinOp, CmpOp, Cond, Expr, Stmt};
use crate::error::ParseError;
use crate::lexer::{Spanned, Token, tokenize};

/// Parse program text into a statement tree.
pub fn parse(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let program = parser.program()?;
    tracing::debug!(statements = program.len(), "Parsed program");
    Ok(program)
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Spanned<'s>>,
    pos: usize,
}

impl<'s> Parser<'s> {
    // ---- Token cursor ----

    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn span_here(&self) -> Range<usize> {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.clone(),
            None => self.source.len()..self.source.len(),
        }
    }

    fn advance(&mut self) -> Option<Token<'s>> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token<'s>) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token<'s>) -> Result<(), ParseError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(&expected.describe()))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(self.source, self.span_here(), message)
    }

    fn unexpected(&self, wanted: &str) -> ParseError {
        let found = self
            .peek()
            .map_or_else(|| "end of input".to_string(), Token::describe);
        self.error_here(format!("expected {wanted}, found {found}"))
    }

    // ---- Statements ----

    fn program(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            stmts.push(self.stmt()?);
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let assign = self.assign()?;
                self.expect(Token::Semi)?;
                Ok(Stmt::Assign(assign))
            }
            Some(Token::If) => {
                let stmt = self.if_stmt()?;
                self.eat(&Token::Semi);
                Ok(stmt)
            }
            Some(Token::While) => {
                self.advance();
                let cond = self.paren_cond()?;
                let body = self.block()?;
                self.eat(&Token::Semi);
                Ok(Stmt::While { cond, body })
            }
            Some(Token::For) => {
                let stmt = self.for_stmt()?;
                self.eat(&Token::Semi);
                Ok(stmt)
            }
            Some(Token::Assert) => {
                self.advance();
                let cond = self.paren_cond()?;
                self.expect(Token::Semi)?;
                Ok(Stmt::Assert(cond))
            }
            _ => Err(self.unexpected("statement")),
        }
    }

    fn assign(&mut self) -> Result<Assign, ParseError> {
        let target = match self.peek() {
            Some(Token::Ident(name)) => name.to_string(),
            _ => return Err(self.unexpected("identifier")),
        };
        self.advance();
        self.expect(Token::Assign)?;
        let expr = self.expr()?;
        Ok(Assign { target, expr })
    }

    fn if_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::If)?;
        let cond = self.paren_cond()?;
        let body = self.block()?;
        let else_body = if self.eat(&Token::Else) {
            if self.peek() == Some(&Token::If) {
                Some(vec![self.if_stmt()?])
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            body,
            else_body,
        })
    }

    fn for_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::For)?;
        self.expect(Token::LParen)?;
        let init = if self.peek() == Some(&Token::Semi) {
            None
        } else {
            Some(self.assign()?)
        };
        self.expect(Token::Semi)?;
        let cond = self.cond()?;
        self.expect(Token::Semi)?;
        let update = if self.peek() == Some(&Token::RParen) {
            None
        } else {
            Some(self.assign()?)
        };
        self.expect(Token::RParen)?;
        let body = self.block()?;
        Ok(Stmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn paren_cond(&mut self) -> Result<Cond, ParseError> {
        self.expect(Token::LParen)?;
        let cond = self.cond()?;
        self.expect(Token::RParen)?;
        Ok(cond)
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(Token::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(stmts);
                }
                None => return Err(self.unexpected("`}`")),
                Some(_) => stmts.push(self.stmt()?),
            }
        }
    }

    // ---- Conditions ----

    fn cond(&mut self) -> Result<Cond, ParseError> {
        let mut lhs = self.and_cond()?;
        while self.eat(&Token::OrOr) {
            lhs = lhs.or(self.and_cond()?);
        }
        Ok(lhs)
    }

    fn and_cond(&mut self) -> Result<Cond, ParseError> {
        let mut lhs = self.unary_cond()?;
        while self.eat(&Token::AndAnd) {
            lhs = lhs.and(self.unary_cond()?);
        }
        Ok(lhs)
    }

    fn unary_cond(&mut self) -> Result<Cond, ParseError> {
        if self.eat(&Token::Bang) {
            return Ok(self.unary_cond()?.negated());
        }
        if self.peek() != Some(&Token::LParen) {
            return self.comparison();
        }

        let start = self.pos;
        let grouped = self.paren_cond();
        let grouped_err = match grouped {
            Ok(cond) if !self.peek().is_some_and(continues_expression) => return Ok(cond),
            Ok(_) => None,
            Err(err) => Some(err),
        };

        self.pos = start;
        match (self.comparison(), grouped_err) {
            (Ok(cond), _) => Ok(cond),
            (Err(err), Some(first)) if first.span.start > err.span.start => Err(first),
            (Err(err), _) => Err(err),
        }
    }

    fn comparison(&mut self) -> Result<Cond, ParseError> {
        let lhs = self.expr()?;
        let op = match self.peek() {
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::EqEq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::Ne,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Ge) => CmpOp::Ge,
            _ => return Ok(Cond::Truthy(lhs)),
        };
        self.advance();
        let rhs = self.expr()?;
        Ok(Cond::compare(op, lhs, rhs))
    }

    // ---- Expressions ----

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            lhs = Expr::binary(op, lhs, self.term()?);
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            lhs = Expr::binary(op, lhs, self.factor()?);
        }
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Int(n)) => {
                let n = *n;
                self.advance();
                Ok(Expr::Num(n))
            }
            Some(Token::Ident(name)) => {
                let name = name.to_string();
                self.advance();
                Ok(Expr::Var(name))
            }
            Some(Token::LParen) => {
                self.advance();
                let expr = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

/// Tokens that can only follow a parenthesised group if it was an expression.
fn continues_expression(token: &Token<'_>) -> bool {
    matches!(
        token,
        Token::Plus
            | Token::Minus
            | Token::Star
            | Token::Slash
            | Token::Lt
            | Token::Gt
            | Token::EqEq
            | Token::NotEq
            | Token::Le
            | Token::Ge
    )
}
