//! Recursive-descent parser for formulas:
//!
//! ```text
//! expr   := term (('+'|'-') term)*
//! term   := factor (('*'|'/') factor)*
//! factor := '-' factor | NUM | REF | NAME '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use crate::coords::Address;
use crate::error::{Error, Result};
use crate::expr::{Expr, Function};
use crate::scan::{Scanner, Token, TokenKind};

pub struct FormulaParser {
    scanner: Scanner,
}

impl Default for FormulaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaParser {
    pub fn new() -> Self {
        Self {
            scanner: Scanner::new(),
        }
    }

    /// Parses `text` as written in cell `base`.
    pub fn parse(&self, text: &str, base: Address) -> Result<Expr> {
        let tokens = self.scanner.scan(text, Some(base))?;
        let mut cursor = Cursor { tokens, index: 0 };
        let expr = cursor.expr()?;
        if cursor.peek().kind != TokenKind::Eof {
            return Err(cursor.unexpected());
        }
        Ok(expr)
    }
}

struct Cursor {
    // Always ends with an Eof token.
    tokens: Vec<Token>,
    index: usize,
}

impl Cursor {
    fn peek(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> Error {
        Error::Syntax(format!("unexpected {}", self.peek().describe()))
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut left = self.term()?;
        loop {
            let func = match self.peek().kind {
                TokenKind::Plus => Function::Add,
                TokenKind::Minus => Function::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = Expr::App(func, vec![left, right]);
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut left = self.factor()?;
        loop {
            let func = match self.peek().kind {
                TokenKind::Star => Function::Mul,
                TokenKind::Slash => Function::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.factor()?;
            left = Expr::App(func, vec![left, right]);
        }
    }

    fn factor(&mut self) -> Result<Expr> {
        match self.peek().kind.clone() {
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::App(Function::Sub, vec![self.factor()?]))
            }
            TokenKind::Num(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            TokenKind::Ref(cell_ref) => {
                self.advance();
                Ok(Expr::Ref(cell_ref))
            }
            TokenKind::Name(name) => {
                let token = self.advance();
                let func = Function::named(&name).ok_or_else(|| {
                    Error::Syntax(format!("unknown function {}", token.describe()))
                })?;
                self.expect(TokenKind::LeftParen)?;
                let mut args = vec![self.expr()?];
                while self.peek().kind == TokenKind::Comma {
                    self.advance();
                    args.push(self.expr()?);
                }
                self.expect(TokenKind::RightParen)?;
                Ok(Expr::App(func, args))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expr()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }
}
