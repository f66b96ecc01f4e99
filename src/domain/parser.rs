//! Recursive descent parser for rule programs.
//!
//! One-token lookahead over the scanner. The grammar, loosest to tightest:
//!
//! ```text
//! program := "symbol" STRING rule*
//! rule    := "if" expr "then" action "end"
//! action  := ("buy" | "sell") NUMBER
//! expr    := or
//! or      := and  ("or"  and)*
//! and     := not  ("and" not)*
//! not     := "not" not | cmp
//! cmp     := add  (("<"|">"|"<="|">="|"=="|"!=") add)?
//! add     := mul  (("+"|"-") mul)*
//! mul     := primary (("*"|"/") primary)*
//! primary := NUMBER | STRING | IDENT ("(" args? ")")? | "(" expr ")"
//! ```
//!
//! Comparisons do not chain: a second comparator after a `cmp` is left for
//! the caller, where it fails the grammar. Errors are not recovered; the
//! first mismatch ends the parse.

use crate::domain::ast::{BinOp, Expr, Program, Rule, Stmt, UnOp};
use crate::domain::error::ParseError;
use crate::domain::scanner::Scanner;
use crate::domain::token::{Token, TokenKind};

struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self { scanner, current }
    }

    fn advance(&mut self) {
        self.current = self.scanner.next_token();
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            lexeme: self.current.lexeme.clone(),
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<(), ParseError> {
        if self.current.kind != kind {
            return Err(self.error(message));
        }
        self.advance();
        Ok(())
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current.kind {
            TokenKind::Number => {
                let value = self.current.value;
                self.advance();
                Ok(Expr::Number(value))
            }
            TokenKind::Ident => {
                let name = self.current.lexeme.clone();
                self.advance();
                if self.current.kind == TokenKind::LParen {
                    self.advance();
                    let mut args = Vec::new();
                    if self.current.kind != TokenKind::RParen {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.current.kind == TokenKind::Comma {
                                self.advance();
                                continue;
                            }
                            break;
                        }
                    }
                    self.consume(
                        TokenKind::RParen,
                        "Expected ')' after function arguments",
                    )?;
                    return Ok(Expr::Call { name, args });
                }
                Ok(Expr::Ident(name))
            }
            TokenKind::Str => {
                let text = self.current.lexeme.clone();
                self.advance();
                Ok(Expr::Str(text))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.consume(TokenKind::RParen, "Expected ')'")?;
                Ok(expr)
            }
            _ => Err(self.error("Expected expression")),
        }
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_primary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_add()?;
        let op = match self.current.kind {
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Ge => BinOp::Ge,
            TokenKind::Le => BinOp::Le,
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::Ne => BinOp::Ne,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_add()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.current.kind == TokenKind::Not {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_cmp()
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.current.kind == TokenKind::And {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.current.kind == TokenKind::Or {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_action(&mut self) -> Result<Stmt, ParseError> {
        match self.current.kind {
            TokenKind::Buy => {
                self.advance();
                if self.current.kind != TokenKind::Number {
                    return Err(self.error("Expected number after 'buy'"));
                }
                let qty = self.current.value as i32;
                self.advance();
                Ok(Stmt::Buy(qty))
            }
            TokenKind::Sell => {
                self.advance();
                if self.current.kind != TokenKind::Number {
                    return Err(self.error("Expected number after 'sell'"));
                }
                let qty = self.current.value as i32;
                self.advance();
                Ok(Stmt::Sell(qty))
            }
            _ => Err(self.error("Expected 'buy' or 'sell'")),
        }
    }

    fn parse_rules(&mut self) -> Result<Vec<Rule>, ParseError> {
        let mut rules = Vec::new();
        while self.current.kind == TokenKind::If {
            self.advance();
            let condition = self.parse_expr()?;
            self.consume(TokenKind::Then, "Expected 'then'")?;
            let action = self.parse_action()?;
            self.consume(TokenKind::End, "Expected 'end'")?;
            rules.push(Rule { condition, action });
        }
        Ok(rules)
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        self.consume(TokenKind::Symbol, "Expected 'symbol' at beginning")?;
        if self.current.kind != TokenKind::Str {
            return Err(self.error("Expected string literal after 'symbol'"));
        }
        let symbol = self.current.lexeme.clone();
        self.advance();

        let rules = self.parse_rules()?;

        if self.current.kind != TokenKind::Eof {
            return Err(self.error("Expected end of input"));
        }

        Ok(Program { symbol, rules })
    }
}

pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    Parser::new(source).parse_program()
}
