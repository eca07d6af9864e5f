//! Statement-level grammar: indentation blocks, `if`, `for`, `var`,
//! and `return`.

use arxc_lex::Token;
use arxc_util::{CompileError, Result};

use crate::ast::{Block, Expr, FloatExpr, ForStmt, IfStmt, ReturnStmt, TypeName, VarExpr};
use crate::Parser;

impl Parser {
    /// Parses one indentation block.
    ///
    /// The current token must be `Indent(n)` with `n` strictly greater
    /// than the enclosing indentation. Expressions are parsed while
    /// subsequent lines carry the same indentation; a dedent (or any
    /// non-indent token) ends the block and is left in the stream for
    /// the enclosing level. A deeper indent between expressions is an
    /// error.
    pub(crate) fn parse_block(&mut self) -> Result<Block> {
        let loc = self.tokens.current_loc();
        let n = match *self.tokens.current() {
            Token::Indent(n) => n,
            _ => {
                return Err(CompileError::parse("expected an indented block", loc));
            }
        };
        if n <= self.indent {
            return Err(CompileError::parse("expected an indented block", loc));
        }

        let outer = self.indent;
        self.indent = n;
        self.tokens.advance();

        let mut nodes = Vec::new();
        loop {
            match self.parse_expression() {
                Ok(expr) => nodes.push(expr),
                Err(err) => {
                    self.indent = outer;
                    return Err(err);
                }
            }

            match *self.tokens.current() {
                Token::Indent(m) if m == n => {
                    self.tokens.advance();
                }
                Token::Indent(m) if m > n => {
                    let loc = self.tokens.current_loc();
                    self.indent = outer;
                    return Err(CompileError::parse(
                        "indentation increase is not allowed here",
                        loc,
                    ));
                }
                _ => break,
            }
        }

        self.indent = outer;
        Ok(Block { nodes, loc })
    }

    /// `if_stmt ::= 'if' expression ':' block ['else' ':' block]`
    ///
    /// The `else` keyword sits at the same indentation as its `if`, so
    /// the dedent token in front of it is consumed here. A missing
    /// `else` leaves the else block empty.
    pub(crate) fn parse_if_stmt(&mut self) -> Result<Expr> {
        let loc = self.tokens.current_loc();
        self.tokens.advance();

        let cond = self.parse_expression()?;
        self.expect_operator(':', "`if` statement")?;
        let then_block = self.parse_block()?;

        let has_else = match *self.tokens.current() {
            Token::Else => true,
            Token::Indent(m) if m == self.indent && *self.tokens.peek(1) == Token::Else => {
                self.tokens.advance();
                true
            }
            _ => false,
        };

        let else_block = if has_else {
            self.tokens.advance();
            self.expect_operator(':', "`else` clause")?;
            self.parse_block()?
        } else {
            Block::empty(self.tokens.current_loc())
        };

        Ok(Expr::If(IfStmt {
            cond: Box::new(cond),
            then_block,
            else_block,
            loc,
        }))
    }

    /// `for_stmt ::= 'for' identifier '=' expression ',' expression
    ///               [',' expression] 'in' expression`
    ///
    /// A missing step becomes the constant 1.0. The body is a single
    /// expression; when it is not already a block it is wrapped in one.
    pub(crate) fn parse_for_stmt(&mut self) -> Result<Expr> {
        let loc = self.tokens.current_loc();
        self.tokens.advance();

        let var_name = match self.tokens.current().clone() {
            Token::Identifier(name) => name,
            _ => {
                return Err(CompileError::parse(
                    "expected identifier after 'for'",
                    self.tokens.current_loc(),
                ));
            }
        };
        self.tokens.advance();

        self.expect_operator('=', "`for` statement")?;
        let start = self.parse_expression()?;

        self.expect_operator(',', "`for` start value")?;
        let end = self.parse_expression()?;

        let step = if *self.tokens.current() == Token::Operator(',') {
            self.tokens.advance();
            self.parse_expression()?
        } else {
            Expr::Float(FloatExpr { value: 1.0, loc })
        };

        if *self.tokens.current() != Token::In {
            return Err(CompileError::parse(
                "expected 'in' after 'for'",
                self.tokens.current_loc(),
            ));
        }
        self.tokens.advance();

        let body = match self.parse_expression()? {
            Expr::Block(block) => block,
            expr => Block {
                loc: expr.loc(),
                nodes: vec![expr],
            },
        };

        Ok(Expr::For(ForStmt {
            var_name,
            start: Box::new(start),
            end: Box::new(end),
            step: Box::new(step),
            body,
            loc,
        }))
    }

    /// `var_expr ::= 'var' binding {',' binding} 'in' expression`
    /// `binding  ::= identifier ['=' expression]`
    ///
    /// A binding without an initializer gets the constant 0.0.
    pub(crate) fn parse_var_expr(&mut self) -> Result<Expr> {
        let loc = self.tokens.current_loc();
        self.tokens.advance();

        if !matches!(self.tokens.current(), Token::Identifier(_)) {
            return Err(CompileError::parse(
                "expected identifier after 'var'",
                self.tokens.current_loc(),
            ));
        }

        let mut bindings = Vec::new();
        loop {
            let name_loc = self.tokens.current_loc();
            let name = match self.tokens.current().clone() {
                Token::Identifier(name) => name,
                _ => {
                    return Err(CompileError::parse(
                        "expected identifier list after 'var'",
                        self.tokens.current_loc(),
                    ));
                }
            };
            self.tokens.advance();

            let init = if *self.tokens.current() == Token::Operator('=') {
                self.tokens.advance();
                self.parse_expression()?
            } else {
                Expr::Float(FloatExpr {
                    value: 0.0,
                    loc: name_loc,
                })
            };
            bindings.push((name, init));

            if *self.tokens.current() != Token::Operator(',') {
                break;
            }
            self.tokens.advance();
        }

        if *self.tokens.current() != Token::In {
            return Err(CompileError::parse(
                "expected 'in' keyword after 'var'",
                self.tokens.current_loc(),
            ));
        }
        self.tokens.advance();

        let body = self.parse_expression()?;

        Ok(Expr::Var(VarExpr {
            bindings,
            ty: TypeName::Float,
            body: Box::new(body),
            loc,
        }))
    }

    /// `return_stmt ::= 'return' expression`
    pub(crate) fn parse_return_stmt(&mut self) -> Result<Expr> {
        let loc = self.tokens.current_loc();
        self.tokens.advance();
        let value = self.parse_expression()?;
        Ok(Expr::Return(ReturnStmt {
            value: Box::new(value),
            loc,
        }))
    }
}
