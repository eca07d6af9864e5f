//! Expression parsing with precedence climbing.
//!
//! Binary operators are parsed by the classic Pratt scheme: parse a
//! unary-prefixed operand, then fold operators whose precedence is at
//! least the current minimum, recursing with `prec + 1` when the next
//! operator binds tighter. Equal precedences therefore group to the
//! left: `a - b - c` is `(a - b) - c`.
//!
//! Operator precedences (design-fixed):
//!
//! | op  | prec |
//! |-----|------|
//! | `=` | 2    |
//! | `<` | 10   |
//! | `>` | 10   |
//! | `+` | 20   |
//! | `-` | 20   |
//! | `*` | 40   |
//!
//! Any other operator has precedence -1, which terminates climbing.

use arxc_lex::Token;
use arxc_util::{CompileError, Result, SourceLocation};

use crate::ast::{
    BinaryExpr, CallExpr, Expr, FloatExpr, TypeName, UnaryExpr, VariableExpr,
};
use crate::Parser;

/// Precedence of a binary operator spelling, or -1 if it is not one.
pub fn bin_op_precedence(op: char) -> i32 {
    match op {
        '=' => 2,
        '<' | '>' => 10,
        '+' | '-' => 20,
        '*' => 40,
        _ => -1,
    }
}

impl Parser {
    /// `expression ::= unary bin_op_rhs`
    pub(crate) fn parse_expression(&mut self) -> Result<Expr> {
        let lhs = self.parse_unary()?;
        self.parse_bin_op_rhs(0, lhs)
    }

    /// `unary ::= primary | op unary`
    ///
    /// `(` and `,` are never unary operators; they belong to the
    /// surrounding grammar.
    fn parse_unary(&mut self) -> Result<Expr> {
        let loc = self.tokens.current_loc();
        match *self.tokens.current() {
            Token::Operator(op) if op != '(' && op != ',' => {
                self.tokens.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary(UnaryExpr {
                    op,
                    operand: Box::new(operand),
                    loc,
                }))
            }
            _ => self.parse_primary(),
        }
    }

    /// Folds binary operators into `lhs` while their precedence is at
    /// least `min_prec`.
    fn parse_bin_op_rhs(&mut self, min_prec: i32, mut lhs: Expr) -> Result<Expr> {
        loop {
            let tok_prec = self.current_precedence();
            if tok_prec < min_prec {
                return Ok(lhs);
            }

            let op = match *self.tokens.current() {
                Token::Operator(op) => op,
                _ => return Ok(lhs),
            };
            let loc = self.tokens.current_loc();
            self.tokens.advance();

            let mut rhs = self.parse_unary()?;

            // If the operator after rhs binds tighter, let it take rhs
            // as its lhs first.
            let next_prec = self.current_precedence();
            if tok_prec < next_prec {
                rhs = self.parse_bin_op_rhs(tok_prec + 1, rhs)?;
            }

            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                loc,
            });
        }
    }

    fn current_precedence(&self) -> i32 {
        match *self.tokens.current() {
            Token::Operator(op) => bin_op_precedence(op),
            _ => -1,
        }
    }

    /// `primary ::= identifier_expr | float | paren_expr | if | for
    ///            | var | return | block | ';' primary`
    pub(crate) fn parse_primary(&mut self) -> Result<Expr> {
        let loc = self.tokens.current_loc();
        match self.tokens.current().clone() {
            Token::Identifier(name) => self.parse_identifier_expr(name, loc),
            Token::FloatLiteral(value) => {
                self.tokens.advance();
                Ok(Expr::Float(FloatExpr { value, loc }))
            }
            Token::Operator('(') => self.parse_paren_expr(),
            Token::If => self.parse_if_stmt(),
            Token::For => self.parse_for_stmt(),
            Token::Var => self.parse_var_expr(),
            Token::Operator(';') => {
                // Stray separators are skipped.
                self.tokens.advance();
                self.parse_primary()
            }
            Token::Return => self.parse_return_stmt(),
            Token::Indent(_) => Ok(Expr::Block(self.parse_block()?)),
            other => {
                // Consume the offending token so the caller's error
                // message points past it.
                self.tokens.advance();
                Err(CompileError::parse(
                    format!("unknown token '{}' when expecting an expression", other),
                    loc,
                ))
            }
        }
    }

    /// A variable reference, or a call when the identifier is followed
    /// by `(`.
    fn parse_identifier_expr(&mut self, name: String, loc: SourceLocation) -> Result<Expr> {
        self.tokens.advance();

        if *self.tokens.current() != Token::Operator('(') {
            return Ok(Expr::Variable(VariableExpr {
                name,
                ty: TypeName::Float,
                loc,
            }));
        }

        self.tokens.advance();
        let mut args = Vec::new();
        if *self.tokens.current() != Token::Operator(')') {
            loop {
                args.push(self.parse_expression()?);

                if *self.tokens.current() == Token::Operator(')') {
                    break;
                }
                if *self.tokens.current() != Token::Operator(',') {
                    return Err(CompileError::parse(
                        "expected ')' or ',' in argument list",
                        self.tokens.current_loc(),
                    ));
                }
                self.tokens.advance();
            }
        }
        self.tokens.advance();

        Ok(Expr::Call(CallExpr { callee: name, args, loc }))
    }

    /// `paren_expr ::= '(' expression ')'`
    fn parse_paren_expr(&mut self) -> Result<Expr> {
        self.tokens.advance();
        let expr = self.parse_expression()?;
        self.expect_operator(')', "parenthesized expression")?;
        Ok(expr)
    }
}
