//! Top-level item grammar: function definitions, extern prototypes.

use arxc_lex::Token;
use arxc_util::{CompileError, Result};

use crate::ast::{Function, Prototype, TypeName, VariableExpr};
use crate::Parser;

impl Parser {
    /// `function ::= 'fn' prototype ':' block`
    pub(crate) fn parse_function(&mut self) -> Result<Function> {
        let loc = self.tokens.current_loc();
        self.tokens.advance();

        let proto = self.parse_prototype(true)?;
        let body = self.parse_block()?;

        Ok(Function { proto, body, loc })
    }

    /// `extern ::= 'extern' prototype`
    ///
    /// An extern prototype has no body and therefore no trailing `:`.
    pub(crate) fn parse_extern(&mut self) -> Result<Prototype> {
        self.tokens.advance();
        self.parse_prototype(false)
    }

    /// `prototype ::= identifier '(' [identifier {',' identifier}] ')'`
    ///
    /// Parameter and return types are fixed to float in this iteration.
    fn parse_prototype(&mut self, expect_colon: bool) -> Result<Prototype> {
        let loc = self.tokens.current_loc();
        let name = match self.tokens.current().clone() {
            Token::Identifier(name) => name,
            _ => {
                return Err(CompileError::parse(
                    "expected function name in prototype",
                    self.tokens.current_loc(),
                ));
            }
        };
        self.tokens.advance();

        self.expect_operator('(', "function prototype")?;

        let mut params = Vec::new();
        while let Token::Identifier(param) = self.tokens.current().clone() {
            let param_loc = self.tokens.current_loc();
            params.push(VariableExpr {
                name: param,
                ty: TypeName::Float,
                loc: param_loc,
            });
            self.tokens.advance();

            if *self.tokens.current() != Token::Operator(',') {
                break;
            }
            self.tokens.advance();
        }

        self.expect_operator(')', "function prototype")?;

        if expect_colon {
            self.expect_operator(':', "function definition")?;
        }

        Ok(Prototype {
            name,
            ret_ty: TypeName::Float,
            params,
            loc,
        })
    }
}
