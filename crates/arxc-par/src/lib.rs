//! arxc-par - Recursive-descent parser for the Arx language.
//!
//! The parser consumes a [`TokenStream`] and produces a [`Module`]: a
//! named, ordered sequence of function definitions, extern prototypes,
//! and top-level expressions.
//!
//! Expressions are parsed with precedence climbing (Pratt parsing) over
//! a fixed operator table; see [`expr::bin_op_precedence`]. Nesting is
//! structural: the lexer turns leading spaces into `Indent` tokens and
//! [`Parser::parse_block`] consumes runs of equally-indented lines,
//! handing dedents back to the enclosing level.
//!
//! Every parse failure is fatal for the current compilation unit: the
//! parser surfaces a single [`CompileError::Parse`] with the source
//! location and makes no attempt at recovery.

pub mod ast;
mod expr;
mod items;
mod stmt;

pub use ast::{
    BinaryExpr, Block, CallExpr, Expr, FloatExpr, ForStmt, Function, IfStmt, Item, Module,
    Prototype, ReturnStmt, TypeName, UnaryExpr, VarExpr, VariableExpr,
};
pub use expr::bin_op_precedence;

use arxc_lex::{Token, TokenStream};
use arxc_util::{CompileError, Result};

/// Parser state: the token cursor plus the current indentation level.
pub struct Parser {
    tokens: TokenStream,

    /// Indentation of the block currently being parsed; 0 at top level.
    indent: u32,
}

impl Parser {
    pub fn new(tokens: TokenStream) -> Self {
        Self { tokens, indent: 0 }
    }

    /// Parses a whole compilation unit. The module name is supplied by
    /// the caller (derived from the input file name).
    ///
    /// Top-level grammar: `item ::= function | extern | expression | ';'`.
    pub fn parse_module(mut self, name: &str) -> Result<Module> {
        let mut module = Module::new(name);
        loop {
            match self.tokens.current().clone() {
                Token::Eof => break,
                // A cursor that was never primed; consume defensively.
                Token::NotInitialized => {
                    self.tokens.advance();
                }
                // Stray top-level semicolons are ignored.
                Token::Operator(';') => {
                    self.tokens.advance();
                }
                // Unindented continuation lines carry no structure here.
                Token::Indent(0) => {
                    self.tokens.advance();
                }
                Token::Fn => module.nodes.push(Item::Function(self.parse_function()?)),
                Token::Extern => module.nodes.push(Item::Extern(self.parse_extern()?)),
                _ => module.nodes.push(Item::Expr(self.parse_expression()?)),
            }
        }
        Ok(module)
    }

    /// Consumes the expected operator token or fails with a parse error
    /// naming the grammar context.
    fn expect_operator(&mut self, op: char, context: &str) -> Result<()> {
        if *self.tokens.current() == Token::Operator(op) {
            self.tokens.advance();
            Ok(())
        } else {
            Err(CompileError::parse(
                format!(
                    "{} expected '{}', found '{}'",
                    context,
                    op,
                    self.tokens.current()
                ),
                self.tokens.current_loc(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arxc_lex::{Lexer, SourceBuffer};

    fn parse_source(source: &str) -> Result<Module> {
        let tokens = Lexer::new(SourceBuffer::from_string(source)).lex()?;
        Parser::new(tokens).parse_module("test")
    }

    fn parse_ok(source: &str) -> Module {
        parse_source(source).expect("parse failed")
    }

    fn top_expr(module: &Module, idx: usize) -> &Expr {
        match &module.nodes[idx] {
            Item::Expr(e) => e,
            other => panic!("expected expression item, got {:?}", other),
        }
    }

    #[test]
    fn test_module_name() {
        let module = parse_ok("1");
        assert_eq!(module.name, "test");
    }

    #[test]
    fn test_top_level_semicolons_ignored() {
        let module = parse_ok(";\n1 + 1\n;");
        assert_eq!(module.nodes.len(), 1);
    }

    #[test]
    fn test_simple_binary() {
        // 1 + 1
        let module = parse_ok("1 + 1");
        assert_eq!(module.nodes.len(), 1);
        match top_expr(&module, 0) {
            Expr::Binary(b) => {
                assert_eq!(b.op, '+');
                assert!(matches!(&*b.lhs, Expr::Float(f) if f.value == 1.0));
                assert!(matches!(&*b.rhs, Expr::Float(f) if f.value == 1.0));
            }
            other => panic!("expected binary expression, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_and_parens() {
        // 1 + 2 * (3 - 2) parses as 1 + (2 * (3 - 2))
        let module = parse_ok("1 + 2 * (3 - 2)");
        let Expr::Binary(add) = top_expr(&module, 0) else {
            panic!("expected binary expression");
        };
        assert_eq!(add.op, '+');
        assert!(matches!(&*add.lhs, Expr::Float(f) if f.value == 1.0));

        let Expr::Binary(mul) = &*add.rhs else {
            panic!("expected '*' on the right of '+'");
        };
        assert_eq!(mul.op, '*');
        assert!(matches!(&*mul.lhs, Expr::Float(f) if f.value == 2.0));

        let Expr::Binary(sub) = &*mul.rhs else {
            panic!("expected parenthesized '-' under '*'");
        };
        assert_eq!(sub.op, '-');
        assert!(matches!(&*sub.lhs, Expr::Float(f) if f.value == 3.0));
        assert!(matches!(&*sub.rhs, Expr::Float(f) if f.value == 2.0));
    }

    #[test]
    fn test_left_associativity() {
        // a - b - c parses as (a - b) - c
        let module = parse_ok("a - b - c");
        let Expr::Binary(outer) = top_expr(&module, 0) else {
            panic!("expected binary expression");
        };
        assert_eq!(outer.op, '-');
        assert!(matches!(&*outer.rhs, Expr::Variable(v) if v.name == "c"));

        let Expr::Binary(inner) = &*outer.lhs else {
            panic!("expected nested '-' on the left");
        };
        assert_eq!(inner.op, '-');
        assert!(matches!(&*inner.lhs, Expr::Variable(v) if v.name == "a"));
        assert!(matches!(&*inner.rhs, Expr::Variable(v) if v.name == "b"));
    }

    #[test]
    fn test_if_else_blocks() {
        let module = parse_ok("if 1 > 2:\n  a = 1\nelse:\n  a = 2\n");
        let Expr::If(stmt) = top_expr(&module, 0) else {
            panic!("expected if statement");
        };

        let Expr::Binary(cond) = &*stmt.cond else {
            panic!("expected binary condition");
        };
        assert_eq!(cond.op, '>');

        assert_eq!(stmt.then_block.nodes.len(), 1);
        match &stmt.then_block.nodes[0] {
            Expr::Binary(assign) => {
                assert_eq!(assign.op, '=');
                assert!(matches!(&*assign.lhs, Expr::Variable(v) if v.name == "a"));
                assert!(matches!(&*assign.rhs, Expr::Float(f) if f.value == 1.0));
            }
            other => panic!("expected assignment, got {:?}", other),
        }

        assert_eq!(stmt.else_block.nodes.len(), 1);
        match &stmt.else_block.nodes[0] {
            Expr::Binary(assign) => {
                assert_eq!(assign.op, '=');
                assert!(matches!(&*assign.rhs, Expr::Float(f) if f.value == 2.0));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_if_without_else_has_empty_else_block() {
        let module = parse_ok("if 1 > 2:\n  a = 1\n");
        let Expr::If(stmt) = top_expr(&module, 0) else {
            panic!("expected if statement");
        };
        assert!(!stmt.then_block.is_empty());
        assert!(stmt.else_block.is_empty());
    }

    #[test]
    fn test_function_and_call() {
        let module = parse_ok("fn add_one(a):\n  a + 1\nadd_one(1)\n");
        assert_eq!(module.nodes.len(), 2);

        let Item::Function(func) = &module.nodes[0] else {
            panic!("expected function item");
        };
        assert_eq!(func.proto.name, "add_one");
        assert_eq!(func.proto.ret_ty, TypeName::Float);
        assert_eq!(func.proto.params.len(), 1);
        assert_eq!(func.proto.params[0].name, "a");
        assert_eq!(func.proto.params[0].ty, TypeName::Float);

        assert_eq!(func.body.nodes.len(), 1);
        let Expr::Binary(body) = &func.body.nodes[0] else {
            panic!("expected binary body");
        };
        assert_eq!(body.op, '+');
        assert!(matches!(&*body.lhs, Expr::Variable(v) if v.name == "a"));
        assert!(matches!(&*body.rhs, Expr::Float(f) if f.value == 1.0));

        match top_expr(&module, 1) {
            Expr::Call(call) => {
                assert_eq!(call.callee, "add_one");
                assert_eq!(call.args.len(), 1);
                assert!(matches!(&call.args[0], Expr::Float(f) if f.value == 1.0));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_function_with_if_and_return() {
        let module = parse_ok(
            "fn math(x):\n  if 1 > 2:\n    a = 1\n  else:\n    a = 2\n  return a\n",
        );
        let Item::Function(func) = &module.nodes[0] else {
            panic!("expected function item");
        };
        assert_eq!(func.body.nodes.len(), 2);
        assert!(matches!(&func.body.nodes[0], Expr::If(_)));
        match &func.body.nodes[1] {
            Expr::Return(ret) => {
                assert!(matches!(&*ret.value, Expr::Variable(v) if v.name == "a"));
            }
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_extern_prototype() {
        let module = parse_ok("extern sin(x)\nsin(1)\n");
        let Item::Extern(proto) = &module.nodes[0] else {
            panic!("expected extern item");
        };
        assert_eq!(proto.name, "sin");
        assert_eq!(proto.params.len(), 1);
        assert!(matches!(top_expr(&module, 1), Expr::Call(_)));
    }

    #[test]
    fn test_for_step_defaults_to_one() {
        let module = parse_ok("for i = 1, 10 in\n  putchard(i)\n");
        let Expr::For(stmt) = top_expr(&module, 0) else {
            panic!("expected for statement");
        };
        assert_eq!(stmt.var_name, "i");
        assert!(matches!(&*stmt.step, Expr::Float(f) if f.value == 1.0));
        assert_eq!(stmt.body.nodes.len(), 1);
    }

    #[test]
    fn test_for_with_explicit_step() {
        let module = parse_ok("for i = 1, 10, 2 in\n  putchard(i)\n");
        let Expr::For(stmt) = top_expr(&module, 0) else {
            panic!("expected for statement");
        };
        assert!(matches!(&*stmt.step, Expr::Float(f) if f.value == 2.0));
    }

    #[test]
    fn test_var_init_defaults_to_zero() {
        let module = parse_ok("var a, b = 2 in a + b");
        let Expr::Var(var) = top_expr(&module, 0) else {
            panic!("expected var expression");
        };
        assert_eq!(var.bindings.len(), 2);
        assert_eq!(var.bindings[0].0, "a");
        assert!(matches!(&var.bindings[0].1, Expr::Float(f) if f.value == 0.0));
        assert_eq!(var.bindings[1].0, "b");
        assert!(matches!(&var.bindings[1].1, Expr::Float(f) if f.value == 2.0));
        assert!(matches!(&*var.body, Expr::Binary(b) if b.op == '+'));
    }

    #[test]
    fn test_unary_expression() {
        let module = parse_ok("!x");
        let Expr::Unary(unary) = top_expr(&module, 0) else {
            panic!("expected unary expression");
        };
        assert_eq!(unary.op, '!');
        assert!(matches!(&*unary.operand, Expr::Variable(v) if v.name == "x"));
    }

    #[test]
    fn test_reparse_is_deterministic() {
        let source = "fn math(x):\n  if 1 > 2:\n    a = 1\n  else:\n    a = 2\n  return a\nmath(1)\n";
        let tokens = Lexer::new(SourceBuffer::from_string(source)).lex().unwrap();
        let first = Parser::new(tokens.clone()).parse_module("m").unwrap();
        let second = Parser::new(tokens).parse_module("m").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_error_missing_paren() {
        assert!(matches!(
            parse_source("(1 + 2"),
            Err(CompileError::Parse { .. })
        ));
    }

    #[test]
    fn test_error_missing_colon_after_if() {
        assert!(matches!(
            parse_source("if 1 > 2\n  a = 1\n"),
            Err(CompileError::Parse { .. })
        ));
    }

    #[test]
    fn test_error_missing_block() {
        assert!(matches!(
            parse_source("fn f(x):\nf(1)"),
            Err(CompileError::Parse { .. })
        ));
    }

    #[test]
    fn test_error_indent_increase_inside_block() {
        assert!(matches!(
            parse_source("if x:\n  a\n    b\n"),
            Err(CompileError::Parse { .. })
        ));
    }

    #[test]
    fn test_error_missing_in_after_var() {
        assert!(matches!(
            parse_source("var a = 1"),
            Err(CompileError::Parse { .. })
        ));
    }

    #[test]
    fn test_error_reports_location() {
        let err = parse_source("fn (x):\n  x\n").unwrap_err();
        let CompileError::Parse { loc, .. } = err else {
            panic!("expected parse error");
        };
        assert_eq!(loc.line, 1);
    }
}
