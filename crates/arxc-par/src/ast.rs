//! AST node definitions.
//!
//! Nodes are built by the parser in a single pass, owned by their parent
//! node, and never mutated afterwards. Every node carries the
//! [`SourceLocation`] of its first token so later phases can report
//! errors against the source.

use std::fmt;

use arxc_util::SourceLocation;

/// Primitive value types of the language.
///
/// Kept as a closed enum rather than string tags; the single conversion
/// to LLVM types lives at the IR boundary in `arxc-gen`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeName {
    /// 32-bit IEEE-754 float, the default (and currently only) value
    /// type of the surface language.
    Float,
    /// 32-bit integer, used at the runtime boundary (`putchar`).
    Int32,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Float => f.write_str("float"),
            TypeName::Int32 => f.write_str("int32"),
        }
    }
}

/// An expression or statement node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Float(FloatExpr),
    Variable(VariableExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Call(CallExpr),
    If(IfStmt),
    For(ForStmt),
    Var(VarExpr),
    Return(ReturnStmt),
    Block(Block),
}

impl Expr {
    /// The source location of the node's first token.
    pub fn loc(&self) -> SourceLocation {
        match self {
            Expr::Float(e) => e.loc,
            Expr::Variable(e) => e.loc,
            Expr::Unary(e) => e.loc,
            Expr::Binary(e) => e.loc,
            Expr::Call(e) => e.loc,
            Expr::If(e) => e.loc,
            Expr::For(e) => e.loc,
            Expr::Var(e) => e.loc,
            Expr::Return(e) => e.loc,
            Expr::Block(e) => e.loc,
        }
    }
}

/// A float literal.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatExpr {
    pub value: f64,
    pub loc: SourceLocation,
}

/// A reference to a named variable.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableExpr {
    pub name: String,
    pub ty: TypeName,
    pub loc: SourceLocation,
}

/// A prefix operator application, e.g. `-x`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnaryExpr {
    pub op: char,
    pub operand: Box<Expr>,
    pub loc: SourceLocation,
}

/// A binary operator application. `op` is either one of the built-in
/// operators from the precedence table or a user-defined spelling that
/// lowers to a call of `binary<op>`.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpr {
    pub op: char,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub loc: SourceLocation,
}

/// A function call with arguments in source order.
#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub callee: String,
    pub args: Vec<Expr>,
    pub loc: SourceLocation,
}

/// A conditional. `then_block` is non-empty after a successful parse;
/// `else_block` is empty when the source has no `else` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub cond: Box<Expr>,
    pub then_block: Block,
    pub else_block: Block,
    pub loc: SourceLocation,
}

/// A counted loop. `step` is never absent: the parser synthesizes a
/// `FloatExpr(1.0)` when the source omits it.
#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub var_name: String,
    pub start: Box<Expr>,
    pub end: Box<Expr>,
    pub step: Box<Expr>,
    pub body: Block,
    pub loc: SourceLocation,
}

/// A `var` binding group with its `in` body. Bindings without an
/// initializer get a synthesized `FloatExpr(0.0)`.
#[derive(Clone, Debug, PartialEq)]
pub struct VarExpr {
    pub bindings: Vec<(String, Expr)>,
    pub ty: TypeName,
    pub body: Box<Expr>,
    pub loc: SourceLocation,
}

/// A `return` with its payload expression.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub value: Box<Expr>,
    pub loc: SourceLocation,
}

/// An ordered sequence of nodes at one indentation level.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub nodes: Vec<Expr>,
    pub loc: SourceLocation,
}

impl Block {
    pub fn empty(loc: SourceLocation) -> Self {
        Self {
            nodes: Vec::new(),
            loc,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A function signature independent of its body. Parameter and return
/// types are fixed to float in this iteration of the language.
#[derive(Clone, Debug, PartialEq)]
pub struct Prototype {
    pub name: String,
    pub ret_ty: TypeName,
    pub params: Vec<VariableExpr>,
    pub loc: SourceLocation,
}

/// A function definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub proto: Prototype,
    pub body: Block,
    pub loc: SourceLocation,
}

/// A top-level entry of a module.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    /// `fn` definition.
    Function(Function),
    /// `extern` prototype.
    Extern(Prototype),
    /// Top-level expression.
    Expr(Expr),
}

/// One parsed compilation unit: a named, ordered sequence of top-level
/// items. The name is supplied by the caller, derived from the input
/// file name.
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub name: String,
    pub nodes: Vec<Item>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }
}
