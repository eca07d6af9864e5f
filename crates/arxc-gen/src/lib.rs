//! arxc-gen - LLVM lowering and artifact emission for the Arx compiler.
//!
//! This crate walks a parsed [`arxc_par::Module`] and drives an inkwell
//! builder to produce a typed LLVM module: SSA control flow for
//! conditionals and loops (branches and phi nodes), entry-block allocas
//! for mutable bindings, and calls for user-defined operators. The
//! finished module can be printed as textual IR or written out as a
//! native object file for the default target triple.
//!
//! The structural AST dump behind `--show-ast` also lives here, next to
//! the other consumers of the whole tree.

pub mod ast_output;
pub mod llvm;
pub mod types;

pub use ast_output::emit_ast;
pub use llvm::LlvmBackend;
pub use types::TypeMapper;
