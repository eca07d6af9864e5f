//! LLVM lowering for the Arx AST.
//!
//! The backend owns the LLVM module and builder for one compiler
//! invocation and lowers parsed modules into it, in source order. Visit
//! methods return the produced IR value directly; there is no shared
//! result slot.
//!
//! Mutable bindings (function parameters, `for` induction variables,
//! `var` bindings) live in allocas created in the owning function's
//! entry block, so stores and loads stay trivially legal regardless of
//! the control flow emitted around them.

use std::path::Path;

use indexmap::IndexMap;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple,
};
use inkwell::types::BasicMetadataTypeEnum;
use inkwell::values::{BasicMetadataValueEnum, FloatValue, FunctionValue, PointerValue};
use inkwell::{FloatPredicate, OptimizationLevel};
use rustc_hash::FxHashMap;

use arxc_par::{
    ast, BinaryExpr, Block, CallExpr, Expr, ForStmt, IfStmt, Item, Prototype, ReturnStmt,
    UnaryExpr, VarExpr, VariableExpr,
};
use arxc_util::{CompileError, Result, SourceLocation};

use crate::types::TypeMapper;

/// Name of the synthesized function that holds a module's top-level
/// expressions.
pub const ANON_EXPR_NAME: &str = "__anon_expr";

/// LLVM backend for the Arx compiler.
///
/// Walks the AST and, through the inkwell builder, constructs a typed
/// IR module. Holds the lexical environment (`named_values`, mapping
/// identifiers to entry-block allocas of the enclosing function) and the
/// prototype registry (`function_protos`, used to materialize externs
/// and forward references on first use).
pub struct LlvmBackend<'ctx> {
    pub context: &'ctx Context,
    pub module: Module<'ctx>,
    pub builder: Builder<'ctx>,
    pub target_triple: String,
    pub opt_level: OptimizationLevel,
    types: TypeMapper<'ctx>,

    named_values: FxHashMap<String, PointerValue<'ctx>>,
    function_protos: IndexMap<String, Prototype>,
}

impl<'ctx> LlvmBackend<'ctx> {
    /// Creates a backend with the runtime builtins already installed.
    pub fn new(context: &'ctx Context, module_name: &str) -> Result<Self> {
        let module = context.create_module(module_name);

        let target_triple = TargetMachine::get_default_triple()
            .as_str()
            .to_string_lossy()
            .into_owned();
        module.set_triple(&TargetTriple::create(&target_triple));

        let mut backend = Self {
            context,
            module,
            builder: context.create_builder(),
            target_triple,
            opt_level: OptimizationLevel::Default,
            types: TypeMapper::new(context),
            named_values: FxHashMap::default(),
            function_protos: IndexMap::new(),
        };

        backend.install_builtins()?;

        Ok(backend)
    }

    /// Installs `putchar` (declared, resolved by the host C runtime) and
    /// `putchard` (defined here: cast to i32, call putchar, return 0.0)
    /// before any user code is lowered.
    fn install_builtins(&mut self) -> Result<()> {
        let loc = SourceLocation::START;
        let i32_type = self.types.int32_type();
        let float_type = self.types.float_type();

        let putchar_type = i32_type.fn_type(&[i32_type.into()], false);
        let putchar = self.module.add_function("putchar", putchar_type, None);

        let putchard_type = float_type.fn_type(&[float_type.into()], false);
        let putchard = self.module.add_function("putchard", putchard_type, None);

        let entry = self.context.append_basic_block(putchard, "entry");
        self.builder.position_at_end(entry);

        let arg = putchard
            .get_nth_param(0)
            .ok_or_else(|| CompileError::lowering("putchard has no parameter", loc))?
            .into_float_value();
        arg.set_name("c");

        let cast = self
            .builder
            .build_float_to_unsigned_int(arg, i32_type, "intcast")
            .map_err(|e| CompileError::lowering(format!("failed to emit fptoui: {}", e), loc))?;
        self.builder
            .build_call(putchar, &[cast.into()], "putchar_call")
            .map_err(|e| CompileError::lowering(format!("failed to emit call: {}", e), loc))?;
        self.builder
            .build_return(Some(&float_type.const_float(0.0)))
            .map_err(|e| CompileError::lowering(format!("failed to emit return: {}", e), loc))?;

        Ok(())
    }

    /// Lowers one parsed module into the LLVM module, in source order.
    ///
    /// Functions and externs land at module scope. Top-level expressions
    /// need an insertion block, so the first one synthesizes a
    /// `__anon_expr` function `() -> float`; the run of top-level
    /// expressions is emitted into it and its return value is the last
    /// expression's value.
    pub fn lower_module(&mut self, module: &ast::Module) -> Result<()> {
        let mut anon_fn: Option<FunctionValue<'ctx>> = None;
        let mut anon_last: Option<FloatValue<'ctx>> = None;

        for item in &module.nodes {
            match item {
                Item::Function(func) => {
                    // A definition between top-level expressions must
                    // not disturb their insertion point or environment.
                    let saved_block = self.builder.get_insert_block();
                    let saved_values = std::mem::take(&mut self.named_values);
                    self.lower_function(func)?;
                    self.named_values = saved_values;
                    if let Some(block) = saved_block {
                        self.builder.position_at_end(block);
                    }
                }
                Item::Extern(proto) => {
                    self.function_protos.insert(proto.name.clone(), proto.clone());
                }
                Item::Expr(expr) => {
                    if anon_fn.is_none() {
                        let fn_type = self.types.float_type().fn_type(&[], false);
                        let function = self.module.add_function(ANON_EXPR_NAME, fn_type, None);
                        let entry = self.context.append_basic_block(function, "entry");
                        self.builder.position_at_end(entry);
                        self.named_values.clear();
                        anon_fn = Some(function);
                    }
                    anon_last = Some(self.lower_expr(expr)?);
                }
            }
        }

        if let Some(function) = anon_fn {
            let loc = SourceLocation::START;
            let value = anon_last.unwrap_or_else(|| self.types.float_type().const_float(0.0));
            let block = self
                .builder
                .get_insert_block()
                .ok_or_else(|| CompileError::lowering("no insertion block", loc))?;
            if block.get_terminator().is_none() {
                self.builder.build_return(Some(&value)).map_err(|e| {
                    CompileError::lowering(format!("failed to emit return: {}", e), loc)
                })?;
            }
            if !function.verify(false) {
                return Err(CompileError::lowering(
                    "top-level expression failed LLVM verification",
                    loc,
                ));
            }
        }

        Ok(())
    }

    /// Resolves a callee: an existing module global, or a registered
    /// prototype materialized on demand (first-referenced order).
    fn get_function(&mut self, name: &str) -> Result<Option<FunctionValue<'ctx>>> {
        if let Some(function) = self.module.get_function(name) {
            return Ok(Some(function));
        }
        if let Some(proto) = self.function_protos.get(name).cloned() {
            return Ok(Some(self.lower_prototype(&proto)?));
        }
        Ok(None)
    }

    /// The function owning the builder's current insertion block.
    fn current_function(&self, loc: SourceLocation) -> Result<FunctionValue<'ctx>> {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or_else(|| CompileError::lowering("no function is being emitted", loc))
    }

    /// Creates an alloca in the entry block of `function`, so every
    /// mutable binding has an addressable home that dominates all uses.
    fn create_entry_block_alloca(
        &self,
        function: FunctionValue<'ctx>,
        name: &str,
        loc: SourceLocation,
    ) -> Result<PointerValue<'ctx>> {
        let entry = function
            .get_first_basic_block()
            .ok_or_else(|| CompileError::lowering("function has no entry block", loc))?;

        let tmp_builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(instr) => tmp_builder.position_before(&instr),
            None => tmp_builder.position_at_end(entry),
        }
        tmp_builder
            .build_alloca(self.types.float_type(), name)
            .map_err(|e| CompileError::lowering(format!("failed to emit alloca: {}", e), loc))
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<FloatValue<'ctx>> {
        match expr {
            Expr::Float(e) => Ok(self.types.float_type().const_float(e.value)),
            Expr::Variable(e) => self.lower_variable(e),
            Expr::Unary(e) => self.lower_unary(e),
            Expr::Binary(e) => self.lower_binary(e),
            Expr::Call(e) => self.lower_call(e),
            Expr::If(e) => self.lower_if(e),
            Expr::For(e) => self.lower_for(e),
            Expr::Var(e) => self.lower_var(e),
            Expr::Return(e) => self.lower_return(e),
            Expr::Block(e) => self.lower_block(e),
        }
    }

    fn lower_variable(&mut self, expr: &VariableExpr) -> Result<FloatValue<'ctx>> {
        let slot = self.named_values.get(&expr.name).copied().ok_or_else(|| {
            CompileError::scope(format!("unknown variable name '{}'", expr.name), expr.loc)
        })?;
        let value = self
            .builder
            .build_load(slot, &expr.name)
            .map_err(|e| {
                CompileError::lowering(format!("failed to emit load: {}", e), expr.loc)
            })?;
        Ok(value.into_float_value())
    }

    fn lower_unary(&mut self, expr: &UnaryExpr) -> Result<FloatValue<'ctx>> {
        let operand = self.lower_expr(&expr.operand)?;

        let callee = format!("unary{}", expr.op);
        let function = self.get_function(&callee)?.ok_or_else(|| {
            CompileError::scope(format!("unknown unary operator '{}'", expr.op), expr.loc)
        })?;

        let call = self
            .builder
            .build_call(function, &[operand.into()], "unop")
            .map_err(|e| {
                CompileError::lowering(format!("failed to emit call: {}", e), expr.loc)
            })?;
        call.try_as_basic_value()
            .basic()
            .map(|v| v.into_float_value())
            .ok_or_else(|| {
                CompileError::lowering(format!("'{}' produced no value", callee), expr.loc)
            })
    }

    fn lower_binary(&mut self, expr: &BinaryExpr) -> Result<FloatValue<'ctx>> {
        // '=' does not evaluate its lhs; the destination must be a
        // variable reference whose slot is stored through.
        if expr.op == '=' {
            let target = match &*expr.lhs {
                Expr::Variable(var) => var,
                _ => {
                    return Err(CompileError::scope(
                        "destination of '=' must be a variable",
                        expr.loc,
                    ));
                }
            };

            let value = self.lower_expr(&expr.rhs)?;
            let slot = self.named_values.get(&target.name).copied().ok_or_else(|| {
                CompileError::scope(
                    format!("unknown variable name '{}'", target.name),
                    target.loc,
                )
            })?;
            self.builder.build_store(slot, value).map_err(|e| {
                CompileError::lowering(format!("failed to emit store: {}", e), expr.loc)
            })?;
            return Ok(value);
        }

        let lhs = self.lower_expr(&expr.lhs)?;
        let rhs = self.lower_expr(&expr.rhs)?;

        match expr.op {
            '+' => self
                .builder
                .build_float_add(lhs, rhs, "addtmp")
                .map_err(|e| {
                    CompileError::lowering(format!("failed to emit fadd: {}", e), expr.loc)
                }),
            '-' => self
                .builder
                .build_float_sub(lhs, rhs, "subtmp")
                .map_err(|e| {
                    CompileError::lowering(format!("failed to emit fsub: {}", e), expr.loc)
                }),
            '*' => self
                .builder
                .build_float_mul(lhs, rhs, "multmp")
                .map_err(|e| {
                    CompileError::lowering(format!("failed to emit fmul: {}", e), expr.loc)
                }),
            '<' => self.lower_comparison(FloatPredicate::ULT, lhs, rhs, "lttmp", expr.loc),
            '>' => self.lower_comparison(FloatPredicate::UGT, lhs, rhs, "gttmp", expr.loc),
            op => {
                // Not a builtin operator: emit a call to the
                // user-defined `binary<op>` function.
                let callee = format!("binary{}", op);
                let function = self.get_function(&callee)?.ok_or_else(|| {
                    CompileError::scope(format!("unknown binary operator '{}'", op), expr.loc)
                })?;
                let call = self
                    .builder
                    .build_call(function, &[lhs.into(), rhs.into()], "binop")
                    .map_err(|e| {
                        CompileError::lowering(format!("failed to emit call: {}", e), expr.loc)
                    })?;
                call.try_as_basic_value()
                    .basic()
                    .map(|v| v.into_float_value())
                    .ok_or_else(|| {
                        CompileError::lowering(format!("'{}' produced no value", callee), expr.loc)
                    })
            }
        }
    }

    /// Unordered compare followed by an i1 → float conversion, so the
    /// comparison result is an ordinary 0.0/1.0 value.
    fn lower_comparison(
        &mut self,
        predicate: FloatPredicate,
        lhs: FloatValue<'ctx>,
        rhs: FloatValue<'ctx>,
        name: &str,
        loc: SourceLocation,
    ) -> Result<FloatValue<'ctx>> {
        let cmp = self
            .builder
            .build_float_compare(predicate, lhs, rhs, name)
            .map_err(|e| CompileError::lowering(format!("failed to emit fcmp: {}", e), loc))?;
        self.builder
            .build_unsigned_int_to_float(cmp, self.types.float_type(), "booltmp")
            .map_err(|e| CompileError::lowering(format!("failed to emit uitofp: {}", e), loc))
    }

    fn lower_call(&mut self, expr: &CallExpr) -> Result<FloatValue<'ctx>> {
        let callee = self.get_function(&expr.callee)?.ok_or_else(|| {
            CompileError::scope(
                format!("unknown function referenced '{}'", expr.callee),
                expr.loc,
            )
        })?;

        if callee.count_params() as usize != expr.args.len() {
            return Err(CompileError::scope(
                format!(
                    "incorrect number of arguments passed to '{}': expected {}, got {}",
                    expr.callee,
                    callee.count_params(),
                    expr.args.len()
                ),
                expr.loc,
            ));
        }

        let mut args: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(expr.args.len());
        for arg in &expr.args {
            args.push(self.lower_expr(arg)?.into());
        }

        let call = self
            .builder
            .build_call(callee, &args, "calltmp")
            .map_err(|e| {
                CompileError::lowering(format!("failed to emit call: {}", e), expr.loc)
            })?;
        call.try_as_basic_value()
            .basic()
            .map(|v| v.into_float_value())
            .ok_or_else(|| {
                CompileError::lowering(
                    format!("call to '{}' produced no value", expr.callee),
                    expr.loc,
                )
            })
    }

    fn lower_if(&mut self, expr: &IfStmt) -> Result<FloatValue<'ctx>> {
        let loc = expr.loc;
        let float_type = self.types.float_type();

        // Truthiness: the condition is non-zero.
        let cond = self.lower_expr(&expr.cond)?;
        let cond = self
            .builder
            .build_float_compare(
                FloatPredicate::ONE,
                cond,
                float_type.const_float(0.0),
                "ifcond",
            )
            .map_err(|e| CompileError::lowering(format!("failed to emit fcmp: {}", e), loc))?;

        let function = self.current_function(loc)?;
        let then_block = self.context.append_basic_block(function, "then");
        let else_block = self.context.append_basic_block(function, "else");
        let merge_block = self.context.append_basic_block(function, "ifcont");

        self.builder
            .build_conditional_branch(cond, then_block, else_block)
            .map_err(|e| CompileError::lowering(format!("failed to emit cbranch: {}", e), loc))?;

        self.builder.position_at_end(then_block);
        let then_value = self.lower_block(&expr.then_block)?;
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|e| CompileError::lowering(format!("failed to emit branch: {}", e), loc))?;
        // Lowering the arm can move the insertion point; the phi needs
        // the block control actually arrives from.
        let then_end = self
            .builder
            .get_insert_block()
            .ok_or_else(|| CompileError::lowering("no insertion block after then", loc))?;

        self.builder.position_at_end(else_block);
        let else_value = self.lower_block(&expr.else_block)?;
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|e| CompileError::lowering(format!("failed to emit branch: {}", e), loc))?;
        let else_end = self
            .builder
            .get_insert_block()
            .ok_or_else(|| CompileError::lowering("no insertion block after else", loc))?;

        self.builder.position_at_end(merge_block);
        let phi = self
            .builder
            .build_phi(float_type, "iftmp")
            .map_err(|e| CompileError::lowering(format!("failed to emit phi: {}", e), loc))?;
        phi.add_incoming(&[(&then_value, then_end), (&else_value, else_end)]);

        Ok(phi.as_basic_value().into_float_value())
    }

    fn lower_for(&mut self, expr: &ForStmt) -> Result<FloatValue<'ctx>> {
        let loc = expr.loc;
        let float_type = self.types.float_type();

        let function = self.current_function(loc)?;
        let slot = self.create_entry_block_alloca(function, &expr.var_name, loc)?;

        // Emit the start value while the induction variable is not yet
        // in scope.
        let start = self.lower_expr(&expr.start)?;
        self.builder.build_store(slot, start).map_err(|e| {
            CompileError::lowering(format!("failed to emit store: {}", e), loc)
        })?;

        let loop_block = self.context.append_basic_block(function, "loop");
        self.builder
            .build_unconditional_branch(loop_block)
            .map_err(|e| CompileError::lowering(format!("failed to emit branch: {}", e), loc))?;
        self.builder.position_at_end(loop_block);

        // The loop variable may shadow an outer binding; restore it when
        // the loop is done.
        let shadowed = self.named_values.insert(expr.var_name.clone(), slot);

        // The body's value is computed and dropped.
        self.lower_block(&expr.body)?;

        let step = self.lower_expr(&expr.step)?;
        let end_cond = self.lower_expr(&expr.end)?;

        // Reload before advancing: the body may have mutated the
        // induction variable through its alloca.
        let current = self
            .builder
            .build_load(slot, &expr.var_name)
            .map_err(|e| CompileError::lowering(format!("failed to emit load: {}", e), loc))?
            .into_float_value();
        let next = self
            .builder
            .build_float_add(current, step, "nextvar")
            .map_err(|e| CompileError::lowering(format!("failed to emit fadd: {}", e), loc))?;
        self.builder.build_store(slot, next).map_err(|e| {
            CompileError::lowering(format!("failed to emit store: {}", e), loc)
        })?;

        let cond = self
            .builder
            .build_float_compare(
                FloatPredicate::ONE,
                end_cond,
                float_type.const_float(0.0),
                "loopcond",
            )
            .map_err(|e| CompileError::lowering(format!("failed to emit fcmp: {}", e), loc))?;

        let after_block = self.context.append_basic_block(function, "afterloop");
        self.builder
            .build_conditional_branch(cond, loop_block, after_block)
            .map_err(|e| CompileError::lowering(format!("failed to emit cbranch: {}", e), loc))?;
        self.builder.position_at_end(after_block);

        match shadowed {
            Some(outer) => {
                self.named_values.insert(expr.var_name.clone(), outer);
            }
            None => {
                self.named_values.remove(&expr.var_name);
            }
        }

        // A for statement always evaluates to 0.0.
        Ok(float_type.const_float(0.0))
    }

    fn lower_var(&mut self, expr: &VarExpr) -> Result<FloatValue<'ctx>> {
        let function = self.current_function(expr.loc)?;

        let mut shadowed = Vec::with_capacity(expr.bindings.len());
        for (name, init) in &expr.bindings {
            // The initializer is emitted before the binding is
            // installed, so `var a = a in ...` refers to the outer `a`.
            let value = self.lower_expr(init)?;

            let slot = self.create_entry_block_alloca(function, name, expr.loc)?;
            self.builder.build_store(slot, value).map_err(|e| {
                CompileError::lowering(format!("failed to emit store: {}", e), expr.loc)
            })?;

            shadowed.push((name.clone(), self.named_values.insert(name.clone(), slot)));
        }

        let body = self.lower_expr(&expr.body)?;

        for (name, outer) in shadowed.into_iter().rev() {
            match outer {
                Some(slot) => {
                    self.named_values.insert(name, slot);
                }
                None => {
                    self.named_values.remove(&name);
                }
            }
        }

        Ok(body)
    }

    fn lower_return(&mut self, expr: &ReturnStmt) -> Result<FloatValue<'ctx>> {
        let value = self.lower_expr(&expr.value)?;
        self.builder.build_return(Some(&value)).map_err(|e| {
            CompileError::lowering(format!("failed to emit return: {}", e), expr.loc)
        })?;

        // Anything emitted after the return lands in a fresh block, so
        // the terminated one stays well-formed.
        let function = self.current_function(expr.loc)?;
        let cont = self.context.append_basic_block(function, "afterret");
        self.builder.position_at_end(cont);

        Ok(value)
    }

    /// Lowers the nodes in source order; the block's value is the last
    /// produced value, or 0.0 for an empty block.
    fn lower_block(&mut self, block: &Block) -> Result<FloatValue<'ctx>> {
        let mut last = None;
        for node in &block.nodes {
            last = Some(self.lower_expr(node)?);
        }
        Ok(last.unwrap_or_else(|| self.types.float_type().const_float(0.0)))
    }

    /// Builds the `(float, ..., float) -> float` function type, adds the
    /// named function to the module, and names its parameters.
    fn lower_prototype(&mut self, proto: &Prototype) -> Result<FunctionValue<'ctx>> {
        let float_type = self.types.float_type();
        let param_types: Vec<BasicMetadataTypeEnum<'ctx>> =
            vec![float_type.into(); proto.params.len()];
        let fn_type = float_type.fn_type(&param_types, false);

        let function = self.module.add_function(&proto.name, fn_type, None);
        for (param, decl) in function.get_param_iter().zip(&proto.params) {
            param.into_float_value().set_name(&decl.name);
        }

        Ok(function)
    }

    fn lower_function(&mut self, func: &ast::Function) -> Result<FunctionValue<'ctx>> {
        self.function_protos
            .insert(func.proto.name.clone(), func.proto.clone());
        let function = self.get_function(&func.proto.name)?.ok_or_else(|| {
            CompileError::lowering(
                format!("could not materialize function '{}'", func.proto.name),
                func.loc,
            )
        })?;

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        // Fresh lexical environment; parameters become entry allocas so
        // the body can assign through them.
        self.named_values.clear();
        for (param, decl) in function.get_param_iter().zip(&func.proto.params) {
            if self.named_values.contains_key(&decl.name) {
                return Err(CompileError::scope(
                    format!("duplicate parameter name '{}'", decl.name),
                    decl.loc,
                ));
            }
            let slot = self.create_entry_block_alloca(function, &decl.name, decl.loc)?;
            self.builder.build_store(slot, param).map_err(|e| {
                CompileError::lowering(format!("failed to emit store: {}", e), decl.loc)
            })?;
            self.named_values.insert(decl.name.clone(), slot);
        }

        let value = self.lower_block(&func.body)?;

        let block = self
            .builder
            .get_insert_block()
            .ok_or_else(|| CompileError::lowering("no insertion block", func.loc))?;
        if block.get_terminator().is_none() {
            self.builder.build_return(Some(&value)).map_err(|e| {
                CompileError::lowering(format!("failed to emit return: {}", e), func.loc)
            })?;
        }

        if !function.verify(false) {
            return Err(CompileError::lowering(
                format!("function '{}' failed LLVM verification", func.proto.name),
                func.loc,
            ));
        }

        Ok(function)
    }

    /// The textual IR of the module built so far.
    pub fn emit_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Writes a native object file for the module's target triple.
    pub fn write_object_file(&self, path: &Path) -> Result<()> {
        Target::initialize_all(&InitializationConfig::default());

        let triple = TargetTriple::create(&self.target_triple);
        let target = Target::from_triple(&triple).map_err(|e| {
            CompileError::lowering(
                format!("failed to resolve target '{}': {}", self.target_triple, e),
                SourceLocation::START,
            )
        })?;

        let target_machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                self.opt_level,
                RelocMode::Default,
                CodeModel::Default,
            )
            .ok_or_else(|| {
                CompileError::lowering(
                    format!("failed to create target machine for '{}'", self.target_triple),
                    SourceLocation::START,
                )
            })?;

        target_machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|e| {
                CompileError::lowering(
                    format!("failed to write object file: {}", e),
                    SourceLocation::START,
                )
            })
    }
}
