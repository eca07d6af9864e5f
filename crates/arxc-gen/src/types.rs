//! Mapping from Arx primitive types to LLVM IR types.

use inkwell::context::Context;
use inkwell::types::{BasicTypeEnum, FloatType, IntType};

use arxc_par::TypeName;

/// The single conversion point between [`TypeName`] and LLVM types.
///
/// Arx values are single-precision floats throughout; the integer types
/// only show up at the runtime boundary (the `putchar` declaration).
pub struct TypeMapper<'ctx> {
    pub context: &'ctx Context,
}

impl<'ctx> TypeMapper<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self { context }
    }

    /// Map an Arx type to the corresponding LLVM basic type.
    pub fn basic_type(&self, ty: TypeName) -> BasicTypeEnum<'ctx> {
        match ty {
            TypeName::Float => self.context.f32_type().into(),
            TypeName::Int32 => self.context.i32_type().into(),
        }
    }

    /// The LLVM type of every Arx surface value.
    pub fn float_type(&self) -> FloatType<'ctx> {
        self.context.f32_type()
    }

    /// The host C `int` type used by the builtins.
    pub fn int32_type(&self) -> IntType<'ctx> {
        self.context.i32_type()
    }
}
