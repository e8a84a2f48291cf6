//! Bytecode model and compiler.
//!
//! This module contains the instruction representation and the AST to
//! bytecode compiler. The virtual machine that executes the emitted
//! instructions lives in a sibling project; the boundary between the two
//! is the serializable [`Code`] sequence.
//!
//! # Module Structure
//!
//! - `op` - instruction, label, and type-assertion definitions
//! - `code` - compiled code object
//! - `builder` - CodeBuilder for emitting instructions during compilation
//! - `compiler` - AST to bytecode compiler

mod builder;
mod code;
mod compiler;
mod op;

pub use builder::CodeBuilder;
pub use code::{Code, Instr};
pub use compiler::{CompileError, Compiler};
pub use op::{Label, Op, StructureCases, TypeSpec};
