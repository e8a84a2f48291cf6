//! Bytecode compiler for the Pebble educational block language.
//!
//! Pebble programs arrive here as an abstract syntax tree that the parser
//! has already built and the linter has already checked against the symbol
//! table. This crate lowers that tree into a flat, labelled instruction
//! stream for Pebble's stack-based virtual machine: structured control
//! flow becomes conditional jumps, pattern matching becomes
//! check/bind/unbind sequences, and named calls are dispatched across the
//! primitive and user namespaces. Parsing, linting, and execution live in
//! sibling projects.
//!
//! ```
//! use pebble::{Compiler, Messages, Primitives, Program, SymbolTable};
//! # use pebble::{CodeLoc, CodeRange};
//!
//! # let position = CodeRange::new(CodeLoc::new(1, 1), CodeLoc::new(1, 1));
//! let program = Program { position, definitions: vec![] };
//! let symbols = SymbolTable::new();
//! let primitives = Primitives::new();
//! let messages = Messages::new();
//!
//! let code = Compiler::compile(&program, &symbols, &primitives, &messages).unwrap();
//! assert_eq!(code.len(), 1);
//! ```

mod ast;
mod bytecode;
mod messages;
mod primitives;
mod source;
mod symbols;

pub use crate::{
    ast::{
        Def, DefLoc, Expr, ExprLoc, FieldBinding, Identifier, Pattern, PatternLoc, Program, Stmt,
        StmtLoc, SwitchBranch,
    },
    bytecode::{Code, CodeBuilder, CompileError, Compiler, Instr, Label, Op, StructureCases, TypeSpec},
    messages::Messages,
    primitives::{Primitive, PrimitiveFunction, PrimitiveProcedure, Primitives},
    source::{CodeLoc, CodeRange},
    symbols::SymbolTable,
};
