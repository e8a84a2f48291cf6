//! Bytecode compiler for transforming the linted AST to VM instructions.
//!
//! The compiler traverses [`Program`] definitions and emits instructions
//! using [`CodeBuilder`]. Lowering is syntax-directed and preserves a
//! strict stack discipline: every statement nets zero stack slots (a
//! `Return` statement leaves the returned value), every expression nets
//! exactly one.
//!
//! Definitions are walked in two sweeps so the entry point's instructions
//! open the emitted stream: first the program entry (`Program` /
//! `InteractiveProgram`), then user callables. Named calls dispatch over
//! three namespaces (runtime primitives, user callables, record field
//! accessors), in that order.
//!
//! Input is trusted: scoping, arity, and type usage were checked by the
//! linter. Anything the compiler cannot lower is a programmer error
//! surfaced as a [`CompileError`], never a user diagnostic.

use std::borrow::Cow;

use num_bigint::BigInt;

use super::builder::CodeBuilder;
use super::code::Code;
use super::op::{Label, Op, TypeSpec};
use crate::ast::{
    Def, Expr, ExprLoc, Identifier, Pattern, PatternLoc, Program, Stmt, StmtLoc, SwitchBranch,
};
use crate::messages::Messages;
use crate::primitives::Primitives;
use crate::source::CodeRange;
use crate::symbols::SymbolTable;

/// Compiles linted AST definitions to VM instructions.
///
/// The symbol table, primitives catalog, and message catalog are read-only
/// borrowed services; the fresh-name counters live inside the builder, so
/// independent compilations never interfere.
pub struct Compiler<'a> {
    /// Code being built.
    code: CodeBuilder,

    /// User-declared procedures, functions, types, constructors, fields.
    symbols: &'a SymbolTable,

    /// Runtime primitive namespaces.
    primitives: &'a Primitives,

    /// Resolved catalog names embedded in emitted instructions.
    messages: &'a Messages,
}

impl<'a> Compiler<'a> {
    fn new(symbols: &'a SymbolTable, primitives: &'a Primitives, messages: &'a Messages) -> Self {
        Self {
            code: CodeBuilder::new(),
            symbols,
            primitives,
            messages,
        }
    }

    /// Compiles a whole program to a [`Code`] sequence.
    ///
    /// Never fails on well-formed, linted input that stays within the
    /// implemented surface. A program with no definitions compiles to a
    /// lone `Return`.
    pub fn compile(
        program: &Program,
        symbols: &'a SymbolTable,
        primitives: &'a Primitives,
        messages: &'a Messages,
    ) -> Result<Code, CompileError> {
        let mut compiler = Compiler::new(symbols, primitives, messages);

        if program.definitions.is_empty() {
            compiler.code.produce(program.position, Op::Return);
            return Ok(compiler.code.into_code());
        }

        // Entry sweep: the entry point compiles first so its instructions
        // open the emitted stream.
        for def in &program.definitions {
            match &def.def {
                Def::Program { body } => {
                    compiler.compile_stmt(body)?;
                    compiler.code.produce(def.position, Op::Return);
                }
                Def::InteractiveProgram { branches } => {
                    compiler.compile_interactive_program(branches, def.position)?;
                }
                Def::Procedure { .. } | Def::Function { .. } | Def::TypeDecl { .. } => {}
            }
        }

        // Callable sweep: user procedures and functions follow the entry
        // point. Type declarations produce no code.
        for def in &program.definitions {
            match &def.def {
                Def::Procedure { name, params, body } => {
                    compiler.compile_procedure_def(name, params, body, def.position)?;
                }
                Def::Function { name, params, body } => {
                    compiler.compile_function_def(name, params, body, def.position)?;
                }
                Def::Program { .. } | Def::InteractiveProgram { .. } | Def::TypeDecl { .. } => {}
            }
        }

        Ok(compiler.code.into_code())
    }

    // ========================================================================
    // Definition Compilation
    // ========================================================================

    /// Lowering for interactive programs: an event dispatcher around the
    /// branch patterns, including the timeout branch.
    fn compile_interactive_program(
        &mut self,
        _branches: &[SwitchBranch],
        position: CodeRange,
    ) -> Result<(), CompileError> {
        Err(CompileError::not_implemented("interactive programs", position))
    }

    /// Lowering for user-defined procedures: a labelled routine entered
    /// through `Call` with the board state saved around the body.
    fn compile_procedure_def(
        &mut self,
        name: &Identifier,
        _params: &[Identifier],
        _body: &StmtLoc,
        position: CodeRange,
    ) -> Result<(), CompileError> {
        Err(CompileError::not_implemented(
            format!("user-defined procedure: {}", name.value),
            position,
        ))
    }

    /// Lowering for user-defined functions: a labelled routine entered
    /// through `Call` that leaves its return value on the stack.
    fn compile_function_def(
        &mut self,
        name: &Identifier,
        _params: &[Identifier],
        _body: &StmtLoc,
        position: CodeRange,
    ) -> Result<(), CompileError> {
        Err(CompileError::not_implemented(
            format!("user-defined function: {}", name.value),
            position,
        ))
    }

    // ========================================================================
    // Statement Compilation
    // ========================================================================

    /// Compiles a single statement.
    fn compile_stmt(&mut self, stmt_loc: &StmtLoc) -> Result<(), CompileError> {
        let position = stmt_loc.position;

        match &stmt_loc.stmt {
            Stmt::Block(stmts) => {
                for stmt in stmts {
                    self.compile_stmt(stmt)?;
                }
            }

            Stmt::Return(value) => {
                self.compile_expr(value)?;
                self.code.produce(position, Op::Return);
            }

            Stmt::AssignVariable { variable, value } => {
                self.compile_expr(value)?;
                self.code.produce(position, Op::SetVariable(variable.value.clone()));
            }

            Stmt::AssignTuple { variables, value } => {
                self.compile_assign_tuple(variables, value, position)?;
            }

            Stmt::ProcedureCall { procedure, args } => {
                self.compile_procedure_call(procedure, args, position)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.compile_if(condition, then_branch, else_branch.as_deref(), position)?;
            }

            Stmt::While { condition, body } => {
                self.compile_while(condition, body, position)?;
            }

            Stmt::Repeat { times, body } => {
                self.compile_repeat(times, body, position)?;
            }

            Stmt::Foreach { index, range, body } => {
                self.compile_foreach(index, range, body, position)?;
            }

            Stmt::Switch { subject, branches } => {
                self.compile_switch(subject, branches, position)?;
            }
        }
        Ok(())
    }

    /// Compiles `(x1, ..., xk) := value`.
    ///
    /// The value is checked to be a k-tuple, each component is read in
    /// place and assigned, and the tuple itself is popped at the end.
    fn compile_assign_tuple(
        &mut self,
        variables: &[Identifier],
        value: &ExprLoc,
        position: CodeRange,
    ) -> Result<(), CompileError> {
        self.compile_expr(value)?;
        self.code.produce(position, Op::TypeCheck(TypeSpec::any_tuple(variables.len())));
        for (index, variable) in variables.iter().enumerate() {
            self.code.produce(position, Op::ReadTupleComponent(index));
            self.code.produce(position, Op::SetVariable(variable.value.clone()));
        }
        self.code.produce(position, Op::Pop);
        Ok(())
    }

    /// Compiles a procedure call statement, dispatching on the name's
    /// namespace: runtime primitive, then user procedure.
    fn compile_procedure_call(
        &mut self,
        procedure: &Identifier,
        args: &[ExprLoc],
        position: CodeRange,
    ) -> Result<(), CompileError> {
        for arg in args {
            self.compile_expr(arg)?;
        }

        let name = procedure.value.as_str();
        if self.primitives.is_procedure(name) {
            self.code.produce(position, Op::PrimitiveCall(name.to_owned(), args.len()));
            Ok(())
        } else if self.symbols.is_procedure(name) {
            Err(CompileError::not_implemented(
                format!("user-defined procedure calls: {name}"),
                position,
            ))
        } else {
            Err(CompileError::new(format!("undefined procedure: {name}"), position))
        }
    }

    /// Compiles an if statement, with or without an else branch.
    fn compile_if(
        &mut self,
        condition: &ExprLoc,
        then_branch: &StmtLoc,
        else_branch: Option<&StmtLoc>,
        position: CodeRange,
    ) -> Result<(), CompileError> {
        self.compile_expr(condition)?;
        let l_else = self.code.fresh_label();
        self.code.produce(position, Op::TypeCheck(self.bool_spec()));
        self.code.produce(position, Op::JumpIfFalse(l_else.clone()));
        self.compile_stmt(then_branch)?;

        match else_branch {
            None => {
                self.code.produce(position, Op::Label(l_else));
            }
            Some(else_branch) => {
                let l_end = self.code.fresh_label();
                self.code.produce(position, Op::Jump(l_end.clone()));
                self.code.produce(position, Op::Label(l_else));
                self.compile_stmt(else_branch)?;
                self.code.produce(position, Op::Label(l_end));
            }
        }
        Ok(())
    }

    /// Compiles a while loop.
    fn compile_while(&mut self, condition: &ExprLoc, body: &StmtLoc, position: CodeRange) -> Result<(), CompileError> {
        let l_start = self.code.fresh_label();
        let l_end = self.code.fresh_label();

        self.code.produce(position, Op::Label(l_start.clone()));
        self.compile_expr(condition)?;
        self.code.produce(position, Op::TypeCheck(self.bool_spec()));
        self.code.produce(position, Op::JumpIfFalse(l_end.clone()));
        self.compile_stmt(body)?;
        self.code.produce(position, Op::Jump(l_start));
        self.code.produce(position, Op::Label(l_end));
        Ok(())
    }

    /// Compiles `repeat <times> <body>`.
    ///
    /// The counter lives on the stack, not in a variable: `Dup` preserves
    /// it across the zero comparison at the loop head, and the decrement
    /// consumes the copy left by the body round. The final `Pop` discards
    /// the exhausted counter.
    fn compile_repeat(&mut self, times: &ExprLoc, body: &StmtLoc, position: CodeRange) -> Result<(), CompileError> {
        self.compile_expr(times)?;
        self.code.produce(position, Op::TypeCheck(TypeSpec::Integer));

        let l_start = self.code.fresh_label();
        let l_end = self.code.fresh_label();
        self.code.produce_list(
            position,
            [
                Op::Label(l_start.clone()),
                Op::Dup,
                Op::PushInteger(BigInt::from(0)),
                Op::PrimitiveCall(">".to_owned(), 2),
                Op::JumpIfFalse(l_end.clone()),
            ],
        );
        self.compile_stmt(body)?;
        self.code.produce_list(
            position,
            [
                Op::PushInteger(BigInt::from(1)),
                Op::PrimitiveCall("-".to_owned(), 2),
                Op::Jump(l_start),
                Op::Label(l_end),
                Op::Pop,
            ],
        );
        Ok(())
    }

    /// Compiles `foreach <index> in <range> <body>`.
    ///
    /// The range value, its length, and the cursor live in synthetic
    /// variables; the `_unsafe*` accessors skip runtime checks already
    /// guaranteed by the up-front `TypeCheck`. Every variable this loop
    /// introduces, the user index included, is unset on exit.
    fn compile_foreach(
        &mut self,
        index: &Identifier,
        range: &ExprLoc,
        body: &StmtLoc,
        position: CodeRange,
    ) -> Result<(), CompileError> {
        let list = self.code.fresh_variable();
        let len = self.code.fresh_variable();
        let cursor = self.code.fresh_variable();
        let l_start = self.code.fresh_label();
        let l_end = self.code.fresh_label();

        self.compile_expr(range)?;
        self.code.produce_list(
            position,
            [
                Op::TypeCheck(TypeSpec::List(Box::new(TypeSpec::Any))),
                Op::SetVariable(list.clone()),
                Op::PushVariable(list.clone()),
                Op::PrimitiveCall("_unsafeListLength".to_owned(), 1),
                Op::SetVariable(len.clone()),
                Op::PushInteger(BigInt::from(0)),
                Op::SetVariable(cursor.clone()),
                Op::Label(l_start.clone()),
                Op::PushVariable(cursor.clone()),
                Op::PushVariable(len.clone()),
                Op::PrimitiveCall("<".to_owned(), 2),
                Op::JumpIfFalse(l_end.clone()),
                Op::PushVariable(list.clone()),
                Op::PushVariable(cursor.clone()),
                Op::PrimitiveCall("_unsafeListNth".to_owned(), 2),
                Op::SetVariable(index.value.clone()),
            ],
        );
        self.compile_stmt(body)?;
        self.code.produce_list(
            position,
            [
                Op::PushVariable(cursor.clone()),
                Op::PushInteger(BigInt::from(1)),
                Op::PrimitiveCall("+".to_owned(), 2),
                Op::SetVariable(cursor.clone()),
                Op::Jump(l_start),
                Op::Label(l_end),
                Op::UnsetVariable(list),
                Op::UnsetVariable(len),
                Op::UnsetVariable(cursor),
                Op::UnsetVariable(index.value.clone()),
            ],
        );
        Ok(())
    }

    /// Compiles a switch statement.
    ///
    /// The subject stays on the stack through the whole check phase.
    /// Checks run in source order and the first match jumps to its branch;
    /// each branch binds its pattern, pops the subject, runs its body,
    /// unbinds, and jumps to the common end label.
    fn compile_switch(
        &mut self,
        subject: &ExprLoc,
        branches: &[SwitchBranch],
        position: CodeRange,
    ) -> Result<(), CompileError> {
        self.compile_expr(subject)?;

        let mut branch_labels = Vec::with_capacity(branches.len());
        for branch in branches {
            let label = self.code.fresh_label();
            self.compile_pattern_check(&branch.pattern, &label)?;
            branch_labels.push(label);
        }

        // No check matched. A wildcard branch masks this failure only
        // because its check jumped unconditionally above.
        self.code.produce_list(
            position,
            [
                Op::PushString(self.messages.switch_no_match().to_owned()),
                Op::PrimitiveCall("_FAIL".to_owned(), 1),
            ],
        );

        let l_end = self.code.fresh_label();
        for (branch, label) in branches.iter().zip(branch_labels) {
            self.code.produce(position, Op::Label(label));
            self.compile_pattern_bind(&branch.pattern)?;
            self.code.produce(position, Op::Pop);
            self.compile_stmt(&branch.body)?;
            self.compile_pattern_unbind(&branch.pattern);
            self.code.produce(position, Op::Jump(l_end.clone()));
        }
        self.code.produce(position, Op::Label(l_end));
        Ok(())
    }

    // ========================================================================
    // Pattern Compilation
    // ========================================================================

    /// Emits the check phase for a pattern: falls through on mismatch and
    /// jumps to `target` on match. The subject is never popped.
    fn compile_pattern_check(&mut self, pattern: &PatternLoc, target: &Label) -> Result<(), CompileError> {
        let position = pattern.position;

        match &pattern.pattern {
            Pattern::Wildcard => {
                self.code.produce(position, Op::Jump(target.clone()));
            }

            Pattern::Structure { constructor, .. } => {
                let type_name = self.constructor_type(constructor)?;
                self.code.produce(position, Op::TypeCheck(TypeSpec::structure(type_name)));
                self.code.produce(
                    position,
                    Op::JumpIfStructure(constructor.value.clone(), target.clone()),
                );
            }

            Pattern::Tuple { params } => {
                self.code.produce(position, Op::TypeCheck(TypeSpec::any_tuple(params.len())));
                self.code.produce(position, Op::JumpIfTuple(params.len(), target.clone()));
            }

            // The interactive dispatcher guarantees the subject's shape,
            // so no type check precedes the constructor test.
            Pattern::Timeout => {
                self.code.produce(
                    position,
                    Op::JumpIfStructure(self.messages.timeout_constructor().to_owned(), target.clone()),
                );
            }
        }
        Ok(())
    }

    /// Emits the bind phase for a pattern. The subject is at the top of
    /// the stack and stays there; each binding reads from it in place.
    fn compile_pattern_bind(&mut self, pattern: &PatternLoc) -> Result<(), CompileError> {
        let position = pattern.position;

        match &pattern.pattern {
            Pattern::Wildcard | Pattern::Timeout => {}

            Pattern::Structure { constructor, params } => {
                if params.is_empty() {
                    return Ok(());
                }
                // The declared field order is authoritative; the linter
                // checked that the parameter count matches.
                let fields = self
                    .symbols
                    .constructor_fields(&constructor.value)
                    .ok_or_else(|| CompileError::undefined_constructor(constructor))?;
                for (field, param) in fields.iter().zip(params) {
                    self.code.produce(position, Op::ReadStructureField(field.clone()));
                    self.code.produce(position, Op::SetVariable(param.value.clone()));
                }
            }

            Pattern::Tuple { params } => {
                for (index, param) in params.iter().enumerate() {
                    self.code.produce(position, Op::ReadTupleComponent(index));
                    self.code.produce(position, Op::SetVariable(param.value.clone()));
                }
            }
        }
        Ok(())
    }

    /// Emits the unbind phase for a pattern: one `UnsetVariable` per name
    /// the bind phase introduced.
    fn compile_pattern_unbind(&mut self, pattern: &PatternLoc) {
        match &pattern.pattern {
            Pattern::Wildcard | Pattern::Timeout => {}
            Pattern::Structure { params, .. } | Pattern::Tuple { params } => {
                for param in params {
                    self.code
                        .produce(pattern.position, Op::UnsetVariable(param.value.clone()));
                }
            }
        }
    }

    // ========================================================================
    // Expression Compilation
    // ========================================================================

    /// Compiles an expression, leaving exactly one value on the stack.
    fn compile_expr(&mut self, expr_loc: &ExprLoc) -> Result<(), CompileError> {
        let position = expr_loc.position;

        match &expr_loc.expr {
            Expr::Variable(name) => {
                self.code.produce(position, Op::PushVariable(name.value.clone()));
            }

            Expr::ConstantNumber(value) => {
                self.code.produce(position, Op::PushInteger(value.clone()));
            }

            Expr::ConstantString(value) => {
                self.code.produce(position, Op::PushString(value.clone()));
            }

            Expr::List(elements) => {
                for element in elements {
                    self.compile_expr(element)?;
                }
                self.code.produce(position, Op::MakeList(elements.len()));
            }

            Expr::Tuple(elements) => {
                for element in elements {
                    self.compile_expr(element)?;
                }
                self.code.produce(position, Op::MakeTuple(elements.len()));
            }

            Expr::Structure { constructor, fields } => {
                let mut field_names = Vec::with_capacity(fields.len());
                for binding in fields {
                    self.compile_expr(&binding.value)?;
                    field_names.push(binding.field.value.clone());
                }
                let type_name = self.constructor_type(constructor)?;
                self.code.produce(
                    position,
                    Op::MakeStructure {
                        type_name,
                        constructor: constructor.value.clone(),
                        field_names,
                    },
                );
            }

            // A copy-with-replacement needs the subject duplicated under
            // the replacement fields; that lowering is not wired up yet.
            Expr::StructureUpdate { .. } => {
                return Err(CompileError::not_implemented("structure update expressions", position));
            }

            Expr::Range { .. } => {
                return Err(CompileError::not_implemented("range expressions", position));
            }

            Expr::FunctionCall { function, args } => {
                self.compile_function_call(function, args, position)?;
            }
        }
        Ok(())
    }

    /// Compiles a function call expression, dispatching on the name's
    /// namespace: runtime primitive, then user function, then field
    /// accessor.
    fn compile_function_call(
        &mut self,
        function: &Identifier,
        args: &[ExprLoc],
        position: CodeRange,
    ) -> Result<(), CompileError> {
        let name = function.value.as_str();

        // && and || need short-circuit lowering, not argument-first
        // dispatch.
        if name == "&&" || name == "||" {
            return Err(CompileError::not_implemented("short-circuit operators", position));
        }

        for arg in args {
            self.compile_expr(arg)?;
        }

        if self.primitives.is_function(name) {
            self.code.produce(position, Op::PrimitiveCall(name.to_owned(), args.len()));
            Ok(())
        } else if self.symbols.is_function(name) {
            Err(CompileError::not_implemented(
                format!("user-defined function calls: {name}"),
                position,
            ))
        } else if self.symbols.is_field(name) {
            Err(CompileError::not_implemented(
                format!("field accessor calls: {name}"),
                position,
            ))
        } else {
            Err(CompileError::new(format!("undefined function: {name}"), position))
        }
    }

    // ========================================================================
    // Catalog Lookups
    // ========================================================================

    /// The type assertion for the built-in Bool type.
    fn bool_spec(&self) -> TypeSpec {
        TypeSpec::structure(self.messages.bool_type())
    }

    /// Name of the type owning `constructor`, from the symbol table.
    fn constructor_type(&self, constructor: &Identifier) -> Result<String, CompileError> {
        self.symbols
            .constructor_type(&constructor.value)
            .map(str::to_owned)
            .ok_or_else(|| CompileError::undefined_constructor(constructor))
    }
}

/// Error raised when the compiler meets input it cannot lower.
///
/// These are programmer errors, not user diagnostics: either the tree was
/// not linted, a name resolves to no namespace, or the construct's
/// lowering is a declared extension point that is not wired up yet.
/// Conditions only observable with values at hand (wrong subject type,
/// out-of-range component index, no matching switch branch) are deferred
/// to the VM through `TypeCheck`, the bounds-checked reads, and `_FAIL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Error message describing the issue.
    message: Cow<'static, str>,
    /// Source location where the error occurred.
    position: CodeRange,
}

impl CompileError {
    fn new(message: impl Into<Cow<'static, str>>, position: CodeRange) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    fn not_implemented(what: impl Into<Cow<'static, str>>, position: CodeRange) -> Self {
        let what = what.into();
        Self::new(format!("not implemented: {what}"), position)
    }

    fn undefined_constructor(constructor: &Identifier) -> Self {
        Self::new(
            format!("undefined constructor: {}", constructor.value),
            constructor.position,
        )
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn position(&self) -> CodeRange {
        self.position
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let start = self.position.start();
        write!(f, "{} at {}:{}", self.message, start.line, start.column)
    }
}

impl std::error::Error for CompileError {}
