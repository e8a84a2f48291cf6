//! The abstract syntax tree accepted by the compiler.
//!
//! Trees arrive from the parser already linted against the symbol table:
//! scoping, arity, and type usage have been checked, so the compiler only
//! inspects the tags it knows how to lower and treats anything else as a
//! programmer error. Every node carries a [`CodeRange`] which the compiler
//! copies onto the instructions it emits.

use num_bigint::BigInt;

use crate::source::CodeRange;

/// An identifier occurrence (variable, parameter, callable or constructor
/// name) with its source location.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub position: CodeRange,
    /// The textual spelling of the identifier.
    pub value: String,
}

impl Identifier {
    pub fn new(position: CodeRange, value: impl Into<String>) -> Self {
        Self {
            position,
            value: value.into(),
        }
    }
}

/// The root of a parsed source file: a sequence of top-level definitions.
#[derive(Debug, Clone)]
pub struct Program {
    pub position: CodeRange,
    pub definitions: Vec<DefLoc>,
}

/// A top-level definition with its source location.
#[derive(Debug, Clone)]
pub struct DefLoc {
    pub position: CodeRange,
    pub def: Def,
}

impl DefLoc {
    pub fn new(position: CodeRange, def: Def) -> Self {
        Self { position, def }
    }
}

/// A top-level definition.
///
/// `Program` is the entry point; a source file has at most one of
/// `Program` / `InteractiveProgram`. Type declarations produce no code;
/// their constructors and fields live in the symbol table by the time the
/// compiler runs.
#[derive(Debug, Clone)]
pub enum Def {
    Program {
        body: StmtLoc,
    },
    /// An event-driven entry point whose branches match on incoming events,
    /// including the distinguished timeout event.
    InteractiveProgram {
        branches: Vec<SwitchBranch>,
    },
    Procedure {
        name: Identifier,
        params: Vec<Identifier>,
        body: StmtLoc,
    },
    Function {
        name: Identifier,
        params: Vec<Identifier>,
        body: StmtLoc,
    },
    TypeDecl {
        name: Identifier,
    },
}

/// A statement with its source location.
#[derive(Debug, Clone)]
pub struct StmtLoc {
    pub position: CodeRange,
    pub stmt: Stmt,
}

impl StmtLoc {
    pub fn new(position: CodeRange, stmt: Stmt) -> Self {
        Self { position, stmt }
    }
}

/// A statement.
///
/// Statement lowerings are stack-neutral: whatever a statement pushes it
/// also consumes, except `Return`, which leaves the returned value on the
/// stack for the frame teardown to pick up.
#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<StmtLoc>),
    Return(ExprLoc),
    If {
        condition: ExprLoc,
        then_branch: Box<StmtLoc>,
        else_branch: Option<Box<StmtLoc>>,
    },
    /// Bounded iteration a fixed number of times; the count is evaluated
    /// once, up front.
    Repeat {
        times: ExprLoc,
        body: Box<StmtLoc>,
    },
    /// Bounded iteration over the elements of a list.
    Foreach {
        index: Identifier,
        range: ExprLoc,
        body: Box<StmtLoc>,
    },
    While {
        condition: ExprLoc,
        body: Box<StmtLoc>,
    },
    /// Pattern-matching switch; branches are tried in source order and the
    /// first match wins.
    Switch {
        subject: ExprLoc,
        branches: Vec<SwitchBranch>,
    },
    AssignVariable {
        variable: Identifier,
        value: ExprLoc,
    },
    /// Destructuring assignment of a tuple value to a list of names.
    AssignTuple {
        variables: Vec<Identifier>,
        value: ExprLoc,
    },
    ProcedureCall {
        procedure: Identifier,
        args: Vec<ExprLoc>,
    },
}

/// One branch of a `Switch` statement or an interactive program.
#[derive(Debug, Clone)]
pub struct SwitchBranch {
    pub pattern: PatternLoc,
    pub body: StmtLoc,
}

impl SwitchBranch {
    pub fn new(pattern: PatternLoc, body: StmtLoc) -> Self {
        Self { pattern, body }
    }
}

/// A pattern with its source location.
#[derive(Debug, Clone)]
pub struct PatternLoc {
    pub position: CodeRange,
    pub pattern: Pattern,
}

impl PatternLoc {
    pub fn new(position: CodeRange, pattern: Pattern) -> Self {
        Self { position, pattern }
    }
}

/// A pattern in a `Switch` branch or an interactive-program branch.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches anything, binds nothing.
    Wildcard,
    /// Matches a structure built with `constructor`; `params` bind the
    /// structure's fields in the field order declared for the constructor.
    Structure {
        constructor: Identifier,
        params: Vec<Identifier>,
    },
    /// Matches a tuple of exactly `params.len()` components.
    Tuple { params: Vec<Identifier> },
    /// Matches the built-in timeout event of interactive programs.
    Timeout,
}

/// An expression with its source location.
#[derive(Debug, Clone)]
pub struct ExprLoc {
    pub position: CodeRange,
    pub expr: Expr,
}

impl ExprLoc {
    pub fn new(position: CodeRange, expr: Expr) -> Self {
        Self { position, expr }
    }
}

/// An expression. Expression lowerings push exactly one value.
#[derive(Debug, Clone)]
pub enum Expr {
    Variable(Identifier),
    /// An arbitrary-precision integer literal.
    ConstantNumber(BigInt),
    ConstantString(String),
    List(Vec<ExprLoc>),
    /// An enumeration range `[first, second .. last]`; `second` fixes the
    /// stride when present.
    Range {
        first: Box<ExprLoc>,
        second: Option<Box<ExprLoc>>,
        last: Box<ExprLoc>,
    },
    Tuple(Vec<ExprLoc>),
    /// Construction of a structure value, binding fields in source order.
    Structure {
        constructor: Identifier,
        fields: Vec<FieldBinding>,
    },
    /// A copy of `subject` with the named fields replaced.
    StructureUpdate {
        constructor: Identifier,
        subject: Box<ExprLoc>,
        fields: Vec<FieldBinding>,
    },
    FunctionCall {
        function: Identifier,
        args: Vec<ExprLoc>,
    },
}

/// A `field <- value` binding in a structure construction or update.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub field: Identifier,
    pub value: ExprLoc,
}

impl FieldBinding {
    pub fn new(field: Identifier, value: ExprLoc) -> Self {
        Self { field, value }
    }
}
