//! Code emission helpers used by the compiler.

use super::code::{Code, Instr};
use super::op::{Label, Op};
use crate::source::CodeRange;

/// Accumulates instructions and mints fresh names during one compilation.
///
/// Both counters are private to the builder and start at zero, so two
/// compilations of the same tree emit identical code. The `_` prefix on
/// generated names is reserved by the parser; user identifiers can never
/// collide with them.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    code: Code,
    next_label: u32,
    next_variable: u32,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `op` annotated with `position`.
    pub fn produce(&mut self, position: CodeRange, op: Op) {
        self.code.push(Instr::new(op, position));
    }

    /// Appends every op in `ops`, all annotated with the same `position`.
    pub fn produce_list<I>(&mut self, position: CodeRange, ops: I)
    where
        I: IntoIterator<Item = Op>,
    {
        for op in ops {
            self.produce(position, op);
        }
    }

    /// Mints a fresh label `_l{N}`.
    pub fn fresh_label(&mut self) -> Label {
        let label = Label::new(format!("_l{}", self.next_label));
        self.next_label += 1;
        label
    }

    /// Mints a fresh synthetic variable name `_v{N}`.
    pub fn fresh_variable(&mut self) -> String {
        let name = format!("_v{}", self.next_variable);
        self.next_variable += 1;
        name
    }

    /// Hands the accumulated code to the caller.
    pub fn into_code(self) -> Code {
        self.code
    }
}
