use std::str::FromStr;

/// Runtime primitives catalog.
///
/// This module enumerates the procedures and functions the virtual machine
/// implements natively. The compiler only ever asks for membership: a call
/// whose name parses into one of these enums is emitted as a
/// `PrimitiveCall`, anything else is dispatched to the user namespaces.
use strum::{Display, EnumString};

/// Runtime-native procedures.
///
/// Uses strum derives for automatic `Display` and `FromStr` implementations;
/// `_FAIL` keeps its underscore spelling via an explicit serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum PrimitiveProcedure {
    PutStone,
    RemoveStone,
    Move,
    GoToEdge,
    ClearBoard,
    /// Aborts execution with the message at the top of the stack. Emitted
    /// by the compiler itself for the switch no-match path.
    #[strum(serialize = "_FAIL")]
    Fail,
}

/// Runtime-native functions.
///
/// Operator names serialize to their source spelling, and the trusted list
/// accessors keep their reserved `_` prefix. The parser rejects user
/// identifiers starting with `_`, so those names cannot be shadowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum PrimitiveFunction {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "^")]
    Pow,
    #[strum(serialize = "div")]
    Div,
    #[strum(serialize = "mod")]
    Mod,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "/=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "not")]
    Not,
    NumStones,
    ExistStones,
    CanMove,
    Next,
    Prev,
    Opposite,
    /// Length of a list already checked to be a list; skips the runtime
    /// type check.
    #[strum(serialize = "_unsafeListLength")]
    UnsafeListLength,
    /// Nth element of a list already checked to be a list, with a trusted
    /// in-range index.
    #[strum(serialize = "_unsafeListNth")]
    UnsafeListNth,
}

/// Either kind of primitive, parsed from its runtime spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Procedure(PrimitiveProcedure),
    Function(PrimitiveFunction),
}

impl FromStr for Primitive {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(p) = PrimitiveProcedure::from_str(s) {
            Ok(Self::Procedure(p))
        } else if let Ok(f) = PrimitiveFunction::from_str(s) {
            Ok(Self::Function(f))
        } else {
            Err(())
        }
    }
}

/// Membership view over the primitive namespaces, handed to the compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Primitives;

impl Primitives {
    pub fn new() -> Self {
        Self
    }

    pub fn is_procedure(&self, name: &str) -> bool {
        PrimitiveProcedure::from_str(name).is_ok()
    }

    pub fn is_function(&self, name: &str) -> bool {
        PrimitiveFunction::from_str(name).is_ok()
    }
}
