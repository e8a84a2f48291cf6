//! Instruction definitions for the stack VM.
//!
//! Instructions are kept symbolic: jump targets are label *names* rather
//! than byte offsets, and variables are referenced by their source
//! spelling. The VM resolves labels once when it loads a [`Code`]
//! sequence, which keeps the compiler free of offset patching.
//!
//! [`Code`]: super::code::Code

use std::fmt;

use indexmap::IndexMap;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// A named position in the instruction stream.
///
/// Labels minted by the compiler all match `_l{N}`. The `_` prefix is a
/// namespace the parser reserves, so user identifiers can never collide
/// with a generated label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapping from constructor name to its field types, used inside
/// [`TypeSpec::Structure`]. Insertion-ordered so identical inputs always
/// serialize and print identically.
pub type StructureCases = IndexMap<String, IndexMap<String, TypeSpec>>;

/// Runtime type assertion tree carried by `TypeCheck`.
///
/// The compiler performs no inference; these trees are the only typing the
/// emitted code enforces, and the VM checks them against live values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeSpec {
    /// Matches any value.
    Any,
    Integer,
    String,
    /// A tuple with one component type per position.
    Tuple(Vec<TypeSpec>),
    /// A homogeneous list.
    List(Box<TypeSpec>),
    /// A value of the named algebraic type. `cases` may constrain the
    /// fields of individual constructors; an empty mapping only asserts
    /// the type itself.
    Structure { type_name: String, cases: StructureCases },
}

impl TypeSpec {
    /// A tuple of `len` unconstrained components.
    pub fn any_tuple(len: usize) -> Self {
        Self::Tuple(vec![Self::Any; len])
    }

    /// A structure assertion on the type name alone.
    pub fn structure(type_name: impl Into<String>) -> Self {
        Self::Structure {
            type_name: type_name.into(),
            cases: StructureCases::new(),
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Integer => f.write_str("Integer"),
            Self::String => f.write_str("String"),
            Self::Tuple(components) => {
                f.write_str("Tuple(")?;
                for (i, component) in components.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{component}")?;
                }
                f.write_str(")")
            }
            Self::List(element) => write!(f, "List({element})"),
            Self::Structure { type_name, cases } => {
                if cases.is_empty() {
                    write!(f, "Structure({type_name})")
                } else {
                    write!(f, "Structure({type_name}, {} cases)", cases.len())
                }
            }
        }
    }
}

/// A single VM instruction.
///
/// Stack effects are noted per variant; "non-popping" reads leave their
/// subject on the stack so a sequence of reads can inspect the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // === Stack pushes ===
    PushInteger(BigInt),
    PushString(String),
    PushVariable(String),

    // === Variable binding ===
    /// Pops a value and assigns it. Creates the variable on first use;
    /// re-assignment type-checks against the previous value.
    SetVariable(String),
    /// Removes a variable from the current scope; no-op if absent.
    UnsetVariable(String),

    // === Control flow ===
    /// Marks a jump target. Label names are unique within a `Code`.
    Label(Label),
    Jump(Label),
    /// Pops a Bool; branches when it is false.
    JumpIfFalse(Label),
    /// Branches when the top of stack is a structure built with the named
    /// constructor. Does not pop.
    JumpIfStructure(String, Label),
    /// Branches when the top of stack is a tuple of the given size. Does
    /// not pop.
    JumpIfTuple(usize, Label),
    /// Calls the routine at a label with `nargs` stacked arguments.
    Call(Label, usize),
    Return,

    // === Value construction ===
    /// Pops as many components as its size operand, pushes the tuple.
    MakeTuple(usize),
    /// Pops as many elements as its size operand, pushes the list.
    MakeList(usize),
    /// Pops one value per field name (last name topmost), pushes the
    /// structure.
    MakeStructure {
        type_name: String,
        constructor: String,
        field_names: Vec<String>,
    },
    /// Like `MakeStructure`, but starts from an existing structure value
    /// below the replacement fields.
    UpdateStructure {
        type_name: String,
        constructor: String,
        field_names: Vec<String>,
    },

    // === Value inspection (non-popping) ===
    ReadTupleComponent(usize),
    ReadStructureField(String),

    // === Stack utilities ===
    Dup,
    Pop,
    /// Reserved; not emitted by the current lowerings.
    Add,

    // === Dispatch ===
    /// Calls a runtime primitive with `nargs` stacked arguments. Primitive
    /// functions push their result; primitive procedures push nothing.
    PrimitiveCall(String, usize),

    // === Global state ===
    SaveState,
    RestoreState,

    // === Type assertion ===
    /// Asserts the top of stack satisfies the spec; aborts otherwise.
    /// Does not pop.
    TypeCheck(TypeSpec),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PushInteger(n) => write!(f, "PushInteger {n}"),
            Self::PushString(s) => write!(f, "PushString {s:?}"),
            Self::PushVariable(name) => write!(f, "PushVariable {name}"),
            Self::SetVariable(name) => write!(f, "SetVariable {name}"),
            Self::UnsetVariable(name) => write!(f, "UnsetVariable {name}"),
            Self::Label(label) => write!(f, "{label}:"),
            Self::Jump(target) => write!(f, "Jump {target}"),
            Self::JumpIfFalse(target) => write!(f, "JumpIfFalse {target}"),
            Self::JumpIfStructure(constructor, target) => {
                write!(f, "JumpIfStructure {constructor} {target}")
            }
            Self::JumpIfTuple(size, target) => write!(f, "JumpIfTuple {size} {target}"),
            Self::Call(target, nargs) => write!(f, "Call {target} {nargs}"),
            Self::Return => f.write_str("Return"),
            Self::MakeTuple(size) => write!(f, "MakeTuple {size}"),
            Self::MakeList(size) => write!(f, "MakeList {size}"),
            Self::MakeStructure {
                type_name,
                constructor,
                field_names,
            } => write!(f, "MakeStructure {type_name} {constructor} [{}]", field_names.join(", ")),
            Self::UpdateStructure {
                type_name,
                constructor,
                field_names,
            } => write!(f, "UpdateStructure {type_name} {constructor} [{}]", field_names.join(", ")),
            Self::ReadTupleComponent(index) => write!(f, "ReadTupleComponent {index}"),
            Self::ReadStructureField(field) => write!(f, "ReadStructureField {field}"),
            Self::Dup => f.write_str("Dup"),
            Self::Pop => f.write_str("Pop"),
            Self::Add => f.write_str("Add"),
            Self::PrimitiveCall(name, nargs) => write!(f, "PrimitiveCall {name} {nargs}"),
            Self::SaveState => f.write_str("SaveState"),
            Self::RestoreState => f.write_str("RestoreState"),
            Self::TypeCheck(spec) => write!(f, "TypeCheck {spec}"),
        }
    }
}
