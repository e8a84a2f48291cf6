//! Catalog of user declarations consulted during lowering.
//!
//! The linter populates a [`SymbolTable`] while it checks the program; the
//! compiler only reads from it: which namespace a callable name lives in,
//! which type owns a constructor, and the declared field order of a
//! constructor (the order `MakeStructure` operands and pattern binds rely
//! on).

use ahash::AHashSet;
use indexmap::IndexMap;

#[derive(Debug, Clone)]
struct ConstructorInfo {
    /// Name of the type this constructor belongs to.
    type_name: String,
    /// Field names in declaration order.
    fields: Vec<String>,
}

/// User-declared procedures, functions, types, constructors, and fields.
///
/// Registration happens before compilation (by the linter, or by hand in
/// tests); during compilation the table is read-only.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    procedures: AHashSet<String>,
    functions: AHashSet<String>,
    types: AHashSet<String>,
    /// Constructors in declaration order, so walking a type's cases is
    /// deterministic.
    constructors: IndexMap<String, ConstructorInfo>,
    fields: AHashSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Registration (linter side)
    // ------------------------------------------------------------------

    pub fn declare_procedure(&mut self, name: impl Into<String>) {
        self.procedures.insert(name.into());
    }

    pub fn declare_function(&mut self, name: impl Into<String>) {
        self.functions.insert(name.into());
    }

    pub fn declare_type(&mut self, name: impl Into<String>) {
        self.types.insert(name.into());
    }

    /// Declares a constructor of `type_name` with its fields in source
    /// order. Field names are also registered in the field-accessor
    /// namespace.
    pub fn declare_constructor<I, S>(&mut self, name: impl Into<String>, type_name: impl Into<String>, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let type_name = type_name.into();
        self.types.insert(type_name.clone());
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        for field in &fields {
            self.fields.insert(field.clone());
        }
        self.constructors.insert(name.into(), ConstructorInfo { type_name, fields });
    }

    // ------------------------------------------------------------------
    // Queries (compiler side)
    // ------------------------------------------------------------------

    /// Name of the type that owns the constructor `name`.
    pub fn constructor_type(&self, name: &str) -> Option<&str> {
        self.constructors.get(name).map(|info| info.type_name.as_str())
    }

    /// Field names of the constructor `name`, in declaration order.
    pub fn constructor_fields(&self, name: &str) -> Option<&[String]> {
        self.constructors.get(name).map(|info| info.fields.as_slice())
    }

    pub fn is_procedure(&self, name: &str) -> bool {
        self.procedures.contains(name)
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    pub fn is_type(&self, name: &str) -> bool {
        self.types.contains(name)
    }

    pub fn is_field(&self, name: &str) -> bool {
        self.fields.contains(name)
    }
}
