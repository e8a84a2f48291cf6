//! Names the compiler copies verbatim into emitted instructions.
//!
//! The runtime ships a message catalog keyed by symbolic names; the three
//! entries below are the ones that end up inside instructions. The Bool
//! type name (key `TYPE:Bool`) and the timeout constructor name (key
//! `CONS:TIMEOUT`) are resolved at compile time. The switch-failure entry
//! is different: the compiler pushes the *key* `errmsg:switch-does-not-match`
//! itself, and the VM localizes it only when the failure fires.

use std::borrow::Cow;

/// Read-only lookup service for catalog entries embedded in code.
///
/// The defaults match the runtime's standard catalog; embedders carrying
/// their own catalog can override the resolved names.
#[derive(Debug, Clone)]
pub struct Messages {
    bool_type: Cow<'static, str>,
    timeout_constructor: Cow<'static, str>,
    switch_no_match: Cow<'static, str>,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            bool_type: Cow::Borrowed("Bool"),
            timeout_constructor: Cow::Borrowed("TIMEOUT"),
            switch_no_match: Cow::Borrowed("errmsg:switch-does-not-match"),
        }
    }
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog with custom resolved names.
    pub fn with_entries(
        bool_type: impl Into<Cow<'static, str>>,
        timeout_constructor: impl Into<Cow<'static, str>>,
        switch_no_match: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            bool_type: bool_type.into(),
            timeout_constructor: timeout_constructor.into(),
            switch_no_match: switch_no_match.into(),
        }
    }

    /// Resolved name of the built-in Bool type (catalog key `TYPE:Bool`).
    pub fn bool_type(&self) -> &str {
        &self.bool_type
    }

    /// Resolved name of the timeout event constructor (catalog key
    /// `CONS:TIMEOUT`).
    pub fn timeout_constructor(&self) -> &str {
        &self.timeout_constructor
    }

    /// Catalog key pushed when no switch branch matches; localized by the
    /// VM, not the compiler.
    pub fn switch_no_match(&self) -> &str {
        &self.switch_no_match
    }
}
