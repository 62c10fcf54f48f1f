//! Permit-media identification.
//!
//! Every mutating command targets one permit-media, identified by its
//! `(type_id, code)` pair. Callers may name one explicitly; otherwise the
//! defaults discovered during login and `update()` are used.

use super::error::DomainError;

/// Defaults cached by the client.
///
/// `type_id` can be discovered by the login flow alone; `code` is only known
/// once an account snapshot has been fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermitDefaults {
    pub type_id: Option<i64>,
    pub code: Option<String>,
}

/// Optional per-call permit overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermitSelector {
    pub type_id: Option<i64>,
    pub code: Option<String>,
}

impl PermitSelector {
    /// Use the cached defaults for both fields.
    pub fn defaults() -> Self {
        Self::default()
    }

    pub fn with_type_id(mut self, type_id: i64) -> Self {
        self.type_id = Some(type_id);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// A fully resolved permit-media target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitContext {
    pub type_id: i64,
    pub code: String,
}

impl PermitContext {
    /// Resolve the target permit-media. Explicit overrides win over defaults.
    pub fn resolve(
        selector: &PermitSelector,
        defaults: &PermitDefaults,
    ) -> Result<Self, DomainError> {
        let type_id = selector
            .type_id
            .or(defaults.type_id)
            .ok_or(DomainError::MissingPermit("type id"))?;
        let code = selector
            .code
            .clone()
            .or_else(|| defaults.code.clone())
            .ok_or(DomainError::MissingPermit("code"))?;

        Ok(Self { type_id, code })
    }
}
