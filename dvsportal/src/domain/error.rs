//! Domain error types.
//!
//! Failures that can be detected before any request is sent.

/// Domain-level errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// No permit override given and no cached default available
    #[error("no permit {0} known; call update() first or pass one explicitly")]
    MissingPermit(&'static str),
}
