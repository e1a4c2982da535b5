use thiserror::Error;

/// A single compile failure. Unlike the parser, the compiler halts after
/// the first one: `compile` early-returns once `self.errors` is non-empty
/// (spec §7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("failed to compile node: {0}")]
    Unsupported(String),
}
