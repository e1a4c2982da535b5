use thiserror::Error;

/// Errors that stop the VM's main loop outright (spec §7: "the VM records
/// them and stops"). Lenient arithmetic (type-mismatched operands,
/// division by zero) is NOT here — that path pushes `Value::Null` instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VmError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("frame overflow")]
    FrameOverflow,

    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArgumentCount { want: usize, got: usize },

    #[error("calling non-function and non-built-in")]
    NotCallable,

    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("constant at index {0} is not a compiled function")]
    NotACompiledFunction(u32),

    /// Index/hash-key failures (spec §7: "unusable as hash key", "index
    /// operator not supported"). These halt the loop, unlike the lenient
    /// arithmetic opcodes above.
    #[error("{0}")]
    Runtime(String),
}
