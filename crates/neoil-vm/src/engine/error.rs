//! Errors that fault an execution.

use neoil_bytecode::{DecodeError, Opcode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// Execution fuel exhausted (too many instructions).
    #[error("runtime execution limit exceeded ({0} instructions)")]
    ExecFuelExhausted(u32),

    /// Too many nested calls.
    #[error("runtime recursion limit exceeded ({0} frames)")]
    RecursionLimitExceeded(u32),

    #[error("evaluation stack limit exceeded ({0} items)")]
    StackOverflow(u32),

    #[error("evaluation stack underflow at {0:04}")]
    StackUnderflow(u32),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("expected {expected}, found {found}")]
    InvalidType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("integer overflow")]
    Overflow,

    #[error("division by zero")]
    DivideByZero,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i128, len: usize },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("unsupported instruction {0}")]
    Unsupported(Opcode),

    #[error("unknown syscall 0x{0:08x}")]
    UnknownSyscall(u32),

    #[error("syscall {0} is not available in this executor")]
    UnavailableSyscall(&'static str),

    #[error("{kind} slot {index} is not initialized")]
    InvalidSlot { kind: &'static str, index: u8 },

    #[error("static slots are already initialized")]
    StaticsAlreadyInitialized,

    #[error("no method entry at {0:04}")]
    InvalidEntry(u32),

    #[error("exception thrown: {0}")]
    Thrown(String),

    #[error("execution aborted{}", .0.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Aborted(Option<String>),

    #[error("assertion failed{}", .0.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    AssertFailed(Option<String>),
}
