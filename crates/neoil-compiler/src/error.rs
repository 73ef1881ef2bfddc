//! Compilation and export errors.
//!
//! Every error is fatal: the first one aborts the whole compilation and no
//! partial program is returned.

/// Error raised while translating or linking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// Source instruction with no sound lowering.
    #[error("unsupported instruction `{instruction}` at IL_{offset:04x} in {method}")]
    UnsupportedInstruction {
        method: String,
        offset: u32,
        instruction: String,
    },

    #[error("unsupported call to {callee} at IL_{offset:04x} in {method}: {reason}")]
    UnsupportedCall {
        method: String,
        offset: u32,
        callee: String,
        reason: String,
    },

    /// Readonly static whose initializer is not a foldable constant.
    #[error("unsupported folded type for static field {field}: {reason}")]
    UnsupportedFoldedType { field: String, reason: String },

    #[error("too many {what} in {scope}: {count} (max {max})")]
    ResourceLimit {
        scope: String,
        what: &'static str,
        count: usize,
        max: usize,
    },

    #[error("address jump is too far in {method}: displacement {displacement}")]
    JumpTooFar { method: String, displacement: i64 },

    #[error("branch target IL_{target:04x} in {method} was never emitted")]
    UnresolvedLocalTarget { method: String, target: u32 },

    #[error("relocation to {target} in {method} is still pending after linking")]
    UnresolvedRelocation { method: String, target: String },

    #[error("method {0} is defined more than once")]
    DuplicateMethod(String),

    #[error("internal consistency error in {method}: {detail}")]
    Consistency { method: String, detail: String },
}

impl CompileError {
    pub(crate) fn consistency(method: &str, detail: impl Into<String>) -> Self {
        Self::Consistency {
            method: method.to_string(),
            detail: detail.into(),
        }
    }
}

/// Error raised while building the ABI descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("type {ty} of {context} cannot be exported")]
    UnsupportedType { context: String, ty: String },

    #[error("abi does not allow functions with the same name: {0}")]
    DuplicateName(String),

    #[error("method {0} has no address; the program was not linked")]
    Unlinked(String),
}
