//! neoil compiler backend: translates a resolved stack IL module into a
//! stack-VM contract image and its ABI.
//!
//! The pipeline:
//! - `convert` - discovery and per-method translation driver
//! - `translate` - instruction-level lowering
//! - `statics` - static slots and compile-time folding of readonly fields
//! - `emit` - per-method code buffer
//! - `link` - local and global relocation passes
//! - `abi` - ABI descriptor export
//!
//! # Example
//!
//! ```
//! let json = r#"{ "types": [ { "name": "Calc", "methods": [ {
//!     "name": "Calc::Add", "display_name": "add", "is_public": true,
//!     "params": [ { "name": "a", "type": "Int32" }, { "name": "b", "type": "Int32" } ],
//!     "return_type": "Int32",
//!     "body": [
//!         { "offset": 0, "op": { "LdArg": 0 } },
//!         { "offset": 1, "op": { "LdArg": 1 } },
//!         { "offset": 2, "op": "Add" },
//!         { "offset": 3, "op": "Ret" }
//!     ] } ] } ] }"#;
//! let module = neoil_core::parse_module(json).unwrap();
//! let contract = neoil_compiler::compile(&module).unwrap();
//! assert_eq!(contract.entry("add"), Some(0));
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod abi;
pub mod compiler;
mod convert;
pub mod emit;
pub mod error;
pub mod link;
pub mod program;
mod statics;
pub mod trace;
mod translate;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod abi_tests;
#[cfg(test)]
mod convert_tests;

pub use abi::{Abi, AbiEvent, AbiMethod, AbiParam, AbiType, export};
pub use compiler::{Compiler, CompilerBuilder, Contract, Limits, MAX_SLOTS};
pub use error::{CompileError, ExportError};
pub use program::{Event, Field, INITIALIZER, Instruction, Method, Program, RelocTarget, Relocation};
pub use statics::Constant;
pub use trace::{NoopTracer, PrintTracer, Tracer, Verbosity};

use neoil_core::SourceModule;

/// Errors that can occur while producing a contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, Error>;

/// Compile `module` with default limits and no tracing.
pub fn compile(module: &SourceModule) -> Result<Contract> {
    Compiler::default().compile(module)
}
