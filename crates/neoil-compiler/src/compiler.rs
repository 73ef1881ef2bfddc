//! Compilation entry points and configuration.

use neoil_bytecode::ScriptHash;
use neoil_core::SourceModule;

use crate::abi::{self, Abi};
use crate::convert::convert;
use crate::program::Program;
use crate::trace::{NoopTracer, Tracer};

/// Hard ceiling of every slot-indexed area on the target machine.
pub const MAX_SLOTS: usize = u8::MAX as usize;

/// Per-compilation resource ceilings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    static_fields: usize,
    params: usize,
    locals: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            static_fields: MAX_SLOTS,
            params: MAX_SLOTS,
            locals: MAX_SLOTS,
        }
    }
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values above 255 are clamped.
    pub fn static_fields(mut self, max: usize) -> Self {
        self.static_fields = max.min(MAX_SLOTS);
        self
    }

    pub fn params(mut self, max: usize) -> Self {
        self.params = max.min(MAX_SLOTS);
        self
    }

    pub fn locals(mut self, max: usize) -> Self {
        self.locals = max.min(MAX_SLOTS);
        self
    }

    pub fn max_static_fields(&self) -> usize {
        self.static_fields
    }

    pub fn max_params(&self) -> usize {
        self.params
    }

    pub fn max_locals(&self) -> usize {
        self.locals
    }
}

/// Builder for [`Compiler`].
#[derive(Default)]
pub struct CompilerBuilder {
    limits: Limits,
}

impl CompilerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn build(self) -> Compiler {
        Compiler {
            limits: self.limits,
        }
    }
}

/// Compiles source modules into contracts. Holds configuration only; every
/// compilation starts from fresh state.
#[derive(Default)]
pub struct Compiler {
    limits: Limits,
}

impl Compiler {
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::new()
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn compile(&self, module: &SourceModule) -> crate::Result<Contract> {
        self.compile_with(module, &mut NoopTracer)
    }

    pub fn compile_with<T: Tracer>(
        &self,
        module: &SourceModule,
        tracer: &mut T,
    ) -> crate::Result<Contract> {
        let program = convert(module, &self.limits, tracer)?;
        let abi = abi::export(&program)?;
        Ok(Contract { program, abi })
    }
}

/// A compiled contract: the linked image and its ABI.
#[derive(Debug, Clone)]
pub struct Contract {
    program: Program,
    abi: Abi,
}

impl Contract {
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    pub fn script(&self) -> &[u8] {
        self.program.script()
    }

    pub fn hash(&self) -> ScriptHash {
        self.program.hash()
    }

    pub fn abi_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.abi)
    }

    /// Entry address of an exported method, by display name.
    pub fn entry(&self, name: &str) -> Option<u32> {
        self.abi.offset_of(name)
    }

    pub fn initializer(&self) -> Option<u32> {
        self.program.initializer()
    }
}
