//! Output data model.
//!
//! A [`Program`] is built once per compilation. The emitter fills method
//! bodies, the linker assigns bases and produces the image; afterwards it
//! is only handed out by shared reference.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use neoil_bytecode::{Opcode, ScriptHash};
use neoil_core::{Colors, Param, TypeRef};

/// Name of the synthesized static initializer.
pub const INITIALIZER: &str = "_initialize";

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub(crate) methods: IndexMap<String, Method>,
    pub(crate) fields: IndexMap<String, Field>,
    pub(crate) events: IndexMap<String, Event>,
    pub(crate) script: Vec<u8>,
}

impl Program {
    /// Methods in layout order.
    pub fn methods(&self) -> &IndexMap<String, Method> {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Static storage slots, keyed `Owner::name`.
    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }

    pub fn events(&self) -> &IndexMap<String, Event> {
        &self.events
    }

    /// The linked image.
    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn hash(&self) -> ScriptHash {
        ScriptHash::of(&self.script)
    }

    /// Entry address of the static initializer, if one was synthesized.
    pub fn initializer(&self) -> Option<u32> {
        self.methods.get(INITIALIZER).and_then(|m| m.base)
    }

    /// Disassembly of the image with one label per method.
    pub fn dump(&self, colors: Colors) -> String {
        let labels: BTreeMap<u32, String> = self
            .methods
            .values()
            .filter_map(|m| Some((m.base?, m.name.clone())))
            .collect();
        neoil_bytecode::dump(&self.script, &labels, colors)
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub display_name: String,
    pub is_public: bool,
    /// Declared on a contract type (as opposed to helper code).
    pub in_contract: bool,
    pub params: Vec<Param>,
    pub return_type: TypeRef,
    pub(crate) code: IndexMap<u32, Instruction>,
    pub(crate) relocations: Vec<Relocation>,
    pub(crate) base: Option<u32>,
}

impl Method {
    pub(crate) fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        is_public: bool,
        in_contract: bool,
        params: Vec<Param>,
        return_type: TypeRef,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            is_public,
            in_contract,
            params,
            return_type,
            code: IndexMap::new(),
            relocations: Vec::new(),
            base: None,
        }
    }

    /// Instructions keyed by local address, in program order.
    pub fn code(&self) -> &IndexMap<u32, Instruction> {
        &self.code
    }

    /// Absolute entry address. Set by the global link pass.
    pub fn base(&self) -> Option<u32> {
        self.base
    }

    /// Cross-method relocations not yet consumed.
    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> u32 {
        self.code.values().map(Instruction::size).sum()
    }

    pub fn is_exported(&self) -> bool {
        self.in_contract && self.is_public
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Vec<u8>,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: Vec<u8>) -> Self {
        Self { opcode, operand }
    }

    pub fn size(&self) -> u32 {
        1 + self.operand.len() as u32
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.opcode as u8);
        out.extend_from_slice(&self.operand);
    }
}

/// Pending operand patch.
///
/// The placeholder is the trailing `width` bytes of the operand of the
/// instruction at local address `at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub at: u32,
    pub width: u8,
    pub target: RelocTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocTarget {
    /// Source offset inside the same method.
    Local(u32),
    /// Entry of another method, by internal name.
    Method(String),
}

impl std::fmt::Display for RelocTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(offset) => write!(f, "IL_{offset:04x}"),
            Self::Method(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub slot: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub display_name: String,
    pub params: Vec<Param>,
}
