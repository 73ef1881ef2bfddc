//! Static field resolution.
//!
//! Mutable statics get a slot in the contract's static area. Readonly
//! statics never get one: their initializer is evaluated at compile time
//! and every read is replaced by the folded constant. Literal constants are
//! inlined by the source compiler and need neither.
//!
//! The remaining static initializer statements (those assigning mutable
//! fields, plus any trailing code) are kept for the synthesized initializer.

mod fold;


use std::fmt;

use indexmap::IndexMap;
use neoil_core::{Op, SourceField, SourceInstruction, SourceModule, TypeKind};

use crate::error::CompileError;
use crate::trace::Tracer;

/// Compile-time value of a readonly static.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int(i128),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    StrArray(Vec<String>),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::StrArray(items) => write!(f, "{items:?}"),
        }
    }
}

/// Where every static field of the module lives.
#[derive(Debug, Clone, Default)]
pub(crate) struct StaticLayout {
    /// Mutable fields by `Owner::name`, in slot order.
    pub slots: IndexMap<String, u8>,
    pub folded: IndexMap<String, Constant>,
    /// Initializer code for mutable fields, concatenated over types.
    pub init: Vec<SourceInstruction>,
    pub statements: usize,
}

impl StaticLayout {
    pub fn needs_initializer(&self) -> bool {
        !self.slots.is_empty() || !self.init.is_empty()
    }
}

/// Assign slots, fold readonly fields and collect initializer statements.
pub(crate) fn resolve<T: Tracer>(
    module: &SourceModule,
    max_slots: usize,
    tracer: &mut T,
) -> Result<StaticLayout, CompileError> {
    let types = || module.types.iter().filter(|t| t.kind != TypeKind::Synthesized);

    let mut fields: IndexMap<String, &SourceField> = IndexMap::new();
    for ty in types() {
        for field in ty.fields.iter().filter(|f| f.is_static) {
            fields.insert(format!("{}::{}", ty.name, field.name), field);
        }
    }

    let mutable: Vec<&String> = fields
        .iter()
        .filter(|(_, f)| !f.is_readonly && !f.is_literal)
        .map(|(key, _)| key)
        .collect();
    if mutable.len() > max_slots {
        return Err(CompileError::ResourceLimit {
            scope: "module".to_string(),
            what: "static fields",
            count: mutable.len(),
            max: max_slots,
        });
    }

    let mut layout = StaticLayout::default();
    for (slot, key) in mutable.into_iter().enumerate() {
        let slot = slot as u8;
        tracer.trace_slot(key, slot);
        layout.slots.insert(key.clone(), slot);
    }

    // Initializers of different types share one body, so each type's
    // offsets are moved past the previous type's.
    let mut base = 0u32;
    for ty in types() {
        let scope = format!("{}::.cctor", ty.name);
        let start = layout.init.len();
        let mut rest = ty.static_init.as_slice();
        while let Some((end, target)) = rest.iter().enumerate().find_map(|(n, i)| match &i.op {
            Op::StSFld(target) => Some((n, target)),
            _ => None,
        }) {
            let statement = &rest[..=end];
            rest = &rest[end + 1..];
            let key = target.key();
            let Some(field) = fields.get(&key) else {
                return Err(CompileError::consistency(
                    &scope,
                    format!("store to unknown static field {target}"),
                ));
            };
            if field.is_readonly {
                let value = fold::evaluate(&statement[..end], &field.ty).map_err(|reason| {
                    CompileError::UnsupportedFoldedType {
                        field: key.clone(),
                        reason,
                    }
                })?;
                tracer.trace_folded(&key, &value);
                layout.folded.insert(key, value);
            } else {
                layout.init.extend(statement.iter().cloned());
                layout.statements += 1;
            }
        }
        let trailing: Vec<_> = rest
            .iter()
            .filter(|i| !matches!(i.op, Op::Ret | Op::Nop))
            .cloned()
            .collect();
        if !trailing.is_empty() {
            layout.init.extend(trailing);
            layout.statements += 1;
        }
        for instr in &mut layout.init[start..] {
            instr.offset += base;
            instr.op.shift_targets(base);
        }
        if let Some(last) = ty.static_init.last() {
            base += last.offset + 1;
        }
    }

    for (key, field) in &fields {
        if field.is_readonly && !field.is_literal && !layout.folded.contains_key(key) {
            return Err(CompileError::UnsupportedFoldedType {
                field: key.clone(),
                reason: "no constant initializer".to_string(),
            });
        }
    }

    Ok(layout)
}
