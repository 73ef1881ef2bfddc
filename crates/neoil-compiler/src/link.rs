//! Two-pass linker.
//!
//! - Local pass: runs once per method right after its body is emitted and
//!   resolves branches against the method's own source-offset map.
//! - Global pass: runs once after every method is translated. Lays methods
//!   out in map order, assigns bases, concatenates the image and resolves
//!   calls and function addresses.
//!
//! All displacements are relative to the address of the instruction that
//! carries them.

use indexmap::IndexMap;

use crate::emit::EmittedBody;
use crate::error::CompileError;
use crate::program::{Instruction, Program, RelocTarget, Relocation};
use crate::trace::Tracer;

/// Resolve local branches of `body`, leaving only cross-method relocations.
pub fn link_local(method: &str, body: &mut EmittedBody) -> Result<(), CompileError> {
    let mut pending = Vec::new();
    for reloc in std::mem::take(&mut body.relocations) {
        let RelocTarget::Local(source) = reloc.target else {
            pending.push(reloc);
            continue;
        };
        let target = *body
            .addr_map
            .get(&source)
            .ok_or_else(|| CompileError::UnresolvedLocalTarget {
                method: method.to_string(),
                target: source,
            })?;
        let displacement = target as i64 - reloc.at as i64;
        patch(method, &mut body.code, &reloc, displacement)?;
    }
    body.relocations = pending;
    Ok(())
}

/// Lay out all methods and resolve cross-method references.
pub fn link_global<T: Tracer>(program: &mut Program, tracer: &mut T) -> Result<(), CompileError> {
    let mut base = 0u32;
    for method in program.methods.values_mut() {
        method.base = Some(base);
        tracer.trace_method_placed(&method.name, base);
        base = base
            .checked_add(method.size())
            .ok_or_else(|| CompileError::ResourceLimit {
                scope: "program".to_string(),
                what: "bytes",
                count: base as usize + method.size() as usize,
                max: u32::MAX as usize,
            })?;
    }

    let bases: IndexMap<String, u32> = program
        .methods
        .values()
        .map(|m| (m.name.clone(), m.base.unwrap_or_default()))
        .collect();

    for method in program.methods.values_mut() {
        let own_base = method.base.unwrap_or_default();
        for reloc in std::mem::take(&mut method.relocations) {
            let RelocTarget::Method(callee) = &reloc.target else {
                return Err(CompileError::UnresolvedRelocation {
                    method: method.name.clone(),
                    target: reloc.target.to_string(),
                });
            };
            let Some(&callee_base) = bases.get(callee) else {
                return Err(CompileError::UnresolvedRelocation {
                    method: method.name.clone(),
                    target: callee.clone(),
                });
            };
            let absolute = own_base as i64 + reloc.at as i64;
            let displacement = callee_base as i64 - absolute;
            patch(&method.name, &mut method.code, &reloc, displacement)?;
        }
    }

    let mut script = Vec::with_capacity(base as usize);
    for method in program.methods.values() {
        for instr in method.code.values() {
            instr.encode_into(&mut script);
        }
    }
    program.script = script;
    Ok(())
}

/// Write `displacement` into the placeholder described by `reloc`.
fn patch(
    method: &str,
    code: &mut IndexMap<u32, Instruction>,
    reloc: &Relocation,
    displacement: i64,
) -> Result<(), CompileError> {
    let instr = code
        .get_mut(&reloc.at)
        .ok_or_else(|| CompileError::consistency(method, format!("no instruction at {}", reloc.at)))?;
    let width = reloc.width as usize;
    if width < 4 || instr.operand.len() < width {
        return Err(CompileError::consistency(
            method,
            format!(
                "{} at {} reserves {} placeholder bytes, need 4",
                instr.opcode, reloc.at, reloc.width
            ),
        ));
    }
    let value = i32::try_from(displacement).map_err(|_| CompileError::JumpTooFar {
        method: method.to_string(),
        displacement,
    })?;
    let start = instr.operand.len() - width;
    instr.operand[start..start + 4].copy_from_slice(&value.to_le_bytes());
    Ok(())
}
