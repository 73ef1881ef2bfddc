//! Human-readable disassembly.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use neoil_core::Colors;

use crate::hash::syscall_name;
use crate::instruction::{InstructionView, instructions};
use crate::{Opcode, StackItemType};

/// Disassemble `script`, printing `labels` above the addresses they name.
///
/// ```text
/// add:
///   0000  INITSLOT 0 2
///   0003  LDARG0
/// ```
pub fn dump(script: &[u8], labels: &BTreeMap<u32, String>, colors: Colors) -> String {
    let mut out = String::new();
    for item in instructions(script) {
        let instr = match item {
            Ok(instr) => instr,
            Err(e) => {
                writeln!(out, "  {}", colors.paint(colors.alert, format!("<{e}>"))).unwrap();
                break;
            }
        };
        if let Some(label) = labels.get(&instr.offset) {
            writeln!(out, "{}:", colors.paint(colors.label, label)).unwrap();
        }
        write!(
            out,
            "  {}  {}",
            colors.paint(colors.muted, format!("{:04}", instr.offset)),
            instr.opcode.name()
        )
        .unwrap();
        let operand = format_operand(&instr, labels, colors);
        if !operand.is_empty() {
            write!(out, " {operand}").unwrap();
        }
        out.push('\n');
    }
    out
}

fn format_operand(instr: &InstructionView<'_>, labels: &BTreeMap<u32, String>, c: Colors) -> String {
    if instr.operand.is_empty() {
        return String::new();
    }
    if let Some(target) = instr.target() {
        return match labels.get(&target) {
            Some(label) => format!("{target:04} <{}>", c.paint(c.label, label)),
            None => format!("{target:04}"),
        };
    }
    if let Some(value) = instr.int_value() {
        return c.paint(c.literal, value);
    }
    match instr.opcode {
        Opcode::PushData1 | Opcode::PushData2 | Opcode::PushData4 => {
            c.paint(c.literal, format_data(instr.data()))
        }
        Opcode::Syscall => {
            let id = u32::from_le_bytes([
                instr.operand[0],
                instr.operand[1],
                instr.operand[2],
                instr.operand[3],
            ]);
            match syscall_name(id) {
                Some(name) => c.paint(c.label, name),
                None => format!("0x{id:08x}"),
            }
        }
        Opcode::InitSlot => format!("{} {}", instr.operand[0], instr.operand[1]),
        Opcode::NewArrayT | Opcode::IsType | Opcode::Convert => {
            match StackItemType::from_u8(instr.operand[0]) {
                Some(ty) => ty.name().to_string(),
                None => format!("0x{:02x}", instr.operand[0]),
            }
        }
        Opcode::InitSSlot
        | Opcode::LdSFld
        | Opcode::StSFld
        | Opcode::LdLoc
        | Opcode::StLoc
        | Opcode::LdArg
        | Opcode::StArg => instr.operand[0].to_string(),
        _ => hex::encode(instr.operand),
    }
}

/// Printable UTF-8 as a quoted string, anything else as hex.
fn format_data(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(s) if !s.is_empty() && s.chars().all(|ch| !ch.is_control()) => format!("{s:?}"),
        _ => format!("0x{}", hex::encode(data)),
    }
}
