//! Constant and slot encoders.
//!
//! Integers use the shortest form available: the dedicated single-byte
//! pushes for `-1..=16`, otherwise the narrowest `PUSHINT*` holding the
//! value's minimal two's-complement representation.

use crate::Opcode;

/// Storage class addressed by slot instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    Static,
    Local,
    Arg,
}

/// Minimal little-endian two's-complement bytes of `value`.
///
/// Zero encodes as a single `0x00` byte.
pub fn int_to_bytes(value: i128) -> Vec<u8> {
    let mut bytes = value.to_le_bytes().to_vec();
    while bytes.len() > 1 {
        let last = bytes[bytes.len() - 1];
        let sign_of_prev = bytes[bytes.len() - 2] & 0x80;
        let redundant = (last == 0x00 && sign_of_prev == 0) || (last == 0xFF && sign_of_prev != 0);
        if !redundant {
            break;
        }
        bytes.pop();
    }
    bytes
}

/// Decode little-endian two's-complement bytes. Empty input is zero.
///
/// Returns `None` when the value does not fit in 128 bits.
pub fn int_from_bytes(bytes: &[u8]) -> Option<i128> {
    if bytes.is_empty() {
        return Some(0);
    }
    let negative = bytes[bytes.len() - 1] & 0x80 != 0;
    let fill = if negative { 0xFF } else { 0x00 };
    if bytes.len() > 16 && bytes[16..].iter().any(|&b| b != fill) {
        return None;
    }
    let mut buf = [fill; 16];
    let n = bytes.len().min(16);
    buf[..n].copy_from_slice(&bytes[..n]);
    let value = i128::from_le_bytes(buf);
    // Truncation at 16 bytes must not flip the sign.
    if (value < 0) != negative {
        return None;
    }
    Some(value)
}

/// Instruction pushing the integer `value`.
pub fn push_int(value: i128) -> (Opcode, Vec<u8>) {
    if let Some(op) = Opcode::small_int(value) {
        return (op, Vec::new());
    }
    let bytes = int_to_bytes(value);
    let (op, width) = match bytes.len() {
        1 => (Opcode::PushInt8, 1),
        2 => (Opcode::PushInt16, 2),
        3..=4 => (Opcode::PushInt32, 4),
        5..=8 => (Opcode::PushInt64, 8),
        _ => (Opcode::PushInt128, 16),
    };
    let fill = if value < 0 { 0xFF } else { 0x00 };
    let mut operand = bytes;
    operand.resize(width, fill);
    (op, operand)
}

pub fn push_bool(value: bool) -> Opcode {
    if value { Opcode::PushT } else { Opcode::PushF }
}

/// Length-prefixed data push.
pub fn push_data(data: &[u8]) -> (Opcode, Vec<u8>) {
    let len = data.len();
    let (op, mut operand) = if len <= u8::MAX as usize {
        (Opcode::PushData1, vec![len as u8])
    } else if len <= u16::MAX as usize {
        (Opcode::PushData2, (len as u16).to_le_bytes().to_vec())
    } else {
        (Opcode::PushData4, (len as u32).to_le_bytes().to_vec())
    };
    operand.extend_from_slice(data);
    (op, operand)
}

/// Slot load, using the operand-free short form for indices 0..=6.
pub fn load_slot(kind: SlotKind, index: u8) -> (Opcode, Vec<u8>) {
    let (short, long) = match kind {
        SlotKind::Static => (Opcode::LdSFld0, Opcode::LdSFld),
        SlotKind::Local => (Opcode::LdLoc0, Opcode::LdLoc),
        SlotKind::Arg => (Opcode::LdArg0, Opcode::LdArg),
    };
    slot_op(short, long, index)
}

/// Slot store, using the operand-free short form for indices 0..=6.
pub fn store_slot(kind: SlotKind, index: u8) -> (Opcode, Vec<u8>) {
    let (short, long) = match kind {
        SlotKind::Static => (Opcode::StSFld0, Opcode::StSFld),
        SlotKind::Local => (Opcode::StLoc0, Opcode::StLoc),
        SlotKind::Arg => (Opcode::StArg0, Opcode::StArg),
    };
    slot_op(short, long, index)
}

fn slot_op(short: Opcode, long: Opcode, index: u8) -> (Opcode, Vec<u8>) {
    if index <= 6 {
        if let Some(op) = Opcode::from_u8(short as u8 + index) {
            return (op, Vec::new());
        }
    }
    (long, vec![index])
}

/// Slot kind and index addressed by a slot instruction, if `op` is one.
pub fn slot_of(op: Opcode, operand: &[u8]) -> Option<(SlotKind, bool, u8)> {
    let byte = op as u8;
    let (kind, load, base) = match byte {
        0x58..=0x5F => (SlotKind::Static, true, 0x58),
        0x60..=0x67 => (SlotKind::Static, false, 0x60),
        0x68..=0x6F => (SlotKind::Local, true, 0x68),
        0x70..=0x77 => (SlotKind::Local, false, 0x70),
        0x78..=0x7F => (SlotKind::Arg, true, 0x78),
        0x80..=0x87 => (SlotKind::Arg, false, 0x80),
        _ => return None,
    };
    let index = if byte - base == 7 {
        *operand.first()?
    } else {
        byte - base
    };
    Some((kind, load, index))
}
