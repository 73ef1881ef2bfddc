//! Instruction decoding.
//!
//! Decoding is zero-copy: an [`InstructionView`] borrows its operand from
//! the script.

use crate::encode::int_from_bytes;
use crate::{Opcode, Operand};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{byte:02x} at {offset}")]
    UnknownOpcode { offset: u32, byte: u8 },
    #[error("truncated {opcode} operand at {offset}")]
    Truncated { offset: u32, opcode: Opcode },
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionView<'a> {
    pub offset: u32,
    pub opcode: Opcode,
    /// Raw operand, including any length prefix.
    pub operand: &'a [u8],
}

impl<'a> InstructionView<'a> {
    pub fn size(&self) -> u32 {
        1 + self.operand.len() as u32
    }

    /// Address of the following instruction.
    pub fn next(&self) -> u32 {
        self.offset + self.size()
    }

    /// Payload of a length-prefixed operand.
    pub fn data(&self) -> &'a [u8] {
        match self.opcode.operand() {
            Operand::Prefixed(n) => &self.operand[n..],
            _ => self.operand,
        }
    }

    /// Signed displacement carried by a relative operand.
    pub fn displacement(&self) -> Option<i32> {
        if !self.opcode.is_relative() {
            return None;
        }
        match self.operand.len() {
            1 => Some(self.operand[0] as i8 as i32),
            4 => Some(i32::from_le_bytes(self.operand[..4].try_into().ok()?)),
            _ => None,
        }
    }

    /// Absolute target of a relative operand.
    pub fn target(&self) -> Option<u32> {
        let disp = self.displacement()?;
        u32::try_from(self.offset as i64 + disp as i64).ok()
    }

    /// Integer pushed by this instruction, if it pushes one.
    pub fn int_value(&self) -> Option<i128> {
        if let Some(v) = self.opcode.small_int_value() {
            return Some(v);
        }
        match self.opcode {
            Opcode::PushInt8
            | Opcode::PushInt16
            | Opcode::PushInt32
            | Opcode::PushInt64
            | Opcode::PushInt128
            | Opcode::PushInt256 => int_from_bytes(self.operand),
            _ => None,
        }
    }
}

/// Decode the instruction at `offset`.
pub fn decode(script: &[u8], offset: u32) -> Result<InstructionView<'_>, DecodeError> {
    let start = offset as usize;
    let byte = *script
        .get(start)
        .ok_or(DecodeError::UnknownOpcode { offset, byte: 0 })?;
    let opcode = Opcode::from_u8(byte).ok_or(DecodeError::UnknownOpcode { offset, byte })?;
    let truncated = DecodeError::Truncated { offset, opcode };

    let rest = &script[start + 1..];
    let len = match opcode.operand() {
        Operand::None => 0,
        Operand::Fixed(n) => n,
        Operand::Prefixed(n) => {
            let prefix = rest.get(..n).ok_or(truncated.clone())?;
            let mut buf = [0u8; 4];
            buf[..n].copy_from_slice(prefix);
            n + u32::from_le_bytes(buf) as usize
        }
    };
    let operand = rest.get(..len).ok_or(truncated)?;
    Ok(InstructionView {
        offset,
        opcode,
        operand,
    })
}

/// Iterator over a script's instructions, stopping after the first error.
pub struct Instructions<'a> {
    script: &'a [u8],
    offset: u32,
    failed: bool,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<InstructionView<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset as usize >= self.script.len() {
            return None;
        }
        match decode(self.script, self.offset) {
            Ok(instr) => {
                self.offset = instr.next();
                Some(Ok(instr))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

pub fn instructions(script: &[u8]) -> Instructions<'_> {
    Instructions {
        script,
        offset: 0,
        failed: false,
    }
}
