//! Method body buffer with local address tracking.

use indexmap::IndexMap;
use neoil_bytecode::{Opcode, SlotKind, interop_hash, load_slot, push_bool, push_data, push_int, store_slot};

use crate::program::{Instruction, RelocTarget, Relocation};

/// Bytes reserved for every jump, call and function-address operand.
pub const PLACEHOLDER_WIDTH: u8 = 4;

/// A finished, locally unlinked method body.
#[derive(Debug, Default)]
pub struct EmittedBody {
    pub code: IndexMap<u32, Instruction>,
    pub relocations: Vec<Relocation>,
    /// Source offset to local address of the first instruction emitted for it.
    pub addr_map: IndexMap<u32, u32>,
}

#[derive(Debug, Default)]
pub struct MethodEmitter {
    body: EmittedBody,
    addr: u32,
}

impl MethodEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current local address (where the next instruction lands).
    pub fn addr(&self) -> u32 {
        self.addr
    }

    /// Bind a source offset to the current address. The first binding wins.
    pub fn mark(&mut self, source_offset: u32) {
        self.body.addr_map.entry(source_offset).or_insert(self.addr);
    }

    pub fn emit(&mut self, opcode: Opcode, operand: Vec<u8>) -> u32 {
        let at = self.addr;
        let instr = Instruction::new(opcode, operand);
        self.addr += instr.size();
        self.body.code.insert(at, instr);
        at
    }

    pub fn op(&mut self, opcode: Opcode) -> u32 {
        self.emit(opcode, Vec::new())
    }

    pub fn push_int(&mut self, value: i128) {
        let (op, operand) = push_int(value);
        self.emit(op, operand);
    }

    pub fn push_bool(&mut self, value: bool) {
        self.op(push_bool(value));
    }

    pub fn push_data(&mut self, data: &[u8]) {
        let (op, operand) = push_data(data);
        self.emit(op, operand);
    }

    pub fn load(&mut self, kind: SlotKind, index: u8) {
        let (op, operand) = load_slot(kind, index);
        self.emit(op, operand);
    }

    pub fn store(&mut self, kind: SlotKind, index: u8) {
        let (op, operand) = store_slot(kind, index);
        self.emit(op, operand);
    }

    pub fn syscall(&mut self, name: &str) {
        self.emit(Opcode::Syscall, interop_hash(name).to_le_bytes().to_vec());
    }

    /// Jump to a source offset of this method.
    pub fn jump(&mut self, opcode: Opcode, source_target: u32) {
        self.with_placeholder(opcode, RelocTarget::Local(source_target));
    }

    /// `CALL_L` to another method.
    pub fn call(&mut self, method: &str) {
        self.with_placeholder(Opcode::CallL, RelocTarget::Method(method.to_string()));
    }

    /// `PUSHA` of another method's entry.
    pub fn push_address(&mut self, method: &str) {
        self.with_placeholder(Opcode::PushA, RelocTarget::Method(method.to_string()));
    }

    fn with_placeholder(&mut self, opcode: Opcode, target: RelocTarget) {
        let at = self.emit(opcode, vec![0; PLACEHOLDER_WIDTH as usize]);
        self.body.relocations.push(Relocation {
            at,
            width: PLACEHOLDER_WIDTH,
            target,
        });
    }

    /// Reverse the top `n` stack items.
    pub fn reverse(&mut self, n: usize) {
        match n {
            0 | 1 => {}
            2 => {
                self.op(Opcode::Swap);
            }
            3 => {
                self.op(Opcode::Reverse3);
            }
            4 => {
                self.op(Opcode::Reverse4);
            }
            _ => {
                self.push_int(n as i128);
                self.op(Opcode::ReverseN);
            }
        }
    }

    pub fn last_opcode(&self) -> Option<Opcode> {
        self.body.code.last().map(|(_, instr)| instr.opcode)
    }

    /// Whether control can reach the current end of the buffer, either by
    /// falling through or because a source offset is bound there.
    pub fn end_is_reachable(&self) -> bool {
        let falls_through = !self.last_opcode().is_some_and(Opcode::is_terminator);
        falls_through || self.body.addr_map.values().any(|&a| a == self.addr)
    }

    pub fn finish(self) -> EmittedBody {
        self.body
    }
}
