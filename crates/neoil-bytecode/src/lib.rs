#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Target machine instruction set for neoil.
//!
//! This crate contains:
//! - Opcode table and operand shapes (`Opcode`, `Operand`, `StackItemType`)
//! - Constant and slot encoders (`push_int`, `push_data`, `load_slot`)
//! - Zero-copy decoder (`decode`, `instructions`)
//! - Content hashing (`ScriptHash`, `interop_hash`)
//! - Disassembler (`dump`)

pub mod dump;
pub mod encode;
pub mod hash;
pub mod instruction;
pub mod opcode;
pub mod stack_item;


pub use dump::dump;
pub use encode::{
    SlotKind, int_from_bytes, int_to_bytes, load_slot, push_bool, push_data, push_int, slot_of,
    store_slot,
};
pub use hash::{HashParseError, KNOWN_SYSCALLS, ScriptHash, interop_hash, syscall_name};
pub use instruction::{DecodeError, InstructionView, Instructions, decode, instructions};
pub use opcode::{Opcode, Operand};
pub use stack_item::StackItemType;
