//! Calls, intrinsics, events and function pointers.

use neoil_bytecode::{Opcode, Operand, ScriptHash, SlotKind, StackItemType};
use neoil_core::{Binding, Callee, Intrinsic, Op, RawOp, SourceInstruction};

use super::Translator;
use crate::error::CompileError;

/// `CallFlags.All`.
const CALL_FLAGS_ALL: i128 = 0x0f;

const CONTRACT_CALL: &str = "System.Contract.Call";
const NOTIFY: &str = "System.Runtime.Notify";

impl<'a> Translator<'a> {
    pub(super) fn call(&mut self, i: usize, callee: &'a Callee) -> Result<usize, CompileError> {
        match callee {
            Callee::Method(name) => self.call_method(i, name)?,
            Callee::Intrinsic(Intrinsic::StringHash) => return self.string_switch(i),
            Callee::Intrinsic(Intrinsic::StringEquals) => {
                self.em.op(Opcode::Equal);
            }
            Callee::Intrinsic(Intrinsic::StringConcat) => {
                self.em.op(Opcode::Cat);
                self.em
                    .emit(Opcode::Convert, vec![StackItemType::ByteString as u8]);
            }
            Callee::Intrinsic(Intrinsic::StringLength) => {
                self.em.op(Opcode::Size);
            }
            Callee::EventInvoke => self.notify(i)?,
            Callee::DelegateInvoke { args } => {
                // The pointer sits below the arguments; it ends up on top.
                self.em.reverse(*args as usize + 1);
                self.em.op(Opcode::CallA);
            }
        }
        Ok(0)
    }

    fn call_method(&mut self, i: usize, name: &str) -> Result<(), CompileError> {
        let index = self.index;
        let Some(target) = index.methods.get(name) else {
            return Err(self.unsupported_call(i, name, "unknown method"));
        };
        let argc = target.params.len();
        match &target.binding {
            Some(Binding::Syscall(service)) => {
                self.em.reverse(argc);
                self.em.syscall(service);
            }
            Some(Binding::OpCodes(ops)) => self.raw(i, name, ops)?,
            Some(Binding::Contract { hash, method }) => {
                let hash: ScriptHash = hash
                    .parse()
                    .map_err(|e| self.unsupported_call(i, name, format!("bad contract hash: {e}")))?;
                self.pack(argc);
                self.em.push_int(CALL_FLAGS_ALL);
                self.em.push_data(method.as_bytes());
                self.em.push_data(hash.as_bytes());
                self.em.syscall(CONTRACT_CALL);
            }
            None if self.index.compiled.contains(name) => {
                self.em.reverse(argc);
                self.em.call(name);
            }
            None => {
                return Err(self.unsupported_call(
                    i,
                    name,
                    "constructors, accessors and synthesized methods have no body",
                ));
            }
        }
        Ok(())
    }

    /// Splice literal instructions. Arguments are left in source order.
    fn raw(&mut self, i: usize, name: &str, ops: &[RawOp]) -> Result<(), CompileError> {
        for raw in ops {
            let Some(opcode) = Opcode::from_u8(raw.opcode) else {
                return Err(self.unsupported_call(
                    i,
                    name,
                    format!("unknown opcode 0x{:02x}", raw.opcode),
                ));
            };
            if !operand_fits(opcode, &raw.operand) {
                return Err(self.unsupported_call(
                    i,
                    name,
                    format!("malformed operand for {opcode}"),
                ));
            }
            self.em.emit(opcode, raw.operand.clone());
        }
        Ok(())
    }

    /// Pack the top `n` items into an array, first argument at index 0.
    pub(super) fn pack(&mut self, n: usize) {
        if n == 0 {
            self.em.op(Opcode::NewArray0);
            return;
        }
        self.em.reverse(n);
        self.em.push_int(n as i128);
        self.em.op(Opcode::Pack);
    }

    fn notify(&mut self, i: usize) -> Result<(), CompileError> {
        let Some(event) = self.pending_event.take() else {
            return Err(self.unsupported_call(i, "Invoke", "no event field loaded"));
        };
        self.pack(event.params.len());
        self.em.push_data(event.display_name.as_bytes());
        self.em.syscall(NOTIFY);
        Ok(())
    }

    /// `ldnull; ldftn m; newobj Delegate` becomes `PUSHA m`.
    pub(super) fn function_pointer(&mut self, i: usize, name: &str) -> Result<usize, CompileError> {
        if !matches!(self.idiom_at(i + 1), Some(Op::NewDelegate)) {
            return Err(self.unsupported(i));
        }
        if !self.index.compiled.contains(name) {
            return Err(self.unsupported_call(i, name, "function pointer to a method with no body"));
        }
        // Delegate target object.
        self.em.op(Opcode::Drop);
        self.em.push_address(name);
        Ok(1)
    }

    /// Rewrite the hash-bucketed `switch` over strings into a chain of
    /// equality tests.
    ///
    /// The region starts right after the hash call and ends at the first
    /// case body (the lowest leaf target). Inside it only bucket plumbing is
    /// allowed; each leaf is `ld s; ldstr k; call equals; brtrue t` and the
    /// last instruction is the jump to the default case.
    fn string_switch(&mut self, i: usize) -> Result<usize, CompileError> {
        let body = self.body;
        let mut leaves = Vec::new();
        let mut j = i + 1;
        while j < body.len() && is_plumbing(&body[j].op) {
            match leaf_at(&body[j..]) {
                Some(leaf) => {
                    leaves.push((j, leaf));
                    j += 4;
                }
                None => j += 1,
            }
        }
        let Some(limit) = leaves.iter().map(|(_, leaf)| leaf.target).min() else {
            return Err(self.unsupported(i));
        };
        let end = body[i + 1..]
            .iter()
            .position(|instr| instr.offset >= limit)
            .map_or(body.len(), |p| i + 1 + p);
        if end > j || end <= i + 1 {
            return Err(self.unsupported(i));
        }
        let default = match body[end - 1].op {
            Op::Br(t) | Op::Leave(t) if t >= limit => t,
            _ => return Err(self.unsupported(i)),
        };

        // The hash value.
        self.em.op(Opcode::Drop);
        for (at, leaf) in leaves.iter().filter(|(at, _)| *at < end) {
            self.load(*at, leaf.kind, leaf.slot)?;
            self.em.push_data(leaf.key.as_bytes());
            self.em.op(Opcode::Equal);
            self.em.jump(Opcode::JmpIfL, leaf.target);
        }
        self.em.jump(Opcode::JmpL, default);
        Ok(end - i - 1)
    }
}

struct Leaf<'a> {
    kind: SlotKind,
    slot: u16,
    key: &'a str,
    target: u32,
}

fn leaf_at(window: &[SourceInstruction]) -> Option<Leaf<'_>> {
    let [load, key, equals, branch, ..] = window else {
        return None;
    };
    let (kind, slot) = match load.op {
        Op::LdLoc(n) => (SlotKind::Local, n),
        Op::LdArg(n) => (SlotKind::Arg, n),
        _ => return None,
    };
    let Op::LdStr(key) = &key.op else {
        return None;
    };
    if equals.op != Op::Call(Callee::Intrinsic(Intrinsic::StringEquals)) {
        return None;
    }
    let Op::BrTrue(target) = branch.op else {
        return None;
    };
    Some(Leaf {
        kind,
        slot,
        key,
        target,
    })
}

/// Instructions a source compiler emits between the hash call and the
/// first case body.
fn is_plumbing(op: &Op) -> bool {
    matches!(
        op,
        Op::Nop
            | Op::LdLoc(_)
            | Op::StLoc(_)
            | Op::LdArg(_)
            | Op::LdcI4(_)
            | Op::LdcI8(_)
            | Op::LdStr(_)
            | Op::Conv(_)
            | Op::Call(Callee::Intrinsic(Intrinsic::StringEquals))
    ) || op.branch_target().is_some()
}

fn operand_fits(opcode: Opcode, operand: &[u8]) -> bool {
    match opcode.operand() {
        Operand::None => operand.is_empty(),
        Operand::Fixed(n) => operand.len() == n,
        Operand::Prefixed(n) => {
            if operand.len() < n {
                return false;
            }
            let mut len = [0u8; 8];
            len[..n].copy_from_slice(&operand[..n]);
            u64::from_le_bytes(len) == (operand.len() - n) as u64
        }
    }
}
