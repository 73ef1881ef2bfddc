//! Instruction translator.
//!
//! Maps each source instruction to zero or more target instructions. The
//! dispatch is one exhaustive `match` over [`Op`]; a new source instruction
//! kind does not compile until it is given a lowering or rejected.
//!
//! Some lowerings consume a short run of following instructions (negated
//! comparisons, array initializers, delegate construction, string switch).
//! `translate` returns how many extra instructions it consumed. An idiom is
//! only recognized when no branch lands inside it.

mod calls;
mod compare;
mod objects;

#[cfg(test)]
mod translate_tests;

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use neoil_bytecode::{Opcode, SlotKind};
use neoil_core::{Op, SourceEvent, SourceInstruction, SourceMethod};

use crate::emit::{EmittedBody, MethodEmitter};
use crate::error::CompileError;
use crate::statics::StaticLayout;

/// Module-wide lookup tables shared by every method translation.
pub(crate) struct ModuleIndex<'a> {
    /// Every method of every non-synthesized type, bound or not.
    pub methods: IndexMap<&'a str, &'a SourceMethod>,
    /// Methods that get a body in the image.
    pub compiled: IndexSet<&'a str>,
    /// Events keyed `Owner::field`.
    pub events: IndexMap<String, &'a SourceEvent>,
    pub statics: StaticLayout,
}

pub(crate) struct Translator<'a> {
    index: &'a ModuleIndex<'a>,
    method: &'a str,
    locals: usize,
    params: usize,
    body: &'a [SourceInstruction],
    /// Source offsets some branch can land on.
    targets: HashSet<u32>,
    em: MethodEmitter,
    /// Slot whose address was taken by the last `ldloca`/`ldarga`.
    address_of: Option<(SlotKind, u8)>,
    /// Event loaded by `ldsfld`, waiting for its `Invoke`.
    pending_event: Option<&'a SourceEvent>,
}

impl<'a> Translator<'a> {
    pub fn new(
        index: &'a ModuleIndex<'a>,
        method: &'a str,
        locals: usize,
        params: usize,
        body: &'a [SourceInstruction],
    ) -> Self {
        let mut targets = HashSet::new();
        for instr in body {
            match &instr.op {
                Op::Switch(list) => targets.extend(list.iter().copied()),
                op => targets.extend(op.branch_target()),
            }
        }
        Self {
            index,
            method,
            locals,
            params,
            body,
            targets,
            em: MethodEmitter::new(),
            address_of: None,
            pending_event: None,
        }
    }

    /// Direct access to the buffer, for prologues.
    pub fn emitter(&mut self) -> &mut MethodEmitter {
        &mut self.em
    }

    /// Translate the whole body in program order.
    pub fn translate_all(&mut self) -> Result<(), CompileError> {
        let mut i = 0;
        while i < self.body.len() {
            self.em.mark(self.body[i].offset);
            let skip = self.translate(i)?;
            i += 1 + skip;
        }
        Ok(())
    }

    /// Close the body with a `RET` when control can reach its end.
    pub fn finish(mut self) -> EmittedBody {
        if self.em.end_is_reachable() {
            self.em.op(Opcode::Ret);
        }
        self.em.finish()
    }

    /// Translate `body[i]`, returning the number of following instructions
    /// it consumed.
    fn translate(&mut self, i: usize) -> Result<usize, CompileError> {
        let body = self.body;
        let op = &body[i].op;
        let mut skip = 0;
        match op {
            Op::Nop | Op::Conv(_) | Op::IsInst(_) | Op::CastClass(_) => {}
            Op::Pop => {
                self.em.op(Opcode::Drop);
            }
            Op::Dup => {
                self.em.op(Opcode::Dup);
            }
            Op::Ret => {
                self.em.op(Opcode::Ret);
            }
            Op::Throw => {
                self.em.op(Opcode::Throw);
            }

            Op::LdNull => {
                self.em.op(Opcode::PushNull);
            }
            Op::LdcI4(v) => skip = self.push_literal(i, *v as i128, 32),
            Op::LdcI8(v) => skip = self.push_literal(i, *v as i128, 64),
            Op::LdStr(s) => self.em.push_data(s.as_bytes()),

            Op::LdLoc(n) => self.load(i, SlotKind::Local, *n)?,
            Op::LdArg(n) => self.load(i, SlotKind::Arg, *n)?,
            Op::StLoc(n) => {
                let slot = self.slot(i, SlotKind::Local, *n)?;
                self.em.store(SlotKind::Local, slot);
            }
            Op::StArg(n) => {
                let slot = self.slot(i, SlotKind::Arg, *n)?;
                self.em.store(SlotKind::Arg, slot);
            }
            Op::LdLocA(n) => {
                let slot = self.slot(i, SlotKind::Local, *n)?;
                self.address_of = Some((SlotKind::Local, slot));
                self.em.load(SlotKind::Local, slot);
            }
            Op::LdArgA(n) => {
                let slot = self.slot(i, SlotKind::Arg, *n)?;
                self.address_of = Some((SlotKind::Arg, slot));
                self.em.load(SlotKind::Arg, slot);
            }

            Op::LdSFld(field) => self.load_static(field)?,
            Op::StSFld(field) => self.store_static(field)?,
            Op::LdFld(index) => {
                self.em.push_int(*index as i128);
                self.em.op(Opcode::PickItem);
            }
            Op::StFld(index) => {
                self.em.push_int(*index as i128);
                self.em.op(Opcode::Swap);
                self.em.op(Opcode::SetItem);
            }

            Op::NewArr(ty) => skip = self.new_array(i, ty)?,
            Op::LdLen => {
                self.em.op(Opcode::Size);
            }
            Op::LdElem => {
                self.em.op(Opcode::PickItem);
            }
            Op::StElem => {
                self.em.op(Opcode::SetItem);
            }
            Op::NewObj { fields, ctor_args } => self.new_object(i, fields, *ctor_args)?,
            Op::InitObj(fields) => self.init_object(i, fields)?,

            Op::Br(t) | Op::Leave(t) => self.em.jump(Opcode::JmpL, *t),
            Op::BrTrue(t) => self.em.jump(Opcode::JmpIfL, *t),
            Op::BrFalse(t) => self.em.jump(Opcode::JmpIfNotL, *t),
            Op::Beq(t) => self.compare_and_branch(Opcode::NumEqual, false, *t),
            Op::BneUn(t) => self.compare_and_branch(Opcode::NumNotEqual, false, *t),
            Op::Blt(t) => self.compare_and_branch(Opcode::Lt, false, *t),
            Op::BltUn(t) => self.compare_and_branch(Opcode::Lt, true, *t),
            Op::Ble(t) => self.compare_and_branch(Opcode::Le, false, *t),
            Op::BleUn(t) => self.compare_and_branch(Opcode::Le, true, *t),
            Op::Bgt(t) => self.compare_and_branch(Opcode::Gt, false, *t),
            Op::BgtUn(t) => self.compare_and_branch(Opcode::Gt, true, *t),
            Op::Bge(t) => self.compare_and_branch(Opcode::Ge, false, *t),
            Op::BgeUn(t) => self.compare_and_branch(Opcode::Ge, true, *t),
            Op::Switch(targets) => self.switch(targets),

            Op::Add => {
                self.em.op(Opcode::Add);
            }
            Op::Sub => {
                self.em.op(Opcode::Sub);
            }
            Op::Mul => {
                self.em.op(Opcode::Mul);
            }
            Op::Div | Op::DivUn => {
                self.em.op(Opcode::Div);
            }
            Op::Rem | Op::RemUn => {
                self.em.op(Opcode::Mod);
            }
            Op::Neg => {
                self.em.op(Opcode::Negate);
            }
            Op::Not => {
                self.em.op(Opcode::Invert);
            }
            Op::And => {
                self.em.op(Opcode::And);
            }
            Op::Or => {
                self.em.op(Opcode::Or);
            }
            Op::Xor => {
                self.em.op(Opcode::Xor);
            }
            Op::Shl => {
                self.em.op(Opcode::Shl);
            }
            Op::Shr | Op::ShrUn => {
                self.em.op(Opcode::Shr);
            }
            Op::Ceq => skip = self.ceq(i),
            Op::Cgt => skip = self.cgt(i, false),
            Op::CgtUn => skip = self.cgt(i, true),
            Op::Clt => skip = self.clt(i, false),
            Op::CltUn => skip = self.clt(i, true),

            Op::Call(callee) => skip = self.call(i, callee)?,
            Op::Ldftn(name) => skip = self.function_pointer(i, name)?,

            Op::Box(ty) | Op::Unbox(ty) | Op::UnboxAny(ty) => {
                if !ty.is_primitive() {
                    return Err(self.unsupported(i));
                }
            }

            Op::InitArray(_)
            | Op::NewDelegate
            | Op::Ldind
            | Op::Stind
            | Op::Ldelema
            | Op::Localloc
            | Op::Calli
            | Op::Sizeof
            | Op::Ldtoken
            | Op::Ldvirtftn
            | Op::NewMultiArray
            | Op::Endfinally => return Err(self.unsupported(i)),
        }
        Ok(skip)
    }

    fn load(&mut self, i: usize, kind: SlotKind, n: u16) -> Result<(), CompileError> {
        let slot = self.slot(i, kind, n)?;
        self.em.load(kind, slot);
        Ok(())
    }

    /// Validate a local or argument index against the method's declaration.
    fn slot(&self, i: usize, kind: SlotKind, n: u16) -> Result<u8, CompileError> {
        let (declared, what) = match kind {
            SlotKind::Local => (self.locals, "local"),
            SlotKind::Arg => (self.params, "argument"),
            SlotKind::Static => (u8::MAX as usize + 1, "static"),
        };
        if n as usize >= declared {
            return Err(CompileError::consistency(
                self.method,
                format!(
                    "{what} {n} out of range at IL_{:04x} ({declared} declared)",
                    self.body[i].offset
                ),
            ));
        }
        u8::try_from(n).map_err(|_| CompileError::ResourceLimit {
            scope: self.method.to_string(),
            what: "slots",
            count: n as usize + 1,
            max: u8::MAX as usize,
        })
    }

    /// The instruction at `j` exists and no branch lands on it.
    /// Push an integer literal, folding a conversion that follows it.
    fn push_literal(&mut self, i: usize, value: i128, bits: u32) -> usize {
        match self.idiom_at(i + 1) {
            Some(Op::Conv(kind)) => {
                self.em.push_int(kind.reinterpret(value, bits));
                1
            }
            _ => {
                self.em.push_int(value);
                0
            }
        }
    }

    fn idiom_at(&self, j: usize) -> Option<&'a Op> {
        let body = self.body;
        let instr = body.get(j)?;
        (!self.targets.contains(&instr.offset)).then_some(&instr.op)
    }

    fn unsupported(&self, i: usize) -> CompileError {
        let instr = &self.body[i];
        CompileError::UnsupportedInstruction {
            method: self.method.to_string(),
            offset: instr.offset,
            instruction: instr.op.to_string(),
        }
    }

    fn unsupported_call(&self, i: usize, callee: &str, reason: impl Into<String>) -> CompileError {
        CompileError::UnsupportedCall {
            method: self.method.to_string(),
            offset: self.body[i].offset,
            callee: callee.to_string(),
            reason: reason.into(),
        }
    }
}
