//! Stack machine executing a linked image.

use std::cell::RefCell;
use std::rc::Rc;

use neoil_bytecode::{InstructionView, Opcode, SlotKind, StackItemType, decode, slot_of};

use super::error::RuntimeError;
use super::frame::{Frame, slot};
use super::item::StackItem;
use super::trace::{NoopTracer, Tracer};

/// Runtime limits for one invocation.
#[derive(Clone, Copy, Debug)]
pub struct FuelLimits {
    /// Maximum instructions executed (default: 1,000,000).
    pub(crate) exec_fuel: u32,
    /// Maximum call depth (default: 1,024).
    pub(crate) recursion_limit: u32,
    /// Maximum evaluation stack size (default: 2,048).
    pub(crate) stack_limit: u32,
}

impl Default for FuelLimits {
    fn default() -> Self {
        Self {
            exec_fuel: 1_000_000,
            recursion_limit: 1024,
            stack_limit: 2048,
        }
    }
}

impl FuelLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exec_fuel(mut self, fuel: u32) -> Self {
        self.exec_fuel = fuel;
        self
    }

    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn stack_limit(mut self, limit: u32) -> Self {
        self.stack_limit = limit;
        self
    }

    pub fn get_exec_fuel(&self) -> u32 {
        self.exec_fuel
    }
    pub fn get_recursion_limit(&self) -> u32 {
        self.recursion_limit
    }
    pub fn get_stack_limit(&self) -> u32 {
        self.stack_limit
    }
}

/// Event raised through `System.Runtime.Notify`.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub name: String,
    pub state: Vec<StackItem>,
}

pub(super) enum Flow {
    Next,
    Jump(u32),
    Halt,
}

/// Executor for one program image.
///
/// Static slots persist across invocations; the initializer, when set, runs
/// once before the first invocation.
pub struct VM<'s> {
    pub(super) script: &'s [u8],
    initializer: Option<u32>,
    initialized: bool,
    pub(super) limits: FuelLimits,
    pub(super) statics: Option<Vec<StackItem>>,
    pub(super) stack: Vec<StackItem>,
    pub(super) frames: Vec<Frame>,
    pub(super) ip: u32,
    exec_fuel: u32,
    pub(super) notifications: Vec<Notification>,
    pub(super) logs: Vec<String>,
}

/// Builder for VM instances.
pub struct VMBuilder<'s> {
    script: &'s [u8],
    initializer: Option<u32>,
    limits: FuelLimits,
}

impl<'s> VMBuilder<'s> {
    pub fn new(script: &'s [u8]) -> Self {
        Self {
            script,
            initializer: None,
            limits: FuelLimits::default(),
        }
    }

    /// Entry of the static initializer.
    pub fn initializer(mut self, entry: Option<u32>) -> Self {
        self.initializer = entry;
        self
    }

    pub fn limits(mut self, limits: FuelLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn exec_fuel(mut self, fuel: u32) -> Self {
        self.limits = self.limits.exec_fuel(fuel);
        self
    }

    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.limits = self.limits.recursion_limit(limit);
        self
    }

    pub fn build(self) -> VM<'s> {
        VM {
            script: self.script,
            initializer: self.initializer,
            initialized: false,
            limits: self.limits,
            statics: None,
            stack: Vec::new(),
            frames: Vec::new(),
            ip: 0,
            exec_fuel: self.limits.get_exec_fuel(),
            notifications: Vec::new(),
            logs: Vec::new(),
        }
    }
}

impl<'s> VM<'s> {
    pub fn builder(script: &'s [u8]) -> VMBuilder<'s> {
        VMBuilder::new(script)
    }

    /// Run the method at `entry` with `args` (first argument first) and
    /// return the evaluation stack at its final `RET`.
    pub fn invoke(&mut self, entry: u32, args: Vec<StackItem>) -> Result<Vec<StackItem>, RuntimeError> {
        self.invoke_with(entry, args, &mut NoopTracer)
    }

    pub fn invoke_with<T: Tracer>(
        &mut self,
        entry: u32,
        args: Vec<StackItem>,
        tracer: &mut T,
    ) -> Result<Vec<StackItem>, RuntimeError> {
        if !self.initialized {
            if let Some(init) = self.initializer {
                self.run(init, Vec::new(), tracer)?;
            }
            self.initialized = true;
        }
        self.run(entry, args, tracer)
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Static slots, empty until the initializer allocates them.
    pub fn statics(&self) -> &[StackItem] {
        self.statics.as_deref().unwrap_or_default()
    }

    fn run<T: Tracer>(
        &mut self,
        entry: u32,
        args: Vec<StackItem>,
        tracer: &mut T,
    ) -> Result<Vec<StackItem>, RuntimeError> {
        if entry as usize >= self.script.len() {
            return Err(RuntimeError::InvalidEntry(entry));
        }
        self.stack.clear();
        self.frames.clear();
        // First argument on top.
        self.stack.extend(args.into_iter().rev());
        self.exec_fuel = self.limits.exec_fuel;
        self.frames.push(Frame::new(None));
        tracer.trace_call(entry);
        self.ip = entry;

        loop {
            match self.step(tracer) {
                Ok(true) => continue,
                Ok(false) => return Ok(std::mem::take(&mut self.stack)),
                Err(e) => {
                    tracer.trace_fault(&e);
                    return Err(e);
                }
            }
        }
    }

    /// Execute one instruction. Returns `false` once the entry frame returns.
    fn step<T: Tracer>(&mut self, tracer: &mut T) -> Result<bool, RuntimeError> {
        if self.exec_fuel == 0 {
            return Err(RuntimeError::ExecFuelExhausted(self.limits.exec_fuel));
        }
        self.exec_fuel -= 1;

        let instr = decode(self.script, self.ip)?;
        tracer.trace_instruction(&instr, self.stack.len());
        let flow = self.exec(&instr, tracer)?;
        if self.stack.len() > self.limits.stack_limit as usize {
            return Err(RuntimeError::StackOverflow(self.limits.stack_limit));
        }
        match flow {
            Flow::Next => self.ip = instr.next(),
            Flow::Jump(target) => self.ip = target,
            Flow::Halt => return Ok(false),
        }
        Ok(true)
    }

    fn exec<T: Tracer>(&mut self, instr: &InstructionView<'_>, tracer: &mut T) -> Result<Flow, RuntimeError> {
        use Opcode::*;
        use StackItem as S;

        match instr.opcode {
            PushInt8 | PushInt16 | PushInt32 | PushInt64 | PushInt128 | PushInt256 | PushM1
            | Push0 | Push1 | Push2 | Push3 | Push4 | Push5 | Push6 | Push7 | Push8 | Push9
            | Push10 | Push11 | Push12 | Push13 | Push14 | Push15 | Push16 => {
                let v = instr.int_value().ok_or(RuntimeError::Overflow)?;
                self.push(S::Integer(v));
            }
            PushT => self.push(S::Boolean(true)),
            PushF => self.push(S::Boolean(false)),
            PushA => {
                let target = self.target(instr)?;
                self.push(S::Pointer(target));
            }
            PushNull => self.push(S::Null),
            PushData1 | PushData2 | PushData4 => self.push(S::ByteString(instr.data().to_vec())),
            Nop => {}

            Jmp | JmpL => return Ok(Flow::Jump(self.target(instr)?)),
            JmpIf | JmpIfL => {
                if self.pop()?.as_bool()? {
                    return Ok(Flow::Jump(self.target(instr)?));
                }
            }
            JmpIfNot | JmpIfNotL => {
                if !self.pop()?.as_bool()? {
                    return Ok(Flow::Jump(self.target(instr)?));
                }
            }
            JmpEq | JmpEqL | JmpNe | JmpNeL | JmpGt | JmpGtL | JmpGe | JmpGeL | JmpLt | JmpLtL
            | JmpLe | JmpLeL => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let taken = match instr.opcode {
                    JmpEq | JmpEqL => a == b,
                    JmpNe | JmpNeL => a != b,
                    JmpGt | JmpGtL => a > b,
                    JmpGe | JmpGeL => a >= b,
                    JmpLt | JmpLtL => a < b,
                    _ => a <= b,
                };
                if taken {
                    return Ok(Flow::Jump(self.target(instr)?));
                }
            }
            Call | CallL => {
                let target = self.target(instr)?;
                return self.call(target, instr.next(), tracer);
            }
            CallA => match self.pop()? {
                S::Pointer(target) => return self.call(target, instr.next(), tracer),
                other => return Err(other.invalid("Pointer")),
            },
            Abort => return Err(RuntimeError::Aborted(None)),
            AbortMsg => {
                let message = self.pop()?.as_string()?;
                return Err(RuntimeError::Aborted(Some(message)));
            }
            Assert => {
                if !self.pop()?.as_bool()? {
                    return Err(RuntimeError::AssertFailed(None));
                }
            }
            AssertMsg => {
                let message = self.pop()?.as_string()?;
                if !self.pop()?.as_bool()? {
                    return Err(RuntimeError::AssertFailed(Some(message)));
                }
            }
            Throw => {
                let item = self.pop()?;
                return Err(RuntimeError::Thrown(item.to_string()));
            }
            Ret => {
                let frame = self
                    .frames
                    .pop()
                    .ok_or(RuntimeError::StackUnderflow(self.ip))?;
                tracer.trace_return();
                return Ok(match frame.return_addr {
                    Some(addr) => Flow::Jump(addr),
                    None => Flow::Halt,
                });
            }
            Syscall => {
                let id = u32::from_le_bytes([
                    instr.operand[0],
                    instr.operand[1],
                    instr.operand[2],
                    instr.operand[3],
                ]);
                self.syscall(id, tracer)?;
            }

            Depth => {
                let depth = self.stack.len() as i128;
                self.push(S::Integer(depth));
            }
            Drop => {
                self.pop()?;
            }
            Nip => {
                let top = self.pop()?;
                self.pop()?;
                self.push(top);
            }
            XDrop => {
                let n = self.pop_index()?;
                let at = self.depth_index(n)?;
                self.stack.remove(at);
            }
            Clear => self.stack.clear(),
            Dup | Over => {
                let item = self.peek(usize::from(instr.opcode == Over))?.clone();
                self.push(item);
            }
            Pick => {
                let n = self.pop_index()?;
                let item = self.peek(n)?.clone();
                self.push(item);
            }
            Tuck => {
                let top = self.peek(0)?.clone();
                let at = self.depth_index(1)?;
                self.stack.insert(at, top);
            }
            Swap => self.reverse_top(2)?,
            Rot => {
                let at = self.depth_index(2)?;
                let item = self.stack.remove(at);
                self.push(item);
            }
            Roll => {
                let n = self.pop_index()?;
                let at = self.depth_index(n)?;
                let item = self.stack.remove(at);
                self.push(item);
            }
            Reverse3 => self.reverse_top(3)?,
            Reverse4 => self.reverse_top(4)?,
            ReverseN => {
                let n = self.pop_index()?;
                self.reverse_top(n)?;
            }

            InitSSlot => {
                if self.statics.is_some() {
                    return Err(RuntimeError::StaticsAlreadyInitialized);
                }
                self.statics = Some(vec![S::Null; instr.operand[0] as usize]);
            }
            InitSlot => {
                let (locals, params) = (instr.operand[0] as usize, instr.operand[1] as usize);
                let mut args = Vec::with_capacity(params);
                for _ in 0..params {
                    args.push(self.pop()?);
                }
                let frame = self
                    .frames
                    .last_mut()
                    .ok_or(RuntimeError::StackUnderflow(self.ip))?;
                frame.locals = vec![S::Null; locals];
                frame.args = args;
            }

            NewBuffer => {
                let n = self.pop_index()?;
                self.push(S::buffer(vec![0; n]));
            }
            Cat => {
                let b = self.pop()?.as_bytes()?;
                let mut a = self.pop()?.as_bytes()?;
                a.extend_from_slice(&b);
                self.push(S::buffer(a));
            }
            Substr => {
                let count = self.pop_index()?;
                let index = self.pop_index()?;
                let bytes = self.pop()?.as_bytes()?;
                let end = index
                    .checked_add(count)
                    .filter(|&end| end <= bytes.len())
                    .ok_or(RuntimeError::IndexOutOfRange {
                        index: index.saturating_add(count) as i128,
                        len: bytes.len(),
                    })?;
                self.push(S::buffer(bytes[index..end].to_vec()));
            }
            Left | Right => {
                let count = self.pop_index()?;
                let bytes = self.pop()?.as_bytes()?;
                if count > bytes.len() {
                    return Err(RuntimeError::IndexOutOfRange {
                        index: count as i128,
                        len: bytes.len(),
                    });
                }
                let part = if instr.opcode == Left {
                    &bytes[..count]
                } else {
                    &bytes[bytes.len() - count..]
                };
                self.push(S::buffer(part.to_vec()));
            }

            Invert => {
                let a = self.pop_int()?;
                self.push(S::Integer(!a));
            }
            And | Or | Xor => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let r = match instr.opcode {
                    And => a & b,
                    Or => a | b,
                    _ => a ^ b,
                };
                self.push(S::Integer(r));
            }
            Equal | NotEqual => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(S::Boolean(a.equals(&b) == (instr.opcode == Equal)));
            }

            Sign | Abs | Negate | Inc | Dec => {
                let a = self.pop_int()?;
                let r = match instr.opcode {
                    Sign => Some(a.signum()),
                    Abs => a.checked_abs(),
                    Negate => a.checked_neg(),
                    Inc => a.checked_add(1),
                    _ => a.checked_sub(1),
                };
                self.push(S::Integer(r.ok_or(RuntimeError::Overflow)?));
            }
            Add | Sub | Mul | Div | Mod | Min | Max => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                if b == 0 && matches!(instr.opcode, Div | Mod) {
                    return Err(RuntimeError::DivideByZero);
                }
                let r = match instr.opcode {
                    Add => a.checked_add(b),
                    Sub => a.checked_sub(b),
                    Mul => a.checked_mul(b),
                    Div => a.checked_div(b),
                    Mod => a.checked_rem(b),
                    Min => Some(a.min(b)),
                    _ => Some(a.max(b)),
                };
                self.push(S::Integer(r.ok_or(RuntimeError::Overflow)?));
            }
            Pow => {
                let exponent = self.pop_int()?;
                let base = self.pop_int()?;
                let exponent = u32::try_from(exponent).map_err(|_| RuntimeError::Overflow)?;
                let r = base.checked_pow(exponent).ok_or(RuntimeError::Overflow)?;
                self.push(S::Integer(r));
            }
            Sqrt => {
                let a = self.pop_int()?;
                if a < 0 {
                    return Err(RuntimeError::Overflow);
                }
                self.push(S::Integer(a.isqrt()));
            }
            Shl => {
                let shift = self.pop_int()?;
                let a = self.pop_int()?;
                self.push(S::Integer(shift_left(a, shift)?));
            }
            Shr => {
                let shift = self.pop_int()?;
                let a = self.pop_int()?;
                if shift < 0 {
                    return Err(RuntimeError::Overflow);
                }
                let r = if shift >= 128 { if a < 0 { -1 } else { 0 } } else { a >> shift };
                self.push(S::Integer(r));
            }
            Not => {
                let a = self.pop()?.as_bool()?;
                self.push(S::Boolean(!a));
            }
            BoolAnd | BoolOr => {
                let b = self.pop()?.as_bool()?;
                let a = self.pop()?.as_bool()?;
                let r = if instr.opcode == BoolAnd { a && b } else { a || b };
                self.push(S::Boolean(r));
            }
            Nz => {
                let a = self.pop_int()?;
                self.push(S::Boolean(a != 0));
            }
            NumEqual | NumNotEqual => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                self.push(S::Boolean((a == b) == (instr.opcode == NumEqual)));
            }
            Lt | Le | Gt | Ge => {
                let b = self.pop()?;
                let a = self.pop()?;
                let r = if a.is_null() || b.is_null() {
                    false
                } else {
                    let (a, b) = (a.as_int()?, b.as_int()?);
                    match instr.opcode {
                        Lt => a < b,
                        Le => a <= b,
                        Gt => a > b,
                        _ => a >= b,
                    }
                };
                self.push(S::Boolean(r));
            }
            Within => {
                let b = self.pop_int()?;
                let a = self.pop_int()?;
                let x = self.pop_int()?;
                self.push(S::Boolean(a <= x && x < b));
            }

            PackMap => {
                let n = self.pop_index()?;
                let mut entries: Vec<(StackItem, StackItem)> = Vec::with_capacity(n);
                for _ in 0..n {
                    let key = self.pop()?;
                    let value = self.pop()?;
                    match entries.iter_mut().find(|(k, _)| k.equals(&key)) {
                        Some(entry) => entry.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                self.push(S::Map(Rc::new(RefCell::new(entries))));
            }
            Pack | PackStruct => {
                let n = self.pop_index()?;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.pop()?);
                }
                self.push(if instr.opcode == Pack {
                    S::array(items)
                } else {
                    S::structure(items)
                });
            }
            Unpack => {
                let items = match self.pop()? {
                    S::Array(items) | S::Struct(items) => items.borrow().clone(),
                    other => return Err(other.invalid("Array")),
                };
                let n = items.len();
                for item in items.into_iter().rev() {
                    self.push(item);
                }
                self.push(S::Integer(n as i128));
            }
            NewArray0 => self.push(S::array(Vec::new())),
            NewStruct0 => self.push(S::structure(Vec::new())),
            NewArray | NewStruct => {
                let n = self.pop_index()?;
                let items = vec![S::Null; n];
                self.push(if instr.opcode == NewArray {
                    S::array(items)
                } else {
                    S::structure(items)
                });
            }
            NewArrayT => {
                let n = self.pop_index()?;
                let default = match StackItemType::from_u8(instr.operand[0]) {
                    Some(StackItemType::Boolean) => S::Boolean(false),
                    Some(StackItemType::Integer) => S::Integer(0),
                    Some(StackItemType::ByteString) => S::ByteString(Vec::new()),
                    _ => S::Null,
                };
                self.push(S::array(vec![default; n]));
            }
            NewMap => self.push(S::Map(Default::default())),
            Size => {
                let n = match self.pop()? {
                    S::Array(items) | S::Struct(items) => items.borrow().len(),
                    S::Map(entries) => entries.borrow().len(),
                    S::Buffer(bytes) => bytes.borrow().len(),
                    other => other.as_bytes()?.len(),
                };
                self.push(S::Integer(n as i128));
            }
            HasKey => {
                let key = self.pop()?;
                let found = match self.pop()? {
                    S::Array(items) | S::Struct(items) => {
                        let i = key.as_int()?;
                        i >= 0 && (i as usize) < items.borrow().len()
                    }
                    S::Map(entries) => entries.borrow().iter().any(|(k, _)| k.equals(&key)),
                    other => {
                        let i = key.as_int()?;
                        i >= 0 && (i as usize) < other.as_bytes()?.len()
                    }
                };
                self.push(S::Boolean(found));
            }
            Keys => match self.pop()? {
                S::Map(entries) => {
                    let keys = entries.borrow().iter().map(|(k, _)| k.clone()).collect();
                    self.push(S::array(keys));
                }
                other => return Err(other.invalid("Map")),
            },
            Values => {
                let values = match self.pop()? {
                    S::Array(items) | S::Struct(items) => {
                        items.borrow().iter().map(copy_struct).collect()
                    }
                    S::Map(entries) => entries.borrow().iter().map(|(_, v)| copy_struct(v)).collect(),
                    other => return Err(other.invalid("Array")),
                };
                self.push(S::array(values));
            }
            PickItem => {
                let key = self.pop()?;
                let item = match self.pop()? {
                    S::Array(items) | S::Struct(items) => {
                        let items = items.borrow();
                        items[index(&key, items.len())?].clone()
                    }
                    S::Map(entries) => entries
                        .borrow()
                        .iter()
                        .find(|(k, _)| k.equals(&key))
                        .map(|(_, v)| v.clone())
                        .ok_or_else(|| RuntimeError::KeyNotFound(key.to_string()))?,
                    other => {
                        let bytes = other.as_bytes()?;
                        S::Integer(bytes[index(&key, bytes.len())?] as i128)
                    }
                };
                self.push(item);
            }
            Append => {
                let item = copy_struct(&self.pop()?);
                match self.pop()? {
                    S::Array(items) | S::Struct(items) => items.borrow_mut().push(item),
                    other => return Err(other.invalid("Array")),
                }
            }
            SetItem => {
                let value = copy_struct(&self.pop()?);
                let key = self.pop()?;
                match self.pop()? {
                    S::Array(items) | S::Struct(items) => {
                        let mut items = items.borrow_mut();
                        let at = index(&key, items.len())?;
                        items[at] = value;
                    }
                    S::Map(entries) => {
                        let mut entries = entries.borrow_mut();
                        match entries.iter_mut().find(|(k, _)| k.equals(&key)) {
                            Some(entry) => entry.1 = value,
                            None => entries.push((key, value)),
                        }
                    }
                    S::Buffer(bytes) => {
                        let mut bytes = bytes.borrow_mut();
                        let at = index(&key, bytes.len())?;
                        let v = value.as_int()?;
                        bytes[at] = u8::try_from(v)
                            .or_else(|_| i8::try_from(v).map(|b| b as u8))
                            .map_err(|_| RuntimeError::Overflow)?;
                    }
                    other => return Err(other.invalid("Array")),
                }
            }
            ReverseItems => match self.pop()? {
                S::Array(items) | S::Struct(items) => items.borrow_mut().reverse(),
                S::Buffer(bytes) => bytes.borrow_mut().reverse(),
                other => return Err(other.invalid("Array")),
            },
            Remove => {
                let key = self.pop()?;
                match self.pop()? {
                    S::Array(items) | S::Struct(items) => {
                        let mut items = items.borrow_mut();
                        let at = index(&key, items.len())?;
                        items.remove(at);
                    }
                    S::Map(entries) => entries.borrow_mut().retain(|(k, _)| !k.equals(&key)),
                    other => return Err(other.invalid("Array")),
                }
            }
            ClearItems => match self.pop()? {
                S::Array(items) | S::Struct(items) => items.borrow_mut().clear(),
                S::Map(entries) => entries.borrow_mut().clear(),
                other => return Err(other.invalid("Array")),
            },
            PopItem => {
                let item = match self.pop()? {
                    S::Array(items) | S::Struct(items) => {
                        let mut items = items.borrow_mut();
                        let len = items.len();
                        items.pop().ok_or(RuntimeError::IndexOutOfRange { index: -1, len })?
                    }
                    other => return Err(other.invalid("Array")),
                };
                self.push(item);
            }
            IsNull => {
                let item = self.pop()?;
                self.push(S::Boolean(item.is_null()));
            }
            IsType | Convert => {
                let target = StackItemType::from_u8(instr.operand[0])
                    .ok_or(RuntimeError::Unsupported(instr.opcode))?;
                let item = self.pop()?;
                if instr.opcode == IsType {
                    self.push(S::Boolean(item.item_type() == target));
                } else {
                    self.push(item.convert(target)?);
                }
            }

            LdSFld0 | LdSFld1 | LdSFld2 | LdSFld3 | LdSFld4 | LdSFld5 | LdSFld6 | LdSFld
            | StSFld0 | StSFld1 | StSFld2 | StSFld3 | StSFld4 | StSFld5 | StSFld6 | StSFld
            | LdLoc0 | LdLoc1 | LdLoc2 | LdLoc3 | LdLoc4 | LdLoc5 | LdLoc6 | LdLoc | StLoc0
            | StLoc1 | StLoc2 | StLoc3 | StLoc4 | StLoc5 | StLoc6 | StLoc | LdArg0 | LdArg1
            | LdArg2 | LdArg3 | LdArg4 | LdArg5 | LdArg6 | LdArg | StArg0 | StArg1 | StArg2
            | StArg3 | StArg4 | StArg5 | StArg6 | StArg => {
                let (kind, load, index) = slot_of(instr.opcode, instr.operand)
                    .ok_or(RuntimeError::Unsupported(instr.opcode))?;
                self.slot_op(kind, load, index)?;
            }

            CallT | Try | TryL | EndTry | EndTryL | EndFinally | MemCpy | ModMul | ModPow => {
                return Err(RuntimeError::Unsupported(instr.opcode));
            }
        }
        Ok(Flow::Next)
    }

    fn call<T: Tracer>(&mut self, target: u32, return_addr: u32, tracer: &mut T) -> Result<Flow, RuntimeError> {
        if self.frames.len() >= self.limits.recursion_limit as usize {
            return Err(RuntimeError::RecursionLimitExceeded(self.limits.recursion_limit));
        }
        if target as usize >= self.script.len() {
            return Err(RuntimeError::InvalidEntry(target));
        }
        self.frames.push(Frame::new(Some(return_addr)));
        tracer.trace_call(target);
        Ok(Flow::Jump(target))
    }

    fn slot_op(&mut self, kind: SlotKind, load: bool, index: u8) -> Result<(), RuntimeError> {
        if load {
            let item = self.slot_mut(kind, index)?.clone();
            self.push(item);
        } else {
            let value = self.pop()?;
            *self.slot_mut(kind, index)? = value;
        }
        Ok(())
    }

    fn slot_mut(&mut self, kind: SlotKind, index: u8) -> Result<&mut StackItem, RuntimeError> {
        match kind {
            SlotKind::Static => {
                let statics = self
                    .statics
                    .as_deref_mut()
                    .ok_or(RuntimeError::InvalidSlot { kind: "static", index })?;
                slot(statics, "static", index)
            }
            SlotKind::Local | SlotKind::Arg => {
                let frame = self
                    .frames
                    .last_mut()
                    .ok_or(RuntimeError::StackUnderflow(self.ip))?;
                if kind == SlotKind::Local {
                    slot(&mut frame.locals, "local", index)
                } else {
                    slot(&mut frame.args, "argument", index)
                }
            }
        }
    }

    fn target(&self, instr: &InstructionView<'_>) -> Result<u32, RuntimeError> {
        instr
            .target()
            .filter(|&t| (t as usize) < self.script.len())
            .ok_or(RuntimeError::InvalidEntry(instr.offset))
    }

    pub(super) fn push(&mut self, item: StackItem) {
        self.stack.push(item);
    }

    pub(super) fn pop(&mut self) -> Result<StackItem, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow(self.ip))
    }

    fn pop_int(&mut self) -> Result<i128, RuntimeError> {
        self.pop()?.as_int()
    }

    fn pop_index(&mut self) -> Result<usize, RuntimeError> {
        let v = self.pop_int()?;
        usize::try_from(v).map_err(|_| RuntimeError::IndexOutOfRange {
            index: v,
            len: self.stack.len(),
        })
    }

    /// Vector index of the item `n` below the top.
    fn depth_index(&self, n: usize) -> Result<usize, RuntimeError> {
        self.stack
            .len()
            .checked_sub(n + 1)
            .ok_or(RuntimeError::StackUnderflow(self.ip))
    }

    fn peek(&self, n: usize) -> Result<&StackItem, RuntimeError> {
        Ok(&self.stack[self.depth_index(n)?])
    }

    fn reverse_top(&mut self, n: usize) -> Result<(), RuntimeError> {
        if n == 0 {
            return Ok(());
        }
        let start = self.depth_index(n - 1)?;
        self.stack[start..].reverse();
        Ok(())
    }
}

/// Struct values are copied when stored into a compound.
fn copy_struct(item: &StackItem) -> StackItem {
    match item {
        StackItem::Struct(items) => {
            StackItem::structure(items.borrow().iter().map(copy_struct).collect())
        }
        other => other.clone(),
    }
}

fn index(key: &StackItem, len: usize) -> Result<usize, RuntimeError> {
    let i = key.as_int()?;
    usize::try_from(i)
        .ok()
        .filter(|&i| i < len)
        .ok_or(RuntimeError::IndexOutOfRange { index: i, len })
}

fn shift_left(a: i128, shift: i128) -> Result<i128, RuntimeError> {
    if shift < 0 {
        return Err(RuntimeError::Overflow);
    }
    if a == 0 || shift == 0 {
        return Ok(a);
    }
    if shift >= 127 {
        return Err(RuntimeError::Overflow);
    }
    let r = a << shift;
    if r >> shift != a {
        return Err(RuntimeError::Overflow);
    }
    Ok(r)
}
