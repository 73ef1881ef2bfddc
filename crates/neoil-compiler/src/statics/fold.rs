//! Compile-time evaluation of readonly static initializers.
//!
//! A tiny stack machine over the instructions a source compiler emits for
//! literal initializers: integer and string constants, conversions and
//! array construction. Arrays live in an arena so `dup` shares them.

use neoil_core::{Callee, Intrinsic, Op, SourceInstruction, TypeRef};

use super::Constant;

#[derive(Debug, Clone)]
enum Value {
    Int(i128),
    Str(String),
    Array(usize),
}

#[derive(Debug)]
enum ArrayValue {
    Bytes(Vec<u8>),
    Strings(Vec<Option<String>>),
}

#[derive(Default)]
struct Evaluator {
    stack: Vec<Value>,
    arrays: Vec<ArrayValue>,
    /// Width of the literal pushed by the previous instruction.
    literal_bits: Option<u32>,
}

/// Evaluate `code` (a statement without its final store) and coerce the
/// result to `ty`.
pub(super) fn evaluate(code: &[SourceInstruction], ty: &TypeRef) -> Result<Constant, String> {
    let mut eval = Evaluator::default();
    for instr in code {
        eval.step(&instr.op)?;
    }
    let value = eval.pop()?;
    if !eval.stack.is_empty() {
        return Err("initializer leaves extra values on the stack".to_string());
    }
    eval.coerce(value, ty)
}

impl Evaluator {
    fn step(&mut self, op: &Op) -> Result<(), String> {
        let literal_bits = self.literal_bits.take();
        match op {
            Op::Nop => {}
            Op::Conv(kind) => {
                if let (Some(bits), Some(Value::Int(v))) = (literal_bits, self.stack.last_mut()) {
                    *v = kind.reinterpret(*v, bits);
                }
            }
            Op::LdcI4(v) => {
                self.stack.push(Value::Int(*v as i128));
                self.literal_bits = Some(32);
            }
            Op::LdcI8(v) => {
                self.stack.push(Value::Int(*v as i128));
                self.literal_bits = Some(64);
            }
            Op::LdStr(s) => self.stack.push(Value::Str(s.clone())),
            Op::Dup => {
                let top = self.stack.last().cloned().ok_or("stack underflow")?;
                self.stack.push(top);
            }
            Op::NewArr(element) => {
                let len = self.pop_int()?;
                let len = usize::try_from(len).map_err(|_| format!("negative array length {len}"))?;
                let array = match element {
                    TypeRef::Byte => ArrayValue::Bytes(vec![0; len]),
                    TypeRef::String => ArrayValue::Strings(vec![None; len]),
                    other => return Err(format!("arrays of {other} are not foldable")),
                };
                self.arrays.push(array);
                self.stack.push(Value::Array(self.arrays.len() - 1));
            }
            Op::InitArray(data) => {
                let id = self.pop_array()?;
                match &mut self.arrays[id] {
                    ArrayValue::Bytes(bytes) if bytes.len() == data.len() => {
                        bytes.copy_from_slice(data);
                    }
                    ArrayValue::Bytes(bytes) => {
                        return Err(format!(
                            "initializer of {} bytes for an array of {}",
                            data.len(),
                            bytes.len()
                        ));
                    }
                    ArrayValue::Strings(_) => {
                        return Err("raw initializer for a string array".to_string());
                    }
                }
            }
            Op::StElem => {
                let value = self.pop()?;
                let index = self.pop_int()?;
                let id = self.pop_array()?;
                self.store_element(id, index, value)?;
            }
            Op::Call(Callee::Intrinsic(Intrinsic::StringConcat)) => {
                let right = self.pop_str()?;
                let left = self.pop_str()?;
                self.stack.push(Value::Str(left + &right));
            }
            other => return Err(format!("`{other}` is not a constant expression")),
        }
        Ok(())
    }

    fn store_element(&mut self, id: usize, index: i128, value: Value) -> Result<(), String> {
        let slot = usize::try_from(index).ok();
        match (&mut self.arrays[id], value) {
            (ArrayValue::Bytes(bytes), Value::Int(v)) => {
                let byte = u8::try_from(v).map_err(|_| format!("{v} does not fit in a byte"))?;
                let cell = slot
                    .and_then(|s| bytes.get_mut(s))
                    .ok_or_else(|| format!("index {index} out of range"))?;
                *cell = byte;
            }
            (ArrayValue::Strings(items), Value::Str(s)) => {
                let cell = slot
                    .and_then(|s| items.get_mut(s))
                    .ok_or_else(|| format!("index {index} out of range"))?;
                *cell = Some(s);
            }
            _ => return Err("array element of the wrong type".to_string()),
        }
        Ok(())
    }

    fn coerce(&mut self, value: Value, ty: &TypeRef) -> Result<Constant, String> {
        let byte_array = matches!(ty, TypeRef::ByteArray)
            || matches!(ty, TypeRef::Array(e) if **e == TypeRef::Byte);
        let string_array = matches!(ty, TypeRef::Array(e) if **e == TypeRef::String);
        match value {
            Value::Int(v) if *ty == TypeRef::Boolean => Ok(Constant::Bool(v != 0)),
            Value::Int(v) if ty.is_integer() => Ok(Constant::Int(v)),
            Value::Str(s) if *ty == TypeRef::String => Ok(Constant::Str(s)),
            Value::Array(id) => match std::mem::replace(&mut self.arrays[id], ArrayValue::Bytes(Vec::new())) {
                ArrayValue::Bytes(bytes) if byte_array => Ok(Constant::Bytes(bytes)),
                ArrayValue::Strings(items) if string_array => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| item.ok_or_else(|| format!("element {i} is never assigned")))
                    .collect::<Result<_, _>>()
                    .map(Constant::StrArray),
                _ => Err(format!("{ty} is not foldable")),
            },
            _ => Err(format!("{ty} is not foldable")),
        }
    }

    fn pop(&mut self) -> Result<Value, String> {
        self.stack.pop().ok_or_else(|| "stack underflow".to_string())
    }

    fn pop_int(&mut self) -> Result<i128, String> {
        match self.pop()? {
            Value::Int(v) => Ok(v),
            _ => Err("expected an integer".to_string()),
        }
    }

    fn pop_str(&mut self) -> Result<String, String> {
        match self.pop()? {
            Value::Str(s) => Ok(s),
            _ => Err("expected a string".to_string()),
        }
    }

    fn pop_array(&mut self) -> Result<usize, String> {
        match self.pop()? {
            Value::Array(id) => Ok(id),
            _ => Err("expected an array".to_string()),
        }
    }
}
