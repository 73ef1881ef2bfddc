//! Statics, arrays and structs.

use neoil_bytecode::{Opcode, SlotKind, StackItemType};
use neoil_core::{FieldRef, Op, TypeRef};

use super::Translator;
use crate::error::CompileError;
use crate::statics::Constant;

impl<'a> Translator<'a> {
    pub(super) fn load_static(&mut self, field: &FieldRef) -> Result<(), CompileError> {
        let index = self.index;
        let key = field.key();
        if let Some(event) = index.events.get(&key) {
            // Nothing to load; the following `Invoke` becomes a notification.
            self.pending_event = Some(event);
            return Ok(());
        }
        if let Some(value) = index.statics.folded.get(&key) {
            self.push_constant(value);
            return Ok(());
        }
        if let Some(&slot) = index.statics.slots.get(&key) {
            self.em.load(SlotKind::Static, slot);
            return Ok(());
        }
        Err(CompileError::consistency(
            self.method,
            format!("static field {field} has no slot and no value"),
        ))
    }

    pub(super) fn store_static(&mut self, field: &FieldRef) -> Result<(), CompileError> {
        let index = self.index;
        let statics = &index.statics;
        let key = field.key();
        if let Some(&slot) = statics.slots.get(&key) {
            self.em.store(SlotKind::Static, slot);
            return Ok(());
        }
        let detail = if statics.folded.contains_key(&key) {
            format!("readonly field {field} assigned outside its initializer")
        } else {
            format!("static field {field} has no slot")
        };
        Err(CompileError::consistency(self.method, detail))
    }

    pub(super) fn push_constant(&mut self, value: &Constant) {
        match value {
            Constant::Int(v) => self.em.push_int(*v),
            Constant::Bool(b) => self.em.push_bool(*b),
            Constant::Str(s) => self.em.push_data(s.as_bytes()),
            Constant::Bytes(bytes) => {
                self.em.push_data(bytes);
                self.em
                    .emit(Opcode::Convert, vec![StackItemType::Buffer as u8]);
            }
            Constant::StrArray(items) => {
                if items.is_empty() {
                    self.em.op(Opcode::NewArray0);
                    return;
                }
                for item in items.iter().rev() {
                    self.em.push_data(item.as_bytes());
                }
                self.em.push_int(items.len() as i128);
                self.em.op(Opcode::Pack);
            }
        }
    }

    /// `newarr`, folding a following `dup; <initialize array>` into a
    /// literal.
    pub(super) fn new_array(&mut self, i: usize, element: &TypeRef) -> Result<usize, CompileError> {
        let init = match (self.idiom_at(i + 1), self.idiom_at(i + 2)) {
            (Some(Op::Dup), Some(Op::InitArray(data))) => Some(data),
            _ => None,
        };
        let Some(data) = init else {
            match element {
                TypeRef::Byte => {
                    self.em.op(Opcode::NewBuffer);
                }
                _ => {
                    self.em
                        .emit(Opcode::NewArrayT, vec![item_type(element) as u8]);
                }
            }
            return Ok(0);
        };

        if *element == TypeRef::Byte {
            // Length pushed by the source.
            self.em.op(Opcode::Drop);
            self.em.push_data(data);
            self.em
                .emit(Opcode::Convert, vec![StackItemType::Buffer as u8]);
            return Ok(2);
        }

        let Some((width, signed)) = element_layout(element) else {
            return Err(self.unsupported(i + 2));
        };
        if data.len() % width != 0 {
            return Err(CompileError::consistency(
                self.method,
                format!(
                    "array initializer of {} bytes for {element}[] at IL_{:04x}",
                    data.len(),
                    self.body[i].offset
                ),
            ));
        }
        let values: Vec<i128> = data.chunks(width).map(|c| decode_element(c, signed)).collect();

        self.em.op(Opcode::Drop);
        if values.is_empty() {
            self.em.op(Opcode::NewArray0);
            return Ok(2);
        }
        for &v in values.iter().rev() {
            if *element == TypeRef::Boolean {
                self.em.push_bool(v != 0);
            } else {
                self.em.push_int(v);
            }
        }
        self.em.push_int(values.len() as i128);
        self.em.op(Opcode::Pack);
        Ok(2)
    }

    /// `newobj` of a struct whose constructor assigns the first `ctor_args`
    /// fields in order.
    pub(super) fn new_object(
        &mut self,
        i: usize,
        fields: &[TypeRef],
        ctor_args: u16,
    ) -> Result<(), CompileError> {
        let k = ctor_args as usize;
        if k > fields.len() {
            return Err(self.unsupported(i));
        }
        if k == 0 {
            self.push_struct_defaults(fields);
            return Ok(());
        }
        self.em.reverse(k);
        self.em.push_int(k as i128);
        self.em.op(Opcode::PackStruct);
        for field in &fields[k..] {
            self.em.op(Opcode::Dup);
            self.push_default(field);
            self.em.op(Opcode::Append);
        }
        Ok(())
    }

    /// `initobj` on the slot whose address was just taken.
    pub(super) fn init_object(&mut self, i: usize, fields: &[TypeRef]) -> Result<(), CompileError> {
        let Some((kind, slot)) = self.address_of.take() else {
            return Err(self.unsupported(i));
        };
        // The address itself.
        self.em.op(Opcode::Drop);
        self.push_struct_defaults(fields);
        self.em.store(kind, slot);
        Ok(())
    }

    fn push_struct_defaults(&mut self, fields: &[TypeRef]) {
        if fields.is_empty() {
            self.em.op(Opcode::NewStruct0);
            return;
        }
        for field in fields.iter().rev() {
            self.push_default(field);
        }
        self.em.push_int(fields.len() as i128);
        self.em.op(Opcode::PackStruct);
    }

    fn push_default(&mut self, ty: &TypeRef) {
        if *ty == TypeRef::Boolean {
            self.em.push_bool(false);
        } else if ty.is_integer() {
            self.em.push_int(0);
        } else {
            self.em.op(Opcode::PushNull);
        }
    }
}

fn item_type(element: &TypeRef) -> StackItemType {
    match element {
        TypeRef::Boolean => StackItemType::Boolean,
        ty if ty.is_integer() => StackItemType::Integer,
        _ => StackItemType::Any,
    }
}

/// Byte width and signedness of array elements stored in initializer blobs.
fn element_layout(element: &TypeRef) -> Option<(usize, bool)> {
    Some(match element {
        TypeRef::Boolean | TypeRef::Byte => (1, false),
        TypeRef::SByte => (1, true),
        TypeRef::Char | TypeRef::UInt16 => (2, false),
        TypeRef::Int16 => (2, true),
        TypeRef::UInt32 => (4, false),
        TypeRef::Int32 => (4, true),
        TypeRef::UInt64 => (8, false),
        TypeRef::Int64 => (8, true),
        _ => return None,
    })
}

fn decode_element(chunk: &[u8], signed: bool) -> i128 {
    let negative = signed && chunk.last().is_some_and(|&b| b & 0x80 != 0);
    let mut buf = [if negative { 0xff } else { 0 }; 16];
    buf[..chunk.len()].copy_from_slice(chunk);
    i128::from_le_bytes(buf)
}
