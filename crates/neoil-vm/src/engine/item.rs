//! Stack items.
//!
//! Compound items (buffers, arrays, structs, maps) have reference semantics:
//! `DUP` shares them and mutation through one copy is seen by all.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use neoil_bytecode::{StackItemType, int_from_bytes, int_to_bytes};

use super::error::RuntimeError;

/// Largest integer the machine accepts, in bytes.
const MAX_INT_SIZE: usize = 32;

pub type Items = Rc<RefCell<Vec<StackItem>>>;

#[derive(Debug, Clone)]
pub enum StackItem {
    Null,
    Boolean(bool),
    Integer(i128),
    ByteString(Vec<u8>),
    Buffer(Rc<RefCell<Vec<u8>>>),
    Array(Items),
    Struct(Items),
    Map(Rc<RefCell<Vec<(StackItem, StackItem)>>>),
    /// Script address pushed by `PUSHA`.
    Pointer(u32),
}

impl StackItem {
    pub fn array(items: Vec<StackItem>) -> Self {
        Self::Array(Rc::new(RefCell::new(items)))
    }

    pub fn structure(items: Vec<StackItem>) -> Self {
        Self::Struct(Rc::new(RefCell::new(items)))
    }

    pub fn buffer(bytes: Vec<u8>) -> Self {
        Self::Buffer(Rc::new(RefCell::new(bytes)))
    }

    pub fn string(s: &str) -> Self {
        Self::ByteString(s.as_bytes().to_vec())
    }

    pub fn item_type(&self) -> StackItemType {
        match self {
            Self::Null => StackItemType::Any,
            Self::Boolean(_) => StackItemType::Boolean,
            Self::Integer(_) => StackItemType::Integer,
            Self::ByteString(_) => StackItemType::ByteString,
            Self::Buffer(_) => StackItemType::Buffer,
            Self::Array(_) => StackItemType::Array,
            Self::Struct(_) => StackItemType::Struct,
            Self::Map(_) => StackItemType::Map,
            Self::Pointer(_) => StackItemType::Pointer,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Result<bool, RuntimeError> {
        Ok(match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Integer(v) => *v != 0,
            Self::ByteString(bytes) => {
                if bytes.len() > MAX_INT_SIZE {
                    return Err(self.invalid("Boolean"));
                }
                bytes.iter().any(|&b| b != 0)
            }
            _ => true,
        })
    }

    pub fn as_int(&self) -> Result<i128, RuntimeError> {
        match self {
            Self::Boolean(b) => Ok(*b as i128),
            Self::Integer(v) => Ok(*v),
            Self::ByteString(bytes) if bytes.len() <= MAX_INT_SIZE => {
                int_from_bytes(bytes).ok_or(RuntimeError::Overflow)
            }
            Self::Buffer(bytes) if bytes.borrow().len() <= MAX_INT_SIZE => {
                int_from_bytes(&bytes.borrow()).ok_or(RuntimeError::Overflow)
            }
            _ => Err(self.invalid("Integer")),
        }
    }

    /// Byte view of a primitive or buffer.
    pub fn as_bytes(&self) -> Result<Vec<u8>, RuntimeError> {
        match self {
            Self::Boolean(b) => Ok(vec![*b as u8]),
            Self::Integer(0) => Ok(Vec::new()),
            Self::Integer(v) => Ok(int_to_bytes(*v)),
            Self::ByteString(bytes) => Ok(bytes.clone()),
            Self::Buffer(bytes) => Ok(bytes.borrow().clone()),
            _ => Err(self.invalid("ByteString")),
        }
    }

    /// Bytes interpreted as UTF-8.
    pub fn as_string(&self) -> Result<String, RuntimeError> {
        String::from_utf8(self.as_bytes()?).map_err(|_| self.invalid("String"))
    }

    /// `EQUAL` semantics: primitives by value, compounds by identity.
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::ByteString(a), Self::ByteString(b)) => a == b,
            (Self::Pointer(a), Self::Pointer(b)) => a == b,
            (Self::Buffer(a), Self::Buffer(b)) => Rc::ptr_eq(a, b),
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            (Self::Struct(a), Self::Struct(b)) => {
                Rc::ptr_eq(a, b) || {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
                }
            }
            _ => false,
        }
    }

    /// `CONVERT` to `target`.
    pub fn convert(&self, target: StackItemType) -> Result<StackItem, RuntimeError> {
        if self.item_type() == target {
            return Ok(match self {
                Self::Buffer(bytes) => Self::buffer(bytes.borrow().clone()),
                other => other.clone(),
            });
        }
        Ok(match target {
            StackItemType::Any if self.is_null() => Self::Null,
            StackItemType::Boolean => Self::Boolean(self.as_bool()?),
            StackItemType::Integer => Self::Integer(self.as_int()?),
            StackItemType::ByteString => Self::ByteString(self.as_bytes()?),
            StackItemType::Buffer => Self::buffer(self.as_bytes()?),
            StackItemType::Array => match self {
                Self::Struct(items) => Self::array(items.borrow().clone()),
                _ => return Err(self.invalid(target.name())),
            },
            StackItemType::Struct => match self {
                Self::Array(items) => Self::structure(items.borrow().clone()),
                _ => return Err(self.invalid(target.name())),
            },
            _ => return Err(self.invalid(target.name())),
        })
    }

    pub(crate) fn invalid(&self, expected: &'static str) -> RuntimeError {
        RuntimeError::InvalidType {
            expected,
            found: self.item_type().name(),
        }
    }
}

/// Structural equality, for inspecting results.
impl PartialEq for StackItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::ByteString(a), Self::ByteString(b)) => a == b,
            (Self::Pointer(a), Self::Pointer(b)) => a == b,
            (Self::Buffer(a), Self::Buffer(b)) => *a.borrow() == *b.borrow(),
            (Self::Array(a), Self::Array(b)) | (Self::Struct(a), Self::Struct(b)) => {
                *a.borrow() == *b.borrow()
            }
            (Self::Map(a), Self::Map(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl fmt::Display for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::ByteString(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => write!(f, "{s:?}"),
                Err(_) => write_hex(f, bytes),
            },
            Self::Buffer(bytes) => {
                f.write_str("buffer:")?;
                write_hex(f, &bytes.borrow())
            }
            Self::Array(items) => write_items(f, "[", &items.borrow(), "]"),
            Self::Struct(items) => write_items(f, "{", &items.borrow(), "}"),
            Self::Map(entries) => {
                f.write_str("map{")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Pointer(addr) => write!(f, "&{addr:04}"),
        }
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("0x")?;
    bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
}

fn write_items(f: &mut fmt::Formatter<'_>, open: &str, items: &[StackItem], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

impl From<i128> for StackItem {
    fn from(v: i128) -> Self {
        Self::Integer(v)
    }
}

impl From<bool> for StackItem {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for StackItem {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}
