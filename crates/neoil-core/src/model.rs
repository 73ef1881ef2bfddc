//! Source model: the typed, already-resolved instruction streams handed over
//! by the front-end.
//!
//! Everything here is plain data. Display names, call classification and
//! operand types are resolved before a module reaches the compiler, so the
//! backend never looks anything up by reflection.
//!
//! The model round-trips through JSON with serde so that front-ends in any
//! language can produce it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A whole compilation unit. Type order is significant: it fixes method,
/// field and event discovery order and therefore the emitted image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceModule {
    pub types: Vec<SourceType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TypeKind {
    /// Part of the exported contract surface.
    #[default]
    Contract,
    /// Library code compiled into the image but never exported.
    Helper,
    /// Compiler-generated scaffolding (closures, display classes). Skipped.
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceType {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub methods: Vec<SourceMethod>,
    #[serde(default)]
    pub fields: Vec<SourceField>,
    #[serde(default)]
    pub events: Vec<SourceEvent>,
    /// Body of the type's static constructor. Never emitted as a method; the
    /// compiler folds or relocates it.
    #[serde(default)]
    pub static_init: Vec<SourceInstruction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MethodKind {
    #[default]
    Normal,
    Constructor,
    StaticConstructor,
    /// Compiler-synthesized `add_`/`remove_` event accessors.
    EventAccessor,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceMethod {
    /// Internal name, unique across the module.
    pub name: String,
    /// Externally visible name.
    pub display_name: String,
    #[serde(default)]
    pub kind: MethodKind,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: TypeRef,
    #[serde(default)]
    pub locals: Vec<TypeRef>,
    /// Call classification for external entries. A bound method has no body
    /// of its own; callers are lowered through the binding instead.
    #[serde(default)]
    pub binding: Option<Binding>,
    #[serde(default)]
    pub body: Vec<SourceInstruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// How calls to an external method are lowered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binding {
    /// Interop service, by its dotted name (e.g. `System.Runtime.Log`).
    Syscall(String),
    /// Literal target-machine instructions spliced at the call site.
    OpCodes(Vec<RawOp>),
    /// Method of another deployed contract.
    Contract { hash: String, method: String },
}

/// One raw target instruction inside an [`Binding::OpCodes`] sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOp {
    pub opcode: u8,
    #[serde(default)]
    pub operand: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_readonly: bool,
    /// Compile-time literal (`const`); never occupies storage.
    #[serde(default)]
    pub is_literal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEvent {
    /// Name of the backing field, as referenced by `ldsfld`.
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub params: Vec<Param>,
}

/// Reference to a field of a specific type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
}

impl FieldRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Module-wide key, `Owner::name`.
    pub fn key(&self) -> String {
        format!("{}::{}", self.owner, self.name)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInstruction {
    /// Source-level address. Branch operands refer to these.
    pub offset: u32,
    pub op: Op,
}

impl SourceInstruction {
    pub fn new(offset: u32, op: Op) -> Self {
        Self { offset, op }
    }
}

/// Resolved type vocabulary of the source language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TypeRef {
    #[default]
    Void,
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    BigInteger,
    String,
    ByteArray,
    Object,
    Array(Box<TypeRef>),
    Tuple(Vec<TypeRef>),
    /// User class or struct, by name.
    Class(String),
    /// Host-provided opaque handle (iterators, storage contexts).
    Interop(String),
    /// Function or delegate type.
    Delegate(String),
}

impl TypeRef {
    pub fn array(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    /// Integral types, including `BigInteger` and `Char`.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::SByte
                | Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
                | Self::BigInteger
        )
    }

    /// Types whose boxed form is the value itself on the target machine.
    pub fn is_primitive(&self) -> bool {
        self.is_integer() || matches!(self, Self::Boolean)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(element) => write!(f, "{element}[]"),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Class(name) | Self::Interop(name) | Self::Delegate(name) => f.write_str(name),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Intrinsic calls recognized by the backend rather than compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intrinsic {
    /// Hash of a string used as the tag of a `switch` over strings.
    StringHash,
    StringEquals,
    StringConcat,
    StringLength,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Callee {
    /// A method of this module, by internal name. Bound methods are lowered
    /// through their [`Binding`].
    Method(String),
    Intrinsic(Intrinsic),
    /// `Invoke` on the event field loaded just before.
    EventInvoke,
    /// `Invoke` on a function pointer sitting below `args` arguments.
    DelegateInvoke { args: u16 },
}

/// Numeric conversion targets. Conversions never change a value's
/// representation on the target machine, except when an unsigned
/// conversion directly follows a literal and is folded into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvKind {
    I1,
    I2,
    I4,
    I8,
    U1,
    U2,
    U4,
    U8,
    I,
    U,
}

impl ConvKind {
    /// Value of a `literal_bits`-wide literal after this conversion.
    ///
    /// The literal is read as unsigned at its own width, then truncated to
    /// the target width. Signed conversions return `value` unchanged.
    pub fn reinterpret(self, value: i128, literal_bits: u32) -> i128 {
        let target_bits = match self {
            Self::U1 => 8,
            Self::U2 => 16,
            Self::U4 => 32,
            Self::U8 | Self::U => 64,
            _ => return value,
        };
        let bits = literal_bits.min(target_bits);
        value & ((1i128 << bits) - 1)
    }
}

/// Source instruction kinds.
///
/// Branch operands are source offsets. Slot operands are zero-based indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Nop,
    Pop,
    Dup,
    Ret,
    Throw,

    LdNull,
    LdcI4(i32),
    LdcI8(i64),
    LdStr(String),

    LdLoc(u16),
    StLoc(u16),
    LdLocA(u16),
    LdArg(u16),
    StArg(u16),
    LdArgA(u16),

    LdSFld(FieldRef),
    StSFld(FieldRef),
    /// Instance field by declaration index.
    LdFld(u16),
    StFld(u16),

    NewArr(TypeRef),
    /// Bulk initializer following `newarr; dup` (raw element bytes).
    InitArray(Vec<u8>),
    LdLen,
    LdElem,
    StElem,
    /// Object construction. `ctor_args` values on the stack become the
    /// leading fields; the remaining fields get default values.
    NewObj {
        fields: Vec<TypeRef>,
        ctor_args: u16,
    },
    /// Delegate construction over a preceding `ldftn`.
    NewDelegate,
    InitObj(Vec<TypeRef>),

    Br(u32),
    Leave(u32),
    BrTrue(u32),
    BrFalse(u32),
    Beq(u32),
    BneUn(u32),
    Blt(u32),
    BltUn(u32),
    Ble(u32),
    BleUn(u32),
    Bgt(u32),
    BgtUn(u32),
    Bge(u32),
    BgeUn(u32),
    Switch(Vec<u32>),

    Add,
    Sub,
    Mul,
    Div,
    DivUn,
    Rem,
    RemUn,
    Neg,
    Not,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    ShrUn,
    Ceq,
    Cgt,
    CgtUn,
    Clt,
    CltUn,
    Conv(ConvKind),

    Call(Callee),
    Ldftn(String),

    Box(TypeRef),
    Unbox(TypeRef),
    UnboxAny(TypeRef),
    IsInst(TypeRef),
    CastClass(TypeRef),

    // No sound lowering on a pointer-free target.
    Ldind,
    Stind,
    Ldelema,
    Localloc,
    Calli,
    Sizeof,
    Ldtoken,
    Ldvirtftn,
    NewMultiArray,
    Endfinally,
}

impl Op {
    /// Mnemonic in source-listing form.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Pop => "pop",
            Self::Dup => "dup",
            Self::Ret => "ret",
            Self::Throw => "throw",
            Self::LdNull => "ldnull",
            Self::LdcI4(_) => "ldc.i4",
            Self::LdcI8(_) => "ldc.i8",
            Self::LdStr(_) => "ldstr",
            Self::LdLoc(_) => "ldloc",
            Self::StLoc(_) => "stloc",
            Self::LdLocA(_) => "ldloca",
            Self::LdArg(_) => "ldarg",
            Self::StArg(_) => "starg",
            Self::LdArgA(_) => "ldarga",
            Self::LdSFld(_) => "ldsfld",
            Self::StSFld(_) => "stsfld",
            Self::LdFld(_) => "ldfld",
            Self::StFld(_) => "stfld",
            Self::NewArr(_) => "newarr",
            Self::InitArray(_) => "initarray",
            Self::LdLen => "ldlen",
            Self::LdElem => "ldelem",
            Self::StElem => "stelem",
            Self::NewObj { .. } => "newobj",
            Self::NewDelegate => "newobj.delegate",
            Self::InitObj(_) => "initobj",
            Self::Br(_) => "br",
            Self::Leave(_) => "leave",
            Self::BrTrue(_) => "brtrue",
            Self::BrFalse(_) => "brfalse",
            Self::Beq(_) => "beq",
            Self::BneUn(_) => "bne.un",
            Self::Blt(_) => "blt",
            Self::BltUn(_) => "blt.un",
            Self::Ble(_) => "ble",
            Self::BleUn(_) => "ble.un",
            Self::Bgt(_) => "bgt",
            Self::BgtUn(_) => "bgt.un",
            Self::Bge(_) => "bge",
            Self::BgeUn(_) => "bge.un",
            Self::Switch(_) => "switch",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::DivUn => "div.un",
            Self::Rem => "rem",
            Self::RemUn => "rem.un",
            Self::Neg => "neg",
            Self::Not => "not",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Shl => "shl",
            Self::Shr => "shr",
            Self::ShrUn => "shr.un",
            Self::Ceq => "ceq",
            Self::Cgt => "cgt",
            Self::CgtUn => "cgt.un",
            Self::Clt => "clt",
            Self::CltUn => "clt.un",
            Self::Conv(_) => "conv",
            Self::Call(_) => "call",
            Self::Ldftn(_) => "ldftn",
            Self::Box(_) => "box",
            Self::Unbox(_) => "unbox",
            Self::UnboxAny(_) => "unbox.any",
            Self::IsInst(_) => "isinst",
            Self::CastClass(_) => "castclass",
            Self::Ldind => "ldind",
            Self::Stind => "stind",
            Self::Ldelema => "ldelema",
            Self::Localloc => "localloc",
            Self::Calli => "calli",
            Self::Sizeof => "sizeof",
            Self::Ldtoken => "ldtoken",
            Self::Ldvirtftn => "ldvirtftn",
            Self::NewMultiArray => "newobj.mdarray",
            Self::Endfinally => "endfinally",
        }
    }

    /// Source offset this instruction may transfer control to, for
    /// single-target branches.
    pub fn branch_target(&self) -> Option<u32> {
        match *self {
            Self::Br(t)
            | Self::Leave(t)
            | Self::BrTrue(t)
            | Self::BrFalse(t)
            | Self::Beq(t)
            | Self::BneUn(t)
            | Self::Blt(t)
            | Self::BltUn(t)
            | Self::Ble(t)
            | Self::BleUn(t)
            | Self::Bgt(t)
            | Self::BgtUn(t)
            | Self::Bge(t)
            | Self::BgeUn(t) => Some(t),
            _ => None,
        }
    }

    /// Add `delta` to every branch target, including `switch` tables.
    pub fn shift_targets(&mut self, delta: u32) {
        match self {
            Self::Br(t)
            | Self::Leave(t)
            | Self::BrTrue(t)
            | Self::BrFalse(t)
            | Self::Beq(t)
            | Self::BneUn(t)
            | Self::Blt(t)
            | Self::BltUn(t)
            | Self::Ble(t)
            | Self::BleUn(t)
            | Self::Bgt(t)
            | Self::BgtUn(t)
            | Self::Bge(t)
            | Self::BgeUn(t) => *t += delta,
            Self::Switch(targets) => targets.iter_mut().for_each(|t| *t += delta),
            _ => {}
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic();
        match self {
            Self::LdcI4(v) => write!(f, "{name} {v}"),
            Self::LdcI8(v) => write!(f, "{name} {v}"),
            Self::LdStr(s) => write!(f, "{name} {s:?}"),
            Self::LdLoc(i)
            | Self::StLoc(i)
            | Self::LdLocA(i)
            | Self::LdArg(i)
            | Self::StArg(i)
            | Self::LdArgA(i)
            | Self::LdFld(i)
            | Self::StFld(i) => write!(f, "{name} {i}"),
            Self::LdSFld(field) | Self::StSFld(field) => write!(f, "{name} {field}"),
            Self::NewArr(ty)
            | Self::Box(ty)
            | Self::Unbox(ty)
            | Self::UnboxAny(ty)
            | Self::IsInst(ty)
            | Self::CastClass(ty) => write!(f, "{name} {ty}"),
            Self::Call(Callee::Method(m)) | Self::Ldftn(m) => write!(f, "{name} {m}"),
            Self::Call(Callee::Intrinsic(i)) => write!(f, "{name} {i:?}"),
            Self::Call(Callee::EventInvoke) => write!(f, "{name} event.Invoke"),
            Self::Call(Callee::DelegateInvoke { .. }) => write!(f, "{name} delegate.Invoke"),
            other => match other.branch_target() {
                Some(t) => write!(f, "{name} IL_{t:04x}"),
                None => f.write_str(name),
            },
        }
    }
}
