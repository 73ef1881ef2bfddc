//! Target machine opcodes.
//!
//! Numbering follows the NeoVM 3 instruction set. Every opcode has a fixed
//! operand shape: no operand, a fixed number of bytes, or a little-endian
//! length prefix followed by that many data bytes.

/// Operand layout of an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    None,
    /// Exactly `n` bytes.
    Fixed(usize),
    /// A little-endian length of `n` bytes, then the data.
    Prefixed(usize),
}

macro_rules! opcodes {
    ($($variant:ident = $byte:literal, $name:literal, $operand:expr;)*) => {
        /// Instruction opcode.
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        #[repr(u8)]
        pub enum Opcode {
            $($variant = $byte,)*
        }

        impl Opcode {
            pub fn from_u8(v: u8) -> Option<Self> {
                match v {
                    $($byte => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Assembly mnemonic.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            pub fn operand(self) -> Operand {
                match self {
                    $(Self::$variant => $operand,)*
                }
            }
        }
    };
}

use Operand::{Fixed, None as Bare, Prefixed};

opcodes! {
    PushInt8 = 0x00, "PUSHINT8", Fixed(1);
    PushInt16 = 0x01, "PUSHINT16", Fixed(2);
    PushInt32 = 0x02, "PUSHINT32", Fixed(4);
    PushInt64 = 0x03, "PUSHINT64", Fixed(8);
    PushInt128 = 0x04, "PUSHINT128", Fixed(16);
    PushInt256 = 0x05, "PUSHINT256", Fixed(32);
    PushT = 0x08, "PUSHT", Bare;
    PushF = 0x09, "PUSHF", Bare;
    PushA = 0x0A, "PUSHA", Fixed(4);
    PushNull = 0x0B, "PUSHNULL", Bare;
    PushData1 = 0x0C, "PUSHDATA1", Prefixed(1);
    PushData2 = 0x0D, "PUSHDATA2", Prefixed(2);
    PushData4 = 0x0E, "PUSHDATA4", Prefixed(4);
    PushM1 = 0x0F, "PUSHM1", Bare;
    Push0 = 0x10, "PUSH0", Bare;
    Push1 = 0x11, "PUSH1", Bare;
    Push2 = 0x12, "PUSH2", Bare;
    Push3 = 0x13, "PUSH3", Bare;
    Push4 = 0x14, "PUSH4", Bare;
    Push5 = 0x15, "PUSH5", Bare;
    Push6 = 0x16, "PUSH6", Bare;
    Push7 = 0x17, "PUSH7", Bare;
    Push8 = 0x18, "PUSH8", Bare;
    Push9 = 0x19, "PUSH9", Bare;
    Push10 = 0x1A, "PUSH10", Bare;
    Push11 = 0x1B, "PUSH11", Bare;
    Push12 = 0x1C, "PUSH12", Bare;
    Push13 = 0x1D, "PUSH13", Bare;
    Push14 = 0x1E, "PUSH14", Bare;
    Push15 = 0x1F, "PUSH15", Bare;
    Push16 = 0x20, "PUSH16", Bare;

    Nop = 0x21, "NOP", Bare;
    Jmp = 0x22, "JMP", Fixed(1);
    JmpL = 0x23, "JMP_L", Fixed(4);
    JmpIf = 0x24, "JMPIF", Fixed(1);
    JmpIfL = 0x25, "JMPIF_L", Fixed(4);
    JmpIfNot = 0x26, "JMPIFNOT", Fixed(1);
    JmpIfNotL = 0x27, "JMPIFNOT_L", Fixed(4);
    JmpEq = 0x28, "JMPEQ", Fixed(1);
    JmpEqL = 0x29, "JMPEQ_L", Fixed(4);
    JmpNe = 0x2A, "JMPNE", Fixed(1);
    JmpNeL = 0x2B, "JMPNE_L", Fixed(4);
    JmpGt = 0x2C, "JMPGT", Fixed(1);
    JmpGtL = 0x2D, "JMPGT_L", Fixed(4);
    JmpGe = 0x2E, "JMPGE", Fixed(1);
    JmpGeL = 0x2F, "JMPGE_L", Fixed(4);
    JmpLt = 0x30, "JMPLT", Fixed(1);
    JmpLtL = 0x31, "JMPLT_L", Fixed(4);
    JmpLe = 0x32, "JMPLE", Fixed(1);
    JmpLeL = 0x33, "JMPLE_L", Fixed(4);
    Call = 0x34, "CALL", Fixed(1);
    CallL = 0x35, "CALL_L", Fixed(4);
    CallA = 0x36, "CALLA", Bare;
    CallT = 0x37, "CALLT", Fixed(2);
    Abort = 0x38, "ABORT", Bare;
    Assert = 0x39, "ASSERT", Bare;
    Throw = 0x3A, "THROW", Bare;
    Try = 0x3B, "TRY", Fixed(2);
    TryL = 0x3C, "TRY_L", Fixed(8);
    EndTry = 0x3D, "ENDTRY", Fixed(1);
    EndTryL = 0x3E, "ENDTRY_L", Fixed(4);
    EndFinally = 0x3F, "ENDFINALLY", Bare;
    Ret = 0x40, "RET", Bare;
    Syscall = 0x41, "SYSCALL", Fixed(4);

    Depth = 0x43, "DEPTH", Bare;
    Drop = 0x45, "DROP", Bare;
    Nip = 0x46, "NIP", Bare;
    XDrop = 0x48, "XDROP", Bare;
    Clear = 0x49, "CLEAR", Bare;
    Dup = 0x4A, "DUP", Bare;
    Over = 0x4B, "OVER", Bare;
    Pick = 0x4D, "PICK", Bare;
    Tuck = 0x4E, "TUCK", Bare;
    Swap = 0x50, "SWAP", Bare;
    Rot = 0x51, "ROT", Bare;
    Roll = 0x52, "ROLL", Bare;
    Reverse3 = 0x53, "REVERSE3", Bare;
    Reverse4 = 0x54, "REVERSE4", Bare;
    ReverseN = 0x55, "REVERSEN", Bare;

    InitSSlot = 0x56, "INITSSLOT", Fixed(1);
    InitSlot = 0x57, "INITSLOT", Fixed(2);
    LdSFld0 = 0x58, "LDSFLD0", Bare;
    LdSFld1 = 0x59, "LDSFLD1", Bare;
    LdSFld2 = 0x5A, "LDSFLD2", Bare;
    LdSFld3 = 0x5B, "LDSFLD3", Bare;
    LdSFld4 = 0x5C, "LDSFLD4", Bare;
    LdSFld5 = 0x5D, "LDSFLD5", Bare;
    LdSFld6 = 0x5E, "LDSFLD6", Bare;
    LdSFld = 0x5F, "LDSFLD", Fixed(1);
    StSFld0 = 0x60, "STSFLD0", Bare;
    StSFld1 = 0x61, "STSFLD1", Bare;
    StSFld2 = 0x62, "STSFLD2", Bare;
    StSFld3 = 0x63, "STSFLD3", Bare;
    StSFld4 = 0x64, "STSFLD4", Bare;
    StSFld5 = 0x65, "STSFLD5", Bare;
    StSFld6 = 0x66, "STSFLD6", Bare;
    StSFld = 0x67, "STSFLD", Fixed(1);
    LdLoc0 = 0x68, "LDLOC0", Bare;
    LdLoc1 = 0x69, "LDLOC1", Bare;
    LdLoc2 = 0x6A, "LDLOC2", Bare;
    LdLoc3 = 0x6B, "LDLOC3", Bare;
    LdLoc4 = 0x6C, "LDLOC4", Bare;
    LdLoc5 = 0x6D, "LDLOC5", Bare;
    LdLoc6 = 0x6E, "LDLOC6", Bare;
    LdLoc = 0x6F, "LDLOC", Fixed(1);
    StLoc0 = 0x70, "STLOC0", Bare;
    StLoc1 = 0x71, "STLOC1", Bare;
    StLoc2 = 0x72, "STLOC2", Bare;
    StLoc3 = 0x73, "STLOC3", Bare;
    StLoc4 = 0x74, "STLOC4", Bare;
    StLoc5 = 0x75, "STLOC5", Bare;
    StLoc6 = 0x76, "STLOC6", Bare;
    StLoc = 0x77, "STLOC", Fixed(1);
    LdArg0 = 0x78, "LDARG0", Bare;
    LdArg1 = 0x79, "LDARG1", Bare;
    LdArg2 = 0x7A, "LDARG2", Bare;
    LdArg3 = 0x7B, "LDARG3", Bare;
    LdArg4 = 0x7C, "LDARG4", Bare;
    LdArg5 = 0x7D, "LDARG5", Bare;
    LdArg6 = 0x7E, "LDARG6", Bare;
    LdArg = 0x7F, "LDARG", Fixed(1);
    StArg0 = 0x80, "STARG0", Bare;
    StArg1 = 0x81, "STARG1", Bare;
    StArg2 = 0x82, "STARG2", Bare;
    StArg3 = 0x83, "STARG3", Bare;
    StArg4 = 0x84, "STARG4", Bare;
    StArg5 = 0x85, "STARG5", Bare;
    StArg6 = 0x86, "STARG6", Bare;
    StArg = 0x87, "STARG", Fixed(1);

    NewBuffer = 0x88, "NEWBUFFER", Bare;
    MemCpy = 0x89, "MEMCPY", Bare;
    Cat = 0x8B, "CAT", Bare;
    Substr = 0x8C, "SUBSTR", Bare;
    Left = 0x8D, "LEFT", Bare;
    Right = 0x8E, "RIGHT", Bare;

    Invert = 0x90, "INVERT", Bare;
    And = 0x91, "AND", Bare;
    Or = 0x92, "OR", Bare;
    Xor = 0x93, "XOR", Bare;
    Equal = 0x97, "EQUAL", Bare;
    NotEqual = 0x98, "NOTEQUAL", Bare;

    Sign = 0x99, "SIGN", Bare;
    Abs = 0x9A, "ABS", Bare;
    Negate = 0x9B, "NEGATE", Bare;
    Inc = 0x9C, "INC", Bare;
    Dec = 0x9D, "DEC", Bare;
    Add = 0x9E, "ADD", Bare;
    Sub = 0x9F, "SUB", Bare;
    Mul = 0xA0, "MUL", Bare;
    Div = 0xA1, "DIV", Bare;
    Mod = 0xA2, "MOD", Bare;
    Pow = 0xA3, "POW", Bare;
    Sqrt = 0xA4, "SQRT", Bare;
    ModMul = 0xA5, "MODMUL", Bare;
    ModPow = 0xA6, "MODPOW", Bare;
    Shl = 0xA8, "SHL", Bare;
    Shr = 0xA9, "SHR", Bare;
    Not = 0xAA, "NOT", Bare;
    BoolAnd = 0xAB, "BOOLAND", Bare;
    BoolOr = 0xAC, "BOOLOR", Bare;
    Nz = 0xB1, "NZ", Bare;
    NumEqual = 0xB3, "NUMEQUAL", Bare;
    NumNotEqual = 0xB4, "NUMNOTEQUAL", Bare;
    Lt = 0xB5, "LT", Bare;
    Le = 0xB6, "LE", Bare;
    Gt = 0xB7, "GT", Bare;
    Ge = 0xB8, "GE", Bare;
    Min = 0xB9, "MIN", Bare;
    Max = 0xBA, "MAX", Bare;
    Within = 0xBB, "WITHIN", Bare;

    PackMap = 0xBE, "PACKMAP", Bare;
    PackStruct = 0xBF, "PACKSTRUCT", Bare;
    Pack = 0xC0, "PACK", Bare;
    Unpack = 0xC1, "UNPACK", Bare;
    NewArray0 = 0xC2, "NEWARRAY0", Bare;
    NewArray = 0xC3, "NEWARRAY", Bare;
    NewArrayT = 0xC4, "NEWARRAY_T", Fixed(1);
    NewStruct0 = 0xC5, "NEWSTRUCT0", Bare;
    NewStruct = 0xC6, "NEWSTRUCT", Bare;
    NewMap = 0xC8, "NEWMAP", Bare;
    Size = 0xCA, "SIZE", Bare;
    HasKey = 0xCB, "HASKEY", Bare;
    Keys = 0xCC, "KEYS", Bare;
    Values = 0xCD, "VALUES", Bare;
    PickItem = 0xCE, "PICKITEM", Bare;
    Append = 0xCF, "APPEND", Bare;
    SetItem = 0xD0, "SETITEM", Bare;
    ReverseItems = 0xD1, "REVERSEITEMS", Bare;
    Remove = 0xD2, "REMOVE", Bare;
    ClearItems = 0xD3, "CLEARITEMS", Bare;
    PopItem = 0xD4, "POPITEM", Bare;

    IsNull = 0xD8, "ISNULL", Bare;
    IsType = 0xD9, "ISTYPE", Fixed(1);
    Convert = 0xDB, "CONVERT", Fixed(1);

    AbortMsg = 0xE0, "ABORTMSG", Bare;
    AssertMsg = 0xE1, "ASSERTMSG", Bare;
}

impl Opcode {
    /// Dedicated single-byte push for `-1..=16`.
    pub fn small_int(value: i128) -> Option<Self> {
        match value {
            -1 => Some(Self::PushM1),
            0..=16 => Self::from_u8(Self::Push0 as u8 + value as u8),
            _ => None,
        }
    }

    /// Value pushed by `PUSHM1` and `PUSH0..PUSH16`.
    pub fn small_int_value(self) -> Option<i128> {
        let byte = self as u8;
        match self {
            Self::PushM1 => Some(-1),
            _ if (Self::Push0 as u8..=Self::Push16 as u8).contains(&byte) => {
                Some((byte - Self::Push0 as u8) as i128)
            }
            _ => None,
        }
    }

    /// Whether the operand is a signed displacement relative to the
    /// instruction's own address.
    pub fn is_relative(self) -> bool {
        matches!(
            self,
            Self::Jmp
                | Self::JmpL
                | Self::JmpIf
                | Self::JmpIfL
                | Self::JmpIfNot
                | Self::JmpIfNotL
                | Self::JmpEq
                | Self::JmpEqL
                | Self::JmpNe
                | Self::JmpNeL
                | Self::JmpGt
                | Self::JmpGtL
                | Self::JmpGe
                | Self::JmpGeL
                | Self::JmpLt
                | Self::JmpLtL
                | Self::JmpLe
                | Self::JmpLeL
                | Self::Call
                | Self::CallL
                | Self::PushA
                | Self::EndTry
                | Self::EndTryL
        )
    }

    /// Control never falls through to the next instruction.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Self::Ret | Self::Throw | Self::Abort | Self::AbortMsg | Self::Jmp | Self::JmpL
        )
    }

    /// Size of an instruction with this opcode and a `data_len`-byte payload.
    pub fn encoded_size(self, data_len: usize) -> usize {
        match self.operand() {
            Operand::None => 1,
            Operand::Fixed(n) => 1 + n,
            Operand::Prefixed(n) => 1 + n + data_len,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
