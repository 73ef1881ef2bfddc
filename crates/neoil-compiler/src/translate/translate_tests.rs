use indoc::indoc;
use neoil_bytecode::Opcode;
use neoil_core::{
    Binding, Callee, ConvKind, FieldRef, Intrinsic, MethodKind, Op, RawOp, SourceEvent, SourceMethod,
    TypeRef,
};

use crate::error::CompileError;
use crate::test_utils::{
    compile_err, contract_type, listing_of, listing_with, method, string_switch_method, with_locals,
};

use neoil_core::TypeRef::{Boolean, Int32, String as Str};

fn call(name: &str) -> Op {
    Op::Call(Callee::Method(name.to_string()))
}

fn intrinsic(i: Intrinsic) -> Op {
    Op::Call(Callee::Intrinsic(i))
}

/// Helper-side method with a call binding and no body.
fn bound(name: &str, params: &[(&str, TypeRef)], binding: Binding) -> SourceMethod {
    SourceMethod {
        binding: Some(binding),
        ..method(name, name, params, TypeRef::Void, vec![])
    }
}

#[test]
fn arguments_and_arithmetic() {
    let m = method(
        "C::Add",
        "add",
        &[("a", Int32), ("b", Int32)],
        Int32,
        vec![Op::LdArg(0), Op::LdArg(1), Op::Add, Op::Ret],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Add:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  ADD
      0006  RET
    ");
}

#[test]
fn integers_use_shortest_push() {
    let m = method(
        "C::Consts",
        "consts",
        &[],
        TypeRef::Void,
        vec![
            Op::LdcI4(-1),
            Op::LdcI4(16),
            Op::LdcI4(17),
            Op::LdcI4(-129),
            Op::LdcI8(1 << 40),
            Op::Ret,
        ],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Consts:
      0000  PUSHM1
      0001  PUSH16
      0002  PUSHINT8 17
      0004  PUSHINT16 -129
      0007  PUSHINT64 1099511627776
      0016  RET
    ");
}

#[test]
fn conditional_branch() {
    let m = method(
        "C::Max",
        "max",
        &[("a", Int32), ("b", Int32)],
        Int32,
        vec![
            Op::LdArg(0),
            Op::LdArg(1),
            Op::Bgt(5),
            Op::LdArg(1),
            Op::Ret,
            Op::LdArg(0),
            Op::Ret,
        ],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Max:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  GT
      0006  JMPIF_L 0013
      0011  LDARG1
      0012  RET
      0013  LDARG0
      0014  RET
    ");
}

#[test]
fn negated_equality_folds_into_one_instruction() {
    let m = method(
        "C::Ne",
        "ne",
        &[("a", Int32), ("b", Int32)],
        Boolean,
        vec![Op::LdArg(0), Op::LdArg(1), Op::Ceq, Op::LdcI4(0), Op::Ceq, Op::Ret],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Ne:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  NUMNOTEQUAL
      0006  RET
    ");
}

#[test]
fn negation_is_not_folded_across_a_branch_target() {
    // IL_0003 is a branch target, so `ldc.i4 0; ceq` stays separate.
    let m = method(
        "C::Ne",
        "ne",
        &[("a", Int32), ("b", Int32)],
        Boolean,
        vec![Op::LdArg(0), Op::LdArg(1), Op::Ceq, Op::LdcI4(0), Op::Ceq, Op::Ret, Op::Br(3)],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Ne:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  NUMEQUAL
      0006  PUSH0
      0007  NUMEQUAL
      0008  RET
      0009  JMP_L 0006
    ");
}

#[test]
fn comparison_with_null_uses_reference_equality() {
    let m = method(
        "C::IsNull",
        "isNull",
        &[("x", Str)],
        Boolean,
        vec![Op::LdArg(0), Op::LdNull, Op::Ceq, Op::Ret],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::IsNull:
      0000  INITSLOT 0 1
      0003  LDARG0
      0004  PUSHNULL
      0005  EQUAL
      0006  RET
    ");
}

#[test]
fn unsigned_comparison_compares_magnitudes() {
    let m = method(
        "C::Below",
        "below",
        &[("a", TypeRef::UInt32), ("b", TypeRef::UInt32)],
        Boolean,
        vec![Op::LdArg(0), Op::LdArg(1), Op::CltUn, Op::Ret],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Below:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  ABS
      0006  SWAP
      0007  ABS
      0008  SWAP
      0009  LT
      0010  RET
    ");
}

#[test]
fn unsigned_greater_than_compares_magnitudes() {
    let m = method(
        "C::Above",
        "above",
        &[("a", TypeRef::UInt32), ("b", TypeRef::UInt32)],
        Boolean,
        vec![Op::LdArg(0), Op::LdArg(1), Op::CgtUn, Op::Ret],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Above:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  ABS
      0006  SWAP
      0007  ABS
      0008  SWAP
      0009  GT
      0010  RET
    ");
}

#[test]
fn unsigned_branches_compare_magnitudes() {
    let m = method(
        "C::Order",
        "order",
        &[("a", TypeRef::UInt32), ("b", TypeRef::UInt32)],
        Int32,
        vec![
            Op::LdArg(0),
            Op::LdArg(1),
            Op::BltUn(12),
            Op::LdArg(0),
            Op::LdArg(1),
            Op::BleUn(12),
            Op::LdArg(0),
            Op::LdArg(1),
            Op::BgtUn(12),
            Op::LdArg(0),
            Op::LdArg(1),
            Op::BgeUn(12),
            Op::LdcI4(1),
            Op::Ret,
        ],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Order:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  ABS
      0006  SWAP
      0007  ABS
      0008  SWAP
      0009  LT
      0010  JMPIF_L 0051
      0015  LDARG0
      0016  LDARG1
      0017  ABS
      0018  SWAP
      0019  ABS
      0020  SWAP
      0021  LE
      0022  JMPIF_L 0051
      0027  LDARG0
      0028  LDARG1
      0029  ABS
      0030  SWAP
      0031  ABS
      0032  SWAP
      0033  GT
      0034  JMPIF_L 0051
      0039  LDARG0
      0040  LDARG1
      0041  ABS
      0042  SWAP
      0043  ABS
      0044  SWAP
      0045  GE
      0046  JMPIF_L 0051
      0051  PUSH1
      0052  RET
    ");
}

#[test]
fn unsigned_inequality_branch_compares_values() {
    let m = method(
        "C::Differs",
        "differs",
        &[("a", TypeRef::UInt32), ("b", TypeRef::UInt32)],
        Int32,
        vec![
            Op::LdArg(0),
            Op::LdArg(1),
            Op::BneUn(5),
            Op::LdcI4(0),
            Op::Ret,
            Op::LdcI4(1),
            Op::Ret,
        ],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Differs:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  NUMNOTEQUAL
      0006  JMPIF_L 0013
      0011  PUSH0
      0012  RET
      0013  PUSH1
      0014  RET
    ");
}

#[test]
fn unsigned_conversion_folds_into_literal() {
    let m = method(
        "C::Mask",
        "mask",
        &[],
        TypeRef::UInt64,
        vec![Op::LdcI4(-1), Op::Conv(ConvKind::U8), Op::Ret],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Mask:
      0000  PUSHINT64 4294967295
      0009  RET
    ");
}

#[test]
fn conversion_at_branch_target_is_not_folded() {
    let m = method(
        "C::Mask",
        "mask",
        &[],
        Int32,
        vec![Op::LdcI4(-1), Op::Conv(ConvKind::U1), Op::Ret, Op::Br(1)],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Mask:
      0000  PUSHM1
      0001  RET
      0002  JMP_L 0001
    ");
}

#[test]
fn switch_becomes_equality_chain() {
    let m = method(
        "C::Pick",
        "pick",
        &[("x", Int32)],
        Int32,
        vec![
            Op::LdArg(0),
            Op::Switch(vec![4, 6]),
            Op::LdcI4(0),
            Op::Ret,
            Op::LdcI4(10),
            Op::Ret,
            Op::LdcI4(20),
            Op::Ret,
        ],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Pick:
      0000  INITSLOT 0 1
      0003  LDARG0
      0004  DUP
      0005  PUSH0
      0006  NUMEQUAL
      0007  JMPIFNOT_L 0018
      0012  DROP
      0013  JMP_L 0035
      0018  DUP
      0019  PUSH1
      0020  NUMEQUAL
      0021  JMPIFNOT_L 0032
      0026  DROP
      0027  JMP_L 0037
      0032  DROP
      0033  PUSH0
      0034  RET
      0035  PUSH10
      0036  RET
      0037  PUSHINT8 20
      0039  RET
    ");
}

#[test]
fn falling_off_the_end_appends_ret() {
    let m = method("C::F", "f", &[], TypeRef::Void, vec![Op::LdcI4(1), Op::Pop]);

    insta::assert_snapshot!(listing_of(m), @r"
    C::F:
      0000  PUSH1
      0001  DROP
      0002  RET
    ");
}

#[test]
fn call_reverses_arguments() {
    let types = vec![contract_type(
        "C",
        vec![
            method("C::Main", "main", &[], Int32, vec![Op::LdcI4(2), Op::LdcI4(3), call("C::Sub"), Op::Ret]),
            method(
                "C::Sub",
                "sub",
                &[("a", Int32), ("b", Int32)],
                Int32,
                vec![Op::LdArg(0), Op::LdArg(1), Op::Sub, Op::Ret],
            ),
        ],
    )];

    insta::assert_snapshot!(listing_with(types), @r"
    C::Main:
      0000  PUSH2
      0001  PUSH3
      0002  SWAP
      0003  CALL_L 0009 <C::Sub>
      0008  RET
    C::Sub:
      0009  INITSLOT 0 2
      0012  LDARG0
      0013  LDARG1
      0014  SUB
      0015  RET
    ");
}

#[test]
fn syscall_binding() {
    let runtime = neoil_core::SourceType {
        name: "Runtime".to_string(),
        kind: neoil_core::TypeKind::Helper,
        methods: vec![bound(
            "Runtime::Log",
            &[("message", Str)],
            Binding::Syscall("System.Runtime.Log".to_string()),
        )],
        ..Default::default()
    };
    let types = vec![
        runtime,
        contract_type(
            "C",
            vec![method("C::Hello", "hello", &[], TypeRef::Void, vec![
                Op::LdStr("hi".to_string()),
                call("Runtime::Log"),
                Op::Ret,
            ])],
        ),
    ];

    insta::assert_snapshot!(listing_with(types), @r#"
    C::Hello:
      0000  PUSHDATA1 "hi"
      0004  SYSCALL System.Runtime.Log
      0009  RET
    "#);
}

#[test]
fn opcode_binding_is_spliced() {
    let sqrt = bound(
        "Math::Sqrt",
        &[("x", Int32)],
        Binding::OpCodes(vec![RawOp {
            opcode: Opcode::Sqrt as u8,
            operand: vec![],
        }]),
    );
    let types = vec![contract_type(
        "C",
        vec![
            sqrt,
            method("C::Root", "root", &[("x", Int32)], Int32, vec![Op::LdArg(0), call("Math::Sqrt"), Op::Ret]),
        ],
    )];

    insta::assert_snapshot!(listing_with(types), @r"
    C::Root:
      0000  INITSLOT 0 1
      0003  LDARG0
      0004  SQRT
      0005  RET
    ");
}

#[test]
fn opcode_binding_with_malformed_operand_is_rejected() {
    let bad = bound(
        "Math::Bad",
        &[],
        Binding::OpCodes(vec![RawOp {
            opcode: Opcode::PushInt8 as u8,
            operand: vec![],
        }]),
    );
    let types = vec![contract_type(
        "C",
        vec![bad, method("C::Run", "run", &[], TypeRef::Void, vec![call("Math::Bad"), Op::Ret])],
    )];

    assert_eq!(
        compile_err(types),
        CompileError::UnsupportedCall {
            method: "C::Run".to_string(),
            offset: 0,
            callee: "Math::Bad".to_string(),
            reason: "malformed operand for PUSHINT8".to_string(),
        }
    );
}

#[test]
fn contract_binding_packs_arguments() {
    let transfer = bound(
        "Token::Transfer",
        &[("to", Str), ("amount", Int32)],
        Binding::Contract {
            hash: "0x00000000000000000000000000000000000000ff".to_string(),
            method: "transfer".to_string(),
        },
    );
    let types = vec![contract_type(
        "C",
        vec![
            transfer,
            method(
                "C::Pay",
                "pay",
                &[("to", Str), ("amount", Int32)],
                TypeRef::Void,
                vec![Op::LdArg(0), Op::LdArg(1), call("Token::Transfer"), Op::Ret],
            ),
        ],
    )];

    insta::assert_snapshot!(listing_with(types), @r#"
    C::Pay:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  SWAP
      0006  PUSH2
      0007  PACK
      0008  PUSH15
      0009  PUSHDATA1 "transfer"
      0019  PUSHDATA1 0xff00000000000000000000000000000000000000
      0041  SYSCALL System.Contract.Call
      0046  RET
    "#);
}

#[test]
fn contract_binding_with_bad_hash_is_rejected() {
    let broken = bound(
        "Token::Broken",
        &[],
        Binding::Contract {
            hash: "0x1234".to_string(),
            method: "x".to_string(),
        },
    );
    let types = vec![contract_type(
        "C",
        vec![broken, method("C::Run", "run", &[], TypeRef::Void, vec![call("Token::Broken"), Op::Ret])],
    )];

    let err = compile_err(types);
    assert!(
        matches!(&err, CompileError::UnsupportedCall { reason, .. } if reason.starts_with("bad contract hash")),
        "{err}"
    );
}

#[test]
fn call_to_unknown_method_is_rejected() {
    let types = vec![contract_type(
        "C",
        vec![method("C::Run", "run", &[], TypeRef::Void, vec![Op::Nop, call("C::Gone"), Op::Ret])],
    )];

    assert_eq!(
        compile_err(types),
        CompileError::UnsupportedCall {
            method: "C::Run".to_string(),
            offset: 1,
            callee: "C::Gone".to_string(),
            reason: "unknown method".to_string(),
        }
    );
}

#[test]
fn call_to_constructor_is_rejected() {
    let ctor = SourceMethod {
        kind: MethodKind::Constructor,
        ..method("C::.ctor", ".ctor", &[], TypeRef::Void, vec![Op::Ret])
    };
    let types = vec![contract_type(
        "C",
        vec![ctor, method("C::Run", "run", &[], TypeRef::Void, vec![call("C::.ctor"), Op::Ret])],
    )];

    let err = compile_err(types);
    assert!(matches!(err, CompileError::UnsupportedCall { ref callee, .. } if callee == "C::.ctor"));
}

#[test]
fn unsupported_instruction_names_offset() {
    let types = vec![contract_type(
        "C",
        vec![method("C::Bad", "bad", &[], TypeRef::Void, vec![Op::Nop, Op::Ldind, Op::Ret])],
    )];

    let err = compile_err(types);

    assert_eq!(
        err,
        CompileError::UnsupportedInstruction {
            method: "C::Bad".to_string(),
            offset: 1,
            instruction: "ldind".to_string(),
        }
    );
    assert_eq!(err.to_string(), "unsupported instruction `ldind` at IL_0001 in C::Bad");
}

#[test]
fn reference_types_cannot_be_boxed() {
    let types = vec![contract_type(
        "C",
        vec![method("C::Bad", "bad", &[], TypeRef::Void, vec![
            Op::LdNull,
            Op::Box(TypeRef::Class("P".to_string())),
            Op::Ret,
        ])],
    )];

    assert!(matches!(
        compile_err(types),
        CompileError::UnsupportedInstruction { offset: 1, .. }
    ));
}

#[test]
fn local_out_of_range_is_a_consistency_error() {
    let types = vec![contract_type(
        "C",
        vec![method("C::Bad", "bad", &[], TypeRef::Void, vec![Op::LdLoc(0), Op::Ret])],
    )];

    assert_eq!(
        compile_err(types),
        CompileError::Consistency {
            method: "C::Bad".to_string(),
            detail: "local 0 out of range at IL_0000 (0 declared)".to_string(),
        }
    );
}

#[test]
fn string_intrinsics() {
    let m = method(
        "C::Len",
        "len",
        &[("a", Str), ("b", Str)],
        Int32,
        vec![
            Op::LdArg(0),
            Op::LdArg(1),
            intrinsic(Intrinsic::StringConcat),
            intrinsic(Intrinsic::StringLength),
            Op::Ret,
        ],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Len:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  CAT
      0006  CONVERT ByteString
      0008  SIZE
      0009  RET
    ");
}

#[test]
fn array_initializers_become_literals() {
    let m = method(
        "C::Arrays",
        "arrays",
        &[],
        TypeRef::Void,
        vec![
            Op::LdcI4(3),
            Op::NewArr(TypeRef::Byte),
            Op::Dup,
            Op::InitArray(vec![1, 2, 3]),
            Op::Pop,
            Op::LdcI4(2),
            Op::NewArr(Int32),
            Op::Dup,
            Op::InitArray(vec![5, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]),
            Op::Pop,
            Op::Ret,
        ],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Arrays:
      0000  PUSH3
      0001  DROP
      0002  PUSHDATA1 0x010203
      0007  CONVERT Buffer
      0009  DROP
      0010  PUSH2
      0011  DROP
      0012  PUSHM1
      0013  PUSH5
      0014  PUSH2
      0015  PACK
      0016  DROP
      0017  RET
    ");
}

#[test]
fn plain_arrays() {
    let m = method(
        "C::Alloc",
        "alloc",
        &[],
        TypeRef::Void,
        vec![
            Op::LdcI4(4),
            Op::NewArr(Int32),
            Op::Pop,
            Op::LdcI4(4),
            Op::NewArr(TypeRef::Byte),
            Op::Pop,
            Op::LdcI4(1),
            Op::NewArr(Str),
            Op::Ret,
        ],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Alloc:
      0000  PUSH4
      0001  NEWARRAY_T Integer
      0003  DROP
      0004  PUSH4
      0005  NEWBUFFER
      0006  DROP
      0007  PUSH1
      0008  NEWARRAY_T Any
      0010  RET
    ");
}

#[test]
fn struct_construction_fills_defaults() {
    let m = method(
        "C::Make",
        "make",
        &[("x", Int32)],
        TypeRef::Class("P".to_string()),
        vec![
            Op::LdArg(0),
            Op::NewObj {
                fields: vec![Int32, Boolean, Str],
                ctor_args: 1,
            },
            Op::Ret,
        ],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Make:
      0000  INITSLOT 0 1
      0003  LDARG0
      0004  PUSH1
      0005  PACKSTRUCT
      0006  DUP
      0007  PUSHF
      0008  APPEND
      0009  DUP
      0010  PUSHNULL
      0011  APPEND
      0012  RET
    ");
}

#[test]
fn initobj_and_field_access() {
    let m = with_locals(
        method(
            "C::Point",
            "point",
            &[],
            Int32,
            vec![
                Op::LdLocA(0),
                Op::InitObj(vec![Int32, Int32]),
                Op::LdLoc(0),
                Op::LdcI4(5),
                Op::StFld(1),
                Op::LdLoc(0),
                Op::LdFld(1),
                Op::Ret,
            ],
        ),
        vec![TypeRef::Class("P".to_string())],
    );

    insta::assert_snapshot!(listing_of(m), @r"
    C::Point:
      0000  INITSLOT 1 0
      0003  LDLOC0
      0004  DROP
      0005  PUSH0
      0006  PUSH0
      0007  PUSH2
      0008  PACKSTRUCT
      0009  STLOC0
      0010  LDLOC0
      0011  PUSH5
      0012  PUSH1
      0013  SWAP
      0014  SETITEM
      0015  LDLOC0
      0016  PUSH1
      0017  PICKITEM
      0018  RET
    ");
}

#[test]
fn initobj_without_address_is_rejected() {
    let types = vec![contract_type(
        "C",
        vec![method("C::Bad", "bad", &[], TypeRef::Void, vec![Op::LdNull, Op::InitObj(vec![]), Op::Ret])],
    )];

    assert!(matches!(
        compile_err(types),
        CompileError::UnsupportedInstruction { offset: 1, .. }
    ));
}

#[test]
fn delegate_becomes_function_address() {
    let double = SourceMethod {
        is_public: false,
        ..method("C::Double", "double", &[("v", Int32)], Int32, vec![Op::LdArg(0), Op::LdArg(0), Op::Add, Op::Ret])
    };
    let types = vec![contract_type(
        "C",
        vec![
            method(
                "C::Apply",
                "apply",
                &[("x", Int32)],
                Int32,
                vec![
                    Op::LdNull,
                    Op::Ldftn("C::Double".to_string()),
                    Op::NewDelegate,
                    Op::LdArg(0),
                    Op::Call(Callee::DelegateInvoke { args: 1 }),
                    Op::Ret,
                ],
            ),
            double,
        ],
    )];

    insta::assert_snapshot!(listing_with(types), @r"
    C::Apply:
      0000  INITSLOT 0 1
      0003  PUSHNULL
      0004  DROP
      0005  PUSHA 0014 <C::Double>
      0010  LDARG0
      0011  SWAP
      0012  CALLA
      0013  RET
    C::Double:
      0014  INITSLOT 0 1
      0017  LDARG0
      0018  LDARG0
      0019  ADD
      0020  RET
    ");
}

#[test]
fn ldftn_without_delegate_is_rejected() {
    let types = vec![contract_type(
        "C",
        vec![
            method("C::Target", "target", &[], TypeRef::Void, vec![Op::Ret]),
            method("C::Bad", "bad", &[], TypeRef::Void, vec![Op::Ldftn("C::Target".to_string()), Op::Ret]),
        ],
    )];

    assert_eq!(
        compile_err(types),
        CompileError::UnsupportedInstruction {
            method: "C::Bad".to_string(),
            offset: 0,
            instruction: "ldftn C::Target".to_string(),
        }
    );
}

fn transfer_event() -> SourceEvent {
    SourceEvent {
        name: "Transferred".to_string(),
        display_name: "Transfer".to_string(),
        params: vec![
            neoil_core::Param::new("from", Str),
            neoil_core::Param::new("amount", Int32),
        ],
    }
}

#[test]
fn event_invoke_becomes_notify() {
    let mut ty = contract_type(
        "C",
        vec![method(
            "C::Fire",
            "fire",
            &[("from", Str), ("amount", Int32)],
            TypeRef::Void,
            vec![
                Op::LdSFld(FieldRef::new("C", "Transferred")),
                Op::LdArg(0),
                Op::LdArg(1),
                Op::Call(Callee::EventInvoke),
                Op::Ret,
            ],
        )],
    );
    ty.events.push(transfer_event());

    insta::assert_snapshot!(listing_with(vec![ty]), @r#"
    C::Fire:
      0000  INITSLOT 0 2
      0003  LDARG0
      0004  LDARG1
      0005  SWAP
      0006  PUSH2
      0007  PACK
      0008  PUSHDATA1 "Transfer"
      0018  SYSCALL System.Runtime.Notify
      0023  RET
    "#);
}

#[test]
fn event_invoke_without_event_is_rejected() {
    let types = vec![contract_type(
        "C",
        vec![method("C::Bad", "bad", &[], TypeRef::Void, vec![Op::Call(Callee::EventInvoke), Op::Ret])],
    )];

    assert_eq!(
        compile_err(types),
        CompileError::UnsupportedCall {
            method: "C::Bad".to_string(),
            offset: 0,
            callee: "Invoke".to_string(),
            reason: "no event field loaded".to_string(),
        }
    );
}

#[test]
fn string_switch_drops_hash_buckets() {
    insta::assert_snapshot!(listing_of(string_switch_method()), @r#"
    C::Route:
      0000  INITSLOT 2 1
      0003  LDARG0
      0004  STLOC0
      0005  LDLOC0
      0006  DROP
      0007  LDLOC0
      0008  PUSHDATA1 "a"
      0011  EQUAL
      0012  JMPIF_L 0032
      0017  LDLOC0
      0018  PUSHDATA1 "b"
      0021  EQUAL
      0022  JMPIF_L 0034
      0027  JMP_L 0036
      0032  PUSH1
      0033  RET
      0034  PUSH2
      0035  RET
      0036  PUSH0
      0037  RET
    "#);
}

#[test]
fn string_hash_outside_a_switch_is_rejected() {
    let m = method(
        "C::Hash",
        "hash",
        &[("s", Str)],
        Int32,
        vec![Op::LdArg(0), intrinsic(Intrinsic::StringHash), Op::Ret],
    );
    let types = vec![contract_type("C", vec![m])];

    assert_eq!(
        compile_err(types),
        CompileError::UnsupportedInstruction {
            method: "C::Hash".to_string(),
            offset: 1,
            instruction: "call StringHash".to_string(),
        }
    );
}

#[test]
fn listing_is_stable_text() {
    // Guards the listing format other tests rely on.
    let m = method("C::F", "f", &[], TypeRef::Void, vec![Op::Ret]);
    assert_eq!(listing_of(m), indoc! {"
        C::F:
          0000  RET
    "});
}
