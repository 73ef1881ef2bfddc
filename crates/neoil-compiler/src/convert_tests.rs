use neoil_core::{
    Binding, Colors, MethodKind, Op, Param, SourceField, SourceMethod, SourceType, TypeKind, TypeRef,
};

use crate::test_utils::{
    compile_err, compile_ok, contract_type, listing_with, method, module, token_type, with_locals,
};
use crate::{CompileError, Compiler, Error, Limits};

fn ret(name: &str) -> SourceMethod {
    method(name, &name.to_lowercase(), &[], TypeRef::Void, vec![Op::Ret])
}

fn with_params(name: &str, count: usize) -> SourceMethod {
    SourceMethod {
        params: (0..count).map(|i| Param::new(format!("p{i}"), TypeRef::Int32)).collect(),
        ..ret(name)
    }
}

#[test]
fn only_translatable_methods_are_registered() {
    let helper = SourceType {
        kind: TypeKind::Helper,
        ..contract_type("A", vec![ret("A::Util")])
    };
    let scaffolding = SourceType {
        kind: TypeKind::Synthesized,
        ..contract_type("S", vec![method("S::X", "x", &[], TypeRef::Void, vec![Op::Localloc])])
    };
    let ctor = SourceMethod {
        kind: MethodKind::Constructor,
        ..ret("C::.ctor")
    };
    let bound = SourceMethod {
        binding: Some(Binding::Syscall("System.Runtime.Log".to_string())),
        body: vec![],
        ..ret("C::Log")
    };
    let contract = contract_type("C", vec![ctor, ret("C::Run"), bound]);

    let compiled = compile_ok(&module(vec![helper, scaffolding, contract]));

    let names: Vec<&str> = compiled.program().methods().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["A::Util", "C::Run"]);
    assert_eq!(compiled.script(), &[0x40, 0x40]);
}

#[test]
fn duplicate_method_is_rejected() {
    let types = vec![
        contract_type("C", vec![ret("C::F")]),
        contract_type("D", vec![ret("C::F")]),
    ];

    assert_eq!(compile_err(types), CompileError::DuplicateMethod("C::F".to_string()));
}

#[test]
fn initializer_name_collision_is_rejected() {
    let mut ty = token_type();
    ty.methods.push(ret("_initialize"));

    assert_eq!(
        compile_err(vec![ty]),
        CompileError::DuplicateMethod("_initialize".to_string())
    );
}

#[test]
fn parameter_limit_is_inclusive() {
    let at_limit = compile_ok(&module(vec![contract_type("C", vec![with_params("C::Wide", 255)])]));
    assert_eq!(&at_limit.script()[..3], &[0x57, 0, 255]);

    assert_eq!(
        compile_err(vec![contract_type("C", vec![with_params("C::Many", 256)])]),
        CompileError::ResourceLimit {
            scope: "C::Many".to_string(),
            what: "parameters",
            count: 256,
            max: 255,
        }
    );
}

#[test]
fn configured_local_limit() {
    let m = with_locals(ret("C::M"), vec![TypeRef::Int32; 3]);
    let compiler = Compiler::builder().limits(Limits::new().locals(2)).build();

    let err = compiler.compile(&module(vec![contract_type("C", vec![m])])).unwrap_err();

    assert_eq!(
        err,
        Error::Compile(CompileError::ResourceLimit {
            scope: "C::M".to_string(),
            what: "locals",
            count: 3,
            max: 2,
        })
    );
}

#[test]
fn limits_are_clamped_to_slot_range() {
    let limits = Limits::new().params(1000).locals(300).static_fields(256);

    assert_eq!(limits.max_params(), 255);
    assert_eq!(limits.max_locals(), 255);
    assert_eq!(limits.max_static_fields(), 255);
    assert_eq!(Limits::new().params(4).max_params(), 4);
}

#[test]
fn statics_are_folded_or_initialized() {
    insta::assert_snapshot!(listing_with(vec![token_type()]), @r#"
    C::Count:
      0000  LDSFLD0
      0001  PUSH1
      0002  ADD
      0003  DUP
      0004  STSFLD0
      0005  RET
    C::Name:
      0006  PUSHDATA1 "tok"
      0011  RET
    C::Owner:
      0012  PUSHDATA1 0x010203
      0017  CONVERT Buffer
      0019  RET
    _initialize:
      0020  INITSSLOT 1
      0022  PUSH7
      0023  STSFLD0
      0024  RET
    "#);
}

#[test]
fn initializer_gets_its_own_locals() {
    let ty = SourceType {
        name: "C".to_string(),
        fields: vec![SourceField {
            name: "x".to_string(),
            ty: TypeRef::Int32,
            is_static: true,
            is_readonly: false,
            is_literal: false,
        }],
        static_init: crate::test_utils::body(vec![
            Op::LdcI4(3),
            Op::StLoc(0),
            Op::LdLoc(0),
            Op::StSFld(neoil_core::FieldRef::new("C", "x")),
            Op::Ret,
        ]),
        ..Default::default()
    };

    insta::assert_snapshot!(listing_with(vec![ty]), @r"
    _initialize:
      0000  INITSSLOT 1
      0002  INITSLOT 1 0
      0005  PUSH3
      0006  STLOC0
      0007  LDLOC0
      0008  STSFLD0
      0009  RET
    ");
}

#[test]
fn branch_to_missing_offset_is_rejected() {
    let m = method("C::F", "f", &[], TypeRef::Void, vec![Op::Br(99)]);

    assert_eq!(
        compile_err(vec![contract_type("C", vec![m])]),
        CompileError::UnresolvedLocalTarget {
            method: "C::F".to_string(),
            target: 99,
        }
    );
}

#[test]
fn compilation_is_deterministic() {
    let source = module(vec![token_type()]);

    let first = compile_ok(&source);
    let second = compile_ok(&source);

    assert_eq!(first.script(), second.script());
    assert_eq!(first.abi_json().unwrap(), second.abi_json().unwrap());
    assert_eq!(
        first.program().dump(Colors::OFF),
        second.program().dump(Colors::OFF)
    );
}
