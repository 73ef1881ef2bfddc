//! Test utilities: source model builders and execution helpers.

use neoil_core::{
    Callee, Colors, FieldRef, Intrinsic, Op, Param, SourceField, SourceInstruction, SourceMethod,
    SourceModule, SourceType, TypeRef,
};
use neoil_vm::{RuntimeError, StackItem, VM};

use crate::{CompileError, Contract, Error, compile};

/// Instructions at offsets 0, 1, 2, ...
pub fn body(ops: Vec<Op>) -> Vec<SourceInstruction> {
    ops.into_iter()
        .enumerate()
        .map(|(i, op)| SourceInstruction::new(i as u32, op))
        .collect()
}

/// Public method `Owner::Name` exported as `display`.
pub fn method(name: &str, display: &str, params: &[(&str, TypeRef)], ret: TypeRef, ops: Vec<Op>) -> SourceMethod {
    SourceMethod {
        name: name.to_string(),
        display_name: display.to_string(),
        is_public: true,
        params: params
            .iter()
            .map(|(n, ty)| Param::new(*n, ty.clone()))
            .collect(),
        return_type: ret,
        body: body(ops),
        ..Default::default()
    }
}

pub fn with_locals(m: SourceMethod, locals: Vec<TypeRef>) -> SourceMethod {
    SourceMethod { locals, ..m }
}

/// `switch (s) { case "a": return 1; case "b": return 2; default: return 0; }`
/// as a source compiler lowers it: a hash, one bucket test, then one string
/// comparison per case.
pub fn string_switch_method() -> SourceMethod {
    with_locals(
        method(
            "C::Route",
            "route",
            &[("s", TypeRef::String)],
            TypeRef::Int32,
            vec![
                Op::LdArg(0),
                Op::StLoc(0),
                Op::LdLoc(0),
                Op::Call(Callee::Intrinsic(Intrinsic::StringHash)),
                Op::StLoc(1),
                Op::LdLoc(1),
                Op::LdcI4(100),
                Op::Bgt(13),
                Op::LdLoc(0),
                Op::LdStr("a".to_string()),
                Op::Call(Callee::Intrinsic(Intrinsic::StringEquals)),
                Op::BrTrue(18),
                Op::Br(22),
                Op::LdLoc(0),
                Op::LdStr("b".to_string()),
                Op::Call(Callee::Intrinsic(Intrinsic::StringEquals)),
                Op::BrTrue(20),
                Op::Br(22),
                Op::LdcI4(1),
                Op::Ret,
                Op::LdcI4(2),
                Op::Ret,
                Op::LdcI4(0),
                Op::Ret,
            ],
        ),
        vec![TypeRef::String, TypeRef::UInt32],
    )
}

pub fn contract_type(name: &str, methods: Vec<SourceMethod>) -> SourceType {
    SourceType {
        name: name.to_string(),
        methods,
        ..Default::default()
    }
}

fn static_field(name: &str, ty: TypeRef, readonly: bool) -> SourceField {
    SourceField {
        name: name.to_string(),
        ty,
        is_static: true,
        is_readonly: readonly,
        is_literal: false,
    }
}

/// Contract with a mutable counter and two readonly statics:
/// `counter = 7`, `Name = "tok"`, `Owner = new byte[] { 1, 2, 3 }`.
pub fn token_type() -> SourceType {
    let field = |name: &str| FieldRef::new("C", name);
    SourceType {
        name: "C".to_string(),
        fields: vec![
            static_field("counter", TypeRef::Int32, false),
            static_field("Name", TypeRef::String, true),
            static_field("Owner", TypeRef::ByteArray, true),
        ],
        methods: vec![
            method(
                "C::Count",
                "count",
                &[],
                TypeRef::Int32,
                vec![
                    Op::LdSFld(field("counter")),
                    Op::LdcI4(1),
                    Op::Add,
                    Op::Dup,
                    Op::StSFld(field("counter")),
                    Op::Ret,
                ],
            ),
            method("C::Name", "name", &[], TypeRef::String, vec![Op::LdSFld(field("Name")), Op::Ret]),
            method("C::Owner", "owner", &[], TypeRef::ByteArray, vec![Op::LdSFld(field("Owner")), Op::Ret]),
        ],
        static_init: body(vec![
            Op::LdcI4(7),
            Op::StSFld(field("counter")),
            Op::LdStr("tok".to_string()),
            Op::StSFld(field("Name")),
            Op::LdcI4(3),
            Op::NewArr(TypeRef::Byte),
            Op::Dup,
            Op::InitArray(vec![1, 2, 3]),
            Op::StSFld(field("Owner")),
            Op::Ret,
        ]),
        ..Default::default()
    }
}

pub fn module(types: Vec<SourceType>) -> SourceModule {
    SourceModule { types }
}

/// Compile a module that must be accepted.
pub fn compile_ok(module: &SourceModule) -> Contract {
    match compile(module) {
        Ok(contract) => contract,
        Err(e) => panic!("compilation failed: {e}"),
    }
}

/// Compile a module that must be rejected by the translator or linker.
pub fn compile_err(types: Vec<SourceType>) -> CompileError {
    match compile(&module(types)) {
        Err(Error::Compile(e)) => e,
        Err(e) => panic!("expected a compile error, got {e}"),
        Ok(_) => panic!("compilation unexpectedly succeeded"),
    }
}

/// Disassembly of a whole module.
pub fn listing_with(types: Vec<SourceType>) -> String {
    compile_ok(&module(types)).program().dump(Colors::OFF)
}

/// Compile a single contract method and return the disassembly.
pub fn listing_of(m: SourceMethod) -> String {
    let contract = compile_ok(&module(vec![contract_type("C", vec![m])]));
    contract.program().dump(Colors::OFF)
}

/// Fresh executor for `contract` with its initializer wired.
pub fn vm(contract: &Contract) -> VM<'_> {
    VM::builder(contract.script())
        .initializer(contract.initializer())
        .build()
}

/// Run an exported method on a fresh executor.
pub fn run(contract: &Contract, name: &str, args: Vec<StackItem>) -> Result<Vec<StackItem>, RuntimeError> {
    let entry = contract
        .entry(name)
        .unwrap_or_else(|| panic!("{name} is not exported"));
    vm(contract).invoke(entry, args)
}

/// Run an exported method and return its single result.
pub fn run_one(contract: &Contract, name: &str, args: Vec<StackItem>) -> StackItem {
    let mut stack = run(contract, name, args).unwrap_or_else(|e| panic!("{name} faulted: {e}"));
    assert_eq!(stack.len(), 1, "{name} left {} items", stack.len());
    stack.remove(0)
}

pub fn int(v: i128) -> StackItem {
    StackItem::Integer(v)
}
