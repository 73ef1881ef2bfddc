use neoil_core::{Op, Param, SourceEvent, SourceType, TypeKind, TypeRef};

use crate::test_utils::{compile_ok, contract_type, method, module, token_type};
use crate::{AbiParam, AbiType, Error, ExportError, compile};

fn add() -> SourceType {
    contract_type(
        "C",
        vec![method(
            "C::Add",
            "add",
            &[("a", TypeRef::Int32), ("b", TypeRef::Int32)],
            TypeRef::Int32,
            vec![Op::LdArg(0), Op::LdArg(1), Op::Add, Op::Ret],
        )],
    )
}

fn export_err(types: Vec<SourceType>) -> ExportError {
    match compile(&module(types)) {
        Err(Error::Export(e)) => e,
        other => panic!("expected an export error, got {other:?}"),
    }
}

#[test]
fn descriptor_json() {
    let contract = compile_ok(&module(vec![add()]));

    insta::assert_snapshot!(contract.abi_json().unwrap(), @r#"
    {
      "hash": "0x3c06314949d10342a0eb59f98ac6074f625e637b",
      "methods": [
        {
          "name": "add",
          "offset": "0",
          "parameters": [
            {
              "name": "a",
              "type": "Integer"
            },
            {
              "name": "b",
              "type": "Integer"
            }
          ],
          "returnType": "Integer"
        }
      ],
      "events": []
    }
    "#);
}

#[test]
fn hash_matches_image() {
    let contract = compile_ok(&module(vec![add()]));

    assert_eq!(contract.script(), &[0x57, 0x00, 0x02, 0x78, 0x79, 0x9e, 0x40]);
    assert_eq!(contract.abi().hash, contract.hash().to_string());
}

#[test]
fn initializer_is_exported_last() {
    let contract = compile_ok(&module(vec![token_type()]));

    let names: Vec<(&str, &str)> = contract
        .abi()
        .methods
        .iter()
        .map(|m| (m.name.as_str(), m.offset.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![("count", "0"), ("name", "6"), ("owner", "12"), ("_initialize", "20")]
    );
    assert_eq!(contract.abi().method("_initialize").unwrap().return_type, AbiType::Void);
    assert_eq!(contract.abi().offset_of("owner"), Some(12));
    assert_eq!(contract.abi().offset_of("missing"), None);
}

#[test]
fn private_and_helper_methods_are_not_exported() {
    let hidden = neoil_core::SourceMethod {
        is_public: false,
        ..method("C::Hidden", "hidden", &[], TypeRef::Void, vec![Op::Ret])
    };
    let mut ty = add();
    ty.methods.push(hidden);
    let helper = SourceType {
        kind: TypeKind::Helper,
        ..contract_type("H", vec![method("H::Util", "util", &[], TypeRef::Void, vec![Op::Ret])])
    };

    let contract = compile_ok(&module(vec![ty, helper]));

    let names: Vec<&str> = contract.abi().methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["add"]);
    assert_eq!(contract.program().methods().len(), 3);
}

#[test]
fn duplicate_export_name_is_rejected() {
    let types = vec![
        contract_type("C", vec![method("C::Run", "run", &[], TypeRef::Void, vec![Op::Ret])]),
        contract_type("D", vec![method("D::Run", "run", &[], TypeRef::Void, vec![Op::Ret])]),
    ];

    assert_eq!(export_err(types), ExportError::DuplicateName("run".to_string()));
}

#[test]
fn delegate_parameter_cannot_be_exported() {
    let m = method(
        "C::Run",
        "run",
        &[("f", TypeRef::Delegate("Func".to_string()))],
        TypeRef::Void,
        vec![Op::Ret],
    );

    assert_eq!(
        export_err(vec![contract_type("C", vec![m])]),
        ExportError::UnsupportedType {
            context: "parameter f of C::Run".to_string(),
            ty: "Func".to_string(),
        }
    );
}

#[test]
fn events_are_described() {
    let mut ty = add();
    ty.events.push(SourceEvent {
        name: "Transferred".to_string(),
        display_name: "Transfer".to_string(),
        params: vec![
            Param::new("from", TypeRef::ByteArray),
            Param::new("amount", TypeRef::BigInteger),
        ],
    });

    let contract = compile_ok(&module(vec![ty]));

    let event = &contract.abi().events[0];
    assert_eq!(event.name, "Transfer");
    assert_eq!(
        event.parameters,
        vec![
            AbiParam {
                name: "from".to_string(),
                ty: AbiType::ByteArray,
            },
            AbiParam {
                name: "amount".to_string(),
                ty: AbiType::Integer,
            },
        ]
    );
}

#[test]
fn type_mapping() {
    let cases = [
        (TypeRef::Void, Some(AbiType::Void)),
        (TypeRef::Boolean, Some(AbiType::Boolean)),
        (TypeRef::Char, Some(AbiType::Integer)),
        (TypeRef::UInt64, Some(AbiType::Integer)),
        (TypeRef::String, Some(AbiType::String)),
        (TypeRef::ByteArray, Some(AbiType::ByteArray)),
        (TypeRef::array(TypeRef::Int32), Some(AbiType::Array)),
        (TypeRef::Tuple(vec![TypeRef::Int32]), Some(AbiType::Array)),
        (TypeRef::Object, Some(AbiType::Any)),
        (TypeRef::Class("Point".to_string()), Some(AbiType::Any)),
        (TypeRef::Interop("Iterator".to_string()), Some(AbiType::InteropInterface)),
        (TypeRef::Delegate("Func".to_string()), None),
    ];

    for (ty, expected) in cases {
        assert_eq!(AbiType::of(&ty), expected, "{ty}");
    }
}
