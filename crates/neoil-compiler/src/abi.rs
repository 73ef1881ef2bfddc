//! ABI exporter.
//!
//! Describes the linked image to callers: script hash, every exported
//! method with its entry offset and signature, and every event.

use serde::{Deserialize, Serialize};

use neoil_core::{Param, TypeRef};

use crate::error::ExportError;
use crate::program::Program;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abi {
    pub hash: String,
    pub methods: Vec<AbiMethod>,
    pub events: Vec<AbiEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiMethod {
    pub name: String,
    /// Decimal entry address.
    pub offset: String,
    pub parameters: Vec<AbiParam>,
    #[serde(rename = "returnType")]
    pub return_type: AbiType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEvent {
    pub name: String,
    pub parameters: Vec<AbiParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AbiType,
}

/// Types visible at the contract boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbiType {
    Void,
    Boolean,
    Integer,
    ByteArray,
    String,
    Array,
    Any,
    InteropInterface,
}

impl AbiType {
    pub fn of(ty: &TypeRef) -> Option<Self> {
        Some(match ty {
            TypeRef::Void => Self::Void,
            TypeRef::Boolean => Self::Boolean,
            TypeRef::String => Self::String,
            TypeRef::ByteArray => Self::ByteArray,
            TypeRef::Array(_) | TypeRef::Tuple(_) => Self::Array,
            TypeRef::Object | TypeRef::Class(_) => Self::Any,
            TypeRef::Interop(_) => Self::InteropInterface,
            TypeRef::Delegate(_) => return None,
            ty if ty.is_integer() => Self::Integer,
            _ => return None,
        })
    }
}

impl Abi {
    pub fn method(&self, name: &str) -> Option<&AbiMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Entry address of an exported method.
    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.method(name)?.offset.parse().ok()
    }
}

/// Build the ABI of a linked program.
pub fn export(program: &Program) -> Result<Abi, ExportError> {
    let mut methods: Vec<AbiMethod> = Vec::new();
    for method in program.methods().values().filter(|m| m.is_exported()) {
        if methods.iter().any(|m| m.name == method.display_name) {
            return Err(ExportError::DuplicateName(method.display_name.clone()));
        }
        let base = method
            .base()
            .ok_or_else(|| ExportError::Unlinked(method.name.clone()))?;
        methods.push(AbiMethod {
            name: method.display_name.clone(),
            offset: base.to_string(),
            parameters: parameters(&method.name, &method.params)?,
            return_type: abi_type(&format!("return value of {}", method.name), &method.return_type)?,
        });
    }

    let events = program
        .events()
        .iter()
        .map(|(key, event)| {
            Ok(AbiEvent {
                name: event.display_name.clone(),
                parameters: parameters(key, &event.params)?,
            })
        })
        .collect::<Result<_, ExportError>>()?;

    Ok(Abi {
        hash: program.hash().to_string(),
        methods,
        events,
    })
}

fn parameters(owner: &str, params: &[Param]) -> Result<Vec<AbiParam>, ExportError> {
    params
        .iter()
        .map(|p| {
            Ok(AbiParam {
                name: p.name.clone(),
                ty: abi_type(&format!("parameter {} of {owner}", p.name), &p.ty)?,
            })
        })
        .collect()
}

fn abi_type(context: &str, ty: &TypeRef) -> Result<AbiType, ExportError> {
    AbiType::of(ty).ok_or_else(|| ExportError::UnsupportedType {
        context: context.to_string(),
        ty: ty.to_string(),
    })
}
