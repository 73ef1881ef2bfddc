#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures shared by the neoil crates.
//!
//! - [`model`]: the source model handed over by the front-end
//! - [`Colors`]: ANSI palette for listings and traces

pub mod colors;
pub mod model;


pub use colors::Colors;
pub use model::{
    Binding, Callee, ConvKind, FieldRef, Intrinsic, MethodKind, Op, Param, RawOp, SourceEvent,
    SourceField, SourceInstruction, SourceMethod, SourceModule, SourceType, TypeKind, TypeRef,
};

/// Parse a JSON-encoded source module.
pub fn parse_module(json: &str) -> Result<SourceModule, serde_json::Error> {
    serde_json::from_str(json)
}
