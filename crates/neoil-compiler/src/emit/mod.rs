//! Per-method code emission.
//!
//! The emitter appends instructions at a running local address and records
//! a relocation whenever an operand refers to an address that is not known
//! yet. It never resolves anything itself; see [`crate::link`].

mod emitter;


pub use emitter::{EmittedBody, MethodEmitter, PLACEHOLDER_WIDTH};
