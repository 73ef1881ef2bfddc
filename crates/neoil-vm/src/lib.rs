#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Reference executor for neoil program images.
//!
//! Implements the subset of the target machine the compiler emits: integer
//! and byte-string arithmetic, slots, calls through relative offsets and
//! pointers, compound items, and the `Notify`/`Log` interop services.

pub mod engine;

pub use engine::{
    FuelLimits, NoopTracer, Notification, PrintTracer, RuntimeError, StackItem, Tracer,
    Verbosity, VM, VMBuilder,
};
