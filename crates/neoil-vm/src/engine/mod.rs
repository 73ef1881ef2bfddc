//! Reference executor for linked program images.
//!
//! Runs a script produced by the compiler so that translations can be
//! checked by behavior rather than by listing alone. Integers are 128-bit;
//! anything wider faults with an overflow.

mod error;
mod frame;
mod interop;
mod item;
mod trace;
mod vm;


pub use error::RuntimeError;
pub use item::StackItem;
pub use trace::{NoopTracer, PrintTracer, Tracer, Verbosity};
pub use vm::{FuelLimits, Notification, VM, VMBuilder};
