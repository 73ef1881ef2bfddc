//! Interop services reachable through `SYSCALL`.
//!
//! Arguments are popped first-argument-first, matching the order the
//! compiler pushes them.

use neoil_bytecode::syscall_name;

use super::error::RuntimeError;
use super::item::StackItem;
use super::trace::Tracer;
use super::vm::{Notification, VM};

impl VM<'_> {
    pub(super) fn syscall<T: Tracer>(&mut self, id: u32, tracer: &mut T) -> Result<(), RuntimeError> {
        let name = syscall_name(id).ok_or(RuntimeError::UnknownSyscall(id))?;
        match name {
            "System.Runtime.Notify" => {
                let event = self.pop()?;
                let state = self.pop()?;
                tracer.trace_syscall(name, &[event.clone(), state.clone()]);
                let state = match state {
                    StackItem::Array(items) | StackItem::Struct(items) => items.borrow().clone(),
                    other => return Err(other.invalid("Array")),
                };
                self.notifications.push(Notification {
                    name: event.as_string()?,
                    state,
                });
            }
            "System.Runtime.Log" => {
                let message = self.pop()?;
                tracer.trace_syscall(name, std::slice::from_ref(&message));
                self.logs.push(message.as_string()?);
            }
            _ => return Err(RuntimeError::UnavailableSyscall(name)),
        }
        Ok(())
    }
}
