//! Execution tracing.
//!
//! `NoopTracer` methods are `#[inline(always)]` and empty, so an untraced
//! run pays nothing. `PrintTracer` collects one line per event.

use neoil_bytecode::InstructionView;
use neoil_core::Colors;

use super::error::RuntimeError;
use super::item::StackItem;

/// Verbosity level for trace output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Calls, returns, syscalls and faults.
    #[default]
    Default,
    /// Also every instruction with the stack depth before it.
    Verbose,
}

/// Hooks called during execution.
pub trait Tracer {
    /// Before executing an instruction.
    fn trace_instruction(&mut self, instr: &InstructionView<'_>, depth: usize);

    /// Entering a method at `target`.
    fn trace_call(&mut self, target: u32);

    /// Leaving the current method.
    fn trace_return(&mut self);

    /// An interop service was invoked.
    fn trace_syscall(&mut self, name: &str, args: &[StackItem]);

    /// Execution faulted.
    fn trace_fault(&mut self, error: &RuntimeError);
}

pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_instruction(&mut self, _instr: &InstructionView<'_>, _depth: usize) {}

    #[inline(always)]
    fn trace_call(&mut self, _target: u32) {}

    #[inline(always)]
    fn trace_return(&mut self) {}

    #[inline(always)]
    fn trace_syscall(&mut self, _name: &str, _args: &[StackItem]) {}

    #[inline(always)]
    fn trace_fault(&mut self, _error: &RuntimeError) {}
}

/// Tracer that collects formatted lines.
pub struct PrintTracer {
    verbosity: Verbosity,
    colors: Colors,
    lines: Vec<String>,
    depth: usize,
}

impl PrintTracer {
    pub fn new(verbosity: Verbosity, colors: Colors) -> Self {
        Self {
            verbosity,
            colors,
            lines: Vec::new(),
            depth: 0,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn output(&self) -> String {
        self.lines.join("\n")
    }

    fn push(&mut self, text: String) {
        let indent = "  ".repeat(self.depth);
        self.lines.push(format!("{indent}{text}"));
    }
}

impl Tracer for PrintTracer {
    fn trace_instruction(&mut self, instr: &InstructionView<'_>, depth: usize) {
        if self.verbosity != Verbosity::Verbose {
            return;
        }
        let c = self.colors;
        self.push(format!(
            "{} {} {}",
            c.paint(c.muted, format!("{:04}", instr.offset)),
            instr.opcode,
            c.paint(c.muted, format!("[{depth}]"))
        ));
    }

    fn trace_call(&mut self, target: u32) {
        let c = self.colors;
        self.push(format!("{} {target:04}", c.paint(c.label, "call")));
        self.depth += 1;
    }

    fn trace_return(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        let c = self.colors;
        self.push(c.paint(c.label, "return"));
    }

    fn trace_syscall(&mut self, name: &str, args: &[StackItem]) {
        let c = self.colors;
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        self.push(format!("{} {name}({})", c.paint(c.alert, "syscall"), args.join(", ")));
    }

    fn trace_fault(&mut self, error: &RuntimeError) {
        let c = self.colors;
        self.push(format!("{} {error}", c.paint(c.alert, "fault")));
    }
}
