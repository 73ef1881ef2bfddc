//! Compilation tracing.
//!
//! Same zero-cost shape as the executor's tracer: [`NoopTracer`] methods are
//! `#[inline(always)]` and empty, so an untraced compilation carries no
//! logging cost. [`PrintTracer`] collects one line per event.

use neoil_core::Colors;

use crate::statics::Constant;

/// Verbosity level for trace output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Translated methods, initializer synthesis and layout.
    #[default]
    Default,
    /// Also discovery: registered methods, slots and folded constants.
    Verbose,
}

/// Hooks called at each stage of a compilation.
pub trait Tracer {
    /// A method was registered during discovery.
    fn trace_method_registered(&mut self, name: &str, display_name: &str);

    /// A mutable static field received a slot.
    fn trace_slot(&mut self, field: &str, slot: u8);

    /// A readonly static field was folded to a constant.
    fn trace_folded(&mut self, field: &str, value: &Constant);

    /// A method body was translated and locally linked.
    fn trace_method_translated(&mut self, name: &str, size: u32, pending: usize);

    /// The static initializer was synthesized.
    fn trace_initializer(&mut self, slots: usize, statements: usize);

    /// The global pass placed a method.
    fn trace_method_placed(&mut self, name: &str, base: u32);
}

pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_method_registered(&mut self, _name: &str, _display_name: &str) {}

    #[inline(always)]
    fn trace_slot(&mut self, _field: &str, _slot: u8) {}

    #[inline(always)]
    fn trace_folded(&mut self, _field: &str, _value: &Constant) {}

    #[inline(always)]
    fn trace_method_translated(&mut self, _name: &str, _size: u32, _pending: usize) {}

    #[inline(always)]
    fn trace_initializer(&mut self, _slots: usize, _statements: usize) {}

    #[inline(always)]
    fn trace_method_placed(&mut self, _name: &str, _base: u32) {}
}

/// Tracer that collects formatted lines.
pub struct PrintTracer {
    verbosity: Verbosity,
    colors: Colors,
    lines: Vec<String>,
}

impl PrintTracer {
    pub fn new(verbosity: Verbosity, colors: Colors) -> Self {
        Self {
            verbosity,
            colors,
            lines: Vec::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// All lines joined with newlines.
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }

    fn verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    fn push(&mut self, tag: &str, text: String) {
        let c = self.colors;
        self.lines
            .push(format!("{} {text}", c.paint(c.muted, format!("{tag:<10}"))));
    }
}

impl Tracer for PrintTracer {
    fn trace_method_registered(&mut self, name: &str, display_name: &str) {
        if self.verbose() {
            self.push("register", format!("{name} as {display_name}"));
        }
    }

    fn trace_slot(&mut self, field: &str, slot: u8) {
        if self.verbose() {
            self.push("slot", format!("{field} -> {slot}"));
        }
    }

    fn trace_folded(&mut self, field: &str, value: &Constant) {
        if self.verbose() {
            let c = self.colors;
            self.push("fold", format!("{field} = {}", c.paint(c.literal, value)));
        }
    }

    fn trace_method_translated(&mut self, name: &str, size: u32, pending: usize) {
        let c = self.colors;
        self.push(
            "translate",
            format!("{} {size} bytes, {pending} pending", c.paint(c.label, name)),
        );
    }

    fn trace_initializer(&mut self, slots: usize, statements: usize) {
        self.push(
            "initialize",
            format!("{slots} slots, {statements} statements"),
        );
    }

    fn trace_method_placed(&mut self, name: &str, base: u32) {
        let c = self.colors;
        self.push("place", format!("{} @ {base:04}", c.paint(c.label, name)));
    }
}
