//! Terminal highlighting for bytecode listings and execution traces.

/// Escape sequences keyed by what they highlight.
///
/// A listing or trace line paints each part through [`Colors::paint`], so the
/// same rendering code serves both plain and highlighted output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colors {
    /// Method labels, callees, call and return events.
    pub label: &'static str,
    /// Pushed constants and folded static values.
    pub literal: &'static str,
    /// Undecodable bytes, syscalls and faults.
    pub alert: &'static str,
    /// Offsets, call depth and trace tags.
    pub muted: &'static str,
    pub reset: &'static str,
}

impl Default for Colors {
    fn default() -> Self {
        Self::OFF
    }
}

impl Colors {
    pub const ON: Self = Self {
        label: "\x1b[34m",
        literal: "\x1b[32m",
        alert: "\x1b[33m",
        muted: "\x1b[2m",
        reset: "\x1b[0m",
    };

    /// Plain text. Every listing in tests uses this.
    pub const OFF: Self = Self {
        label: "",
        literal: "",
        alert: "",
        muted: "",
        reset: "",
    };

    pub fn new(enabled: bool) -> Self {
        if enabled { Self::ON } else { Self::OFF }
    }

    pub fn is_enabled(&self) -> bool {
        !self.reset.is_empty()
    }

    /// `text` wrapped in `color` and a reset.
    pub fn paint(&self, color: &str, text: impl std::fmt::Display) -> String {
        format!("{color}{text}{}", self.reset)
    }
}
