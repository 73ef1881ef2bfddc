//! Call frames.

use super::error::RuntimeError;
use super::item::StackItem;

/// One activation. Slots are allocated by `INITSLOT`.
#[derive(Debug, Default)]
pub struct Frame {
    /// Where `RET` resumes. `None` for the entry frame.
    pub return_addr: Option<u32>,
    pub locals: Vec<StackItem>,
    pub args: Vec<StackItem>,
}

impl Frame {
    pub fn new(return_addr: Option<u32>) -> Self {
        Self {
            return_addr,
            ..Self::default()
        }
    }
}

/// Fixed-size slot area (statics, locals or arguments).
pub(crate) fn slot<'s>(
    slots: &'s mut [StackItem],
    kind: &'static str,
    index: u8,
) -> Result<&'s mut StackItem, RuntimeError> {
    slots
        .get_mut(index as usize)
        .ok_or(RuntimeError::InvalidSlot { kind, index })
}
