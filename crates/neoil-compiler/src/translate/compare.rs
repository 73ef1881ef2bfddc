//! Comparisons, conditional branches and `switch`.

use neoil_bytecode::Opcode;
use neoil_core::Op;

use super::Translator;

/// Displacement of the `JMPIFNOT_L` that skips one switch case: itself,
/// the `DROP` and the case's `JMP_L`.
const SKIP_CASE: i32 = 5 + 1 + 5;

impl<'a> Translator<'a> {
    pub(super) fn ceq(&mut self, i: usize) -> usize {
        let negated = self.negation_follows(i);
        let opcode = match (self.after_null(i), negated) {
            (true, false) => Opcode::Equal,
            (true, true) => Opcode::NotEqual,
            (false, false) => Opcode::NumEqual,
            (false, true) => Opcode::NumNotEqual,
        };
        self.em.op(opcode);
        if negated { 2 } else { 0 }
    }

    pub(super) fn cgt(&mut self, i: usize, unsigned: bool) -> usize {
        let negated = self.negation_follows(i);
        // `cgt.un` against null is the compiler's `x != null`.
        if unsigned && self.after_null(i) {
            self.em
                .op(if negated { Opcode::Equal } else { Opcode::NotEqual });
        } else {
            if unsigned {
                self.abs_operands();
            }
            self.em.op(if negated { Opcode::Le } else { Opcode::Gt });
        }
        if negated { 2 } else { 0 }
    }

    pub(super) fn clt(&mut self, i: usize, unsigned: bool) -> usize {
        let negated = self.negation_follows(i);
        if unsigned {
            self.abs_operands();
        }
        self.em.op(if negated { Opcode::Ge } else { Opcode::Lt });
        if negated { 2 } else { 0 }
    }

    pub(super) fn compare_and_branch(&mut self, compare: Opcode, unsigned: bool, target: u32) {
        if unsigned {
            self.abs_operands();
        }
        self.em.op(compare);
        self.em.jump(Opcode::JmpIfL, target);
    }

    /// Jump table as a chain of equality tests on the tag.
    ///
    /// Each case is `DUP, PUSH k, NUMEQUAL, JMPIFNOT_L next, DROP, JMP_L t`.
    /// Falling out of the chain drops the tag and continues.
    pub(super) fn switch(&mut self, targets: &[u32]) {
        for (k, &target) in targets.iter().enumerate() {
            self.em.op(Opcode::Dup);
            self.em.push_int(k as i128);
            self.em.op(Opcode::NumEqual);
            self.em
                .emit(Opcode::JmpIfNotL, SKIP_CASE.to_le_bytes().to_vec());
            self.em.op(Opcode::Drop);
            self.em.jump(Opcode::JmpL, target);
        }
        self.em.op(Opcode::Drop);
    }

    /// Replace both operands with their absolute values. Unsigned values
    /// never go negative on the target machine, so this only matters for
    /// operands that were reinterpreted from signed storage.
    fn abs_operands(&mut self) {
        self.em.op(Opcode::Abs);
        self.em.op(Opcode::Swap);
        self.em.op(Opcode::Abs);
        self.em.op(Opcode::Swap);
    }

    /// `ldc.i4.0; ceq` follows `body[i]`.
    fn negation_follows(&self, i: usize) -> bool {
        matches!(self.idiom_at(i + 1), Some(Op::LdcI4(0)))
            && matches!(self.idiom_at(i + 2), Some(Op::Ceq))
    }

    /// `body[i]` directly follows `ldnull` and nothing jumps in between.
    fn after_null(&self, i: usize) -> bool {
        i > 0
            && matches!(self.body[i - 1].op, Op::LdNull)
            && self.idiom_at(i).is_some()
    }
}
