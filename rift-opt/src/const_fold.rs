//! Local constant folding.

use rift_ir::{BasicBlock, InsnId, Opcode, Operand};

/// Folds every pure instruction whose operands are all constants,
/// replacing its uses with the evaluated constant. Returns the number of
/// rewrites performed: one per folded instruction plus the downstream
/// use-replacement count.
///
/// Instructions without consumers are skipped (there is nothing to
/// rewrite; dead code is a separate pass's business), which also makes the
/// fold idempotent: a second run performs zero rewrites. The dead producer
/// itself is never erased here. Evaluation "no result" cases (division by
/// zero, oversized shifts) leave the instruction untouched, and poison is
/// never constant, so folds cannot see through it.
pub fn const_fold(bb: &mut BasicBlock) -> usize {
    let mut n = 0;

    let ids: Vec<InsnId> = bb.insns().collect();
    for id in ids {
        if bb.insn(id).use_count() == 0 {
            continue;
        }
        if let Some(replacement) = fold(bb, id) {
            n += 1 + bb.replace_all_uses_with(id, replacement);
        }
    }

    if n != 0 {
        tracing::debug!(rewrites = n, "const_fold");
    }
    n
}

/// Evaluates one instruction to its replacement operand, if it folds.
fn fold(bb: &BasicBlock, id: InsnId) -> Option<Operand> {
    let insn = bb.insn(id);
    let ops = insn.operands();
    match insn.opcode() {
        Opcode::Binop | Opcode::Cmp => {
            let op = ops[0].as_const()?.as_op()?;
            let lhs = ops[1].as_const()?;
            let rhs = ops[2].as_const()?;
            lhs.apply(op, rhs).map(Operand::Const)
        }
        Opcode::Unop => {
            let op = ops[0].as_const()?.as_op()?;
            let lhs = ops[1].as_const()?;
            lhs.apply_unary(op).map(Operand::Const)
        }
        Opcode::Cast => {
            let into = insn.template()[1];
            ops[0].as_const()?.cast_zx(into).map(Operand::Const)
        }
        Opcode::CastSx => {
            let into = insn.template()[1];
            ops[0].as_const()?.cast_sx(into).map(Operand::Const)
        }
        Opcode::Bitcast => {
            // Total at equal widths; a failure here is a validation-level
            // bug rather than a fold miss.
            let into = insn.template()[1];
            let folded = ops[0].as_const()?.bitcast(into);
            debug_assert!(folded.is_some(), "bitcast between unequal sizes");
            folded.map(Operand::Const)
        }
        Opcode::Select => {
            let cond = ops[0].as_const()?;
            Some(ops[if cond.as_bool() { 1 } else { 2 }].clone())
        }
        _ => None,
    }
}
