//! Flag materialization helpers.
//!
//! Flags are single-bit pseudo-registers; every helper emits the comparison
//! network computing the flag from the integer result and writes it back.
//! Flags the ISA leaves undefined are poison, never a guessed constant.

use rift_ir::{BasicBlock, Constant, Error, InsnId, Op, Operand, Type};

use crate::Reg;

/// SF: sign bit of the result.
pub(crate) fn set_sf(bb: &mut BasicBlock, result: InsnId) -> Result<(), Error> {
    let ty = bb.insn(result).result_type();
    let sf = bb.push_cmp(Op::Slt, result, Constant::int(ty, 0))?;
    bb.push_write_reg(Reg::Sf.mreg(), sf)?;
    Ok(())
}

/// ZF: result is zero.
pub(crate) fn set_zf(bb: &mut BasicBlock, result: InsnId) -> Result<(), Error> {
    let ty = bb.insn(result).result_type();
    let zf = bb.push_cmp(Op::Eq, result, Constant::int(ty, 0))?;
    bb.push_write_reg(Reg::Zf.mreg(), zf)?;
    Ok(())
}

/// Even parity of the low result byte, as an `i1` producer.
///
/// The xor ladder folds the byte onto its low bit; PF is set when that bit
/// is clear.
pub(crate) fn parity(bb: &mut BasicBlock, result: InsnId) -> Result<InsnId, Error> {
    let ty = bb.insn(result).result_type();
    let low: Operand = if ty == Type::I8 {
        result.into()
    } else {
        bb.push_cast(Type::I8, result)?.into()
    };
    let mut acc = low;
    for shift in [4, 2, 1] {
        let sh = bb.push_binop(Op::BitShr, acc.clone(), Constant::int(Type::I8, shift))?;
        acc = bb.push_binop(Op::BitXor, acc, sh)?.into();
    }
    let bit = bb.push_binop(Op::BitAnd, acc, Constant::int(Type::I8, 1))?;
    bb.push_cmp(Op::Eq, bit, Constant::int(Type::I8, 0))
}

/// PF: even parity of the low result byte.
pub(crate) fn set_pf(bb: &mut BasicBlock, result: InsnId) -> Result<(), Error> {
    let pf = parity(bb, result)?;
    bb.push_write_reg(Reg::Pf.mreg(), pf)?;
    Ok(())
}

/// AF: carry out of bit 3, `((lhs ^ rhs ^ result) & 0x10) != 0`.
pub(crate) fn set_af(
    bb: &mut BasicBlock,
    lhs: &Operand,
    rhs: &Operand,
    result: InsnId,
) -> Result<(), Error> {
    let ty = bb.insn(result).result_type();
    let x = bb.push_binop(Op::BitXor, lhs.clone(), rhs.clone())?;
    let x = bb.push_binop(Op::BitXor, x, result)?;
    let bit = bb.push_binop(Op::BitAnd, x, Constant::int(ty, 0x10))?;
    let af = bb.push_cmp(Op::Ne, bit, Constant::int(ty, 0))?;
    bb.push_write_reg(Reg::Af.mreg(), af)?;
    Ok(())
}

/// AF for negation, where the implicit left operand is zero.
pub(crate) fn set_af_neg(
    bb: &mut BasicBlock,
    lhs: &Operand,
    result: InsnId,
) -> Result<(), Error> {
    let ty = bb.insn(result).result_type();
    let x = bb.push_binop(Op::BitXor, lhs.clone(), result)?;
    let bit = bb.push_binop(Op::BitAnd, x, Constant::int(ty, 0x10))?;
    let af = bb.push_cmp(Op::Ne, bit, Constant::int(ty, 0))?;
    bb.push_write_reg(Reg::Af.mreg(), af)?;
    Ok(())
}

/// OF after addition: the operands agree in sign and the result does not,
/// `((lhs ^ result) & (rhs ^ result)) < 0`.
pub(crate) fn set_of_add(
    bb: &mut BasicBlock,
    lhs: &Operand,
    rhs: &Operand,
    result: InsnId,
) -> Result<(), Error> {
    let ty = bb.insn(result).result_type();
    let a = bb.push_binop(Op::BitXor, lhs.clone(), result)?;
    let b = bb.push_binop(Op::BitXor, rhs.clone(), result)?;
    let x = bb.push_binop(Op::BitAnd, a, b)?;
    let of = bb.push_cmp(Op::Slt, x, Constant::int(ty, 0))?;
    bb.push_write_reg(Reg::Of.mreg(), of)?;
    Ok(())
}

/// OF after subtraction: `((lhs ^ rhs) & (lhs ^ result)) < 0`.
pub(crate) fn set_of_sub(
    bb: &mut BasicBlock,
    lhs: &Operand,
    rhs: &Operand,
    result: InsnId,
) -> Result<(), Error> {
    let ty = bb.insn(result).result_type();
    let a = bb.push_binop(Op::BitXor, lhs.clone(), rhs.clone())?;
    let b = bb.push_binop(Op::BitXor, lhs.clone(), result)?;
    let x = bb.push_binop(Op::BitAnd, a, b)?;
    let of = bb.push_cmp(Op::Slt, x, Constant::int(ty, 0))?;
    bb.push_write_reg(Reg::Of.mreg(), of)?;
    Ok(())
}

/// Flag set after `or`/`and`/`xor`/`test`: SF/ZF/PF from the result, OF
/// and CF cleared, AF architecturally undefined.
pub(crate) fn set_flags_logical(bb: &mut BasicBlock, result: InsnId) -> Result<(), Error> {
    set_sf(bb, result)?;
    set_zf(bb, result)?;
    set_pf(bb, result)?;
    bb.push_write_reg(Reg::Of.mreg(), false)?;
    bb.push_write_reg(Reg::Cf.mreg(), false)?;
    let af = bb.push_poison(Type::I1, "logical op leaves AF undefined")?;
    bb.push_write_reg(Reg::Af.mreg(), af)?;
    Ok(())
}

/// Writes `flag` to `new` unless `no_count` holds, in which case the
/// previous flag value is preserved. Used by the shift and rotate family,
/// whose flag effects are gated on a nonzero masked count.
pub(crate) fn write_flag_preserving(
    bb: &mut BasicBlock,
    flag: Reg,
    no_count: InsnId,
    new: impl Into<Operand>,
) -> Result<(), Error> {
    let old = bb.push_read_reg(Type::I1, flag.mreg())?;
    let value = bb.push_select(no_count, old, new.into())?;
    bb.push_write_reg(flag.mreg(), value)?;
    Ok(())
}
