//! Arithmetic, logic, shifts, rotates and the compare family.
//!
//! The read-modify-write forms split on `LOCK`: the plain path reads the
//! destination, computes and writes back; the locked path emits an atomic
//! read-modify-write against the memory operand and recomputes the result
//! from the returned pre-image for the flag network.

use rift_ir::{Constant, InsnId, Op, Operand, Type};

use super::flags::{
    parity, set_af, set_af_neg, set_flags_logical, set_of_add, set_of_sub, set_pf, set_sf,
    set_zf, write_flag_preserving,
};
use super::{agen, int_ty, operand, read, read_reg, write, write_reg, Ctx};
use crate::{InsnAttrs, MachOperand, Reg, SemaError};

/// Plain or locked read-modify-write through a binary operator; returns
/// the left-hand pre-image and the computed result.
fn rmw_binop(cx: &mut Ctx, op: Op, rhs: Operand) -> Result<(Operand, InsnId), SemaError> {
    let ty = int_ty(cx)?;
    if cx.insn.attrs.contains(InsnAttrs::LOCK) {
        let MachOperand::Mem(m) = operand(cx, 0)? else {
            return Err(SemaError::BadOperand {
                mnemonic: cx.insn.mnemonic,
                index: 0,
            });
        };
        let (ptr, seg) = agen(cx, &m, true)?;
        let pre = cx.bb.push_atomic_binop(op, seg, ptr, rhs.clone())?;
        let result = cx.bb.push_binop(op, pre, rhs)?;
        Ok((pre.into(), result))
    } else {
        let lhs = read(cx, 0, ty)?;
        let result = cx.bb.push_binop(op, lhs.clone(), rhs)?;
        write(cx, 0, result)?;
        Ok((lhs, result))
    }
}

/// Unary counterpart of [`rmw_binop`] for NEG and NOT.
fn rmw_unop(cx: &mut Ctx, op: Op) -> Result<(Operand, InsnId), SemaError> {
    let ty = int_ty(cx)?;
    if cx.insn.attrs.contains(InsnAttrs::LOCK) {
        let MachOperand::Mem(m) = operand(cx, 0)? else {
            return Err(SemaError::BadOperand {
                mnemonic: cx.insn.mnemonic,
                index: 0,
            });
        };
        let (ptr, seg) = agen(cx, &m, true)?;
        let pre = cx.bb.push_atomic_unop(ty, op, seg, ptr)?;
        let result = cx.bb.push_unop(op, pre)?;
        Ok((pre.into(), result))
    } else {
        let lhs = read(cx, 0, ty)?;
        let result = cx.bb.push_unop(op, lhs.clone())?;
        write(cx, 0, result)?;
        Ok((lhs, result))
    }
}

pub(super) fn add(cx: &mut Ctx) -> Result<(), SemaError> {
    let ty = int_ty(cx)?;
    let rhs = read(cx, 1, ty)?;
    let (lhs, result) = rmw_binop(cx, Op::Add, rhs.clone())?;

    set_af(cx.bb, &lhs, &rhs, result)?;
    set_sf(cx.bb, result)?;
    set_zf(cx.bb, result)?;
    set_pf(cx.bb, result)?;
    set_of_add(cx.bb, &lhs, &rhs, result)?;
    // CF: unsigned wrap, result below either operand.
    let c0 = cx.bb.push_cmp(Op::Ult, result, lhs)?;
    let c1 = cx.bb.push_cmp(Op::Ult, result, rhs)?;
    let cf = cx.bb.push_binop(Op::BitOr, c0, c1)?;
    cx.bb.push_write_reg(Reg::Cf.mreg(), cf)?;
    Ok(())
}

pub(super) fn sub(cx: &mut Ctx) -> Result<(), SemaError> {
    let ty = int_ty(cx)?;
    let rhs = read(cx, 1, ty)?;
    let (lhs, result) = rmw_binop(cx, Op::Sub, rhs.clone())?;

    set_af(cx.bb, &lhs, &rhs, result)?;
    set_sf(cx.bb, result)?;
    set_zf(cx.bb, result)?;
    set_pf(cx.bb, result)?;
    set_of_sub(cx.bb, &lhs, &rhs, result)?;
    let cf = cx.bb.push_cmp(Op::Ult, lhs, rhs)?;
    cx.bb.push_write_reg(Reg::Cf.mreg(), cf)?;
    Ok(())
}

pub(super) fn inc(cx: &mut Ctx) -> Result<(), SemaError> {
    step(cx, Op::Add)
}

pub(super) fn dec(cx: &mut Ctx) -> Result<(), SemaError> {
    step(cx, Op::Sub)
}

/// INC/DEC: ADD/SUB by one that leaves CF untouched.
fn step(cx: &mut Ctx, op: Op) -> Result<(), SemaError> {
    let ty = int_ty(cx)?;
    let rhs: Operand = Constant::int(ty, 1).into();
    let (lhs, result) = rmw_binop(cx, op, rhs.clone())?;

    set_af(cx.bb, &lhs, &rhs, result)?;
    set_sf(cx.bb, result)?;
    set_zf(cx.bb, result)?;
    set_pf(cx.bb, result)?;
    match op {
        Op::Add => set_of_add(cx.bb, &lhs, &rhs, result)?,
        _ => set_of_sub(cx.bb, &lhs, &rhs, result)?,
    }
    Ok(())
}

pub(super) fn neg(cx: &mut Ctx) -> Result<(), SemaError> {
    let ty = int_ty(cx)?;
    let (lhs, result) = rmw_unop(cx, Op::Neg)?;

    set_af_neg(cx.bb, &lhs, result)?;
    set_sf(cx.bb, result)?;
    set_zf(cx.bb, result)?;
    set_pf(cx.bb, result)?;
    let cf = cx.bb.push_cmp(Op::Ne, lhs.clone(), Constant::int(ty, 0))?;
    cx.bb.push_write_reg(Reg::Cf.mreg(), cf)?;
    // OF: negating the minimum value overflows back onto itself.
    let min = Constant::int(ty, (1u128 << (ty.bit_width() - 1)) as i128);
    let of = cx.bb.push_cmp(Op::Eq, lhs, min)?;
    cx.bb.push_write_reg(Reg::Of.mreg(), of)?;
    Ok(())
}

pub(super) fn or(cx: &mut Ctx) -> Result<(), SemaError> {
    logical(cx, Op::BitOr)
}

pub(super) fn and(cx: &mut Ctx) -> Result<(), SemaError> {
    logical(cx, Op::BitAnd)
}

/// `xor reg, reg` over the same register is the zero idiom: the flag
/// outcome is constant and the register write needs no xor at all.
pub(super) fn xor(cx: &mut Ctx) -> Result<(), SemaError> {
    if let (Ok(MachOperand::Reg(a)), Ok(MachOperand::Reg(b))) = (operand(cx, 0), operand(cx, 1)) {
        if a == b {
            cx.bb.push_write_reg(Reg::Sf.mreg(), false)?;
            cx.bb.push_write_reg(Reg::Zf.mreg(), true)?;
            cx.bb.push_write_reg(Reg::Pf.mreg(), true)?;
            cx.bb.push_write_reg(Reg::Of.mreg(), false)?;
            cx.bb.push_write_reg(Reg::Cf.mreg(), false)?;
            cx.bb.push_write_reg(Reg::Af.mreg(), false)?;
            let ty = int_ty(cx)?;
            return write_reg(cx, a, Constant::int(ty, 0));
        }
    }
    logical(cx, Op::BitXor)
}

fn logical(cx: &mut Ctx, op: Op) -> Result<(), SemaError> {
    let ty = int_ty(cx)?;
    let rhs = read(cx, 1, ty)?;
    let (_lhs, result) = rmw_binop(cx, op, rhs)?;
    set_flags_logical(cx.bb, result)?;
    Ok(())
}

/// NOT affects no flags.
pub(super) fn not(cx: &mut Ctx) -> Result<(), SemaError> {
    rmw_unop(cx, Op::BitNot)?;
    Ok(())
}

/// SHL/SHR/SAR.
///
/// The count is masked to the operand width's count mask first, exactly as
/// the CPU masks it. Flags the ISA defines are computed with count-zero
/// preservation: SF/ZF/PF from the result, CF as the last bit shifted out,
/// OF for the 1-bit forms. OF for larger counts and AF for any nonzero
/// count are architecturally undefined and stay poison.
pub(super) fn shift(cx: &mut Ctx, op: Op) -> Result<(), SemaError> {
    let ty = int_ty(cx)?;
    let w = ty.bit_width();
    let count_mask = if w == 64 { 63 } else { 31 };

    let rhs = read(cx, 1, ty)?;
    let lhs = read(cx, 0, ty)?;
    let amt = cx
        .bb
        .push_binop(Op::BitAnd, rhs, Constant::int(ty, count_mask))?;
    let result = cx.bb.push_binop(op, lhs.clone(), amt)?;
    write(cx, 0, result)?;

    let no_count = cx.bb.push_cmp(Op::Eq, amt, Constant::int(ty, 0))?;

    let sf = cx.bb.push_cmp(Op::Slt, result, Constant::int(ty, 0))?;
    write_flag_preserving(cx.bb, Reg::Sf, no_count, sf)?;
    let zf = cx.bb.push_cmp(Op::Eq, result, Constant::int(ty, 0))?;
    write_flag_preserving(cx.bb, Reg::Zf, no_count, zf)?;
    let pf = parity(cx.bb, result)?;
    write_flag_preserving(cx.bb, Reg::Pf, no_count, pf)?;

    // CF: the last bit shifted out of the destination.
    let out_pos = match op {
        Op::BitShl => cx
            .bb
            .push_binop(Op::Sub, Constant::int(ty, w as i128), amt)?,
        _ => cx.bb.push_binop(Op::Sub, amt, Constant::int(ty, 1))?,
    };
    let out = cx.bb.push_binop(Op::BitShr, lhs.clone(), out_pos)?;
    let bit = cx.bb.push_binop(Op::BitAnd, out, Constant::int(ty, 1))?;
    let cf = cx.bb.push_cmp(Op::Ne, bit, Constant::int(ty, 0))?;
    write_flag_preserving(cx.bb, Reg::Cf, no_count, cf)?;

    // OF is defined for 1-bit shifts only.
    let one_count = cx.bb.push_cmp(Op::Eq, amt, Constant::int(ty, 1))?;
    let of_one: Operand = match op {
        Op::BitShl => {
            let msb = cx.bb.push_cmp(Op::Slt, result, Constant::int(ty, 0))?;
            cx.bb.push_binop(Op::BitXor, msb, cf)?.into()
        }
        Op::BitShr => cx
            .bb
            .push_cmp(Op::Slt, lhs, Constant::int(ty, 0))?
            .into(),
        _ => Constant::bool(false).into(),
    };
    let of_undef = cx
        .bb
        .push_poison(Type::I1, "shift count above one leaves OF undefined")?;
    let of = cx.bb.push_select(one_count, of_one, of_undef)?;
    write_flag_preserving(cx.bb, Reg::Of, no_count, of)?;

    let af_undef = cx.bb.push_poison(Type::I1, "shift leaves AF undefined")?;
    write_flag_preserving(cx.bb, Reg::Af, no_count, af_undef)?;
    Ok(())
}

/// ROL/ROR.
///
/// SF/ZF/PF/AF are untouched. CF receives the wrapped bit for a nonzero
/// masked count; OF is defined for the 1-bit forms only.
pub(super) fn rotate(cx: &mut Ctx, op: Op) -> Result<(), SemaError> {
    let ty = int_ty(cx)?;
    let w = ty.bit_width();
    let count_mask = if w == 64 { 63 } else { 31 };

    let rhs = read(cx, 1, ty)?;
    let lhs = read(cx, 0, ty)?;
    let amt = cx
        .bb
        .push_binop(Op::BitAnd, rhs, Constant::int(ty, count_mask))?;
    let result = cx.bb.push_binop(op, lhs, amt)?;
    write(cx, 0, result)?;

    let no_count = cx.bb.push_cmp(Op::Eq, amt, Constant::int(ty, 0))?;

    // CF: the bit that wrapped around.
    let cf = match op {
        Op::BitRol => {
            let bit = cx.bb.push_binop(Op::BitAnd, result, Constant::int(ty, 1))?;
            cx.bb.push_cmp(Op::Ne, bit, Constant::int(ty, 0))?
        }
        _ => cx.bb.push_cmp(Op::Slt, result, Constant::int(ty, 0))?,
    };
    write_flag_preserving(cx.bb, Reg::Cf, no_count, cf)?;

    let one_count = cx.bb.push_cmp(Op::Eq, amt, Constant::int(ty, 1))?;
    let msb = cx.bb.push_cmp(Op::Slt, result, Constant::int(ty, 0))?;
    let of_one = match op {
        Op::BitRol => cx.bb.push_binop(Op::BitXor, msb, cf)?,
        _ => {
            let next = cx
                .bb
                .push_binop(Op::BitShr, result, Constant::int(ty, (w - 2) as i128))?;
            let next_bit = cx.bb.push_binop(Op::BitAnd, next, Constant::int(ty, 1))?;
            let next_set = cx.bb.push_cmp(Op::Ne, next_bit, Constant::int(ty, 0))?;
            cx.bb.push_binop(Op::BitXor, msb, next_set)?
        }
    };
    let of_undef = cx
        .bb
        .push_poison(Type::I1, "rotate count above one leaves OF undefined")?;
    let of = cx.bb.push_select(one_count, of_one, of_undef)?;
    write_flag_preserving(cx.bb, Reg::Of, no_count, of)?;
    Ok(())
}

/// CMP: SUB without the writeback.
pub(super) fn cmp(cx: &mut Ctx) -> Result<(), SemaError> {
    let ty = int_ty(cx)?;
    let lhs = read(cx, 0, ty)?;
    let rhs = read(cx, 1, ty)?;
    let result = cx.bb.push_binop(Op::Sub, lhs.clone(), rhs.clone())?;

    set_af(cx.bb, &lhs, &rhs, result)?;
    set_sf(cx.bb, result)?;
    set_zf(cx.bb, result)?;
    set_pf(cx.bb, result)?;
    set_of_sub(cx.bb, &lhs, &rhs, result)?;
    let cf = cx.bb.push_cmp(Op::Ult, lhs, rhs)?;
    cx.bb.push_write_reg(Reg::Cf.mreg(), cf)?;
    Ok(())
}

/// TEST: AND without the writeback.
pub(super) fn test(cx: &mut Ctx) -> Result<(), SemaError> {
    let ty = int_ty(cx)?;
    let lhs = read(cx, 0, ty)?;
    let rhs = read(cx, 1, ty)?;
    let result = cx.bb.push_binop(Op::BitAnd, lhs, rhs)?;
    set_flags_logical(cx.bb, result)?;
    Ok(())
}

pub(super) fn clc(cx: &mut Ctx) -> Result<(), SemaError> {
    cx.bb.push_write_reg(Reg::Cf.mreg(), false)?;
    Ok(())
}

/// CDQE: sign-extend EAX into RAX.
pub(super) fn cdqe(cx: &mut Ctx) -> Result<(), SemaError> {
    let low = read_reg(cx, Reg::Eax, Type::I32)?;
    let wide = cx.bb.push_sign_extend(Type::I64, low)?;
    write_reg(cx, Reg::Rax, wide)
}

/// CQO: fill RDX with the sign of RAX.
pub(super) fn cqo(cx: &mut Ctx) -> Result<(), SemaError> {
    let acc = read_reg(cx, Reg::Rax, Type::I64)?;
    let sign = cx.bb.push_binop(Op::BitSar, acc, Constant::int(Type::I64, 63))?;
    write_reg(cx, Reg::Rdx, sign)
}
