//! Data movement: MOV and friends, LEA, PUSH/POP, vector transfers.

use rift_ir::{Constant, Op, Seg, Type};

use super::{agen, int_ty, operand, read, read_reg, write, write_reg, Ctx};
use crate::{MachOperand, SemaError};

/// `mov reg, reg` over the same register is a no-op; everything else is a
/// width-typed transfer.
pub(super) fn mov(cx: &mut Ctx) -> Result<(), SemaError> {
    if let (Ok(MachOperand::Reg(a)), Ok(MachOperand::Reg(b))) = (operand(cx, 0), operand(cx, 1)) {
        if a == b {
            return Ok(());
        }
    }
    let ty = int_ty(cx)?;
    let value = read(cx, 1, ty)?;
    write(cx, 0, value)
}

pub(super) fn movzx(cx: &mut Ctx) -> Result<(), SemaError> {
    widen(cx, false)
}

pub(super) fn movsx(cx: &mut Ctx) -> Result<(), SemaError> {
    widen(cx, true)
}

/// Reads the source at its own width and widens to the destination width.
fn widen(cx: &mut Ctx, signed: bool) -> Result<(), SemaError> {
    let dst_ty = Type::try_int(operand(cx, 0)?.width())?;
    let src_ty = Type::try_int(operand(cx, 1)?.width())?;
    let value = read(cx, 1, src_ty)?;
    let wide = if signed {
        cx.bb.push_sign_extend(dst_ty, value)?
    } else {
        cx.bb.push_cast(dst_ty, value)?
    };
    write(cx, 0, wide)
}

/// `lea reg, [reg]` with no index, displacement or segment over the same
/// register is a no-op; everything else materializes the effective
/// address.
pub(super) fn lea(cx: &mut Ctx) -> Result<(), SemaError> {
    let dst = operand(cx, 0)?;
    let MachOperand::Mem(m) = operand(cx, 1)? else {
        return Err(SemaError::BadOperand {
            mnemonic: cx.insn.mnemonic,
            index: 1,
        });
    };
    let Some(dst_reg) = dst.as_reg() else {
        return Err(SemaError::BadOperand {
            mnemonic: cx.insn.mnemonic,
            index: 0,
        });
    };
    if m.index.is_none() && m.disp == 0 && m.seg.is_none() && m.base == Some(dst_reg) {
        return Ok(());
    }
    let (ptr, _seg) = agen(cx, &m, false)?;
    write_reg(cx, dst_reg, ptr)
}

/// Decrements SP by the operand width in bytes (2 for a 16-bit operand,
/// pointer width otherwise) and stores the value at the new SP.
pub(super) fn push(cx: &mut Ctx) -> Result<(), SemaError> {
    let sp = cx.mach.sp;
    let pty = cx.mach.ptr_int_type();
    let ty = int_ty(cx)?;
    let delta = if cx.insn.effective_width == 16 {
        2
    } else {
        cx.mach.ptr_bytes() as i128
    };

    let prev_sp = read_reg(cx, sp, pty)?;
    let value = read(cx, 0, ty)?;
    let new_sp = cx
        .bb
        .push_binop(Op::Sub, prev_sp, Constant::int(pty, delta))?;
    write_reg(cx, sp, new_sp)?;

    let ptr = cx.bb.push_cast(Type::Pointer, new_sp)?;
    cx.bb.push_store_mem(Seg::NONE, ptr, value)?;
    Ok(())
}

/// Loads from SP, writes the destination, then increments SP. The load is
/// emitted before the SP update to honor fault ordering.
pub(super) fn pop(cx: &mut Ctx) -> Result<(), SemaError> {
    let sp = cx.mach.sp;
    let pty = cx.mach.ptr_int_type();
    let ty = int_ty(cx)?;
    let delta = if cx.insn.effective_width == 16 {
        2
    } else {
        cx.mach.ptr_bytes() as i128
    };

    let prev_sp = read_reg(cx, sp, pty)?;
    let ptr = cx.bb.push_cast(Type::Pointer, prev_sp.clone())?;
    let value = cx.bb.push_load_mem(ty, Seg::NONE, ptr)?;

    let new_sp = cx
        .bb
        .push_binop(Op::Add, prev_sp, Constant::int(pty, delta))?;
    write_reg(cx, sp, new_sp)?;

    write(cx, 0, value)
}

/// Vector transfers move a fixed 128-bit lane type regardless of
/// alignment.
pub(super) fn vector_mov(cx: &mut Ctx, ty: Type) -> Result<(), SemaError> {
    let value = read(cx, 1, ty)?;
    write(cx, 0, value)
}
