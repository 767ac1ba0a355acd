//! Control transfer: CALL/JMP/RET and the trap family.

use rift_ir::{Constant, Op, Type};

use super::{read, read_reg, write_reg, Ctx};
use crate::{MachOperand, SemaError};

pub(super) fn call(cx: &mut Ctx) -> Result<(), SemaError> {
    let target = read(cx, 0, Type::Pointer)?;
    cx.bb.push_xcall(target)?;
    Ok(())
}

pub(super) fn jmp(cx: &mut Ctx) -> Result<(), SemaError> {
    let target = read(cx, 0, Type::Pointer)?;
    cx.bb.push_xjmp(target)?;
    Ok(())
}

/// RET; the `ret imm16` form releases callee-popped stack bytes before the
/// terminator.
pub(super) fn ret(cx: &mut Ctx) -> Result<(), SemaError> {
    if let Some(MachOperand::Imm(imm)) = cx.insn.ops.first().copied() {
        let sp = cx.mach.sp;
        let pty = cx.mach.ptr_int_type();
        let prev_sp = read_reg(cx, sp, pty)?;
        let new_sp = cx
            .bb
            .push_binop(Op::Add, prev_sp, Constant::int(pty, imm.value as i128))?;
        write_reg(cx, sp, new_sp)?;
    }
    cx.bb.push_ret([])?;
    Ok(())
}

pub(super) fn trap(cx: &mut Ctx, tag: &'static str) -> Result<(), SemaError> {
    cx.bb.push_trap(tag)?;
    Ok(())
}
