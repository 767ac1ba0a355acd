//! The x86 semantic lifter.
//!
//! One translator per mnemonic; each observably models the instruction's
//! effect on architectural state by emitting IR that reads and writes
//! registers, memory and flags into the supplied basic block. Translators
//! are deterministic and never touch IR outside that block.

mod alu;
mod data;
mod flags;
mod flow;

use rift_ir::{BasicBlock, Constant, Op, Operand, Seg, Type};

use crate::{Machine, MachInsn, MachOperand, MemRef, Mnemonic, Reg, SemaError};

/// Translation context handed to every translator.
pub(crate) struct Ctx<'a> {
    pub(crate) mach: &'a Machine,
    pub(crate) insn: &'a MachInsn,
    pub(crate) bb: &'a mut BasicBlock,
}

/// Lifts one decoded instruction into the block.
///
/// Emitted instructions are tagged with the decode address. Unhandled
/// mnemonics yield [`SemaError::UnhandledMnemonic`] and emit nothing;
/// callers are expected to continue with the next instruction.
#[tracing::instrument(name = "lift", level = "trace", skip(mach, bb), fields(mnemonic = %insn.mnemonic, ip = insn.ip))]
pub fn lift(mach: &Machine, insn: &MachInsn, bb: &mut BasicBlock) -> Result<(), SemaError> {
    bb.set_ip(insn.ip);
    let result = dispatch(&mut Ctx {
        mach,
        insn,
        bb: &mut *bb,
    });
    bb.clear_ip();
    result.map_err(|e| e.at(insn.ip))
}

fn dispatch(cx: &mut Ctx) -> Result<(), SemaError> {
    use Mnemonic::*;

    match cx.insn.mnemonic {
        Nop => Ok(()),
        Mov => data::mov(cx),
        Movzx => data::movzx(cx),
        Movsx | Movsxd => data::movsx(cx),
        Lea => data::lea(cx),
        Push => data::push(cx),
        Pop => data::pop(cx),
        Movups | Movaps => data::vector_mov(cx, Type::F32x4),
        Movupd | Movapd => data::vector_mov(cx, Type::F64x2),
        Movdqu | Movdqa => data::vector_mov(cx, Type::I32x4),
        Add => alu::add(cx),
        Sub => alu::sub(cx),
        Inc => alu::inc(cx),
        Dec => alu::dec(cx),
        Neg => alu::neg(cx),
        Or => alu::or(cx),
        And => alu::and(cx),
        Xor => alu::xor(cx),
        Not => alu::not(cx),
        Shl => alu::shift(cx, Op::BitShl),
        Shr => alu::shift(cx, Op::BitShr),
        Sar => alu::shift(cx, Op::BitSar),
        Rol => alu::rotate(cx, Op::BitRol),
        Ror => alu::rotate(cx, Op::BitRor),
        Cmp => alu::cmp(cx),
        Test => alu::test(cx),
        Clc => alu::clc(cx),
        Cdqe => alu::cdqe(cx),
        Cqo => alu::cqo(cx),
        Call => flow::call(cx),
        Jmp => flow::jmp(cx),
        Ret => flow::ret(cx),
        Ud2 => flow::trap(cx, "ud2"),
        Int3 => flow::trap(cx, "int3"),
        Int1 => flow::trap(cx, "int1"),
        other => Err(SemaError::UnhandledMnemonic(other)),
    }
}

/// Decoded operand by index.
pub(crate) fn operand(cx: &Ctx, index: usize) -> Result<MachOperand, SemaError> {
    cx.insn.ops.get(index).copied().ok_or(SemaError::BadOperand {
        mnemonic: cx.insn.mnemonic,
        index,
    })
}

/// Integer type of the instruction's effective operand width.
pub(crate) fn int_ty(cx: &Ctx) -> Result<Type, SemaError> {
    Ok(Type::try_int(cx.insn.effective_width)?)
}

/// Reads decoded operand `index` as a value of type `ty`, abstracting over
/// register, memory and immediate forms.
pub(crate) fn read(cx: &mut Ctx, index: usize, ty: Type) -> Result<Operand, SemaError> {
    match operand(cx, index)? {
        MachOperand::Reg(r) => read_reg(cx, r, ty),
        MachOperand::Imm(imm) => Ok(Constant::int(ty, imm.value as i128).into()),
        MachOperand::Mem(m) => {
            let (ptr, seg) = agen(cx, &m, false)?;
            Ok(cx.bb.push_load_mem(ty, seg, ptr)?.into())
        }
    }
}

/// Writes `value` to decoded operand `index`. Immediates are never a
/// destination.
pub(crate) fn write(
    cx: &mut Ctx,
    index: usize,
    value: impl Into<Operand>,
) -> Result<(), SemaError> {
    match operand(cx, index)? {
        MachOperand::Reg(r) => write_reg(cx, r, value),
        MachOperand::Mem(m) => {
            let (ptr, seg) = agen(cx, &m, true)?;
            cx.bb.push_store_mem(seg, ptr, value)?;
            Ok(())
        }
        MachOperand::Imm(_) => Err(SemaError::BadOperand {
            mnemonic: cx.insn.mnemonic,
            index,
        }),
    }
}

/// Reads a register as a value of type `ty`; a width mismatch against the
/// register reads the natural form and casts.
pub(crate) fn read_reg(cx: &mut Ctx, reg: Reg, ty: Type) -> Result<Operand, SemaError> {
    if ty.bit_width() == reg.width() {
        Ok(cx.bb.push_read_reg(ty, reg.mreg())?.into())
    } else {
        let natural = cx.bb.push_read_reg(reg.ir_type(), reg.mreg())?;
        Ok(cx.bb.push_cast(ty, natural)?.into())
    }
}

/// Writes a value into a register, casting on a width mismatch.
pub(crate) fn write_reg(
    cx: &mut Ctx,
    reg: Reg,
    value: impl Into<Operand>,
) -> Result<(), SemaError> {
    let value = value.into();
    let ty = cx.bb.operand_type(&value);
    if ty.bit_width() == reg.width() {
        cx.bb.push_write_reg(reg.mreg(), value)?;
    } else {
        let cast = cx.bb.push_cast(reg.ir_type(), value)?;
        cx.bb.push_write_reg(reg.mreg(), cast)?;
    }
    Ok(())
}

/// Effective-address generation: emits the pointer computation for a
/// memory operand and resolves its segment.
pub(crate) fn agen(
    cx: &mut Ctx,
    mem: &MemRef,
    _for_write: bool,
) -> Result<(Operand, Seg), SemaError> {
    let pty = cx.mach.ptr_int_type();

    let mut addr: Option<Operand> = match mem.base {
        Some(base) => Some(read_reg(cx, base, pty)?),
        None => None,
    };
    if let Some(index) = mem.index {
        let mut idx = read_reg(cx, index, pty)?;
        if mem.scale > 1 {
            idx = cx
                .bb
                .push_binop(Op::Mul, idx, Constant::int(pty, mem.scale as i128))?
                .into();
        }
        addr = Some(match addr {
            Some(a) => cx.bb.push_binop(Op::Add, a, idx)?.into(),
            None => idx,
        });
    }
    let addr = match (addr, mem.disp) {
        (None, disp) => Constant::int(pty, disp as i128).into(),
        (Some(a), 0) => a,
        (Some(a), disp) => cx
            .bb
            .push_binop(Op::Add, a, Constant::int(pty, disp as i128))?
            .into(),
    };
    let ptr = cx.bb.push_cast(Type::Pointer, addr)?;
    Ok((ptr.into(), segment(mem.seg)))
}

/// Segment selector of a memory operand's override, flat otherwise.
pub(crate) fn segment(seg: Option<Reg>) -> Seg {
    match seg {
        Some(Reg::Es) => Seg(1),
        Some(Reg::Cs) => Seg(2),
        Some(Reg::Ss) => Seg(3),
        Some(Reg::Ds) => Seg(4),
        Some(Reg::Fs) => Seg(5),
        Some(Reg::Gs) => Seg(6),
        _ => Seg::NONE,
    }
}
