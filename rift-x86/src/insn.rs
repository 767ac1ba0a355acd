use bitflags::bitflags;
use smallvec::SmallVec;

use crate::Reg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
/// Mnemonic of a decoded instruction, as delivered by the disassembler.
pub enum Mnemonic {
    Nop,
    Mov,
    Movzx,
    Movsx,
    Movsxd,
    Lea,
    Push,
    Pop,
    Movups,
    Movaps,
    Movupd,
    Movapd,
    Movdqu,
    Movdqa,
    Add,
    Sub,
    Inc,
    Dec,
    Neg,
    Or,
    And,
    Xor,
    Not,
    Shl,
    Shr,
    Sar,
    Rol,
    Ror,
    Cmp,
    Test,
    Call,
    Jmp,
    Ret,
    Ud2,
    Int3,
    Int1,
    Clc,
    Cdqe,
    Cqo,
    // Decoded but not yet translated; the lifter reports these as
    // unhandled rather than aborting.
    Xchg,
    Cmpxchg,
    Xadd,
    Adc,
    Sbb,
    Mul,
    Imul,
    Div,
    Idiv,
    Bt,
    Bts,
    Cpuid,
}

bitflags! {
    /// Attribute bits of a decoded instruction.
    pub struct InsnAttrs: u32 {
        /// `LOCK` prefix: read-modify-write forms become atomics.
        const LOCK = 0x01;
        /// `REP`/`REPE` prefix.
        const REP = 0x02;
        /// `REPNE` prefix.
        const REPNE = 0x04;
    }
}

/// Memory operand descriptor: `seg:[base + index * scale + disp]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRef {
    /// Segment override, if any.
    pub seg: Option<Reg>,
    /// Base register.
    pub base: Option<Reg>,
    /// Index register.
    pub index: Option<Reg>,
    /// Index scale: 1, 2, 4 or 8.
    pub scale: u8,
    /// Signed displacement.
    pub disp: i64,
    /// Access width in bits.
    pub width: u16,
}

impl MemRef {
    /// `[base]` at the given width.
    pub fn base(base: Reg, width: u16) -> Self {
        Self {
            seg: None,
            base: Some(base),
            index: None,
            scale: 1,
            disp: 0,
            width,
        }
    }

    /// Adds a displacement.
    pub fn with_disp(mut self, disp: i64) -> Self {
        self.disp = disp;
        self
    }

    /// Adds a scaled index register.
    pub fn with_index(mut self, index: Reg, scale: u8) -> Self {
        self.index = Some(index);
        self.scale = scale;
        self
    }

    /// Adds a segment override.
    pub fn with_seg(mut self, seg: Reg) -> Self {
        self.seg = Some(seg);
        self
    }
}

/// Immediate operand with its encoded width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Imm {
    /// Sign-extended value.
    pub value: i64,
    /// Encoded width in bits.
    pub width: u16,
}

/// One decoded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachOperand {
    /// Register operand.
    Reg(Reg),
    /// Memory operand.
    Mem(MemRef),
    /// Immediate operand.
    Imm(Imm),
}

impl MachOperand {
    /// Operand width in bits.
    pub fn width(&self) -> u16 {
        match self {
            MachOperand::Reg(r) => r.width(),
            MachOperand::Mem(m) => m.width,
            MachOperand::Imm(i) => i.width,
        }
    }

    /// The register, if this is a register operand.
    pub fn as_reg(&self) -> Option<Reg> {
        match self {
            MachOperand::Reg(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<Reg> for MachOperand {
    fn from(r: Reg) -> Self {
        MachOperand::Reg(r)
    }
}

impl From<MemRef> for MachOperand {
    fn from(m: MemRef) -> Self {
        MachOperand::Mem(m)
    }
}

/// A decoded machine instruction, the lifter's input.
///
/// This is the narrow waist between the disassembler front-end and the
/// semantic layer; nothing here depends on how the bytes were decoded.
#[derive(Debug, Clone)]
pub struct MachInsn {
    /// Mnemonic.
    pub mnemonic: Mnemonic,
    /// Decoded operands in encoding order.
    pub ops: SmallVec<[MachOperand; 4]>,
    /// Effective operand width in bits.
    pub effective_width: u16,
    /// Attribute bits, including `LOCK`.
    pub attrs: InsnAttrs,
    /// Address the instruction was decoded at.
    pub ip: u64,
}

impl MachInsn {
    /// Decoded instruction with the given operands; the effective width
    /// defaults to the first operand's width (64 for none).
    pub fn new(mnemonic: Mnemonic, ops: impl IntoIterator<Item = MachOperand>) -> Self {
        let ops: SmallVec<[MachOperand; 4]> = ops.into_iter().collect();
        let effective_width = ops.first().map(MachOperand::width).unwrap_or(64);
        Self {
            mnemonic,
            ops,
            effective_width,
            attrs: InsnAttrs::empty(),
            ip: 0,
        }
    }

    /// Overrides the effective operand width.
    pub fn with_width(mut self, bits: u16) -> Self {
        self.effective_width = bits;
        self
    }

    /// Marks the instruction `LOCK`-prefixed.
    pub fn locked(mut self) -> Self {
        self.attrs |= InsnAttrs::LOCK;
        self
    }

    /// Sets the decode address.
    pub fn at(mut self, ip: u64) -> Self {
        self.ip = ip;
        self
    }

    /// Immediate-operand convenience used by imm-carrying forms.
    pub fn imm(value: i64, width: u16) -> MachOperand {
        MachOperand::Imm(Imm { value, width })
    }
}
