use rift_ir::{MReg, Type};

/// Register class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegKind {
    /// General purpose register at any width.
    Gpr,
    /// 128-bit vector register.
    Vector,
    /// Single-bit flag pseudo-register.
    Flag,
    /// Segment selector register.
    Segment,
    /// Instruction pointer.
    Ip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
#[repr(u16)]
/// Architectural register as named by the decoder.
///
/// Every sub-register name is its own enumerator; the lifter reads and
/// writes operands at their decoded width, so it never needs to reason
/// about aliasing between the forms. Flags are modeled as single-bit
/// pseudo-registers, matching how the IR consumes them.
pub enum Reg {
    // 64-bit general purpose.
    Rax,
    Rcx,
    Rdx,
    Rbx,
    Rsp,
    Rbp,
    Rsi,
    Rdi,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    // 32-bit forms.
    Eax,
    Ecx,
    Edx,
    Ebx,
    Esp,
    Ebp,
    Esi,
    Edi,
    R8d,
    R9d,
    R10d,
    R11d,
    R12d,
    R13d,
    R14d,
    R15d,
    // 16-bit forms.
    Ax,
    Cx,
    Dx,
    Bx,
    Sp,
    Bp,
    Si,
    Di,
    R8w,
    R9w,
    R10w,
    R11w,
    R12w,
    R13w,
    R14w,
    R15w,
    // 8-bit forms.
    Al,
    Cl,
    Dl,
    Bl,
    Spl,
    Bpl,
    Sil,
    Dil,
    R8b,
    R9b,
    R10b,
    R11b,
    R12b,
    R13b,
    R14b,
    R15b,
    Ah,
    Ch,
    Dh,
    Bh,
    // Vector registers.
    Xmm0,
    Xmm1,
    Xmm2,
    Xmm3,
    Xmm4,
    Xmm5,
    Xmm6,
    Xmm7,
    Xmm8,
    Xmm9,
    Xmm10,
    Xmm11,
    Xmm12,
    Xmm13,
    Xmm14,
    Xmm15,
    // Instruction pointer.
    Rip,
    // Segment selectors.
    Es,
    Cs,
    Ss,
    Ds,
    Fs,
    Gs,
    // Flag pseudo-registers.
    Cf,
    Pf,
    Af,
    Zf,
    Sf,
    Df,
    Of,
}

impl Reg {
    /// Register width in bits.
    pub const fn width(self) -> u16 {
        match self.kind() {
            RegKind::Vector => 128,
            RegKind::Flag => 1,
            RegKind::Segment => 16,
            RegKind::Ip => 64,
            RegKind::Gpr => match self {
                Reg::Rax
                | Reg::Rcx
                | Reg::Rdx
                | Reg::Rbx
                | Reg::Rsp
                | Reg::Rbp
                | Reg::Rsi
                | Reg::Rdi
                | Reg::R8
                | Reg::R9
                | Reg::R10
                | Reg::R11
                | Reg::R12
                | Reg::R13
                | Reg::R14
                | Reg::R15 => 64,
                Reg::Eax
                | Reg::Ecx
                | Reg::Edx
                | Reg::Ebx
                | Reg::Esp
                | Reg::Ebp
                | Reg::Esi
                | Reg::Edi
                | Reg::R8d
                | Reg::R9d
                | Reg::R10d
                | Reg::R11d
                | Reg::R12d
                | Reg::R13d
                | Reg::R14d
                | Reg::R15d => 32,
                Reg::Ax
                | Reg::Cx
                | Reg::Dx
                | Reg::Bx
                | Reg::Sp
                | Reg::Bp
                | Reg::Si
                | Reg::Di
                | Reg::R8w
                | Reg::R9w
                | Reg::R10w
                | Reg::R11w
                | Reg::R12w
                | Reg::R13w
                | Reg::R14w
                | Reg::R15w => 16,
                _ => 8,
            },
        }
    }

    /// Register class.
    pub const fn kind(self) -> RegKind {
        match self {
            Reg::Xmm0
            | Reg::Xmm1
            | Reg::Xmm2
            | Reg::Xmm3
            | Reg::Xmm4
            | Reg::Xmm5
            | Reg::Xmm6
            | Reg::Xmm7
            | Reg::Xmm8
            | Reg::Xmm9
            | Reg::Xmm10
            | Reg::Xmm11
            | Reg::Xmm12
            | Reg::Xmm13
            | Reg::Xmm14
            | Reg::Xmm15 => RegKind::Vector,
            Reg::Rip => RegKind::Ip,
            Reg::Es | Reg::Cs | Reg::Ss | Reg::Ds | Reg::Fs | Reg::Gs => RegKind::Segment,
            Reg::Cf | Reg::Pf | Reg::Af | Reg::Zf | Reg::Sf | Reg::Df | Reg::Of => {
                RegKind::Flag
            }
            _ => RegKind::Gpr,
        }
    }

    /// Natural IR type of a read or write at full register width.
    pub const fn ir_type(self) -> Type {
        match self.kind() {
            RegKind::Flag => Type::I1,
            RegKind::Vector => Type::I128,
            RegKind::Segment => Type::I16,
            RegKind::Ip => Type::I64,
            RegKind::Gpr => match self.width() {
                8 => Type::I8,
                16 => Type::I16,
                32 => Type::I32,
                _ => Type::I64,
            },
        }
    }

    /// Interned IR register name.
    pub const fn mreg(self) -> MReg {
        MReg(self as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn widths_and_kinds() {
        assert_eq!(Reg::Rax.width(), 64);
        assert_eq!(Reg::Eax.width(), 32);
        assert_eq!(Reg::Ax.width(), 16);
        assert_eq!(Reg::Ah.width(), 8);
        assert_eq!(Reg::Xmm3.width(), 128);
        assert_eq!(Reg::Zf.width(), 1);
        assert_eq!(Reg::Zf.kind(), RegKind::Flag);
        assert_eq!(Reg::Fs.kind(), RegKind::Segment);
        assert_eq!(Reg::Rip.ir_type(), Type::I64);
        assert_eq!(Reg::Ecx.ir_type(), Type::I32);
    }

    #[test]
    fn interned_names_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for reg in Reg::iter() {
            assert!(seen.insert(reg.mreg()), "{reg} collides");
        }
    }
}
