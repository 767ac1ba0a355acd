use core::fmt;
use std::borrow::Cow;

use crate::{MReg, Op, Seg, Type};

/// A typed compile-time constant.
///
/// Storage types carry a raw little-endian bit pattern; the interned kinds
/// carry the selector they name. Constants are plain values with no identity
/// and never participate in use-lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constant {
    ty: Type,
    payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum Payload {
    Bits(u128),
    Op(Op),
    Reg(MReg),
    Seg(Seg),
    Str(Cow<'static, str>),
}

impl Constant {
    /// Constant of a storage type from an integer bit pattern, masked to the
    /// type's width. Signed values extend naturally, so `int(I32, -1)` holds
    /// `0xffff_ffff`.
    pub fn int(ty: Type, value: impl Into<i128>) -> Self {
        debug_assert!(ty.is_storage(), "{ty} has no bit pattern");
        Self {
            ty,
            payload: Payload::Bits(value.into() as u128 & mask(ty)),
        }
    }

    /// `i1` constant.
    pub fn bool(value: bool) -> Self {
        Self::int(Type::I1, value as i128)
    }

    /// Single precision float constant.
    pub fn f32(value: f32) -> Self {
        Self {
            ty: Type::F32,
            payload: Payload::Bits(value.to_bits() as u128),
        }
    }

    /// Double precision float constant.
    pub fn f64(value: f64) -> Self {
        Self {
            ty: Type::F64,
            payload: Payload::Bits(value.to_bits() as u128),
        }
    }

    /// Interned operator selector.
    pub fn op(op: Op) -> Self {
        Self {
            ty: Type::Op,
            payload: Payload::Op(op),
        }
    }

    /// Interned machine register name.
    pub fn reg(reg: MReg) -> Self {
        Self {
            ty: Type::Reg,
            payload: Payload::Reg(reg),
        }
    }

    /// Interned segment selector.
    pub fn seg(seg: Seg) -> Self {
        Self {
            ty: Type::Seg,
            payload: Payload::Seg(seg),
        }
    }

    /// Interned tag string.
    pub fn str(tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            ty: Type::Str,
            payload: Payload::Str(tag.into()),
        }
    }

    /// The constant's type.
    pub const fn ty(&self) -> Type {
        self.ty
    }

    /// Raw bit pattern; zero for interned kinds.
    pub fn as_u128(&self) -> u128 {
        match self.payload {
            Payload::Bits(b) => b,
            _ => 0,
        }
    }

    /// Low 64 bits of the pattern.
    pub fn as_u64(&self) -> u64 {
        self.as_u128() as u64
    }

    /// Pattern sign-extended from the type's width.
    pub fn as_i128(&self) -> i128 {
        let w = self.ty.bit_width() as u32;
        if w == 0 || w == 128 {
            return self.as_u128() as i128;
        }
        let shift = 128 - w;
        ((self.as_u128() as i128) << shift) >> shift
    }

    /// Low 64 bits, sign-extended from the type's width.
    pub fn as_i64(&self) -> i64 {
        self.as_i128() as i64
    }

    /// Boolean payload of an `i1` (low bit otherwise).
    pub fn as_bool(&self) -> bool {
        self.as_u128() & 1 != 0
    }

    /// Operator payload, if this is an interned operator.
    pub fn as_op(&self) -> Option<Op> {
        match self.payload {
            Payload::Op(op) => Some(op),
            _ => None,
        }
    }

    /// Register payload, if this is an interned register name.
    pub fn as_reg(&self) -> Option<MReg> {
        match self.payload {
            Payload::Reg(r) => Some(r),
            _ => None,
        }
    }

    /// Segment payload, if this is an interned segment selector.
    pub fn as_seg(&self) -> Option<Seg> {
        match self.payload {
            Payload::Seg(s) => Some(s),
            _ => None,
        }
    }

    /// Tag string payload, if this is an interned string.
    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Reinterprets the bit pattern as another type of equal storage size.
    ///
    /// Total whenever both types have storage and the sizes match.
    pub fn bitcast(&self, into: Type) -> Option<Constant> {
        if !self.ty.is_storage() || !into.is_storage() {
            return None;
        }
        if self.ty.bit_width() != into.bit_width() {
            return None;
        }
        Some(Constant {
            ty: into,
            payload: self.payload.clone(),
        })
    }

    /// Zero-extending cast between integer-storage types; narrowing
    /// truncates.
    pub fn cast_zx(&self, into: Type) -> Option<Constant> {
        if !int_like(self.ty) || !int_like(into) {
            return None;
        }
        Some(Constant::int(into, self.as_u128() as i128))
    }

    /// Sign-extending cast between integer-storage types; narrowing
    /// truncates.
    pub fn cast_sx(&self, into: Type) -> Option<Constant> {
        if !int_like(self.ty) || !int_like(into) {
            return None;
        }
        Some(Constant::int(into, self.as_i128()))
    }

    /// Evaluates a unary operator over this constant.
    ///
    /// Returns `None` when the operator is not unary or the type is not an
    /// integer.
    pub fn apply_unary(&self, op: Op) -> Option<Constant> {
        if !int_like(self.ty) {
            return None;
        }
        let bits = self.as_u128();
        let out = match op {
            Op::Neg => bits.wrapping_neg(),
            Op::BitNot => !bits,
            _ => return None,
        };
        Some(Constant::int(self.ty, (out & mask(self.ty)) as i128))
    }

    /// Evaluates a binary operator over two constants of the same integer
    /// type, producing the result constant (`i1` for comparisons).
    ///
    /// Returns `None` for every undefined case: mismatched or non-integer
    /// operand types, division or remainder by zero, signed division
    /// overflow, and shift or rotate amounts at or above the bit width.
    pub fn apply(&self, op: Op, rhs: &Constant) -> Option<Constant> {
        if self.ty != rhs.ty || !int_like(self.ty) {
            return None;
        }
        let ty = self.ty;
        let w = ty.bit_width() as u32;
        let m = mask(ty);
        let (a, b) = (self.as_u128(), rhs.as_u128());
        let (sa, sb) = (self.as_i128(), rhs.as_i128());

        if op.is_comparison() {
            let v = match op {
                Op::Eq => a == b,
                Op::Ne => a != b,
                Op::Ult => a < b,
                Op::Ule => a <= b,
                Op::Ugt => a > b,
                Op::Uge => a >= b,
                Op::Slt => sa < sb,
                Op::Sle => sa <= sb,
                Op::Sgt => sa > sb,
                Op::Sge => sa >= sb,
                _ => unreachable!(),
            };
            return Some(Constant::bool(v));
        }

        let out = match op {
            Op::Add => a.wrapping_add(b),
            Op::Sub => a.wrapping_sub(b),
            Op::Mul => a.wrapping_mul(b),
            Op::Udiv => a.checked_div(b)?,
            Op::Urem => a.checked_rem(b)?,
            // Signed division evaluates at 128 bits, so the narrow-width
            // overflow case (minimum / -1) must be rejected explicitly.
            Op::Sdiv | Op::Srem => {
                let min = -1i128 << (w - 1);
                if sb == 0 || (sa == min && sb == -1) {
                    return None;
                }
                match op {
                    Op::Sdiv => (sa / sb) as u128,
                    _ => (sa % sb) as u128,
                }
            }
            Op::BitAnd => a & b,
            Op::BitOr => a | b,
            Op::BitXor => a ^ b,
            Op::BitShl | Op::BitShr | Op::BitSar | Op::BitRor | Op::BitRol => {
                let n = b;
                if n >= w as u128 {
                    return None;
                }
                let n = n as u32;
                match op {
                    Op::BitShl => a << n,
                    Op::BitShr => a >> n,
                    Op::BitSar => (sa >> n) as u128,
                    Op::BitRol if n == 0 => a,
                    Op::BitRol => (a << n) | (a >> (w - n)),
                    Op::BitRor if n == 0 => a,
                    Op::BitRor => (a >> n) | (a << (w - n)),
                    _ => unreachable!(),
                }
            }
            _ => return None,
        };
        Some(Constant::int(ty, (out & m) as i128))
    }
}

/// Integer-storage types, i.e. everything `apply` and the integer casts
/// operate on. Pointers are 64-bit patterns and participate.
fn int_like(ty: Type) -> bool {
    ty.is_integer() || ty == Type::Pointer
}

const fn mask(ty: Type) -> u128 {
    match ty.bit_width() {
        0 => 0,
        128 => u128::MAX,
        w => (1u128 << w) - 1,
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Bits(_) => match self.ty {
                Type::I1 => write!(f, "{}", self.as_bool()),
                Type::Pointer => write!(f, "{:#x}", self.as_u64()),
                Type::F32 => write!(f, "{}", f32::from_bits(self.as_u64() as u32)),
                Type::F64 => write!(f, "{}", f64::from_bits(self.as_u64())),
                ty if ty.is_vector() || ty == Type::I128 => {
                    write!(f, "{:#x}", self.as_u128())
                }
                _ => write!(f, "{}", self.as_i64()),
            },
            Payload::Op(op) => write!(f, "{op}"),
            Payload::Reg(r) => write!(f, "{r}"),
            Payload::Seg(s) => write!(f, "{s}"),
            Payload::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_and_extraction() {
        let c = Constant::int(Type::I32, -1);
        assert_eq!(c.as_u128(), 0xffff_ffff);
        assert_eq!(c.as_i64(), -1);
        assert_eq!(Constant::int(Type::I8, 0x1ff).as_u64(), 0xff);
        assert!(Constant::bool(true).as_bool());
    }

    #[test]
    fn apply_arithmetic() {
        let a = Constant::int(Type::I32, 3);
        let b = Constant::int(Type::I32, 4);
        assert_eq!(a.apply(Op::Add, &b), Some(Constant::int(Type::I32, 7)));
        assert_eq!(a.apply(Op::Sub, &b), Some(Constant::int(Type::I32, -1)));
        assert_eq!(
            Constant::int(Type::I8, 0x7f).apply(Op::Add, &Constant::int(Type::I8, 1)),
            Some(Constant::int(Type::I8, -128))
        );
    }

    #[test]
    fn apply_undefined_cases() {
        let a = Constant::int(Type::I32, 10);
        let zero = Constant::int(Type::I32, 0);
        assert_eq!(a.apply(Op::Udiv, &zero), None);
        assert_eq!(a.apply(Op::Srem, &zero), None);
        // Signed division overflow.
        let min = Constant::int(Type::I32, i32::MIN);
        let neg1 = Constant::int(Type::I32, -1);
        assert_eq!(min.apply(Op::Sdiv, &neg1), None);
        // Mixed types never evaluate.
        assert_eq!(a.apply(Op::Add, &Constant::int(Type::I64, 1)), None);
        // Shift amount at or above the width.
        let big = Constant::int(Type::I32, 32);
        assert_eq!(a.apply(Op::BitShl, &big), None);
        assert_eq!(a.apply(Op::BitRor, &big), None);
    }

    #[test]
    fn apply_shifts_and_rotates() {
        let a = Constant::int(Type::I8, 0b1000_0001u8 as i8);
        let one = Constant::int(Type::I8, 1);
        assert_eq!(
            a.apply(Op::BitShr, &one),
            Some(Constant::int(Type::I8, 0b0100_0000))
        );
        assert_eq!(
            a.apply(Op::BitSar, &one),
            Some(Constant::int(Type::I8, 0b1100_0000u8 as i8))
        );
        assert_eq!(
            a.apply(Op::BitRol, &one),
            Some(Constant::int(Type::I8, 0b0000_0011))
        );
        assert_eq!(
            a.apply(Op::BitRor, &one),
            Some(Constant::int(Type::I8, 0b1100_0000u8 as i8))
        );
    }

    #[test]
    fn apply_comparisons() {
        let a = Constant::int(Type::I16, -2);
        let b = Constant::int(Type::I16, 1);
        assert_eq!(a.apply(Op::Slt, &b), Some(Constant::bool(true)));
        // -2 is a large unsigned pattern.
        assert_eq!(a.apply(Op::Ult, &b), Some(Constant::bool(false)));
        assert_eq!(a.apply(Op::Eq, &a.clone()), Some(Constant::bool(true)));
    }

    #[test]
    fn casts() {
        let c = Constant::int(Type::I8, -1);
        assert_eq!(c.cast_zx(Type::I32), Some(Constant::int(Type::I32, 0xff)));
        assert_eq!(c.cast_sx(Type::I32), Some(Constant::int(Type::I32, -1)));
        // Narrowing truncates.
        let w = Constant::int(Type::I32, 0x1_0042);
        assert_eq!(w.cast_zx(Type::I16), Some(Constant::int(Type::I16, 0x42)));
        // Same-size casts are the identity on the pattern.
        assert_eq!(
            Constant::int(Type::I64, 7).cast_zx(Type::Pointer),
            Some(Constant::int(Type::Pointer, 7))
        );
    }

    #[test]
    fn bitcast_requires_equal_size() {
        let c = Constant::f32(1.5);
        let as_int = c.bitcast(Type::I32).unwrap();
        assert_eq!(as_int.as_u64(), 1.5f32.to_bits() as u64);
        assert_eq!(as_int.bitcast(Type::F32), Some(c));
        assert_eq!(Constant::int(Type::I32, 1).bitcast(Type::I64), None);
        assert_eq!(Constant::op(Op::Add).bitcast(Type::I8), None);
    }
}
