use core::fmt;

use crate::Error;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
/// Value type of the intermediate representation.
///
/// This is a closed enumeration; there is no subtyping and types compare by
/// value only. `None`, `Pack` and the interned kinds (`Op`, `Reg`, `Seg`,
/// `Str`) carry no storage and only appear in opcode schemas or as
/// compile-time constant operands.
pub enum Type {
    /// Absence of a value, the result type of effect-only instructions.
    #[default]
    None = 0x00,
    /// Schema sentinel tolerating variadic trailing operands.
    Pack = 0x01,
    /// Single bit, the result of comparisons and the flag register type.
    I1 = 0x02,
    /// 8-bit integer.
    I8 = 0x03,
    /// 16-bit integer.
    I16 = 0x04,
    /// 32-bit integer.
    I32 = 0x05,
    /// 64-bit integer.
    I64 = 0x06,
    /// 128-bit integer.
    I128 = 0x07,
    /// IEEE-754 single precision float.
    F32 = 0x08,
    /// IEEE-754 double precision float.
    F64 = 0x09,
    /// Machine pointer, 64-bit storage.
    Pointer = 0x0a,
    /// Vector of 16 8-bit lanes.
    I8x16 = 0x0b,
    /// Vector of 8 16-bit lanes.
    I16x8 = 0x0c,
    /// Vector of 4 32-bit lanes.
    I32x4 = 0x0d,
    /// Vector of 2 64-bit lanes.
    I64x2 = 0x0e,
    /// Vector of 4 single precision floats.
    F32x4 = 0x0f,
    /// Vector of 2 double precision floats.
    F64x2 = 0x10,
    /// Interned operator selector, constant-only.
    Op = 0x11,
    /// Interned machine register name, constant-only.
    Reg = 0x12,
    /// Interned segment selector, constant-only.
    Seg = 0x13,
    /// Interned tag string, constant-only.
    Str = 0x14,
}

impl Type {
    /// Maps a bit width to the matching integer type.
    ///
    /// Accepts exactly 1/8/16/32/64/128; any other width is a programmer
    /// error. Use [`Type::try_int`] for widths coming from untrusted input
    /// such as a decoder.
    pub fn int(bits: u16) -> Self {
        Self::try_int(bits)
            .unwrap_or_else(|_| panic!("no integer type of width {bits}"))
    }

    /// Fallible variant of [`Type::int`].
    pub fn try_int(bits: u16) -> Result<Self, Error> {
        match bits {
            1 => Ok(Type::I1),
            8 => Ok(Type::I8),
            16 => Ok(Type::I16),
            32 => Ok(Type::I32),
            64 => Ok(Type::I64),
            128 => Ok(Type::I128),
            _ => Err(Error::UnsupportedWidth(bits)),
        }
    }

    /// Storage width in bits, zero for non-storage kinds.
    pub const fn bit_width(self) -> u16 {
        match self {
            Type::I1 => 1,
            Type::I8 => 8,
            Type::I16 => 16,
            Type::I32 => 32,
            Type::I64 | Type::F64 | Type::Pointer => 64,
            Type::F32 => 32,
            Type::I128 => 128,
            Type::I8x16
            | Type::I16x8
            | Type::I32x4
            | Type::I64x2
            | Type::F32x4
            | Type::F64x2 => 128,
            Type::None | Type::Pack | Type::Op | Type::Reg | Type::Seg | Type::Str => 0,
        }
    }

    /// Storage width in whole bytes; `I1` rounds up to one byte.
    pub const fn byte_width(self) -> u16 {
        (self.bit_width() + 7) / 8
    }

    /// Number of lanes, one for scalars and zero for non-storage kinds.
    pub const fn lanes(self) -> u16 {
        match self {
            Type::I8x16 => 16,
            Type::I16x8 => 8,
            Type::I32x4 | Type::F32x4 => 4,
            Type::I64x2 | Type::F64x2 => 2,
            _ if self.bit_width() != 0 => 1,
            _ => 0,
        }
    }

    /// Scalar type of a single lane; identity for scalars.
    pub const fn lane_type(self) -> Self {
        match self {
            Type::I8x16 => Type::I8,
            Type::I16x8 => Type::I16,
            Type::I32x4 => Type::I32,
            Type::I64x2 => Type::I64,
            Type::F32x4 => Type::F32,
            Type::F64x2 => Type::F64,
            other => other,
        }
    }

    /// True for the scalar integer types `i1` through `i128`.
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Type::I1 | Type::I8 | Type::I16 | Type::I32 | Type::I64 | Type::I128
        )
    }

    /// True for the scalar float types.
    pub const fn is_float(self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    /// True for the vector types.
    pub const fn is_vector(self) -> bool {
        self.lanes() > 1
    }

    /// True for anything with storage, i.e. a value that can be bitcast.
    pub const fn is_storage(self) -> bool {
        self.bit_width() != 0
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::None => "none",
            Type::Pack => "pack",
            Type::I1 => "i1",
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::I128 => "i128",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::Pointer => "pointer",
            Type::I8x16 => "i8x16",
            Type::I16x8 => "i16x8",
            Type::I32x4 => "i32x4",
            Type::I64x2 => "i64x2",
            Type::F32x4 => "f32x4",
            Type::F64x2 => "f64x2",
            Type::Op => "op",
            Type::Reg => "reg",
            Type::Seg => "seg",
            Type::Str => "str",
        };
        f.write_str(name)
    }
}
