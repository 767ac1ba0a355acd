//! # The `impl_opcodes!` macro
//!
//! The opcode metamodel is generated from a single declarative table. One
//! row per opcode carries everything the rest of the crate needs to know:
//!
//! ```rust,ignore
//! impl_opcodes! {
//!     "Generic binary operator over a template type."
//!     Binop "binop" [T0; op, T0, T0] templates 1 constexpr [0] pure,
//!     // ...
//! }
//! ```
//!
//! Each row includes:
//!
//! - A docstring (becomes the variant documentation).
//! - The variant identifier and the display name.
//! - The slot schema `[result; operand, ...]` where every slot is either a
//!   concrete type name or a template back-reference `T0`/`T1`.
//! - The template count, the constexpr operand indices, and whether the
//!   opcode has side effects.
//!
//! Instructions carry no per-kind fields; typing, validation and printing
//! all read the generated [`OpcodeDesc`] table.

use core::fmt;

use crate::Type;

/// One slot of an opcode schema: a concrete type or a reference into the
/// instruction's template types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The slot has this exact type.
    Ty(Type),
    /// The slot takes the type of `template_types[n]`.
    Template(u8),
}

/// Static descriptor of an opcode, the single source of truth for its
/// typing, validation and printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeDesc {
    /// Textual name as printed in dumps.
    pub name: &'static str,
    /// Whether the instruction observes or mutates state outside the IR
    /// graph; side-effecting instructions are never folded or reordered.
    pub side_effects: bool,
    /// Number of template types the opcode is parameterized over (0-2).
    pub template_count: u8,
    /// Slot schema; `slots[0]` is the result, operand slots follow.
    pub slots: &'static [Slot],
    /// Operand indices that must hold compile-time constants.
    pub constexprs: &'static [u8],
}

impl OpcodeDesc {
    /// Fixed operand count of the schema (the `pack` slot counts as one).
    pub const fn arity(&self) -> usize {
        self.slots.len() - 1
    }

    /// True if the final operand slot is the variadic `pack` sentinel.
    pub fn has_pack(&self) -> bool {
        matches!(self.slots.last(), Some(Slot::Ty(Type::Pack)))
    }

    /// Resolves a schema slot against an instruction's template types.
    /// Slot 0 is the result.
    pub fn resolve(&self, slot: usize, template: &[Type; 2]) -> Type {
        match self.slots[slot] {
            Slot::Ty(ty) => ty,
            Slot::Template(n) => template[n as usize],
        }
    }
}

macro_rules! slot {
    (T0) => {
        Slot::Template(0)
    };
    (T1) => {
        Slot::Template(1)
    };
    (none) => {
        Slot::Ty(Type::None)
    };
    (pack) => {
        Slot::Ty(Type::Pack)
    };
    (i1) => {
        Slot::Ty(Type::I1)
    };
    (pointer) => {
        Slot::Ty(Type::Pointer)
    };
    (op) => {
        Slot::Ty(Type::Op)
    };
    (reg) => {
        Slot::Ty(Type::Reg)
    };
    (seg) => {
        Slot::Ty(Type::Seg)
    };
    (str) => {
        Slot::Ty(Type::Str)
    };
}

macro_rules! side_effects {
    (pure) => {
        false
    };
    (effect) => {
        true
    };
}

macro_rules! impl_opcodes {
    ($($doc:literal $Variant:ident $name:literal
        [$res:tt $(; $($operand:tt),*)?]
        templates $tc:literal constexpr [$($cx:literal),*] $se:ident),* $(,)?) =>
    {
        /// Instruction opcode.
        ///
        /// The schema of every opcode lives in its [`OpcodeDesc`]; see the
        /// module documentation for the generating table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(u8)]
        pub enum Opcode {
            $(
                #[doc = $doc]
                $Variant,
            )*
        }

        static DESCS: &[OpcodeDesc] = &[
            $(
                OpcodeDesc {
                    name: $name,
                    side_effects: side_effects!($se),
                    template_count: $tc,
                    slots: &[slot!($res) $($(, slot!($operand))*)?],
                    constexprs: &[$($cx),*],
                },
            )*
        ];

        impl Opcode {
            /// The opcode's static descriptor.
            pub fn desc(self) -> &'static OpcodeDesc {
                &DESCS[self as usize]
            }
        }
    };
}

impl_opcodes! {
    "No operation."
    Nop "nop" [none] templates 0 constexpr [] pure,

    "Generic binary operator over a template type."
    Binop "binop" [T0; op, T0, T0] templates 1 constexpr [0] pure,

    "Generic unary operator over a template type."
    Unop "unop" [T0; op, T0] templates 1 constexpr [0] pure,

    "Comparison predicate over a template type, produces `i1`."
    Cmp "cmp" [i1; op, T0, T0] templates 1 constexpr [0] pure,

    "Zero-extending integer cast; narrowing truncates."
    Cast "cast" [T1; T0] templates 2 constexpr [] pure,

    "Sign-extending integer cast; narrowing truncates."
    CastSx "cast_sx" [T1; T0] templates 2 constexpr [] pure,

    "Bit pattern reinterpretation between equal-size types."
    Bitcast "bitcast" [T1; T0] templates 2 constexpr [] pure,

    "Ternary select on an `i1` condition."
    Select "select" [T0; i1, T0, T0] templates 1 constexpr [] pure,

    "Memory load through a segment and a pointer."
    LoadMem "load_mem" [T0; seg, pointer] templates 1 constexpr [] effect,

    "Memory store through a segment and a pointer."
    StoreMem "store_mem" [none; seg, pointer, T0] templates 1 constexpr [] effect,

    "Architectural register read."
    ReadReg "read_reg" [T0; reg] templates 1 constexpr [0] effect,

    "Architectural register write."
    WriteReg "write_reg" [none; reg, T0] templates 1 constexpr [0] effect,

    "Atomic read-modify-write against memory, yields the pre-image."
    AtomicBinop "atomic_binop" [T0; op, seg, pointer, T0] templates 1 constexpr [0] effect,

    "Atomic unary read-modify-write against memory, yields the pre-image."
    AtomicUnop "atomic_unop" [T0; op, seg, pointer] templates 1 constexpr [0] effect,

    "Indirect call leaving the lifted region."
    Xcall "xcall" [none; pointer] templates 0 constexpr [] effect,

    "Indirect jump leaving the lifted region."
    Xjmp "xjmp" [none; pointer] templates 0 constexpr [] effect,

    "Return terminator; operand list is architecture-defined."
    Ret "ret" [none; pack] templates 0 constexpr [] effect,

    "Trap tagged with the originating instruction."
    Trap "trap" [none; str] templates 0 constexpr [0] effect,

    "Opaque placeholder for an unmodeled or architecturally undefined
     result; never folded."
    Poison "poison" [T0; str] templates 1 constexpr [0] effect,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.desc().name)
    }
}
