use core::fmt;

use crate::Constant;

/// Stable identity of an instruction inside its owning [`BasicBlock`]'s
/// arena.
///
/// Handles stay valid for the lifetime of the instruction, across list
/// detach and reinsert; they are only invalidated by
/// [`BasicBlock::destroy`].
///
/// [`BasicBlock`]: crate::BasicBlock
/// [`BasicBlock::destroy`]: crate::BasicBlock::destroy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InsnId(pub(crate) u32);

impl InsnId {
    /// Raw arena slot index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One input slot of an instruction: either an owned constant or a use-edge
/// into a producer instruction of the same block.
///
/// A use-edge is tracked in the producer's use-list for as long as it is
/// installed in an instruction; a free-standing `Operand` value is untracked
/// until the block installs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Owned compile-time constant.
    Const(Constant),
    /// Reference to the producing instruction.
    Use(InsnId),
}

impl Operand {
    /// True if this slot holds a constant.
    pub const fn is_const(&self) -> bool {
        matches!(self, Operand::Const(_))
    }

    /// The constant payload, if any.
    pub const fn as_const(&self) -> Option<&Constant> {
        match self {
            Operand::Const(c) => Some(c),
            Operand::Use(_) => None,
        }
    }

    /// The producer, if this slot is a use-edge.
    pub const fn as_insn(&self) -> Option<InsnId> {
        match self {
            Operand::Use(id) => Some(*id),
            Operand::Const(_) => None,
        }
    }
}

impl From<Constant> for Operand {
    fn from(c: Constant) -> Self {
        Operand::Const(c)
    }
}

impl From<InsnId> for Operand {
    fn from(id: InsnId) -> Self {
        Operand::Use(id)
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Const(Constant::bool(b))
    }
}

/// One entry of a producer's use-list: the consuming instruction and the
/// operand slot holding the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UseRef {
    /// The consuming instruction.
    pub user: InsnId,
    /// Operand index within the consumer.
    pub index: u32,
}

/// Architecture-interned machine register name.
///
/// The IR does not interpret register numbers; the architecture layer owns
/// the numbering and pretty names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MReg(pub u16);

impl fmt::Display for MReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Architecture-interned segment selector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Seg(pub u8);

impl Seg {
    /// Flat address space, no segment override.
    pub const NONE: Seg = Seg(0);
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Seg::NONE {
            f.write_str("flat")
        } else {
            write!(f, "s{}", self.0)
        }
    }
}

/// Rendering style for the textual dump.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// `%name` / bare constant only.
    Concise,
    /// Full one-line rendering without escape codes.
    #[default]
    Plain,
    /// Full rendering with ANSI colors; side-effecting opcodes are painted
    /// red, pure ones teal, constants green.
    Ansi,
}
