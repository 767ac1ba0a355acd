//! Typed SSA intermediate representation of the rift lifter.
//!
//! The IR is a graph of [`Insn`] nodes owned by a [`BasicBlock`] arena.
//! There is exactly one instruction shape; per-opcode knowledge (operand
//! schema, template types, constexpr requirements, side effects) lives in
//! the static [`OpcodeDesc`] table generated by the `impl_opcodes!` macro in
//! [`opcode`], which is the single source of truth for typing, validation
//! and printing.
//!
//! Consumers relate values through [`Operand`] slots; every use-edge is
//! tracked in the producer's use-list, so "all consumers of a value" is
//! enumerable in O(uses) and [`BasicBlock::replace_all_uses_with`] is the
//! fundamental rewrite primitive of every pass.
//!
//! The IR is single-threaded per block; blocks of distinct methods share no
//! value and may be processed in parallel by a pass driver.

#![warn(missing_docs)]

mod block;
mod constant;
mod error;
mod insn;
pub mod opcode;
mod op;
mod types;
mod value;

pub use block::{BasicBlock, Insns};
pub use constant::Constant;
pub use error::Error;
pub use insn::{Insn, NO_LABEL};
pub use op::Op;
pub use opcode::{Opcode, OpcodeDesc, Slot};
pub use types::Type;
pub use value::{InsnId, MReg, Operand, Seg, Style, UseRef};
