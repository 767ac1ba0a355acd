//! x86 semantic lifter of the rift framework.
//!
//! Consumes decoded instructions (see [`MachInsn`], the narrow waist to the
//! disassembler) and emits typed SSA into a [`rift_ir::BasicBlock`], one
//! translator per mnemonic. Architectural registers, memory and flags
//! become explicit `read_reg`/`write_reg`/`load_mem`/`store_mem` traffic;
//! `LOCK`-prefixed read-modify-writes become atomics; whatever the ISA
//! leaves undefined becomes tagged poison.

mod error;
mod insn;
mod machine;
mod reg;
pub mod sema;

pub use error::SemaError;
pub use insn::{Imm, InsnAttrs, MachInsn, MachOperand, MemRef, Mnemonic};
pub use machine::{Machine, AMD64, I386};
pub use reg::{Reg, RegKind};
pub use sema::lift;
