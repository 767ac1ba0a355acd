//! Structural IR diagnostics.

use thiserror::Error;

use crate::{Opcode, Type};

/// Structural errors of the IR core.
///
/// These are always fatal for the offending instruction and are surfaced
/// eagerly by the `push_*` builders; a pass pipeline aggregates them without
/// aborting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An operand's type does not match the descriptor schema.
    #[error("expected operand #{index} to be of type '{expected}', got '{actual}' instead: {insn}")]
    OperandTypeMismatch {
        /// Offending operand index.
        index: usize,
        /// Type required by the schema, templates resolved.
        expected: Type,
        /// Type the operand actually has.
        actual: Type,
        /// Rendering of the offending instruction.
        insn: String,
    },
    /// A constexpr-required operand is not a compile-time constant.
    #[error("expected operand #{index} to be constexpr, got '{operand}' instead: {insn}")]
    ConstexprMismatch {
        /// Offending operand index.
        index: usize,
        /// Concise rendering of the operand.
        operand: String,
        /// Rendering of the offending instruction.
        insn: String,
    },
    /// The operand count does not match the descriptor arity.
    #[error("opcode '{opcode}' expects {expected} operands, got {actual}")]
    ArityMismatch {
        /// The opcode whose schema was violated.
        opcode: Opcode,
        /// Arity demanded by the schema.
        expected: usize,
        /// Operand count supplied.
        actual: usize,
    },
    /// No integer type of the requested width exists.
    #[error("unsupported integer width: {0}")]
    UnsupportedWidth(u16),
}
