//! Semantic lifter diagnostics.

use thiserror::Error;

use crate::Mnemonic;

/// Errors surfaced while lifting one decoded instruction.
#[derive(Debug, Error)]
pub enum SemaError {
    /// No translator is registered for the mnemonic. Callers are expected
    /// to continue with the next instruction.
    #[error("unhandled mnemonic: {0}")]
    UnhandledMnemonic(Mnemonic),
    /// An operand kind the translator cannot accept in this position, e.g.
    /// an immediate as a write destination.
    #[error("{mnemonic} cannot use operand #{index} here")]
    BadOperand {
        /// Mnemonic being translated.
        mnemonic: Mnemonic,
        /// Offending operand index.
        index: usize,
    },
    /// Structural IR error raised by a builder.
    #[error(transparent)]
    Ir(#[from] rift_ir::Error),
    /// Any lifter error wrapped with the machine address it occurred at.
    #[error("{source} (at {ip:#x})")]
    At {
        /// Machine-code address of the offending instruction.
        ip: u64,
        /// The underlying diagnostic.
        #[source]
        source: Box<SemaError>,
    },
}

impl SemaError {
    /// Wraps the diagnostic with the machine address it was raised at.
    pub fn at(self, ip: u64) -> Self {
        SemaError::At {
            ip,
            source: Box::new(self),
        }
    }
}
