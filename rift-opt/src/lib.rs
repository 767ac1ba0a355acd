//! Local IR optimization passes.
//!
//! Every pass is a rewrite over one [`BasicBlock`] reporting how many
//! rewrites it performed; a driver loops the registry until a sweep comes
//! back clean. Pass diagnostics aggregate and never abort the pipeline.

mod const_fold;

pub use const_fold::const_fold;

use rift_ir::BasicBlock;

/// A local rewrite over a single basic block.
pub trait Pass {
    /// Stable pass name for logs and drivers.
    fn name(&self) -> &'static str;

    /// Runs the rewrite, returning the number of changes performed.
    fn run(&self, bb: &mut BasicBlock) -> usize;
}

/// Constant folding as a registered pass.
pub struct ConstFold;

impl Pass for ConstFold {
    fn name(&self) -> &'static str {
        "const-fold"
    }

    fn run(&self, bb: &mut BasicBlock) -> usize {
        const_fold(bb)
    }
}

/// Built-in local passes, in the order a driver should apply them.
pub fn local_passes() -> Vec<Box<dyn Pass>> {
    vec![Box::new(ConstFold)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rift_ir::{Constant, Op, Type};

    #[test]
    fn registry_runs_the_folder() {
        let mut bb = BasicBlock::new();
        let a = bb
            .push_binop(
                Op::Add,
                Constant::int(Type::I32, 1),
                Constant::int(Type::I32, 2),
            )
            .unwrap();
        bb.push_ret([a.into()]).unwrap();

        let mut total = 0;
        for pass in local_passes() {
            assert!(!pass.name().is_empty());
            total += pass.run(&mut bb);
        }
        assert!(total > 0);
    }
}
