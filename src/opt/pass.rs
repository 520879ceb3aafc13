// Copyright (c) 2017-2021 Fabian Schuiki

use crate::ir::prelude::*;
use crate::pass::sccp::SccpOptions;
use rayon::prelude::*;

/// An optimization pass.
///
/// The optimization infrastructure will always call `run_on_module()`. However,
/// implementors of the trait should override the function at their desired
/// level of granularity. The `Pass` trait provides a sane default for all
/// `run_*()` functions.
pub trait Pass {
    /// Run this pass on an entire module.
    ///
    /// Functions are processed in parallel. Returns whether any of them was
    /// modified.
    fn run_on_module(ctx: &PassContext, module: &mut Module) -> bool {
        module
            .par_functions_mut()
            .map(|func| Self::run_on_function(ctx, func))
            .reduce(|| false, |a, b| a || b)
    }

    /// Run this pass on an entire function.
    fn run_on_function(ctx: &PassContext, func: &mut Function) -> bool {
        let mut builder = FunctionBuilder::new(func);
        Self::run_on_cfg(ctx, &mut builder)
    }

    /// Run this pass on the body of a function.
    fn run_on_cfg(ctx: &PassContext, builder: &mut FunctionBuilder) -> bool {
        let mut modified = false;
        let insts: Vec<_> = builder.all_insts().collect();
        for inst in insts {
            modified |= Self::run_on_inst(ctx, inst, builder);
        }
        modified
    }

    /// Run this pass on an instruction.
    #[allow(unused_variables)]
    fn run_on_inst(ctx: &PassContext, inst: Inst, builder: &mut FunctionBuilder) -> bool {
        false
    }
}

/// Additional context and configuration for optimizations.
#[derive(Debug, Clone, Default)]
pub struct PassContext {
    /// Configuration of the sparse conditional constant propagation.
    pub sccp: SccpOptions,
}
