// Copyright (c) 2017-2021 Fabian Schuiki

//! Sparse Conditional Constant Propagation
//!
//! This pass simultaneously discovers which control flow edges of a function
//! can be taken and which values are compile-time constants. Evaluating only
//! along executable edges lets it find constants that plain constant folding
//! misses, such as values flowing through a phi node whose other incoming
//! blocks are never entered.
//!
//! The pass runs in two phases. `analyze` solves the dataflow problem without
//! touching the function, and `transform` applies the outcome: constant results
//! are replaced with literals, conditional branches on literals are made
//! unconditional, and the blocks that become unreachable are removed.

use crate::ir::prelude::*;
use crate::opt::prelude::*;

mod engine;
mod lattice;
mod transform;
mod visitor;

pub use self::engine::{analyze, CfgEdge, CfgEdgeDumper, SccpResult, SccpResultDumper};
pub use self::lattice::ConstantValue;
pub use self::transform::{transform, Changes};

/// Sparse Conditional Constant Propagation
///
/// Analyzes each function and rewrites it based on the constants and
/// executable edges found.
pub struct SparseCondConstProp;

impl Pass for SparseCondConstProp {
    fn run_on_cfg(ctx: &PassContext, builder: &mut FunctionBuilder) -> bool {
        info!("SCCP [@{}]", builder.name());
        let result = analyze(builder, &ctx.sccp);
        let changes = transform(builder, &result, &ctx.sccp);
        debug!("SCCP [@{}] made changes {:?}", builder.name(), changes);
        !changes.is_empty()
    }
}

/// Sparse Conditional Constant Propagation fact printer
///
/// Analyzes each function and prints the facts and executable edges found to
/// stderr. Does not modify the module.
pub struct SccpPrinter;

impl Pass for SccpPrinter {
    fn run_on_module(ctx: &PassContext, module: &mut Module) -> bool {
        for func in module.functions() {
            info!("Print SCCP [@{}]", func.name());
            let result = analyze(func, &ctx.sccp);
            eprint!("{}", result.dump(func));
        }
        false
    }
}

/// The order in which items are taken off a worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorklistOrder {
    /// Smallest edge or instruction first.
    Ascending,
    /// Largest edge or instruction first.
    Descending,
}

impl Default for WorklistOrder {
    fn default() -> Self {
        WorklistOrder::Ascending
    }
}

/// How phi nodes are repaired after unreachable blocks are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhiRepair {
    /// Remove exactly the incoming entries whose block is no longer a
    /// predecessor.
    Precise,
    /// Remove all incoming entries of every remaining phi node.
    ///
    /// This leaves behind phi nodes without incoming values, which the
    /// verifier rejects.
    Legacy,
}

impl Default for PhiRepair {
    fn default() -> Self {
        PhiRepair::Precise
    }
}

/// Configuration of the constant propagation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SccpOptions {
    /// The order in which control flow edges are processed.
    pub cfg_order: WorklistOrder,
    /// The order in which instructions are re-evaluated.
    pub ssa_order: WorklistOrder,
    /// How phi nodes are repaired.
    pub phi_repair: PhiRepair,
}
