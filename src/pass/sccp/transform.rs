// Copyright (c) 2017-2021 Fabian Schuiki

//! Rewriting a function based on the outcome of the constant propagation.

use super::{PhiRepair, SccpOptions, SccpResult};
use crate::analysis::PredecessorTable;
use crate::ir::prelude::*;
use bitflags::bitflags;
use std::collections::BTreeSet;

bitflags! {
    /// The kinds of changes made to a function.
    pub struct Changes: u8 {
        /// Constant instruction results were replaced with literals.
        const CONSTANTS_FOLDED = 1 << 0;
        /// Conditional branches with a literal condition were made
        /// unconditional.
        const BRANCHES_SIMPLIFIED = 1 << 1;
        /// Unreachable blocks were removed.
        const BLOCKS_REMOVED = 1 << 2;
        /// Incoming entries of phi nodes were removed.
        const PHIS_REPAIRED = 1 << 3;
    }
}

/// Apply the outcome of the constant propagation to a function.
///
/// Replaces every constant instruction result with a literal, turns
/// conditional branches on literals into unconditional ones, and removes the
/// blocks that can no longer be reached. Returns the kinds of changes made.
pub fn transform(
    builder: &mut FunctionBuilder,
    result: &SccpResult,
    opts: &SccpOptions,
) -> Changes {
    let mut changes = Changes::empty();
    if substitute_constants(builder, result) {
        changes |= Changes::CONSTANTS_FOLDED;
    }
    if simplify_branches(builder) {
        changes |= Changes::BRANCHES_SIMPLIFIED;
    }
    changes |= remove_unreachable_blocks(builder, opts.phi_repair);
    changes
}

/// Replace each constant instruction result with a literal and remove the
/// instruction.
fn substitute_constants(builder: &mut FunctionBuilder, result: &SccpResult) -> bool {
    let mut modified = false;
    for (value, imm) in result.constants() {
        let inst = match builder.get_value_inst(value) {
            Some(inst) => inst,
            None => continue,
        };
        let ty = builder.value_type(value);
        let literal = builder.const_int(ty, imm);
        debug!("Replace {} with {}", inst.dump(builder), imm);
        builder.replace_use(value, literal);
        builder.remove_inst(inst);
        modified = true;
    }
    modified
}

/// Replace conditional branches on a literal with unconditional ones.
fn simplify_branches(builder: &mut FunctionBuilder) -> bool {
    let mut modified = false;
    let blocks: Vec<_> = builder.blocks().collect();
    for bb in blocks {
        let term = match builder.get_terminator(bb) {
            Some(term) => term,
            None => continue,
        };
        let target = match builder[term] {
            InstData::Branch {
                opcode: Opcode::BrCond,
                args: [cond],
                bbs: [if_true, if_false],
            } => match builder.get_const_int(cond) {
                Some(0) => if_false,
                Some(_) => if_true,
                None => continue,
            },
            _ => continue,
        };
        debug!(
            "Replace {} with jump to {}",
            term.dump(builder),
            target.dump(builder)
        );
        builder.insert_before(term);
        builder.ins().br(target);
        builder.remove_inst(term);
        modified = true;
    }
    modified
}

/// Remove the blocks which cannot be reached from the entry, and repair the
/// phi nodes of the remaining blocks.
fn remove_unreachable_blocks(builder: &mut FunctionBuilder, repair: PhiRepair) -> Changes {
    let mut changes = Changes::empty();
    let entry = match builder.first_block() {
        Some(bb) => bb,
        None => return changes,
    };

    // Find all reachable blocks.
    let mut reachable = BTreeSet::new();
    let mut todo = vec![entry];
    while let Some(bb) = todo.pop() {
        if reachable.insert(bb) {
            todo.extend(builder.successors(bb).iter().cloned());
        }
    }
    let dead: Vec<_> = builder
        .blocks()
        .filter(|bb| !reachable.contains(bb))
        .collect();

    // Drop phi entries referring to blocks that are gone.
    let preds = PredecessorTable::new_filtered(builder, |bb| reachable.contains(&bb));
    let phis: Vec<(Block, Inst)> = {
        let func: &Function = builder;
        reachable
            .iter()
            .flat_map(|&bb| func.phis(bb).map(move |inst| (bb, inst)))
            .collect()
    };
    for (bb, phi) in phis {
        let stale: Vec<usize> = builder[phi]
            .blocks()
            .iter()
            .enumerate()
            .filter(|&(_, &from)| match repair {
                PhiRepair::Precise => !preds.is_pred(from, bb),
                PhiRepair::Legacy => true,
            })
            .map(|(index, _)| index)
            .collect();
        for &index in stale.iter().rev() {
            let (value, from) = builder.remove_phi_incoming(phi, index);
            debug!(
                "Remove [{}, {}] from {}",
                value.dump(builder),
                from.dump(builder),
                phi.dump(builder)
            );
            changes |= Changes::PHIS_REPAIRED;
        }
    }

    // Remove the dead blocks.
    if !dead.is_empty() {
        for &bb in &dead {
            debug!("Remove unreachable {}", bb.dump(builder));
        }
        builder.remove_blocks(&dead);
        changes |= Changes::BLOCKS_REMOVED;
    }
    changes
}
