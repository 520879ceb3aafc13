// Copyright (c) 2017-2021 Fabian Schuiki

use crate::ir::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// A table of basic block predecessors.
#[derive(Debug, Clone)]
pub struct PredecessorTable {
    pred: BTreeMap<Block, BTreeSet<Block>>,
}

impl PredecessorTable {
    /// Compute the predecessor table for a function.
    pub fn new(func: &Function) -> Self {
        Self::new_filtered(func, |_| true)
    }

    /// Compute the predecessor table for a function, only considering the
    /// terminators of blocks for which `keep` returns true.
    ///
    /// Blocks that are filtered out do not appear as the predecessor of any
    /// other block.
    pub fn new_filtered(func: &Function, keep: impl Fn(Block) -> bool) -> Self {
        let mut pred = BTreeMap::new();
        for bb in func.blocks() {
            pred.insert(bb, BTreeSet::new());
        }
        for bb in func.blocks().filter(|&bb| keep(bb)) {
            for &to_bb in func.successors(bb) {
                if let Some(preds) = pred.get_mut(&to_bb) {
                    preds.insert(bb);
                }
            }
        }
        Self { pred }
    }

    /// Check whether `pred` is a predecessor of `bb`.
    pub fn is_pred(&self, pred: Block, bb: Block) -> bool {
        self.pred
            .get(&bb)
            .map(|preds| preds.contains(&pred))
            .unwrap_or(false)
    }
}

impl Function {
    /// Compute the predecessor table of the function.
    pub fn predtbl(&self) -> PredecessorTable {
        PredecessorTable::new(self)
    }
}
