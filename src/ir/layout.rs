// Copyright (c) 2017-2021 Fabian Schuiki

//! Instruction and BB ordering.

use crate::ir::{Block, Inst};
use std::collections::HashMap;

/// Determines the order of instructions and BBs in a `Function`.
#[derive(Default)]
pub struct FunctionLayout {
    /// The BBs in layout order.
    bbs: Vec<Block>,
    /// The instructions of each BB in layout order.
    insts: HashMap<Block, Vec<Inst>>,
    /// Lookup table to find the BB that contains an instruction.
    inst_map: HashMap<Inst, Block>,
}

impl FunctionLayout {
    /// Create a new function layout.
    pub fn new() -> Self {
        Default::default()
    }

    /// Append a BB to the end of the function.
    pub fn append_block(&mut self, bb: Block) {
        assert!(!self.is_block_inserted(bb), "{} already inserted", bb);
        self.bbs.push(bb);
        self.insts.insert(bb, vec![]);
    }

    /// Remove a BB from the function.
    ///
    /// The instructions of the BB are dropped from the layout as well.
    pub fn remove_block(&mut self, bb: Block) {
        self.bbs.retain(|&b| b != bb);
        for inst in self.insts.remove(&bb).unwrap_or_default() {
            self.inst_map.remove(&inst);
        }
    }

    /// Return an iterator over all BBs in layout order.
    pub fn blocks<'a>(&'a self) -> impl Iterator<Item = Block> + 'a {
        self.bbs.iter().cloned()
    }

    /// Get the first BB in the layout. This is the entry block.
    pub fn first_block(&self) -> Option<Block> {
        self.bbs.first().cloned()
    }

    /// Check if a BB is currently inserted.
    pub fn is_block_inserted(&self, bb: Block) -> bool {
        self.insts.contains_key(&bb)
    }

    /// Append an instruction to the end of a BB.
    pub fn append_inst(&mut self, inst: Inst, bb: Block) {
        self.map_inst(inst, bb);
        self.block_insts_mut(bb).push(inst);
    }

    /// Insert an instruction before another instruction.
    pub fn insert_inst_before(&mut self, inst: Inst, before: Inst) {
        let bb = self.inst_block(before);
        let pos = self.inst_position(before, bb);
        self.map_inst(inst, bb);
        self.block_insts_mut(bb).insert(pos, inst);
    }

    /// Remove an instruction from the function.
    pub fn remove_inst(&mut self, inst: Inst) {
        let bb = match self.inst_map.remove(&inst) {
            Some(bb) => bb,
            None => panic!("inst {} was not inserted", inst),
        };
        self.block_insts_mut(bb).retain(|&i| i != inst);
    }

    /// Return an iterator over all instructions in a BB in layout order.
    pub fn insts<'a>(&'a self, bb: Block) -> impl Iterator<Item = Inst> + 'a {
        self.insts
            .get(&bb)
            .into_iter()
            .flat_map(|insts| insts.iter().cloned())
    }

    /// Get the last instruction in a BB.
    pub fn last_inst(&self, bb: Block) -> Option<Inst> {
        self.insts.get(&bb).and_then(|insts| insts.last().cloned())
    }

    /// Get the BB which contains `inst`, or `None` if it is not inserted.
    pub fn get_inst_block(&self, inst: Inst) -> Option<Block> {
        self.inst_map.get(&inst).cloned()
    }

    /// Get the BB which contains `inst`, or panic.
    pub fn inst_block(&self, inst: Inst) -> Block {
        match self.get_inst_block(inst) {
            Some(bb) => bb,
            None => panic!("inst {} not inserted", inst),
        }
    }

    fn map_inst(&mut self, inst: Inst, bb: Block) {
        if let Some(old_bb) = self.inst_map.insert(inst, bb) {
            panic!(
                "inst {} already inserted in {}, now being inserted into {}",
                inst, old_bb, bb
            );
        }
    }

    fn block_insts_mut(&mut self, bb: Block) -> &mut Vec<Inst> {
        match self.insts.get_mut(&bb) {
            Some(insts) => insts,
            None => panic!("{} not inserted", bb),
        }
    }

    fn inst_position(&self, inst: Inst, bb: Block) -> usize {
        self.insts[&bb]
            .iter()
            .position(|&i| i == inst)
            .expect("inst map out of sync with layout")
    }
}
