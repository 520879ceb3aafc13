// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of functions.

use crate::{
    impl_table_indexing,
    ir::{
        Arg, Block, BlockData, ControlFlowGraph, DataFlowGraph, ExtFunc, ExtFuncData,
        FunctionLayout, Inst, InstBuilder, InstData, Signature, Value, ValueData,
    },
    ty::Type,
    verifier::{Verifier, VerifierErrors},
};
use std::ops::Deref;

/// A function.
///
/// Owns the data flow graph, control flow graph, and layout of the function
/// body. Use a `FunctionBuilder` to modify it.
pub struct Function {
    name: String,
    sig: Signature,
    pub(crate) dfg: DataFlowGraph,
    pub(crate) cfg: ControlFlowGraph,
    pub(crate) layout: FunctionLayout,
}

impl_table_indexing!(Function, dfg.insts, Inst, InstData);
impl_table_indexing!(Function, dfg.values, Value, ValueData);
impl_table_indexing!(Function, cfg.blocks, Block, BlockData);

impl Function {
    /// Create a new function with an empty body.
    pub fn new(name: impl Into<String>, sig: Signature) -> Self {
        let mut dfg = DataFlowGraph::new();
        dfg.make_args_for_signature(&sig);
        Self {
            name: name.into(),
            sig,
            dfg,
            cfg: ControlFlowGraph::new(),
            layout: FunctionLayout::new(),
        }
    }

    /// Get the name of the function.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the function's signature.
    pub fn sig(&self) -> &Signature {
        &self.sig
    }

    /// Get the DFG of the function.
    pub fn dfg(&self) -> &DataFlowGraph {
        &self.dfg
    }

    /// Get the CFG of the function.
    pub fn cfg(&self) -> &ControlFlowGraph {
        &self.cfg
    }

    /// Get the layout of the function.
    pub fn layout(&self) -> &FunctionLayout {
        &self.layout
    }

    /// Verify the integrity of the function.
    pub fn verify(&self) -> Result<(), VerifierErrors> {
        let mut verifier = Verifier::new();
        verifier.verify_function(self);
        verifier.finish()
    }

    /// Dump the function in human-readable form.
    pub fn dump(&self) -> &Self {
        self
    }

    // ----- Arguments ---------------------------------------------------------

    /// Return an iterator over the argument values of the function.
    pub fn args<'a>(&'a self) -> impl Iterator<Item = Value> + 'a {
        self.sig.inputs().map(move |arg| self.dfg.arg_value(arg))
    }

    /// Returns the value of an argument.
    pub fn arg_value(&self, arg: Arg) -> Value {
        self.dfg.arg_value(arg)
    }

    /// Return the value of the input argument at position `pos`.
    pub fn input_arg(&self, pos: usize) -> Value {
        match self.sig.inputs().nth(pos) {
            Some(arg) => self.dfg.arg_value(arg),
            None => panic!("{} has no input argument {}", self.name, pos),
        }
    }

    // ----- Blocks and layout -------------------------------------------------

    /// Return an iterator over the BBs in layout order.
    pub fn blocks<'a>(&'a self) -> impl Iterator<Item = Block> + 'a {
        self.layout.blocks()
    }

    /// Return the entry block, if the function has a body.
    pub fn first_block(&self) -> Option<Block> {
        self.layout.first_block()
    }

    /// Return the entry block, or panic.
    pub fn entry(&self) -> Block {
        match self.layout.first_block() {
            Some(bb) => bb,
            None => panic!("function @{} has no blocks", self.name),
        }
    }

    /// Check whether a BB exists in the function.
    pub fn has_block(&self, bb: Block) -> bool {
        self.cfg.contains(bb) && self.layout.is_block_inserted(bb)
    }

    /// Return the name of a BB.
    pub fn get_block_name(&self, bb: Block) -> Option<&str> {
        self.cfg.get_name(bb)
    }

    /// Return an iterator over the instructions of a BB in layout order.
    pub fn insts<'a>(&'a self, bb: Block) -> impl Iterator<Item = Inst> + 'a {
        self.layout.insts(bb)
    }

    /// Return an iterator over all instructions in layout order.
    pub fn all_insts<'a>(&'a self) -> impl Iterator<Item = Inst> + 'a {
        self.blocks().flat_map(move |bb| self.insts(bb))
    }

    /// Return an iterator over the phi nodes at the beginning of a BB.
    pub fn phis<'a>(&'a self, bb: Block) -> impl Iterator<Item = Inst> + 'a {
        self.insts(bb)
            .take_while(move |&inst| self[inst].opcode().is_phi())
    }

    /// Return the terminator of a BB, if it has one.
    pub fn get_terminator(&self, bb: Block) -> Option<Inst> {
        self.layout
            .last_inst(bb)
            .filter(|&inst| self[inst].opcode().is_terminator())
    }

    /// Return the terminator of a BB, or panic.
    pub fn terminator(&self, bb: Block) -> Inst {
        match self.get_terminator(bb) {
            Some(inst) => inst,
            None => panic!("{} has no terminator", bb),
        }
    }

    /// Return the successors of a BB, as named by its terminator.
    ///
    /// The same successor may appear twice, for branches with identical
    /// targets.
    pub fn successors(&self, bb: Block) -> &[Block] {
        match self.get_terminator(bb) {
            Some(term) => self[term].blocks(),
            None => &[],
        }
    }

    /// Return the BB containing an instruction, if it is inserted.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.layout.get_inst_block(inst)
    }

    // ----- Values and instructions -------------------------------------------

    /// Returns whether an instruction produces a result.
    pub fn has_result(&self, inst: Inst) -> bool {
        self.dfg.has_result(inst)
    }

    /// Returns the result of an instruction.
    pub fn inst_result(&self, inst: Inst) -> Value {
        self.dfg.inst_result(inst)
    }

    /// Returns the result of an instruction, if it has one.
    pub fn get_inst_result(&self, inst: Inst) -> Option<Value> {
        self.dfg.get_inst_result(inst)
    }

    /// Returns the type of a value.
    pub fn value_type(&self, value: Value) -> Type {
        self.dfg.value_type(value)
    }

    /// Returns the type of an instruction.
    pub fn inst_type(&self, inst: Inst) -> Type {
        self.get_inst_result(inst)
            .map(|v| self.value_type(v))
            .unwrap_or(Type::Void)
    }

    /// Return the instruction that produces `value`.
    pub fn get_value_inst(&self, value: Value) -> Option<Inst> {
        self.dfg.get_value_inst(value)
    }

    /// Return the instruction that produces `value`, or panic.
    pub fn value_inst(&self, value: Value) -> Inst {
        self.dfg.value_inst(value)
    }

    /// Return the argument that produces `value`.
    pub fn get_value_arg(&self, value: Value) -> Option<Arg> {
        self.dfg.get_value_arg(value)
    }

    /// Return the integer a value holds, if it is a literal.
    pub fn get_const_int(&self, value: Value) -> Option<i64> {
        self.dfg.get_const_int(value)
    }

    /// Return the name of a value.
    pub fn get_name(&self, value: Value) -> Option<&str> {
        self.dfg.get_name(value)
    }

    /// Iterate over all instructions that use a value.
    pub fn uses<'a>(&'a self, value: Value) -> impl Iterator<Item = Inst> + 'a {
        self.dfg.uses(value)
    }

    /// Check if a value is used.
    pub fn has_uses(&self, value: Value) -> bool {
        self.dfg.has_uses(value)
    }

    /// Find the value with the given name.
    pub fn find_value(&self, name: &str) -> Option<Value> {
        self.dfg
            .names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(&v, _)| v)
    }

    /// Find the BB with the given name.
    pub fn find_block(&self, name: &str) -> Option<Block> {
        self.blocks()
            .find(|&bb| self.get_block_name(bb) == Some(name))
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "func @{} {} {{\n", self.name, self.sig.dump(self))?;
        for bb in self.blocks() {
            write!(f, "{}:\n", bb.dump(self))?;
            for inst in self.insts(bb) {
                write!(f, "    {}\n", inst.dump(self))?;
            }
        }
        write!(f, "}}")?;
        Ok(())
    }
}

impl Value {
    /// Dump the value in human readable form.
    pub fn dump(self, func: &Function) -> ValueDumper<'_> {
        ValueDumper(self, func)
    }
}

/// Temporary object to dump a `Value` in human-readable form.
pub struct ValueDumper<'a>(Value, &'a Function);

impl std::fmt::Display for ValueDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(imm) = self.1.get_const_int(self.0) {
            write!(f, "{}", imm)
        } else if let Some(name) = self.1.get_name(self.0) {
            write!(f, "%{}", name)
        } else {
            write!(f, "%{}", self.0)
        }
    }
}

impl Block {
    /// Dump the BB in human readable form.
    pub fn dump(self, func: &Function) -> BlockDumper<'_> {
        BlockDumper(self, func)
    }
}

/// Temporary object to dump a `Block` in human-readable form.
pub struct BlockDumper<'a>(Block, &'a Function);

impl std::fmt::Display for BlockDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.1.cfg.blocks.get(self.0).and_then(|d| d.name.as_ref()) {
            Some(name) => write!(f, "%{}", name),
            None => write!(f, "%{}", self.0),
        }
    }
}

/// A temporary object used to modify a `Function`.
pub struct FunctionBuilder<'a> {
    /// The function being modified.
    func: &'a mut Function,
    /// The position where we are currently inserting instructions.
    pos: FunctionInsertPos,
}

/// An insertion point within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionInsertPos {
    /// No insertion point.
    None,
    /// Append to the end of a BB.
    Append(Block),
    /// Insert before an instruction.
    Before(Inst),
}

impl FunctionInsertPos {
    /// Insert an instruction and advance the position.
    fn add_inst(&mut self, inst: Inst, layout: &mut FunctionLayout) {
        match *self {
            FunctionInsertPos::None => panic!("no insertion point for {}", inst),
            FunctionInsertPos::Append(bb) => layout.append_inst(inst, bb),
            FunctionInsertPos::Before(other) => layout.insert_inst_before(inst, other),
        }
    }

    /// Move the position off an instruction that is about to be removed.
    fn remove_inst(&mut self, inst: Inst, layout: &FunctionLayout) {
        match *self {
            FunctionInsertPos::Before(i) if i == inst => {
                *self = match layout.get_inst_block(inst) {
                    Some(bb) => FunctionInsertPos::Append(bb),
                    None => FunctionInsertPos::None,
                };
            }
            _ => (),
        }
    }
}

impl<'a> Deref for FunctionBuilder<'a> {
    type Target = Function;

    fn deref(&self) -> &Function {
        self.func
    }
}

impl<'a> FunctionBuilder<'a> {
    /// Create a new builder for a function.
    pub fn new(func: &'a mut Function) -> Self {
        Self {
            func,
            pos: FunctionInsertPos::None,
        }
    }

    /// Add a new instruction using an `InstBuilder`.
    pub fn ins(&mut self) -> InstBuilder<'a, '_> {
        InstBuilder::new(self)
    }

    /// Add a new instruction at the current position.
    pub fn build_inst(&mut self, data: InstData, ty: Type) -> Inst {
        let inst = self.func.dfg.add_inst(data, ty);
        self.pos.add_inst(inst, &mut self.func.layout);
        inst
    }

    /// Remove an instruction.
    ///
    /// Panics if the instruction's result is still in use.
    pub fn remove_inst(&mut self, inst: Inst) {
        self.pos.remove_inst(inst, &self.func.layout);
        self.func.dfg.remove_inst(inst);
        self.func.layout.remove_inst(inst);
    }

    /// Create a new BB at the end of the function.
    pub fn block(&mut self) -> Block {
        let bb = self.func.cfg.add_block();
        self.func.layout.append_block(bb);
        bb
    }

    /// Create a new named BB at the end of the function.
    pub fn named_block(&mut self, name: impl Into<String>) -> Block {
        let bb = self.block();
        self.func.cfg.set_name(bb, name.into());
        bb
    }

    /// Remove a group of BBs and all their instructions.
    ///
    /// Instructions in the group may use each other's results. Panics if an
    /// instruction outside the group still uses a result defined inside it.
    pub fn remove_blocks(&mut self, bbs: &[Block]) {
        let insts: Vec<Inst> = bbs
            .iter()
            .flat_map(|&bb| self.func.layout.insts(bb).collect::<Vec<_>>())
            .collect();
        for &inst in &insts {
            self.func.dfg.drop_operands(inst);
        }
        for &inst in &insts {
            self.pos.remove_inst(inst, &self.func.layout);
            self.func.dfg.remove_inst(inst);
        }
        for &bb in bbs {
            match self.pos {
                FunctionInsertPos::Append(b) if b == bb => {
                    self.pos = FunctionInsertPos::None
                }
                _ => (),
            }
            self.func.layout.remove_block(bb);
            self.func.cfg.remove_block(bb);
        }
    }

    /// Append all following instructions to the end of `bb`.
    pub fn append_to(&mut self, bb: Block) {
        self.pos = FunctionInsertPos::Append(bb);
    }

    /// Insert all following instructions before `inst`.
    pub fn insert_before(&mut self, inst: Inst) {
        self.pos = FunctionInsertPos::Before(inst);
    }

    /// Import an external function for use within this function.
    pub fn add_extern(&mut self, name: impl Into<String>, sig: Signature) -> ExtFunc {
        self.func.dfg.add_ext_func(ExtFuncData {
            name: name.into(),
            sig,
        })
    }

    // ----- Data Flow Graph ---------------------------------------------------

    /// Return the interned integer literal of the given type and value.
    pub fn const_int(&mut self, ty: Type, imm: i64) -> Value {
        self.func.dfg.const_int(ty, imm)
    }

    /// Add a placeholder value.
    ///
    /// This function is intended to be used when constructing phi nodes.
    pub fn add_placeholder(&mut self, ty: Type) -> Value {
        self.func.dfg.add_placeholder(ty)
    }

    /// Remove a placeholder value.
    pub fn remove_placeholder(&mut self, value: Value) {
        self.func.dfg.remove_placeholder(value)
    }

    /// Set the name of a value.
    pub fn set_name(&mut self, value: Value, name: String) {
        self.func.dfg.set_name(value, name)
    }

    /// Replace all uses of a value with another.
    ///
    /// Returns how many uses were replaced.
    pub fn replace_use(&mut self, from: Value, to: Value) -> usize {
        self.func.dfg.replace_use(from, to)
    }

    /// Remove an incoming value and block from a phi node.
    pub fn remove_phi_incoming(&mut self, inst: Inst, index: usize) -> (Value, Block) {
        self.func.dfg.remove_phi_incoming(inst, index)
    }

    /// Remove an instruction if its value is not being read.
    ///
    /// Returns true if the instruction was removed.
    pub fn prune_if_unused(&mut self, inst: Inst) -> bool {
        match self.get_inst_result(inst) {
            Some(value) if !self.has_uses(value) => {
                self.remove_inst(inst);
                true
            }
            _ => false,
        }
    }
}
