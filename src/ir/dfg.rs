// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of the data flow in a `Function`.
//!
//! Each function has an associated `DataFlowGraph` which contains all the
//! values, instructions, arguments, and links between them. The graph keeps a
//! def-use map up to date on every mutation, such that the users of a value
//! can be found without scanning the whole function.

use crate::{
    impl_table_indexing,
    ir::{Arg, Block, ExtFunc, ExtFuncData, Inst, InstData, Signature, Value, ValueData},
    table::{PrimaryTable, SecondaryTable, TableKey},
    ty::Type,
};
use std::collections::{BTreeSet, HashMap};

/// A data flow graph.
///
/// This is the main container for instructions, values, and the relationship
/// between them. Every `Function` has an associated data flow graph.
#[derive(Default)]
pub struct DataFlowGraph {
    /// The instructions in the graph.
    pub(crate) insts: PrimaryTable<Inst, InstData>,
    /// The result values produced by instructions.
    pub(crate) results: SecondaryTable<Inst, Value>,
    /// The values in the graph.
    pub(crate) values: PrimaryTable<Value, ValueData>,
    /// The argument values.
    pub(crate) args: SecondaryTable<Arg, Value>,
    /// The external functions in the graph.
    pub(crate) ext_funcs: PrimaryTable<ExtFunc, ExtFuncData>,
    /// The interned integer literals.
    pub(crate) consts: HashMap<(Type, i64), Value>,
    /// The names assigned to values.
    pub(crate) names: HashMap<Value, String>,
    /// The instructions using each value.
    pub(crate) uses: HashMap<Value, BTreeSet<Inst>>,
}

impl_table_indexing!(DataFlowGraph, insts, Inst, InstData);
impl_table_indexing!(DataFlowGraph, values, Value, ValueData);
impl_table_indexing!(DataFlowGraph, ext_funcs, ExtFunc, ExtFuncData);

impl DataFlowGraph {
    /// Create a new data flow graph.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a placeholder value.
    ///
    /// This function is intended to be used when constructing phi nodes whose
    /// incoming values are defined further down.
    pub fn add_placeholder(&mut self, ty: Type) -> Value {
        self.values.add(ValueData::Placeholder { ty })
    }

    /// Remove a placeholder value.
    pub fn remove_placeholder(&mut self, value: Value) {
        assert!(!self.has_uses(value), "placeholder {} still in use", value);
        assert!(self[value].is_placeholder());
        self.values.remove(value);
        self.uses.remove(&value);
    }

    /// Add an instruction.
    pub fn add_inst(&mut self, data: InstData, ty: Type) -> Inst {
        let inst = self.insts.add(data);
        for &arg in self.insts[inst].args() {
            self.uses.entry(arg).or_default().insert(inst);
        }
        if !ty.is_void() {
            let result = self.values.add(ValueData::Inst { ty, inst });
            self.results.add(inst, result);
        }
        inst
    }

    /// Remove an instruction.
    ///
    /// Panics if the instruction's result is still used by another
    /// instruction.
    pub fn remove_inst(&mut self, inst: Inst) {
        if let Some(value) = self.get_inst_result(inst) {
            assert!(
                self.uses(value).all(|user| user == inst),
                "result {} of {} still in use",
                value,
                inst
            );
            self.results.remove(inst);
            self.values.remove(value);
            self.names.remove(&value);
            self.uses.remove(&value);
        }
        self.drop_operands(inst);
        self.insts.remove(inst);
    }

    /// Unregister an instruction as a user of its operands.
    ///
    /// The operands themselves are left untouched. Used before removing a group
    /// of instructions that refer to each other.
    pub(crate) fn drop_operands(&mut self, inst: Inst) {
        for arg in self.insts[inst].args() {
            if let Some(users) = self.uses.get_mut(arg) {
                users.remove(&inst);
            }
        }
    }

    /// Returns whether an instruction produces a result.
    pub fn has_result(&self, inst: Inst) -> bool {
        self.results.storage.contains_key(&inst.index())
    }

    /// Returns the result of an instruction.
    pub fn inst_result(&self, inst: Inst) -> Value {
        self.results[inst]
    }

    /// Returns the result of an instruction, if it has one.
    pub fn get_inst_result(&self, inst: Inst) -> Option<Value> {
        self.results.get(inst).cloned()
    }

    /// Returns the value of an argument.
    pub fn arg_value(&self, arg: Arg) -> Value {
        self.args[arg]
    }

    /// Create values for the arguments in a signature.
    pub(crate) fn make_args_for_signature(&mut self, sig: &Signature) {
        for arg in sig.inputs() {
            let value = self.values.add(ValueData::Arg {
                ty: sig.arg_type(arg),
                arg,
            });
            self.args.add(arg, value);
        }
    }

    /// Return the interned integer literal of the given type and value.
    ///
    /// The value is brought into canonical form for the type first, such that
    /// `i8 255` and `i8 -1` refer to the same literal.
    pub fn const_int(&mut self, ty: Type, imm: i64) -> Value {
        let imm = ty.canonical_int(imm);
        let values = &mut self.values;
        *self
            .consts
            .entry((ty, imm))
            .or_insert_with(|| values.add(ValueData::Const { ty, imm }))
    }

    /// Return the integer a value holds, if it is a literal.
    pub fn get_const_int(&self, value: Value) -> Option<i64> {
        match self.values.get(value) {
            Some(&ValueData::Const { imm, .. }) => Some(imm),
            _ => None,
        }
    }

    /// Add an external function.
    pub fn add_ext_func(&mut self, data: ExtFuncData) -> ExtFunc {
        self.ext_funcs.add(data)
    }

    /// Returns the type of a value.
    pub fn value_type(&self, value: Value) -> Type {
        self[value].ty()
    }

    /// Return the instruction that produces `value`.
    pub fn get_value_inst(&self, value: Value) -> Option<Inst> {
        match self.values.get(value) {
            Some(&ValueData::Inst { inst, .. }) => Some(inst),
            _ => None,
        }
    }

    /// Return the instruction that produces `value`, or panic.
    pub fn value_inst(&self, value: Value) -> Inst {
        match self.get_value_inst(value) {
            Some(inst) => inst,
            None => panic!("value {} not the result of an instruction", value),
        }
    }

    /// Return the argument that produces `value`.
    pub fn get_value_arg(&self, value: Value) -> Option<Arg> {
        match self.values.get(value) {
            Some(&ValueData::Arg { arg, .. }) => Some(arg),
            _ => None,
        }
    }

    /// Return the name of a value.
    pub fn get_name(&self, value: Value) -> Option<&str> {
        self.names.get(&value).map(AsRef::as_ref)
    }

    /// Set the name of a value.
    pub fn set_name(&mut self, value: Value, name: String) {
        self.names.insert(value, name);
    }

    /// Replace all uses of a value with another.
    ///
    /// Returns how many uses were replaced.
    pub fn replace_use(&mut self, from: Value, to: Value) -> usize {
        if from == to {
            return 0;
        }
        let users = match self.uses.remove(&from) {
            Some(users) => users,
            None => return 0,
        };
        let mut count = 0;
        for inst in users {
            count += self.insts[inst].replace_value(from, to);
            self.uses.entry(to).or_default().insert(inst);
        }
        count
    }

    /// Remove an incoming value and block from a phi instruction.
    ///
    /// Returns the removed value and block.
    pub fn remove_phi_incoming(&mut self, inst: Inst, index: usize) -> (Value, Block) {
        let (value, bb) = match &mut self.insts[inst] {
            InstData::Phi { args, bbs, .. } => (args.remove(index), bbs.remove(index)),
            data => panic!("{} is not a phi but {}", inst, data.opcode()),
        };
        if !self.insts[inst].args().contains(&value) {
            if let Some(users) = self.uses.get_mut(&value) {
                users.remove(&inst);
            }
        }
        (value, bb)
    }

    /// Iterate over all instructions that use a value.
    pub fn uses<'a>(&'a self, value: Value) -> impl Iterator<Item = Inst> + 'a {
        self.uses
            .get(&value)
            .into_iter()
            .flat_map(|users| users.iter().cloned())
    }

    /// Check if a value is used.
    pub fn has_uses(&self, value: Value) -> bool {
        self.uses(value).next().is_some()
    }
}
