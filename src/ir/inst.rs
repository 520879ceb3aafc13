// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of instructions.
//!
//! This module implements the various instructions of the intermediate
//! representation.

use crate::{
    ir::{Block, ExtFunc, Function, FunctionBuilder, Inst, Value},
    ty::{int_ty, void_ty, Type},
};
use itertools::Itertools;

/// A temporary object used to construct a single instruction.
pub struct InstBuilder<'a, 'b> {
    builder: &'b mut FunctionBuilder<'a>,
    name: Option<String>,
}

impl<'a, 'b> InstBuilder<'a, 'b> {
    /// Create a new instruction builder that inserts into `builder`.
    pub fn new(builder: &'b mut FunctionBuilder<'a>) -> Self {
        Self {
            builder,
            name: None,
        }
    }

    /// Assign a name to the instruction being built.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<'a, 'b> InstBuilder<'a, 'b> {
    /// `neg`: two's complement of a value.
    pub fn neg(&mut self, x: Value) -> Value {
        let ty = self.value_type(x);
        let inst = self.build_unary(Opcode::Neg, ty, x);
        self.inst_result(inst)
    }

    /// `not`: bitwise inverse of a value.
    pub fn not(&mut self, x: Value) -> Value {
        let ty = self.value_type(x);
        let inst = self.build_unary(Opcode::Not, ty, x);
        self.inst_result(inst)
    }

    /// `add`: sum of two values.
    pub fn add(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Add, x, y)
    }

    /// `sub`: difference of two values.
    pub fn sub(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Sub, x, y)
    }

    /// `mul`: product of two values.
    pub fn mul(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Mul, x, y)
    }

    /// `sdiv`: signed quotient of two values.
    pub fn sdiv(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Sdiv, x, y)
    }

    /// `udiv`: unsigned quotient of two values.
    pub fn udiv(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Udiv, x, y)
    }

    /// `srem`: signed remainder of two values.
    pub fn srem(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Srem, x, y)
    }

    /// `urem`: unsigned remainder of two values.
    pub fn urem(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Urem, x, y)
    }

    /// `and`: bitwise AND of two values.
    pub fn and(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::And, x, y)
    }

    /// `or`: bitwise OR of two values.
    pub fn or(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Or, x, y)
    }

    /// `xor`: bitwise XOR of two values.
    pub fn xor(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Xor, x, y)
    }

    /// `shl`: shift a value left by an amount.
    pub fn shl(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Shl, x, y)
    }

    /// `shr`: shift a value right by an amount.
    pub fn shr(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Shr, x, y)
    }

    /// `eq`: check two values for equality.
    pub fn eq(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Eq, x, y)
    }

    /// `neq`: check two values for inequality.
    pub fn neq(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Neq, x, y)
    }

    /// `slt`: signed less-than comparison.
    pub fn slt(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Slt, x, y)
    }

    /// `sgt`: signed greater-than comparison.
    pub fn sgt(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Sgt, x, y)
    }

    /// `sle`: signed less-than-or-equal comparison.
    pub fn sle(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Sle, x, y)
    }

    /// `sge`: signed greater-than-or-equal comparison.
    pub fn sge(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Sge, x, y)
    }

    /// `ult`: unsigned less-than comparison.
    pub fn ult(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Ult, x, y)
    }

    /// `ugt`: unsigned greater-than comparison.
    pub fn ugt(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Ugt, x, y)
    }

    /// `ule`: unsigned less-than-or-equal comparison.
    pub fn ule(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Ule, x, y)
    }

    /// `uge`: unsigned greater-than-or-equal comparison.
    pub fn uge(&mut self, x: Value, y: Value) -> Value {
        self.compare(Opcode::Uge, x, y)
    }

    /// Build a binary or comparison instruction from its opcode.
    ///
    /// Panics if `opcode` is neither.
    pub fn binary_op(&mut self, opcode: Opcode, x: Value, y: Value) -> Value {
        if opcode.is_compare() {
            self.compare(opcode, x, y)
        } else if opcode.is_binary() {
            self.binary(opcode, x, y)
        } else {
            panic!("{} is not a binary operation", opcode)
        }
    }

    /// `call`: call a function and yield its return value, if any.
    pub fn call(&mut self, func: ExtFunc, args: Vec<Value>) -> Inst {
        let ty = self.builder.dfg()[func].sig.return_type();
        let data = InstData::Call {
            opcode: Opcode::Call,
            func,
            args,
        };
        self.build(data, ty)
    }

    /// `ret`: return from a void function.
    pub fn ret(&mut self) -> Inst {
        self.build_nullary(Opcode::Ret)
    }

    /// `ret`: return a value from a function.
    pub fn ret_value(&mut self, x: Value) -> Inst {
        self.build_unary(Opcode::RetValue, void_ty(), x)
    }

    /// `phi`: select a value based on the predecessor BB control arrived from.
    ///
    /// The type of the phi is taken from its first incoming value.
    pub fn phi(&mut self, args: Vec<Value>, bbs: Vec<Block>) -> Value {
        assert!(!args.is_empty(), "phi without incoming values");
        let ty = self.value_type(args[0]);
        self.phi_with_type(ty, args, bbs)
    }

    /// `phi`: like `phi`, but with an explicit type.
    pub fn phi_with_type(&mut self, ty: Type, args: Vec<Value>, bbs: Vec<Block>) -> Value {
        assert_eq!(args.len(), bbs.len());
        let data = InstData::Phi {
            opcode: Opcode::Phi,
            args,
            bbs,
        };
        let inst = self.build(data, ty);
        self.inst_result(inst)
    }

    /// `br`: transfer control to another BB.
    pub fn br(&mut self, bb: Block) -> Inst {
        let data = InstData::Jump {
            opcode: Opcode::Br,
            bbs: [bb],
        };
        self.build(data, void_ty())
    }

    /// `br`: transfer control to `bb0` if `x` is nonzero, `bb1` otherwise.
    pub fn br_cond(&mut self, x: Value, bb0: Block, bb1: Block) -> Inst {
        let data = InstData::Branch {
            opcode: Opcode::BrCond,
            args: [x],
            bbs: [bb0, bb1],
        };
        self.build(data, void_ty())
    }
}

/// Convenience functions to construct the different instruction formats.
impl<'a, 'b> InstBuilder<'a, 'b> {
    /// `opcode`
    fn build_nullary(&mut self, opcode: Opcode) -> Inst {
        let data = InstData::Nullary { opcode };
        self.build(data, void_ty())
    }

    /// `a = opcode type x`
    fn build_unary(&mut self, opcode: Opcode, ty: Type, x: Value) -> Inst {
        let data = InstData::Unary { opcode, args: [x] };
        self.build(data, ty)
    }

    /// `a = opcode type x, y`
    fn build_binary(&mut self, opcode: Opcode, ty: Type, x: Value, y: Value) -> Inst {
        let data = InstData::Binary {
            opcode,
            args: [x, y],
        };
        self.build(data, ty)
    }

    fn binary(&mut self, opcode: Opcode, x: Value, y: Value) -> Value {
        let ty = self.value_type(x);
        let inst = self.build_binary(opcode, ty, x, y);
        self.inst_result(inst)
    }

    fn compare(&mut self, opcode: Opcode, x: Value, y: Value) -> Value {
        let inst = self.build_binary(opcode, int_ty(1), x, y);
        self.inst_result(inst)
    }
}

/// Fundamental convenience forwards to the wrapped builder.
impl<'a, 'b> InstBuilder<'a, 'b> {
    /// Convenience forward to `FunctionBuilder`.
    pub(crate) fn build(&mut self, data: InstData, ty: Type) -> Inst {
        let inst = self.builder.build_inst(data, ty);
        if let Some(name) = self.name.take() {
            if let Some(value) = self.builder.get_inst_result(inst) {
                self.builder.set_name(value, name);
            }
        }
        inst
    }

    fn value_type(&self, value: Value) -> Type {
        self.builder.value_type(value)
    }

    fn inst_result(&self, inst: Inst) -> Value {
        self.builder.inst_result(inst)
    }
}

/// An instruction format.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstData {
    /// `opcode`
    Nullary { opcode: Opcode },
    /// `a = opcode type x`
    Unary { opcode: Opcode, args: [Value; 1] },
    /// `a = opcode type x, y`
    Binary { opcode: Opcode, args: [Value; 2] },
    /// `opcode bb`
    Jump { opcode: Opcode, bbs: [Block; 1] },
    /// `a = opcode type [x, bb],*`
    Phi {
        opcode: Opcode,
        args: Vec<Value>,
        bbs: Vec<Block>,
    },
    /// `opcode x, bb0, bb1`
    Branch {
        opcode: Opcode,
        args: [Value; 1],
        bbs: [Block; 2],
    },
    /// `a = opcode type func (args)`
    Call {
        opcode: Opcode,
        func: ExtFunc,
        args: Vec<Value>,
    },
}

impl InstData {
    /// Get the opcode of the instruction.
    pub fn opcode(&self) -> Opcode {
        match *self {
            InstData::Nullary { opcode, .. } => opcode,
            InstData::Unary { opcode, .. } => opcode,
            InstData::Binary { opcode, .. } => opcode,
            InstData::Jump { opcode, .. } => opcode,
            InstData::Phi { opcode, .. } => opcode,
            InstData::Branch { opcode, .. } => opcode,
            InstData::Call { opcode, .. } => opcode,
        }
    }

    /// Get the arguments of an instruction.
    pub fn args(&self) -> &[Value] {
        match self {
            InstData::Nullary { .. } => &[],
            InstData::Unary { args, .. } => args,
            InstData::Binary { args, .. } => args,
            InstData::Jump { .. } => &[],
            InstData::Phi { args, .. } => args,
            InstData::Branch { args, .. } => args,
            InstData::Call { args, .. } => args,
        }
    }

    /// Mutable access to the arguments of an instruction.
    ///
    /// Bypasses the def-use tracking of the data flow graph.
    pub(crate) fn args_mut(&mut self) -> &mut [Value] {
        match self {
            InstData::Nullary { .. } => &mut [],
            InstData::Unary { args, .. } => args,
            InstData::Binary { args, .. } => args,
            InstData::Jump { .. } => &mut [],
            InstData::Phi { args, .. } => args,
            InstData::Branch { args, .. } => args,
            InstData::Call { args, .. } => args,
        }
    }

    /// Get the BBs of an instruction.
    ///
    /// For terminators these are the successors. For phi nodes these are the
    /// incoming BBs.
    pub fn blocks(&self) -> &[Block] {
        match self {
            InstData::Phi { bbs, .. } => bbs,
            InstData::Jump { bbs, .. } => bbs,
            InstData::Branch { bbs, .. } => bbs,
            _ => &[],
        }
    }

    /// Get the called function of a call instruction.
    pub fn get_ext_func(&self) -> Option<ExtFunc> {
        match *self {
            InstData::Call { func, .. } => Some(func),
            _ => None,
        }
    }

    /// Replace all uses of a value with another.
    ///
    /// Returns how many uses were replaced.
    pub(crate) fn replace_value(&mut self, from: Value, to: Value) -> usize {
        let mut count = 0;
        for arg in self.args_mut() {
            if *arg == from {
                *arg = to;
                count += 1;
            }
        }
        count
    }
}

/// An instruction opcode.
///
/// This enum represents the actual instruction, whereas `InstData` covers the
/// format and arguments of the instruction.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Opcode {
    Neg,
    Not,

    Add,
    Sub,
    Mul,
    Sdiv,
    Udiv,
    Srem,
    Urem,
    And,
    Or,
    Xor,
    Shl,
    Shr,

    Eq,
    Neq,
    Slt,
    Sgt,
    Sle,
    Sge,
    Ult,
    Ugt,
    Ule,
    Uge,

    Phi,
    Br,
    BrCond,
    Ret,
    RetValue,
    Call,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Opcode::Neg => "neg",
                Opcode::Not => "not",
                Opcode::Add => "add",
                Opcode::Sub => "sub",
                Opcode::Mul => "mul",
                Opcode::Sdiv => "sdiv",
                Opcode::Udiv => "udiv",
                Opcode::Srem => "srem",
                Opcode::Urem => "urem",
                Opcode::And => "and",
                Opcode::Or => "or",
                Opcode::Xor => "xor",
                Opcode::Shl => "shl",
                Opcode::Shr => "shr",
                Opcode::Eq => "eq",
                Opcode::Neq => "neq",
                Opcode::Slt => "slt",
                Opcode::Sgt => "sgt",
                Opcode::Sle => "sle",
                Opcode::Sge => "sge",
                Opcode::Ult => "ult",
                Opcode::Ugt => "ugt",
                Opcode::Ule => "ule",
                Opcode::Uge => "uge",
                Opcode::Phi => "phi",
                Opcode::Br => "br",
                Opcode::BrCond => "br",
                Opcode::Ret => "ret",
                Opcode::RetValue => "ret",
                Opcode::Call => "call",
            }
        )
    }
}

impl Opcode {
    /// Check if this instruction is a phi node.
    pub fn is_phi(self) -> bool {
        self == Opcode::Phi
    }

    /// Check if this instruction is a terminator.
    pub fn is_terminator(self) -> bool {
        match self {
            Opcode::Ret | Opcode::RetValue | Opcode::Br | Opcode::BrCond => true,
            _ => false,
        }
    }

    /// Check if this is a return instruction.
    pub fn is_return(self) -> bool {
        match self {
            Opcode::Ret | Opcode::RetValue => true,
            _ => false,
        }
    }

    /// Check if this is a branch instruction.
    pub fn is_branch(self) -> bool {
        match self {
            Opcode::Br | Opcode::BrCond => true,
            _ => false,
        }
    }

    /// Check if this is a two-operand arithmetic or bitwise operation.
    pub fn is_binary(self) -> bool {
        match self {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Sdiv
            | Opcode::Udiv
            | Opcode::Srem
            | Opcode::Urem
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr => true,
            _ => false,
        }
    }

    /// Check if this is an integer comparison.
    pub fn is_compare(self) -> bool {
        match self {
            Opcode::Eq
            | Opcode::Neq
            | Opcode::Slt
            | Opcode::Sgt
            | Opcode::Sle
            | Opcode::Sge
            | Opcode::Ult
            | Opcode::Ugt
            | Opcode::Ule
            | Opcode::Uge => true,
            _ => false,
        }
    }

    /// Check if this is a single-operand operation.
    pub fn is_unary(self) -> bool {
        match self {
            Opcode::Neg | Opcode::Not => true,
            _ => false,
        }
    }
}

impl Inst {
    /// Dump the instruction in human readable form.
    pub fn dump(self, func: &Function) -> InstDumper<'_> {
        InstDumper(self, func)
    }
}

/// Temporary object to dump an `Inst` in human-readable form.
pub struct InstDumper<'a>(Inst, &'a Function);

impl std::fmt::Display for InstDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inst = self.0;
        let func = self.1;
        let data = &func[inst];
        if let Some(result) = func.get_inst_result(inst) {
            write!(f, "{} = ", result.dump(func))?;
        }
        write!(f, "{}", data.opcode())?;
        match *data {
            InstData::Nullary { .. } => (),
            InstData::Unary { args: [x], .. } => {
                write!(f, " {} {}", func.value_type(x), x.dump(func))?;
            }
            InstData::Binary { args: [x, y], .. } => {
                write!(
                    f,
                    " {} {}, {}",
                    func.value_type(x),
                    x.dump(func),
                    y.dump(func)
                )?;
            }
            InstData::Phi {
                ref args, ref bbs, ..
            } => {
                write!(
                    f,
                    " {} {}",
                    func.inst_type(inst),
                    args.iter()
                        .zip(bbs.iter())
                        .map(|(arg, bb)| format!("[{}, {}]", arg.dump(func), bb.dump(func)))
                        .format(", ")
                )?;
            }
            InstData::Jump { bbs: [bb], .. } => {
                write!(f, " {}", bb.dump(func))?;
            }
            InstData::Branch {
                args: [x],
                bbs: [bb0, bb1],
                ..
            } => {
                write!(f, " {}, {}, {}", x.dump(func), bb0.dump(func), bb1.dump(func))?;
            }
            InstData::Call {
                func: ext,
                ref args,
                ..
            } => {
                write!(
                    f,
                    " {} @{} ({})",
                    func.dfg()[ext].sig.return_type(),
                    func.dfg()[ext].name,
                    args.iter().map(|arg| arg.dump(func)).format(", ")
                )?;
            }
        }
        Ok(())
    }
}
