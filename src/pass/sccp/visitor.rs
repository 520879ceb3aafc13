// Copyright (c) 2017-2021 Fabian Schuiki

//! Transfer functions of the constant propagation.
//!
//! The visitor evaluates a single instruction against the current state of the
//! analysis. It never modifies that state. Instead it returns the instruction's
//! new lattice value and collects the control flow edges the instruction may
//! take, leaving it to the engine to record both.

use super::{CfgEdge, ConstantValue, SccpResult};
use crate::ir::prelude::*;
use crate::ty::Type;

/// Evaluates instructions against a snapshot of the analysis state.
pub(super) struct Visitor<'a> {
    func: &'a Function,
    state: &'a SccpResult,
    activated: Vec<CfgEdge>,
}

impl<'a> Visitor<'a> {
    /// Create a visitor reading from `state`.
    pub fn new(func: &'a Function, state: &'a SccpResult) -> Self {
        Self {
            func,
            state,
            activated: vec![],
        }
    }

    /// Consume the visitor and return the edges activated so far.
    pub fn into_activated(self) -> Vec<CfgEdge> {
        self.activated
    }

    /// Compute the lattice value of an instruction.
    ///
    /// Branches record the successor edges they may take, and evaluate to
    /// `Bottom` themselves.
    pub fn visit(&mut self, inst: Inst) -> ConstantValue {
        let func = self.func;
        let data = &func[inst];
        let opcode = data.opcode();
        match *data {
            InstData::Phi {
                ref args, ref bbs, ..
            } => self.visit_phi(inst, args, bbs),
            InstData::Jump { bbs: [target], .. } => {
                self.activate(inst, target);
                ConstantValue::Bottom
            }
            InstData::Branch {
                args: [cond],
                bbs: [if_true, if_false],
                ..
            } => {
                match self.fact(cond) {
                    ConstantValue::Constant(0) => self.activate(inst, if_false),
                    ConstantValue::Constant(_) => self.activate(inst, if_true),
                    _ => {
                        self.activate(inst, if_true);
                        self.activate(inst, if_false);
                    }
                }
                ConstantValue::Bottom
            }
            InstData::Binary { args: [x, y], .. } if opcode.is_compare() => {
                self.visit_binary(x, y, |a, b| Some(compare(opcode, a, b) as i64))
            }
            InstData::Binary { args: [x, y], .. } => {
                let ty = func.inst_type(inst);
                self.visit_binary(x, y, |a, b| fold(opcode, ty, a, b))
            }
            _ => ConstantValue::Bottom,
        }
    }

    /// Meet the incoming values which arrive over executable edges.
    fn visit_phi(&self, inst: Inst, args: &[Value], bbs: &[Block]) -> ConstantValue {
        let bb = match self.func.inst_block(inst) {
            Some(bb) => bb,
            None => return ConstantValue::Top,
        };
        args.iter()
            .zip(bbs.iter())
            .filter(|&(_, &pred)| self.state.is_executable_edge(CfgEdge::new(pred, bb)))
            .fold(ConstantValue::Top, |acc, (&arg, _)| acc.meet(self.fact(arg)))
    }

    /// Evaluate a two-operand instruction.
    ///
    /// `Bottom` operands dominate `Top` ones. If both operands are constant,
    /// `eval` computes the result, or returns `None` if there is none.
    fn visit_binary(
        &self,
        x: Value,
        y: Value,
        eval: impl FnOnce(i64, i64) -> Option<i64>,
    ) -> ConstantValue {
        use ConstantValue::*;
        match (self.fact(x), self.fact(y)) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Top, _) | (_, Top) => Top,
            (Constant(a), Constant(b)) => eval(a, b).map(Constant).unwrap_or(Bottom),
        }
    }

    fn fact(&self, value: Value) -> ConstantValue {
        self.state.value_fact(self.func, value)
    }

    fn activate(&mut self, inst: Inst, to: Block) {
        if let Some(from) = self.func.inst_block(inst) {
            self.activated.push(CfgEdge::new(from, to));
        }
    }
}

/// Evaluate an integer comparison.
///
/// Signed and unsigned predicates both compare the signed payload.
fn compare(opcode: Opcode, a: i64, b: i64) -> bool {
    match opcode {
        Opcode::Eq => a == b,
        Opcode::Neq => a != b,
        Opcode::Slt | Opcode::Ult => a < b,
        Opcode::Sgt | Opcode::Ugt => a > b,
        Opcode::Sle | Opcode::Ule => a <= b,
        Opcode::Sge | Opcode::Uge => a >= b,
        _ => unreachable!("{} is not a comparison", opcode),
    }
}

/// Fold a binary operation on two constants.
///
/// Returns `None` for division by zero and for operations that are not
/// folded.
fn fold(opcode: Opcode, ty: Type, a: i64, b: i64) -> Option<i64> {
    let result = match opcode {
        Opcode::Add => a.wrapping_add(b),
        Opcode::Sub => a.wrapping_sub(b),
        Opcode::Mul => a.wrapping_mul(b),
        Opcode::Sdiv | Opcode::Udiv => a.checked_div(b)?,
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Xor => a ^ b,
        _ => return None,
    };
    Some(ty.canonical_int(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::int_ty;

    #[test]
    fn fold_wraps_to_width() {
        assert_eq!(fold(Opcode::Add, int_ty(8), 127, 1), Some(-128));
        assert_eq!(fold(Opcode::Mul, int_ty(32), 1 << 20, 1 << 20), Some(0));
        assert_eq!(
            fold(Opcode::Add, int_ty(64), i64::max_value(), 1),
            Some(i64::min_value())
        );
        assert_eq!(fold(Opcode::Xor, int_ty(1), 1, 1), Some(0));
    }

    #[test]
    fn fold_division() {
        assert_eq!(fold(Opcode::Sdiv, int_ty(32), 7, 2), Some(3));
        assert_eq!(fold(Opcode::Sdiv, int_ty(32), -7, 2), Some(-3));
        assert_eq!(fold(Opcode::Udiv, int_ty(32), 7, 0), None);
        assert_eq!(fold(Opcode::Sdiv, int_ty(64), i64::min_value(), -1), None);
    }

    #[test]
    fn fold_skips_shifts_and_remainders() {
        for &op in &[Opcode::Shl, Opcode::Shr, Opcode::Srem, Opcode::Urem] {
            assert_eq!(fold(op, int_ty(32), 6, 4), None, "{}", op);
        }
    }

    #[test]
    fn compare_predicates() {
        assert!(compare(Opcode::Slt, -1, 0));
        assert!(compare(Opcode::Ult, -1, 0));
        assert!(compare(Opcode::Uge, 3, 3));
        assert!(!compare(Opcode::Neq, 3, 3));
    }
}
