// Copyright (c) 2017-2021 Fabian Schuiki

//! Verification of IR integrity.
//!
//! This module implements verification of the intermediate representation. It
//! checks that functions are well-formed, basic blocks have terminators, phi
//! nodes agree with the control flow graph, and types line up.

use crate::{
    analysis::PredecessorTable,
    ir::{prelude::*, ValueData},
    ty::{int_ty, Type},
};
use std::{
    fmt::Display,
    ops::{Deref, DerefMut},
};

/// An IR verifier.
///
/// The `Verifier` acts as a context to call the various IR checking functions
/// on. It keeps track of errors.
#[derive(Default)]
pub struct Verifier {
    errors: VerifierErrors,
    func_name: Option<String>,
}

impl Verifier {
    /// Create a new verifier.
    pub fn new() -> Self {
        Default::default()
    }

    /// Verify the integrity of a `Module`.
    pub fn verify_module(&mut self, module: &Module) {
        for func in module.functions() {
            self.verify_function(func);
        }
    }

    /// Verify the integrity of a `Function`.
    pub fn verify_function(&mut self, func: &Function) {
        self.func_name = Some(format!("func @{}", func.name()));

        if func.first_block().is_none() {
            self.push(None, "layout has no entry block".to_string());
        }
        let preds = func.predtbl();
        for bb in func.blocks() {
            // Check that the block has at least one instruction.
            let last = match func.layout().last_inst(bb) {
                Some(inst) => inst,
                None => {
                    self.push(Some(bb.dump(func).to_string()), "block is empty".into());
                    continue;
                }
            };

            let mut past_phis = false;
            for inst in func.insts(bb) {
                let opcode = func[inst].opcode();

                // Check that terminators only appear at the end of the block.
                if opcode.is_terminator() && inst != last {
                    self.push(
                        Some(inst.dump(func).to_string()),
                        format!("terminator must be at the end of block {}", bb.dump(func)),
                    );
                }
                if inst == last && !opcode.is_terminator() {
                    self.push(
                        Some(bb.dump(func).to_string()),
                        format!(
                            "last instruction `{}` must be a terminator",
                            inst.dump(func)
                        ),
                    );
                }

                // Check that phi nodes are grouped at the beginning.
                if opcode.is_phi() && past_phis {
                    self.push(
                        Some(inst.dump(func).to_string()),
                        format!("phi must be at the beginning of block {}", bb.dump(func)),
                    );
                }
                past_phis |= !opcode.is_phi();

                InstVerifier {
                    verifier: self,
                    func,
                    preds: &preds,
                }
                .verify_inst(inst, bb);
            }
        }

        self.func_name = None;
    }

    /// Finish verification and return the result.
    ///
    /// Consumes the verifier.
    pub fn finish(self) -> Result<(), VerifierErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Finish verification and panic if errors occurred.
    ///
    /// Consumes the verifier.
    pub fn finish_panic(self) {
        match self.finish() {
            Ok(()) => (),
            Err(errs) => panic!("Verification failed:\n{}", errs),
        }
    }

    fn push(&mut self, object: Option<String>, message: String) {
        self.errors.push(VerifierError {
            function: self.func_name.clone(),
            object,
            message,
        });
    }
}

/// An instruction verifier.
struct InstVerifier<'a> {
    verifier: &'a mut Verifier,
    func: &'a Function,
    preds: &'a PredecessorTable,
}

impl<'a> Deref for InstVerifier<'a> {
    type Target = Verifier;
    fn deref(&self) -> &Verifier {
        self.verifier
    }
}

impl<'a> DerefMut for InstVerifier<'a> {
    fn deref_mut(&mut self) -> &mut Verifier {
        self.verifier
    }
}

impl<'a> InstVerifier<'a> {
    fn is_value_defined(&self, value: Value) -> bool {
        match self.func.dfg().values.get(value) {
            Some(ValueData::Inst { inst, .. }) => self.func.inst_block(*inst).is_some(),
            Some(ValueData::Arg { .. }) | Some(ValueData::Const { .. }) => true,
            Some(ValueData::Placeholder { .. }) | None => false,
        }
    }

    fn error(&mut self, inst: Inst, message: String) {
        let object = Some(inst.dump(self.func).to_string());
        self.verifier.push(object, message);
    }

    /// Verify the integrity of a single instruction.
    fn verify_inst(&mut self, inst: Inst, bb: Block) {
        let func = self.func;
        let data = &func[inst];

        // Check that all arguments and blocks have a definition.
        let mut undefined = false;
        for &value in data.args() {
            if !self.is_value_defined(value) {
                undefined = true;
                self.error(inst, format!("value {} has no definition", value.dump(func)));
            }
        }
        for &block in data.blocks() {
            if !func.has_block(block) {
                undefined = true;
                self.error(inst, format!("block {} has no definition", block));
            }
        }
        if undefined {
            return;
        }

        // Check for instruction-specific invariants.
        let opcode = data.opcode();
        match *data {
            InstData::Unary { args: [x], .. } if opcode.is_unary() => {
                self.verify_arg_matches_ty(inst, x, func.inst_type(inst));
            }
            InstData::Binary { args: [x, y], .. } if opcode.is_binary() => {
                let ty = func.inst_type(inst);
                self.verify_int_ty(inst, ty);
                self.verify_arg_matches_ty(inst, x, ty);
                self.verify_arg_matches_ty(inst, y, ty);
            }
            InstData::Binary { args: [x, y], .. } if opcode.is_compare() => {
                if func.inst_type(inst) != int_ty(1) {
                    self.error(inst, "comparison must yield i1".into());
                }
                self.verify_arg_matches_ty(inst, y, func.value_type(x));
            }
            InstData::Phi {
                ref args, ref bbs, ..
            } => {
                if args.is_empty() {
                    self.error(inst, "phi has no incoming values".into());
                }
                for (&arg, &from) in args.iter().zip(bbs.iter()) {
                    self.verify_arg_matches_ty(inst, arg, func.inst_type(inst));
                    if !self.preds.is_pred(from, bb) {
                        self.error(
                            inst,
                            format!(
                                "{} is not a predecessor of {}",
                                from.dump(func),
                                bb.dump(func)
                            ),
                        );
                    }
                }
            }
            InstData::Jump { .. } => (),
            InstData::Branch { args: [cond], .. } => {
                self.verify_arg_matches_ty(inst, cond, int_ty(1));
            }
            InstData::Nullary {
                opcode: Opcode::Ret,
            } => {
                self.verify_return_type(inst, Type::Void);
            }
            InstData::Unary {
                opcode: Opcode::RetValue,
                args: [x],
            } => {
                self.verify_return_type(inst, func.value_type(x));
            }
            InstData::Call {
                func: ext,
                ref args,
                ..
            } => {
                let sig = &func.dfg()[ext].sig;
                if sig.inputs().count() != args.len() {
                    self.error(
                        inst,
                        format!(
                            "call passes {} arguments, but @{} takes {}",
                            args.len(),
                            func.dfg()[ext].name,
                            sig.inputs().count()
                        ),
                    );
                } else {
                    for (input, &arg) in sig.inputs().zip(args.iter()) {
                        self.verify_arg_matches_ty(inst, arg, sig.arg_type(input));
                    }
                }
            }
            _ => self.error(inst, format!("malformed {} instruction", opcode)),
        }
    }

    /// Verify that an instruction operates on integers.
    fn verify_int_ty(&mut self, inst: Inst, ty: Type) {
        if !ty.is_int() {
            self.error(inst, format!("type {} must be an integer", ty));
        }
    }

    /// Verify that an argument has a given type.
    fn verify_arg_matches_ty(&mut self, inst: Inst, arg: Value, ty: Type) {
        let arg_ty = self.func.value_type(arg);
        if arg_ty != ty {
            let message = format!(
                "argument {} must be of type {} (but is {})",
                arg.dump(self.func),
                ty,
                arg_ty
            );
            self.error(inst, message);
        }
    }

    /// Verify that the return type of the enclosing function is compatible with
    /// a ret instruction.
    fn verify_return_type(&mut self, inst: Inst, ty: Type) {
        let func_ty = self.func.sig().return_type();
        if func_ty != ty {
            self.error(
                inst,
                format!(
                    "requires function to have return type {} (but has {})",
                    ty, func_ty
                ),
            );
        }
    }
}

/// A verification error.
#[derive(Debug)]
pub struct VerifierError {
    /// The function within which the error occurred.
    pub function: Option<String>,
    /// The object which caused the error.
    pub object: Option<String>,
    /// The error message.
    pub message: String,
}

impl Display for VerifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(ref function) = self.function {
            write!(f, "{}: ", function)?;
        }
        if let Some(ref object) = self.object {
            write!(f, "{}: ", object)?;
        }
        write!(f, "{}", self.message)?;
        Ok(())
    }
}

/// A list of verification errors.
#[derive(Debug, Default)]
pub struct VerifierErrors(pub Vec<VerifierError>);

impl Deref for VerifierErrors {
    type Target = Vec<VerifierError>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for VerifierErrors {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Display for VerifierErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for err in self.iter() {
            writeln!(f, "- {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for VerifierErrors {}
