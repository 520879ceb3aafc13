// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of the input arguments and return type of functions.

use crate::{
    ir::{Arg, Function},
    table::PrimaryTable,
    ty::Type,
};

/// A description of the input arguments and return type of a function.
#[derive(Default, Clone)]
pub struct Signature {
    args: PrimaryTable<Arg, Type>,
    inp: Vec<Arg>,
    retty: Option<Type>,
}

impl Signature {
    /// Create a new signature.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add an input argument.
    pub fn add_input(&mut self, ty: Type) -> Arg {
        let arg = self.args.add(ty);
        self.inp.push(arg);
        arg
    }

    /// Set the return type of the signature.
    pub fn set_return_type(&mut self, ty: Type) {
        self.retty = Some(ty);
    }

    /// Get the return type of the signature.
    ///
    /// Signatures without an explicit return type return `void`.
    pub fn return_type(&self) -> Type {
        self.retty.unwrap_or(Type::Void)
    }

    /// Check whether the signature has any inputs.
    pub fn has_inputs(&self) -> bool {
        !self.inp.is_empty()
    }

    /// Return an iterator over the inputs of the signature.
    pub fn inputs<'a>(&'a self) -> impl Iterator<Item = Arg> + 'a {
        self.inp.iter().cloned()
    }

    /// Return the type of argument `arg`.
    pub fn arg_type(&self, arg: Arg) -> Type {
        self.args[arg]
    }

    /// Dump the signature in human-readable form, with argument names.
    pub fn dump<'a>(&'a self, func: &'a Function) -> SignatureDumper<'a> {
        SignatureDumper(self, func)
    }
}

impl Eq for Signature {}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.return_type() == other.return_type()
            && self.inp.len() == other.inp.len()
            && self
                .inputs()
                .zip(other.inputs())
                .all(|(a, b)| self.arg_type(a) == other.arg_type(b))
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use std::iter::{once, repeat};
        write!(f, "(")?;
        for (arg, sep) in self.inputs().zip(once("").chain(repeat(", "))) {
            write!(f, "{}{}", sep, self.arg_type(arg))?;
        }
        write!(f, ") {}", self.return_type())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Temporary object to dump a `Signature` in human-readable form.
pub struct SignatureDumper<'a>(&'a Signature, &'a Function);

impl std::fmt::Display for SignatureDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use std::iter::{once, repeat};
        write!(f, "(")?;
        for (arg, sep) in self.0.inputs().zip(once("").chain(repeat(", "))) {
            let value = self.1.arg_value(arg);
            write!(
                f,
                "{}{} {}",
                sep,
                self.1.value_type(value),
                value.dump(self.1)
            )?;
        }
        write!(f, ") {}", self.0.return_type())
    }
}
