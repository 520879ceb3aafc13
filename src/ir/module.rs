// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of a collection of functions.
//!
//! This module implements the `Module`, a collection of `Function` definitions
//! and external function declarations. A module acts as the root node of the
//! intermediate representation, and is the unit of information ingested by
//! the reader and emitted by the writer.

use crate::{
    impl_table_indexing,
    ir::{Function, ModDecl, ModFunc, Signature},
    table::PrimaryTable,
};
use rayon::prelude::*;

/// A module.
///
/// This is the root node of the intermediate representation. Contains
/// `Function` definitions and external function declarations.
#[derive(Default)]
pub struct Module {
    /// The functions defined in this module.
    funcs: PrimaryTable<ModFunc, Function>,
    /// The functions declared in this module.
    decls: PrimaryTable<ModDecl, DeclData>,
}

/// An external function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclData {
    /// The name of the declared function.
    pub name: String,
    /// The signature of the declared function.
    pub sig: Signature,
}

impl_table_indexing!(Module, funcs, ModFunc, Function);
impl_table_indexing!(Module, decls, ModDecl, DeclData);

impl Module {
    /// Create a new empty module.
    pub fn new() -> Self {
        Default::default()
    }

    /// Dump the module in human-readable form.
    pub fn dump(&self) -> ModuleDumper<'_> {
        ModuleDumper(self)
    }

    /// Add a function to the module.
    pub fn add_function(&mut self, func: Function) -> ModFunc {
        self.funcs.add(func)
    }

    /// Add an external function declaration to the module.
    pub fn declare(&mut self, name: impl Into<String>, sig: Signature) -> ModDecl {
        self.decls.add(DeclData {
            name: name.into(),
            sig,
        })
    }

    /// Return an iterator over the functions in this module.
    pub fn functions<'a>(&'a self) -> impl Iterator<Item = &'a Function> + 'a {
        self.funcs.values()
    }

    /// Return an iterator over the functions in this module, in parallel.
    pub fn par_functions_mut(&mut self) -> impl ParallelIterator<Item = &mut Function> {
        self.funcs.storage.par_iter_mut().map(|(_, func)| func)
    }

    /// Return an iterator over the declarations in this module.
    pub fn declarations<'a>(&'a self) -> impl Iterator<Item = &'a DeclData> + 'a {
        self.decls.values()
    }

    /// Find a function by name.
    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions().find(|func| func.name() == name)
    }

    /// Find a function by name, for modification.
    pub fn function_by_name_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.funcs
            .storage
            .values_mut()
            .find(|func| func.name() == name)
    }

    /// Look up the signature of a function or declaration by name.
    pub fn lookup_signature(&self, name: &str) -> Option<&Signature> {
        self.function_by_name(name)
            .map(|func| func.sig())
            .or_else(|| {
                self.declarations()
                    .find(|decl| decl.name == name)
                    .map(|decl| &decl.sig)
            })
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.dump())
    }
}

/// Temporary object to dump a `Module` in human-readable form.
pub struct ModuleDumper<'a>(&'a Module);

impl std::fmt::Display for ModuleDumper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut newline = false;
        for decl in self.0.declarations() {
            write!(f, "declare @{} {}\n", decl.name, decl.sig)?;
            newline = true;
        }
        for func in self.0.functions() {
            if newline {
                write!(f, "\n")?;
            }
            write!(f, "{}\n", func)?;
            newline = true;
        }
        Ok(())
    }
}
