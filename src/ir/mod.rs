// Copyright (c) 2017-2021 Fabian Schuiki

//! Representation of functions and modules.
//!
//! This module implements the SSA intermediate representation the optimization
//! passes operate on. Functions own their values, instructions, and basic
//! blocks in tables, and refer to them through opaque keys.

use crate::{impl_table_key, ty::Type};

mod cfg;
mod dfg;
mod function;
mod inst;
mod layout;
mod module;
pub mod prelude;
mod sig;

pub use self::cfg::*;
pub use self::dfg::*;
pub use self::function::*;
pub use self::inst::*;
pub use self::layout::*;
pub use self::module::*;
pub use self::sig::*;

impl_table_key! {
    /// An instruction.
    struct Inst(u32) as "i";

    /// A value.
    struct Value(u32) as "v";

    /// A basic block.
    struct Block(u32) as "bb";

    /// An argument of a `Function`.
    struct Arg(u32) as "arg";

    /// An external function called from within a `Function`.
    struct ExtFunc(u32) as "ext";

    /// A function defined in a `Module`.
    struct ModFunc(u32) as "f";

    /// A function declared in a `Module`.
    struct ModDecl(u32) as "decl";
}

/// Internal table storage for values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueData {
    /// The value is the result of an instruction.
    Inst { ty: Type, inst: Inst },
    /// The value is an argument of the `Function`.
    Arg { ty: Type, arg: Arg },
    /// The value is an integer literal.
    Const { ty: Type, imm: i64 },
    /// The value is a placeholder. Used during construction of phi nodes.
    Placeholder { ty: Type },
}

impl ValueData {
    /// Return the type of the value.
    pub fn ty(&self) -> Type {
        match *self {
            ValueData::Inst { ty, .. } => ty,
            ValueData::Arg { ty, .. } => ty,
            ValueData::Const { ty, .. } => ty,
            ValueData::Placeholder { ty } => ty,
        }
    }

    /// Check if the value is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        match self {
            ValueData::Placeholder { .. } => true,
            _ => false,
        }
    }
}

/// Internal table storage for blocks.
#[derive(Debug, Clone, Default)]
pub struct BlockData {
    /// The name of the block.
    pub name: Option<String>,
}

/// A function called from within a `Function`.
///
/// Calls carry the name and signature of their target, since functions are
/// analyzed in isolation.
#[derive(Debug, Clone)]
pub struct ExtFuncData {
    /// The name of the called function.
    pub name: String,
    /// The signature of the called function.
    pub sig: Signature,
}
