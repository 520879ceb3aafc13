// Copyright (c) 2017-2021 Fabian Schuiki

//! Re-exports of commonly used IR items.

pub use crate::ir::{
    Arg, Block, DeclData, ExtFunc, Function, FunctionBuilder, Inst, InstData, ModFunc, Module,
    Opcode, Signature, Value,
};
