// Copyright (c) 2017-2021 Fabian Schuiki

//! Sparse conditional constant propagation over a small SSA intermediate
//! representation. This library provides tools to create, read, write,
//! verify, and optimize functions in that representation.

#[macro_use]
extern crate log;

pub mod analysis;
pub mod assembly;
pub mod ir;
pub mod opt;
pub mod pass;
pub mod table;
mod ty;
pub mod verifier;

pub use crate::ty::*;
