// Copyright (c) 2017-2021 Fabian Schuiki

//! Optimization and analysis passes on the IR.
//!
//! This module implements various passes that analyze or mutate an
//! intermediate representation.

pub mod sccp;

pub use self::sccp::{SccpPrinter, SparseCondConstProp};
