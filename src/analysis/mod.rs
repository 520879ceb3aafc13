// Copyright (c) 2017-2021 Fabian Schuiki

//! Analysis passes on the IR
//!
//! This module implements various analysis passes on the IR.

mod preds;

pub use self::preds::*;
